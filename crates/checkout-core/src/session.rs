//! Checkout Session
//!
//! One payer, one link, one card form. The session owns all of its state
//! (field validation, lifecycle view, countdown, loading flag) and runs
//! the payment flow:
//!
//! ```text
//!   validate all fields ──▶ tokenize card ──▶ submit token ──▶ fold result
//!                                                              into status
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::card::CardValidationState;
use crate::clock::Clock;
use crate::error::{CheckoutError, Result};
use crate::lifecycle::{CountdownTimer, LinkLifecycle, LinkStatus};
use crate::model::{CardInput, PaymentLink, PaymentResult};
use crate::ports::Tokenizer;
use crate::usecase::{PaymentSubmission, ProcessPayment};

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payment form session for a single link
pub struct CheckoutSession {
    id: SessionId,
    lifecycle: LinkLifecycle,
    card_state: CardValidationState,
    loading: bool,
    error: Option<String>,
    last_result: Option<PaymentResult>,
    countdown: Option<CountdownTimer>,
    tokenizer: Arc<dyn Tokenizer>,
    payments: ProcessPayment,
    clock: Arc<dyn Clock>,
}

impl CheckoutSession {
    pub fn new(
        link: PaymentLink,
        tokenizer: Arc<dyn Tokenizer>,
        payments: ProcessPayment,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let lifecycle = LinkLifecycle::new(link, clock.now());
        Self {
            id: SessionId::new(),
            lifecycle,
            card_state: CardValidationState::new(),
            loading: false,
            error: None,
            last_result: None,
            countdown: None,
            tokenizer,
            payments,
            clock,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn lifecycle(&self) -> &LinkLifecycle {
        &self.lifecycle
    }

    /// Display status at the clock's current time
    pub fn status(&mut self) -> LinkStatus {
        self.lifecycle.observe_time(self.clock.now());
        self.lifecycle.status()
    }

    pub fn card_state(&self) -> &CardValidationState {
        &self.card_state
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Inline error for the last attempt
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_result(&self) -> Option<&PaymentResult> {
        self.last_result.as_ref()
    }

    /// Start the expiry countdown for the current link, replacing any
    /// running one
    pub fn start_countdown<F>(&mut self, on_expired: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.stop_countdown();
        if self.lifecycle.status() != LinkStatus::Pending {
            return;
        }
        self.countdown = Some(CountdownTimer::start(
            self.lifecycle.link().expires_at,
            Arc::clone(&self.clock),
            on_expired,
        ));
    }

    pub fn countdown(&self) -> Option<&CountdownTimer> {
        self.countdown.as_ref()
    }

    pub fn stop_countdown(&mut self) {
        if let Some(mut timer) = self.countdown.take() {
            timer.stop();
        }
    }

    /// Take a re-fetched copy of the link as the new ground truth
    pub fn refresh(&mut self, link: PaymentLink) {
        self.lifecycle.refresh(link, self.clock.now());
    }

    /// Run the whole payment flow. The loading flag is cleared on every
    /// path; failures also land in [`Self::error`].
    pub async fn pay(&mut self, card: &CardInput, terms_accepted: bool) -> Result<PaymentResult> {
        self.loading = true;
        self.error = None;
        self.last_result = None;

        let outcome = self.submit(card, terms_accepted).await;
        self.loading = false;

        match &outcome {
            Ok(result) => {
                self.error = result.error_message().map(str::to_string);
                self.last_result = Some(result.clone());
            }
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "Payment attempt failed");
                self.error = Some(e.user_message());
            }
        }
        outcome
    }

    async fn submit(&mut self, card: &CardInput, terms_accepted: bool) -> Result<PaymentResult> {
        if self.lifecycle.observe_time(self.clock.now()) {
            self.stop_countdown();
        }
        if !self.lifecycle.is_payable() {
            return Err(CheckoutError::validation(
                "status",
                format!("El link de pago no admite pagos ({})", self.lifecycle.status()),
            ));
        }

        if !self.card_state.validate_all(card, terms_accepted, self.clock.today()) {
            return Err(match self.card_state.errors().first() {
                Some(first) => CheckoutError::validation(first.field.as_str(), first.message()),
                None => CheckoutError::validation(
                    "accept_terms",
                    "Debes aceptar los términos y condiciones",
                ),
            });
        }

        tracing::debug!(session_id = %self.id, provider = self.tokenizer.name(), "Tokenizing card");
        let token = self.tokenizer.tokenize(card).await?;

        let submission = PaymentSubmission {
            payment_link_id: self.lifecycle.link().id.clone(),
            card_token: token.token,
            accept_terms: terms_accepted,
        };
        let result = self.payments.execute(&submission).await?;

        self.lifecycle.observe_payment(&result)?;
        self.stop_countdown();
        Ok(result)
    }
}

impl std::fmt::Debug for CheckoutSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutSession")
            .field("id", &self.id)
            .field("link_id", &self.lifecycle.link().id)
            .field("status", &self.lifecycle.status())
            .field("loading", &self.loading)
            .field("tokenizer", &self.tokenizer.name())
            .finish_non_exhaustive()
    }
}
