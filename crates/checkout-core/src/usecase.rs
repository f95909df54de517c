//! Use Cases
//!
//! Each use case validates its input locally and only then calls its
//! collaborator. A validation failure never reaches the transport.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result};
use crate::model::{
    CreatePaymentLinkRequest, CurrencyPair, FeeCalculation, FeeCalculationRequest, PaymentLink,
    PaymentResult, ProcessPaymentRequest,
};
use crate::ports::{FeeCalculator, PaymentLinkRepository};

/// Minimum trimmed length of a link description
pub const MIN_DESCRIPTION_CHARS: usize = 10;

/// Lifetime given to links created with an expiry
pub const DEFAULT_LINK_TTL: Duration = Duration::hours(24);

fn require_positive(field: &'static str, amount: Decimal, message: &str) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(CheckoutError::validation(field, message));
    }
    Ok(())
}

fn require_present(field: &'static str, value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CheckoutError::validation(field, message));
    }
    Ok(())
}

fn has_min_description(description: &str) -> bool {
    description.trim().chars().count() >= MIN_DESCRIPTION_CHARS
}

// ============================================================================
// Fees
// ============================================================================

/// Fee calculation with local amount checks
#[derive(Clone)]
pub struct CalculateFees {
    calculator: Arc<dyn FeeCalculator>,
}

impl CalculateFees {
    pub fn new(calculator: Arc<dyn FeeCalculator>) -> Self {
        Self { calculator }
    }

    /// Build the wire request, rejecting amounts that are not positive
    /// before or after rounding
    pub fn prepare(
        amount: Decimal,
        transaction_number: u32,
        pair: &CurrencyPair,
    ) -> Result<FeeCalculationRequest> {
        const MESSAGE: &str = "El monto debe ser mayor a 0";
        require_positive("amount", amount, MESSAGE)?;

        let request = FeeCalculationRequest::new(amount, transaction_number, pair)?;
        if request.amount <= 0 {
            return Err(CheckoutError::validation("amount", MESSAGE));
        }
        Ok(request)
    }

    pub async fn execute(
        &self,
        amount: Decimal,
        transaction_number: u32,
        pair: &CurrencyPair,
    ) -> Result<FeeCalculation> {
        let request = Self::prepare(amount, transaction_number, pair)?;
        tracing::debug!(amount = request.amount, transaction_number, "Calculating fees");
        self.calculator.calculate(&request).await
    }
}

// ============================================================================
// Payment links
// ============================================================================

/// Payment link creation
#[derive(Clone)]
pub struct CreatePaymentLink {
    repository: Arc<dyn PaymentLinkRepository>,
}

impl CreatePaymentLink {
    pub fn new(repository: Arc<dyn PaymentLinkRepository>) -> Self {
        Self { repository }
    }

    pub fn validate(request: &CreatePaymentLinkRequest) -> Result<()> {
        require_present("merchant_id", &request.merchant_id, "Merchant ID is required")?;
        require_positive("amount_usd", request.amount_usd, "Amount must be greater than 0")?;
        if !has_min_description(&request.description) {
            return Err(CheckoutError::validation(
                "description",
                "Description must be at least 10 characters",
            ));
        }
        Ok(())
    }

    pub async fn execute(&self, request: &CreatePaymentLinkRequest) -> Result<PaymentLink> {
        Self::validate(request)?;
        let link = self.repository.create(request).await?;
        tracing::info!(link_id = %link.id, merchant_id = %link.merchant_id, "Payment link created");
        Ok(link)
    }
}

/// Payment link lookup
#[derive(Clone)]
pub struct GetPaymentLinkById {
    repository: Arc<dyn PaymentLinkRepository>,
}

impl GetPaymentLinkById {
    pub fn new(repository: Arc<dyn PaymentLinkRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, id: &str) -> Result<PaymentLink> {
        require_present("payment_link_id", id, "Payment link ID is required")?;
        self.repository.get_by_id(id).await
    }
}

/// A tokenized payment ready to submit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSubmission {
    pub payment_link_id: String,
    pub card_token: String,
    pub accept_terms: bool,
}

/// Payment submission
#[derive(Clone)]
pub struct ProcessPayment {
    repository: Arc<dyn PaymentLinkRepository>,
}

impl ProcessPayment {
    pub fn new(repository: Arc<dyn PaymentLinkRepository>) -> Self {
        Self { repository }
    }

    pub fn validate(submission: &PaymentSubmission) -> Result<()> {
        require_present(
            "payment_link_id",
            &submission.payment_link_id,
            "Payment link ID is required",
        )?;
        require_present("card_token", &submission.card_token, "Card token is required")?;
        if !submission.accept_terms {
            return Err(CheckoutError::validation(
                "accept_terms",
                "You must accept the terms and conditions",
            ));
        }
        Ok(())
    }

    pub async fn execute(&self, submission: &PaymentSubmission) -> Result<PaymentResult> {
        Self::validate(submission)?;
        let request = ProcessPaymentRequest {
            payment_link_id: submission.payment_link_id.clone(),
            payment_token: submission.card_token.clone(),
        };
        let result = self.repository.process_payment(&request).await?;
        tracing::info!(
            link_id = %request.payment_link_id,
            transaction_id = %result.transaction_id(),
            success = result.is_success(),
            "Payment processed"
        );
        Ok(result)
    }
}

// ============================================================================
// Create-link form
// ============================================================================

/// Merchant-facing link creation form
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateLinkForm {
    pub merchant_name: String,
    pub description: String,
    pub amount: Decimal,
    pub has_expiration: bool,
}

impl Default for CreateLinkForm {
    fn default() -> Self {
        Self {
            merchant_name: String::new(),
            description: String::new(),
            amount: Decimal::ZERO,
            has_expiration: true,
        }
    }
}

impl CreateLinkForm {
    /// First failing field, checked in form order
    pub fn validate(&self) -> Result<()> {
        require_present(
            "merchant_name",
            &self.merchant_name,
            "El nombre del comercio es requerido",
        )?;
        if !has_min_description(&self.description) {
            return Err(CheckoutError::validation(
                "description",
                "La descripción debe tener al menos 10 caracteres",
            ));
        }
        require_positive("amount", self.amount, "El monto debe ser mayor a 0")
    }

    /// Validated wire request for `merchant_id`
    pub fn into_request(
        self,
        merchant_id: String,
        pair: CurrencyPair,
        now: DateTime<Utc>,
    ) -> Result<CreatePaymentLinkRequest> {
        self.validate()?;
        Ok(CreatePaymentLinkRequest {
            merchant_id,
            amount_usd: self.amount,
            currency_from: pair.from,
            currency_to: pair.to,
            description: self.description.trim().to_string(),
            expires_at: self.has_expiration.then(|| now + DEFAULT_LINK_TTL),
        })
    }
}
