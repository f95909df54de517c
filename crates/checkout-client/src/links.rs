//! Payment link repository over HTTP

use std::sync::Arc;

use async_trait::async_trait;
use checkout_core::model::{
    CreatePaymentLinkRequest, PaymentFailure, PaymentLink, PaymentResult, ProcessPaymentRequest,
};
use checkout_core::{CheckoutError, Clock, PaymentLinkRepository, Result, SystemClock};

use crate::http::ApiClient;

const LINKS_PATH: &str = "/payment-links";
const PAY_PATH: &str = "/payment-links/pay";

/// Payment links owned by the checkout back-end
#[derive(Clone)]
pub struct HttpPaymentLinkRepository {
    api: ApiClient,
    clock: Arc<dyn Clock>,
}

impl HttpPaymentLinkRepository {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            clock: Arc::new(SystemClock),
        }
    }

    /// Clock used to stamp fallback transaction ids
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Failure result standing in for a payment call that never got a
    /// usable answer
    fn fallback(&self, err: &CheckoutError) -> PaymentResult {
        let message = match err {
            CheckoutError::Transport(api) => api.message.clone(),
            other => other.to_string(),
        };
        let transaction_id = format!("error_{}", self.clock.now().timestamp_millis());
        PaymentResult::Error(PaymentFailure::new(message, transaction_id))
    }
}

impl std::fmt::Debug for HttpPaymentLinkRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPaymentLinkRepository")
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentLinkRepository for HttpPaymentLinkRepository {
    async fn create(&self, request: &CreatePaymentLinkRequest) -> Result<PaymentLink> {
        self.api.post(LINKS_PATH, request).await
    }

    async fn get_by_id(&self, id: &str) -> Result<PaymentLink> {
        match self.api.get_segment(LINKS_PATH, id).await {
            Err(CheckoutError::Transport(err)) if err.is_not_found() => {
                Err(CheckoutError::NotFound("Payment link not found".into()))
            }
            other => other,
        }
    }

    async fn process_payment(&self, request: &ProcessPaymentRequest) -> Result<PaymentResult> {
        match self.api.post(PAY_PATH, request).await {
            Ok(result) => Ok(result),
            Err(err) => {
                tracing::warn!(
                    link_id = %request.payment_link_id,
                    error = %err,
                    "Payment call failed, reporting as error result"
                );
                Ok(self.fallback(&err))
            }
        }
    }
}
