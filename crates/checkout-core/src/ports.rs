//! Collaborator Ports
//!
//! Every network-bound dependency of the checkout flow sits behind one of
//! these traits. Engines receive them as `Arc<dyn …>` so an HTTP
//! implementation and a test double are interchangeable.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_core::ports::FeeCalculator;
//!
//! let fees: Arc<dyn FeeCalculator> = Arc::new(HttpFeeCalculator::new(api));
//! let calc = fees.calculate(&request).await?;
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    CardInput, CardToken, CreatePaymentLinkRequest, FeeCalculation, FeeCalculationRequest,
    FxConversion, FxConversionRequest, PaymentLink, PaymentResult, ProcessPaymentRequest,
};

/// Remote fee calculator
#[async_trait]
pub trait FeeCalculator: Send + Sync {
    async fn calculate(&self, request: &FeeCalculationRequest) -> Result<FeeCalculation>;
}

/// Remote currency converter
#[async_trait]
pub trait FxConverter: Send + Sync {
    async fn convert(&self, request: &FxConversionRequest) -> Result<FxConversion>;
}

/// Remote owner of payment links
#[async_trait]
pub trait PaymentLinkRepository: Send + Sync {
    async fn create(&self, request: &CreatePaymentLinkRequest) -> Result<PaymentLink>;

    /// `CheckoutError::NotFound` when the id is unknown
    async fn get_by_id(&self, id: &str) -> Result<PaymentLink>;

    /// Rejections come back as `PaymentResult::{Error, Failed}`, not `Err`
    async fn process_payment(&self, request: &ProcessPaymentRequest) -> Result<PaymentResult>;
}

/// Card tokenization provider
#[async_trait]
pub trait Tokenizer: Send + Sync {
    async fn tokenize(&self, card: &CardInput) -> Result<CardToken>;

    /// Provider name for logs
    fn name(&self) -> &'static str;
}
