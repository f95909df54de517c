//! # checkout-client
//!
//! Concrete collaborators for `checkout-core`.
//!
//! ## Collaborators
//!
//! - **`HttpFeeCalculator`**: `POST /fee-calculator/calculate`
//! - **`HttpFxConverter`**: `POST /mock-services/fx/convert`
//! - **`HttpPaymentLinkRepository`**: create, fetch and pay payment links
//! - **`MockTokenizer`**: fixed-delay tokenization stub
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_client::{CheckoutBackend, ClientConfig};
//!
//! let backend = CheckoutBackend::from_config(&ClientConfig::from_env()?)?;
//! let quote = backend.orchestrator().compute_total(amount, 1, &pair).await?;
//! ```

pub mod config;
pub mod fees;
pub mod http;
pub mod links;
pub mod tokenize;

use std::sync::Arc;

use checkout_core::orchestrator::ConversionOrchestrator;
use checkout_core::usecase::CalculateFees;
use checkout_core::{FeeCalculator, FxConverter, PaymentLinkRepository, Result, Tokenizer};

pub use config::ClientConfig;
pub use fees::{HttpFeeCalculator, HttpFxConverter};
pub use http::ApiClient;
pub use links::HttpPaymentLinkRepository;
pub use tokenize::{MOCK_TOKEN, MockTokenizer};

// Re-export core types for convenience
pub use checkout_core::{CheckoutError, PaymentResult};

/// Every collaborator the checkout flow needs, behind its port
#[derive(Clone)]
pub struct CheckoutBackend {
    pub fees: Arc<dyn FeeCalculator>,
    pub fx: Arc<dyn FxConverter>,
    pub links: Arc<dyn PaymentLinkRepository>,
    pub tokenizer: Arc<dyn Tokenizer>,
}

impl CheckoutBackend {
    /// HTTP collaborators sharing one connection pool, plus the stub
    /// tokenizer
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let api = ApiClient::new(config)?;
        tracing::info!(base_url = %api.base_url(), "Checkout API client ready");

        Ok(Self {
            fees: Arc::new(HttpFeeCalculator::new(api.clone())),
            fx: Arc::new(HttpFxConverter::new(api.clone())),
            links: Arc::new(HttpPaymentLinkRepository::new(api)),
            tokenizer: Arc::new(MockTokenizer::new(config.tokenize_delay)),
        })
    }

    pub fn orchestrator(&self) -> ConversionOrchestrator {
        ConversionOrchestrator::new(CalculateFees::new(Arc::clone(&self.fees)), Arc::clone(&self.fx))
    }
}
