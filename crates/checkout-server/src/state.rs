//! Application State

use std::sync::Arc;

use checkout_client::CheckoutBackend;
use checkout_core::orchestrator::ConversionOrchestrator;
use checkout_core::usecase::{CreatePaymentLink, GetPaymentLinkById, ProcessPayment};
use checkout_core::{Clock, SystemClock};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Collaborators behind their ports (HTTP in production)
    pub backend: CheckoutBackend,

    /// Source of `now` for lifecycle views and card expiry checks
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(backend: CheckoutBackend) -> Self {
        Self {
            backend,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn orchestrator(&self) -> ConversionOrchestrator {
        self.backend.orchestrator()
    }

    pub fn create_link(&self) -> CreatePaymentLink {
        CreatePaymentLink::new(Arc::clone(&self.backend.links))
    }

    pub fn get_link(&self) -> GetPaymentLinkById {
        GetPaymentLinkById::new(Arc::clone(&self.backend.links))
    }

    pub fn payments(&self) -> ProcessPayment {
        ProcessPayment::new(Arc::clone(&self.backend.links))
    }
}
