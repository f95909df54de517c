//! # checkout-core
//!
//! Card validation, fee aggregation and payment-link lifecycle for a
//! checkout front-end. No I/O of its own: every network-bound step goes
//! through a port trait.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      CheckoutSession                         │
//! │  ┌──────────────┐  ┌───────────────┐  ┌──────────────────┐   │
//! │  │     Card     │  │ LinkLifecycle │  │    Tokenizer     │   │
//! │  │  Validation  │  │  + Countdown  │  │ PaymentLinkRepo  │   │
//! │  └──────────────┘  └───────────────┘  │     (ports)      │   │
//! │                                       └──────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//!
//!   ConversionOrchestrator:  FeeCalculator ──▶ FxConverter
//!                                  │
//!                                  └──▶ fees::aggregate ──▶ labels
//! ```

pub mod card;
pub mod clock;
pub mod error;
pub mod fees;
pub mod format;
pub mod lifecycle;
pub mod merchant;
pub mod model;
pub mod orchestrator;
pub mod ports;
pub mod session;
pub mod usecase;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use card::{CardBrand, CardValidationState, detect_brand, luhn_check};
pub use clock::{Clock, SystemClock};
pub use error::{ApiError, CheckoutError, Result};
pub use fees::{FeesByType, aggregate, label_for};
pub use lifecycle::{CountdownTimer, LifecycleEvent, LinkLifecycle, LinkStatus};
pub use model::{CardInput, CardToken, CurrencyCode, CurrencyPair, PaymentLink, PaymentResult};
pub use orchestrator::{ConversionOrchestrator, Quote, QuoteError};
pub use ports::{FeeCalculator, FxConverter, PaymentLinkRepository, Tokenizer};
pub use session::CheckoutSession;
