//! Payment Link Lifecycle
//!
//! ```text
//!                ┌──────────▶ COMPLETED   (payment reported success)
//!   PENDING ─────┼──────────▶ FAILED      (payment reported error/failed)
//!                └──────────▶ EXPIRED     (now > expires_at, display only)
//! ```
//!
//! The remote counterpart owns the authoritative status. `LinkLifecycle`
//! keeps that copy untouched and derives a display status on top of it,
//! until the next re-fetch replaces the authoritative copy.

mod countdown;

pub use countdown::{
    Countdown, CountdownTimer, EXPIRED_LABEL, NO_EXPIRATION_LABEL, TICK_PERIOD, Tick,
    format_time_remaining, is_expiring_rapidly,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result};
use crate::model::{PaymentLink, PaymentResult};

/// Payment link status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkStatus {
    #[default]
    Pending,
    Completed,
    Expired,
    Failed,
}

impl LinkStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Expired => "EXPIRED",
            Self::Failed => "FAILED",
        }
    }

    /// Every status but `PENDING` is final
    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }

    /// Apply an event. Terminal states accept nothing.
    pub fn transition(self, event: LifecycleEvent) -> Result<Self> {
        match (self, event) {
            (Self::Pending, LifecycleEvent::PaymentSucceeded) => Ok(Self::Completed),
            (Self::Pending, LifecycleEvent::PaymentFailed) => Ok(Self::Failed),
            (Self::Pending, LifecycleEvent::ExpiryElapsed) => Ok(Self::Expired),
            (from, event) => Err(CheckoutError::InvalidTransition { from, event }),
        }
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What can move a link out of `PENDING`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    PaymentSucceeded,
    PaymentFailed,
    ExpiryElapsed,
}

impl LifecycleEvent {
    pub fn from_payment(result: &PaymentResult) -> Self {
        if result.is_success() {
            Self::PaymentSucceeded
        } else {
            Self::PaymentFailed
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PaymentSucceeded => "payment_succeeded",
            Self::PaymentFailed => "payment_failed",
            Self::ExpiryElapsed => "expiry_elapsed",
        };
        f.write_str(name)
    }
}

/// Whether the time condition for expiry holds
pub fn has_elapsed(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|at| now > at)
}

/// Display status for `link` at `now`, never written back
pub fn derive_status(link: &PaymentLink, now: DateTime<Utc>) -> LinkStatus {
    if link.status == LinkStatus::Pending && has_elapsed(link.expires_at, now) {
        LinkStatus::Expired
    } else {
        link.status
    }
}

/// Client-side view of one payment link
#[derive(Clone, Debug)]
pub struct LinkLifecycle {
    link: PaymentLink,
    display: LinkStatus,
}

impl LinkLifecycle {
    pub fn new(link: PaymentLink, now: DateTime<Utc>) -> Self {
        let display = derive_status(&link, now);
        Self { link, display }
    }

    /// The authoritative entity as last fetched
    pub fn link(&self) -> &PaymentLink {
        &self.link
    }

    /// Derived display status
    pub fn status(&self) -> LinkStatus {
        self.display
    }

    pub fn is_payable(&self) -> bool {
        self.display == LinkStatus::Pending
    }

    /// Re-check the time condition. Returns `true` on the call that first
    /// observes expiry.
    pub fn observe_time(&mut self, now: DateTime<Utc>) -> bool {
        if self.display == LinkStatus::Pending && has_elapsed(self.link.expires_at, now) {
            self.display = LinkStatus::Expired;
            tracing::info!(link_id = %self.link.id, "Payment link expired locally");
            return true;
        }
        false
    }

    /// Reflect a payment outcome in the display status
    pub fn observe_payment(&mut self, result: &PaymentResult) -> Result<LinkStatus> {
        let event = LifecycleEvent::from_payment(result);
        self.display = self.display.transition(event)?;
        tracing::debug!(link_id = %self.link.id, status = %self.display, "Link status updated");
        Ok(self.display)
    }

    /// Replace the authoritative copy after a re-fetch
    pub fn refresh(&mut self, link: PaymentLink, now: DateTime<Utc>) {
        self.display = derive_status(&link, now);
        self.link = link;
    }

    pub fn time_remaining(&self, now: DateTime<Utc>) -> String {
        format_time_remaining(self.link.expires_at, now)
    }

    pub fn is_expiring_rapidly(&self, now: DateTime<Utc>) -> bool {
        is_expiring_rapidly(self.link.expires_at, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CurrencyCode, PaymentFailure, PaymentReceipt};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn link(expires_in: Option<Duration>) -> PaymentLink {
        PaymentLink {
            id: "pl_1".into(),
            merchant_id: "merchant-1".into(),
            amount_usd: dec!(50),
            currency_from: CurrencyCode::usd(),
            currency_to: CurrencyCode::mxn(),
            status: LinkStatus::Pending,
            expires_at: expires_in.map(|d| now() + d),
            description: "Lifecycle test link".into(),
            created_at: now(),
            updated_at: now(),
            transactions: vec![],
        }
    }

    fn success() -> PaymentResult {
        PaymentResult::Success(PaymentReceipt {
            transaction_id: "tx_1".into(),
            original_amount: dec!(50),
            fees: dec!(2),
            total_amount: dec!(52),
            psp_used: "mock".into(),
            psp_reference: "ref".into(),
            processing_time_ms: 10,
        })
    }

    #[test]
    fn test_transitions_from_pending() {
        let pending = LinkStatus::Pending;
        assert_eq!(pending.transition(LifecycleEvent::PaymentSucceeded).unwrap(), LinkStatus::Completed);
        assert_eq!(pending.transition(LifecycleEvent::PaymentFailed).unwrap(), LinkStatus::Failed);
        assert_eq!(pending.transition(LifecycleEvent::ExpiryElapsed).unwrap(), LinkStatus::Expired);
    }

    #[test]
    fn test_terminal_states_reject_events() {
        for status in [LinkStatus::Completed, LinkStatus::Failed, LinkStatus::Expired] {
            assert!(status.is_terminal());
            for event in [
                LifecycleEvent::PaymentSucceeded,
                LifecycleEvent::PaymentFailed,
                LifecycleEvent::ExpiryElapsed,
            ] {
                assert!(matches!(
                    status.transition(event),
                    Err(CheckoutError::InvalidTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn test_expiry_is_display_only() {
        let mut lifecycle = LinkLifecycle::new(link(Some(Duration::seconds(30))), now());
        assert!(lifecycle.is_payable());

        assert!(!lifecycle.observe_time(now() + Duration::seconds(30)));
        assert!(lifecycle.observe_time(now() + Duration::seconds(31)));
        assert!(!lifecycle.observe_time(now() + Duration::seconds(90)));

        assert_eq!(lifecycle.status(), LinkStatus::Expired);
        assert_eq!(lifecycle.link().status, LinkStatus::Pending);
    }

    #[test]
    fn test_no_expiration_never_expires() {
        let mut lifecycle = LinkLifecycle::new(link(None), now());
        assert!(!lifecycle.observe_time(now() + Duration::days(3650)));
        assert_eq!(lifecycle.time_remaining(now()), NO_EXPIRATION_LABEL);
        assert!(!lifecycle.is_expiring_rapidly(now()));
    }

    #[test]
    fn test_payment_outcomes() {
        let mut lifecycle = LinkLifecycle::new(link(None), now());
        assert_eq!(lifecycle.observe_payment(&success()).unwrap(), LinkStatus::Completed);
        assert!(lifecycle.observe_payment(&success()).is_err());

        let mut lifecycle = LinkLifecycle::new(link(None), now());
        let failed = PaymentResult::Failed(PaymentFailure::new("declined", "tx_2"));
        assert_eq!(lifecycle.observe_payment(&failed).unwrap(), LinkStatus::Failed);
    }

    #[test]
    fn test_refresh_replaces_authoritative_copy() {
        let mut lifecycle = LinkLifecycle::new(link(Some(Duration::seconds(5))), now());
        lifecycle.observe_time(now() + Duration::seconds(10));
        assert_eq!(lifecycle.status(), LinkStatus::Expired);

        let mut fetched = link(Some(Duration::seconds(5)));
        fetched.status = LinkStatus::Completed;
        lifecycle.refresh(fetched, now() + Duration::seconds(10));
        assert_eq!(lifecycle.status(), LinkStatus::Completed);
        assert_eq!(lifecycle.link().status, LinkStatus::Completed);
    }
}
