//! In-memory collaborators
//!
//! Stand-ins for every port, recording what they were asked so tests can
//! assert on call order and payloads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::card::detect_brand;
use crate::clock::Clock;
use crate::error::{ApiError, CheckoutError, Result};
use crate::lifecycle::LinkStatus;
use crate::model::{
    AppliedFeeRule, CardInput, CardToken, CreatePaymentLinkRequest, FeeApplicationType,
    FeeCalculation, FeeCalculationRequest, FeeRuleType, FxConversion, FxConversionRequest,
    PaymentLink, PaymentReceipt, PaymentResult, ProcessPaymentRequest,
};
use crate::ports::{FeeCalculator, FxConverter, PaymentLinkRepository, Tokenizer};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Fee calculator charging a flat fee (5 unless set) on top of the amount
#[derive(Debug, Default)]
pub struct FakeFeeCalculator {
    fail: bool,
    fee: Option<Decimal>,
    calls: AtomicUsize,
    last: Mutex<Option<FeeCalculationRequest>>,
}

impl FakeFeeCalculator {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Flat `fee`, negative values included
    pub fn with_fee(fee: Decimal) -> Self {
        Self {
            fee: Some(fee),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<FeeCalculationRequest> {
        lock(&self.last).clone()
    }
}

#[async_trait]
impl FeeCalculator for FakeFeeCalculator {
    async fn calculate(&self, request: &FeeCalculationRequest) -> Result<FeeCalculation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last) = Some(request.clone());

        if self.fail {
            return Err(CheckoutError::Transport(ApiError::from_response(
                500,
                Some(serde_json::json!({ "message": "fee service unavailable" })),
            )));
        }

        let amount = Decimal::from(request.amount);
        let fee = self.fee.unwrap_or_else(|| Decimal::from(5));
        Ok(FeeCalculation {
            total_fee: fee,
            original_amount: amount,
            final_amount: amount + fee,
            applied_rules: vec![AppliedFeeRule {
                id: "fixed-1".into(),
                rule_type: FeeRuleType::Fixed,
                application_type: FeeApplicationType::Always,
                value: fee,
                fee_amount: fee,
                description: "Flat fee".into(),
            }],
            transaction_number: request.transaction_number,
        })
    }
}

/// Converter applying a fixed rate
#[derive(Debug)]
pub struct FakeFxConverter {
    rate: Option<Decimal>,
    calls: AtomicUsize,
    last: Mutex<Option<FxConversionRequest>>,
}

impl FakeFxConverter {
    pub fn succeeding(rate: Decimal) -> Self {
        Self {
            rate: Some(rate),
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            rate: None,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<FxConversionRequest> {
        lock(&self.last).clone()
    }
}

#[async_trait]
impl FxConverter for FakeFxConverter {
    async fn convert(&self, request: &FxConversionRequest) -> Result<FxConversion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last) = Some(request.clone());

        let rate = self
            .rate
            .ok_or_else(|| CheckoutError::Transport(ApiError::network("connection refused")))?;

        Ok(FxConversion {
            from_currency: request.from_currency.clone(),
            to_currency: request.to_currency.clone(),
            amount: request.amount,
            converted_amount: request.amount * rate,
            exchange_rate: rate,
            timestamp: epoch(),
            rate_source: "fake".into(),
        })
    }
}

/// Link store that settles every payment with a configurable result
#[derive(Debug, Default)]
pub struct FakeLinkRepository {
    links: Mutex<HashMap<String, PaymentLink>>,
    created: Mutex<Vec<CreatePaymentLinkRequest>>,
    payments: Mutex<Vec<ProcessPaymentRequest>>,
    payment_result: Option<PaymentResult>,
}

impl FakeLinkRepository {
    pub fn with_payment_result(result: PaymentResult) -> Self {
        Self {
            payment_result: Some(result),
            ..Self::default()
        }
    }

    pub fn insert(&self, link: PaymentLink) {
        lock(&self.links).insert(link.id.clone(), link);
    }

    pub fn created(&self) -> Vec<CreatePaymentLinkRequest> {
        lock(&self.created).clone()
    }

    pub fn payments(&self) -> Vec<ProcessPaymentRequest> {
        lock(&self.payments).clone()
    }
}

#[async_trait]
impl PaymentLinkRepository for FakeLinkRepository {
    async fn create(&self, request: &CreatePaymentLinkRequest) -> Result<PaymentLink> {
        let mut created = lock(&self.created);
        created.push(request.clone());

        let link = PaymentLink {
            id: format!("pl_{}", created.len()),
            merchant_id: request.merchant_id.clone(),
            amount_usd: request.amount_usd,
            currency_from: request.currency_from.clone(),
            currency_to: request.currency_to.clone(),
            status: LinkStatus::Pending,
            expires_at: request.expires_at,
            description: request.description.clone(),
            created_at: epoch(),
            updated_at: epoch(),
            transactions: Vec::new(),
        };
        self.insert(link.clone());
        Ok(link)
    }

    async fn get_by_id(&self, id: &str) -> Result<PaymentLink> {
        lock(&self.links)
            .get(id)
            .cloned()
            .ok_or_else(|| CheckoutError::NotFound("Payment link not found".into()))
    }

    async fn process_payment(&self, request: &ProcessPaymentRequest) -> Result<PaymentResult> {
        let mut payments = lock(&self.payments);
        payments.push(request.clone());

        Ok(self.payment_result.clone().unwrap_or_else(|| {
            PaymentResult::Success(PaymentReceipt {
                transaction_id: format!("tx_{}", payments.len()),
                original_amount: Decimal::from(100),
                fees: Decimal::from(5),
                total_amount: Decimal::from(105),
                psp_used: "fake".into(),
                psp_reference: "fake_ref".into(),
                processing_time_ms: 1,
            })
        }))
    }
}

/// Tokenizer returning `tok_test` without delay
#[derive(Debug, Default)]
pub struct FakeTokenizer {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeTokenizer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tokenizer for FakeTokenizer {
    async fn tokenize(&self, card: &CardInput) -> Result<CardToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CheckoutError::Transport(ApiError::network("tokenizer offline")));
        }
        Ok(CardToken {
            token: "tok_test".into(),
            card_brand: detect_brand(&card.number),
            last4: card.last4(),
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Wall time that follows tokio's (pausable) clock
#[derive(Debug)]
pub struct TokioClock {
    base: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl TokioClock {
    pub fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            started: tokio::time::Instant::now(),
        }
    }

    pub fn base(&self) -> DateTime<Utc> {
        self.base
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = tokio::time::Instant::now() - self.started;
        self.base + chrono::Duration::from_std(elapsed).unwrap_or_default()
    }
}
