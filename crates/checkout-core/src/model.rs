//! Domain Models
//!
//! Wire-compatible entities exchanged with the checkout back-end.
//! All money is `rust_decimal::Decimal`; string-encoded decimals on the wire
//! (`"1.5000"`, `"123.00"`) are normalized to numbers on receipt.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::card::CardBrand;
use crate::error::{CheckoutError, Result};
use crate::lifecycle::LinkStatus;

/// ISO-4217 style currency code: exactly three ASCII letters, upper-cased
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn parse(code: &str) -> Result<Self> {
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(CheckoutError::validation(
                "currency",
                format!("'{code}' is not a 3-letter currency code"),
            ))
        }
    }

    pub fn usd() -> Self {
        Self("USD".into())
    }

    pub fn mxn() -> Self {
        Self("MXN".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CheckoutError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source and target currency of a checkout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

impl CurrencyPair {
    pub fn new(from: CurrencyCode, to: CurrencyCode) -> Self {
        Self { from, to }
    }

    /// Parse both codes, reporting which side is malformed
    pub fn parse(from: &str, to: &str) -> Result<Self> {
        let from = CurrencyCode::parse(from).map_err(|_| {
            CheckoutError::validation(
                "currency_from",
                "La moneda de origen debe ser un código de 3 letras",
            )
        })?;
        let to = CurrencyCode::parse(to).map_err(|_| {
            CheckoutError::validation(
                "currency_to",
                "La moneda de destino debe ser un código de 3 letras",
            )
        })?;
        Ok(Self { from, to })
    }
}

impl Default for CurrencyPair {
    fn default() -> Self {
        Self::new(CurrencyCode::usd(), CurrencyCode::mxn())
    }
}

// ============================================================================
// Card input
// ============================================================================

/// Raw card form fields. Never persisted past tokenization.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CardInput {
    #[serde(rename = "card_number")]
    pub number: String,

    #[serde(rename = "card_holder")]
    pub holder: String,

    /// `MM/YY`
    #[serde(rename = "expiration_date")]
    pub expiration: String,

    pub cvv: String,
}

impl CardInput {
    pub fn new(
        number: impl Into<String>,
        holder: impl Into<String>,
        expiration: impl Into<String>,
        cvv: impl Into<String>,
    ) -> Self {
        Self {
            number: number.into(),
            holder: holder.into(),
            expiration: expiration.into(),
            cvv: cvv.into(),
        }
    }

    pub fn brand(&self) -> CardBrand {
        crate::card::detect_brand(&self.number)
    }

    /// Last four digits of the number, whitespace ignored
    pub fn last4(&self) -> String {
        let digits: Vec<char> = self.number.chars().filter(|c| !c.is_whitespace()).collect();
        let start = digits.len().saturating_sub(4);
        digits[start..].iter().collect()
    }
}

// Keep card data out of logs.
impl std::fmt::Debug for CardInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardInput")
            .field("number", &crate::format::mask_card_number(&self.number))
            .field("holder", &self.holder)
            .field("expiration", &"**/**")
            .field("cvv", &"***")
            .finish()
    }
}

/// Tokenization output
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardToken {
    pub token: String,
    pub card_brand: CardBrand,
    pub last4: String,
}

// ============================================================================
// Fees
// ============================================================================

/// Fee rule kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeRuleType {
    Fixed,
    Percentage,
    FxSpread,
}

impl FeeRuleType {
    pub const ALL: [Self; 3] = [Self::Percentage, Self::FxSpread, Self::Fixed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "FIXED",
            Self::Percentage => "PERCENTAGE",
            Self::FxSpread => "FX_SPREAD",
        }
    }
}

/// Condition under which a fee rule applies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeApplicationType {
    Always,
    AmountRange,
    TransactionCount,
}

/// A fee rule applied by the back-end. Immutable once received.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedFeeRule {
    pub id: String,

    #[serde(rename = "type")]
    pub rule_type: FeeRuleType,

    pub application_type: FeeApplicationType,

    /// Rate or fixed amount; sent as a decimal string
    pub value: Decimal,

    pub fee_amount: Decimal,

    #[serde(default)]
    pub description: String,
}

/// Result of a fee calculation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeCalculation {
    pub total_fee: Decimal,
    pub original_amount: Decimal,
    pub final_amount: Decimal,
    #[serde(default)]
    pub applied_rules: Vec<AppliedFeeRule>,
    pub transaction_number: u32,
}

impl FeeCalculation {
    /// Whether `total_fee` equals the sum of the applied rules' amounts.
    /// The back-end guarantees this; nothing here enforces it.
    pub fn fees_balance(&self) -> bool {
        let sum: Decimal = self.applied_rules.iter().map(|r| r.fee_amount).sum();
        sum == self.total_fee
    }
}

/// Fee calculation request (wire shape)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCalculationRequest {
    /// Whole units; the back-end rejects fractional amounts
    pub amount: i64,
    pub transaction_number: u32,
    pub currency_from: CurrencyCode,
    pub currency_to: CurrencyCode,
}

impl FeeCalculationRequest {
    /// Round half away from zero to an integer amount
    pub fn new(amount: Decimal, transaction_number: u32, pair: &CurrencyPair) -> Result<Self> {
        let amount = amount
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| CheckoutError::validation("amount", "El monto está fuera de rango"))?;

        Ok(Self {
            amount,
            transaction_number,
            currency_from: pair.from.clone(),
            currency_to: pair.to.clone(),
        })
    }
}

// ============================================================================
// FX conversion
// ============================================================================

/// FX conversion request (wire shape)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FxConversionRequest {
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// Read-only result of one conversion call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FxConversion {
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    pub amount: Decimal,
    pub converted_amount: Decimal,
    pub exchange_rate: Decimal,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub rate_source: String,
}

// ============================================================================
// Payment links
// ============================================================================

/// Transaction status as reported by the back-end
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// A payment attempt against a link
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub payment_link_id: String,
    pub amount_usd: Decimal,
    pub currency_to_amount: Decimal,
    pub status: TransactionStatus,
    pub card_last4: String,
    pub card_brand: String,
    #[serde(default, with = "timestamp_opt")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// A payment link. The remote counterpart owns it; nothing local mutates
/// `status`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentLink {
    pub id: String,
    pub merchant_id: String,

    /// Sent as a string (`"123.00"`) by the fetch endpoint
    pub amount_usd: Decimal,

    pub currency_from: CurrencyCode,
    pub currency_to: CurrencyCode,
    pub status: LinkStatus,

    #[serde(default, with = "timestamp_opt")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub description: String,

    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// Payment link creation request (wire shape)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatePaymentLinkRequest {
    pub merchant_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_usd: Decimal,
    pub currency_from: CurrencyCode,
    pub currency_to: CurrencyCode,
    pub description: String,
    pub expires_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Payment submission
// ============================================================================

/// Payment submission request (wire shape)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessPaymentRequest {
    pub payment_link_id: String,
    pub payment_token: String,
}

/// Successful settlement
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub transaction_id: String,
    pub original_amount: Decimal,
    pub fees: Decimal,
    pub total_amount: Decimal,
    pub psp_used: String,
    pub psp_reference: String,
    pub processing_time_ms: u64,
}

/// Rejected or errored payment, with whatever the back-end echoed back
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentFailure {
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psp_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}

impl PaymentFailure {
    pub fn new(error_message: impl Into<String>, transaction_id: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
            transaction_id: transaction_id.into(),
            original_amount: None,
            fees: None,
            total_amount: None,
            psp_used: None,
            transaction_status: None,
            processing_time_ms: None,
        }
    }
}

/// Outcome of a payment submission. Failures are values, not errors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PaymentResult {
    Success(PaymentReceipt),
    Error(PaymentFailure),
    Failed(PaymentFailure),
}

impl PaymentResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn transaction_id(&self) -> &str {
        match self {
            Self::Success(r) => &r.transaction_id,
            Self::Error(f) | Self::Failed(f) => &f.transaction_id,
        }
    }

    /// Message to show inline, if the payment did not go through
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Error(f) | Self::Failed(f) => Some(if f.error_message.is_empty() {
                "Error al procesar el pago"
            } else {
                &f.error_message
            }),
        }
    }
}

// ============================================================================
// Timestamp wire formats
// ============================================================================

/// Accepts RFC 3339 and offset-less ISO timestamps (read as UTC).
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                    .map(|naive| naive.and_utc())
                    .ok()
            })
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

/// Nullable variant of [`timestamp`]
pub mod timestamp_opt {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.is_empty() => super::timestamp::parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn link_json() -> serde_json::Value {
        json!({
            "id": "pl_123",
            "merchant_id": "merchant-1",
            "amount_usd": "123.00",
            "currency_from": "USD",
            "currency_to": "MXN",
            "status": "PENDING",
            "expires_at": null,
            "description": "Order #42 for a test",
            "created_at": "2025-01-10T12:00:00Z",
            "updated_at": "2025-01-10T12:00:00.123456"
        })
    }

    #[test]
    fn test_amount_usd_string_normalizes() {
        let link: PaymentLink = serde_json::from_value(link_json()).unwrap();
        assert_eq!(link.amount_usd, dec!(123));
        assert_eq!(link.status, LinkStatus::Pending);
        assert!(link.expires_at.is_none());
        assert!(link.transactions.is_empty());
    }

    #[test]
    fn test_fee_rule_value_string_normalizes() {
        let calc: FeeCalculation = serde_json::from_value(json!({
            "total_fee": 7,
            "original_amount": 200,
            "final_amount": 207,
            "applied_rules": [
                {"id": "r1", "type": "PERCENTAGE", "application_type": "ALWAYS",
                 "value": "1.5000", "fee_amount": 3, "description": "base"},
                {"id": "r2", "type": "FX_SPREAD", "application_type": "AMOUNT_RANGE",
                 "value": "2.0", "fee_amount": 4, "description": "spread"}
            ],
            "transaction_number": 1
        }))
        .unwrap();

        assert_eq!(calc.applied_rules[0].value, dec!(1.5));
        assert_eq!(calc.applied_rules[1].rule_type, FeeRuleType::FxSpread);
        assert!(calc.fees_balance());
    }

    #[test]
    fn test_fee_request_rounds_amount() {
        let pair = CurrencyPair::default();
        assert_eq!(FeeCalculationRequest::new(dec!(99.5), 0, &pair).unwrap().amount, 100);
        assert_eq!(FeeCalculationRequest::new(dec!(99.49), 0, &pair).unwrap().amount, 99);
    }

    #[test]
    fn test_currency_code_rules() {
        assert_eq!(CurrencyCode::parse("usd").unwrap().as_str(), "USD");
        assert!(CurrencyCode::parse("US").is_err());
        assert!(CurrencyCode::parse("US1").is_err());
        assert!(serde_json::from_value::<CurrencyCode>(json!("EURO")).is_err());

        let err = CurrencyPair::parse("USD", "MX").unwrap_err();
        assert!(matches!(err, CheckoutError::Validation { field: "currency_to", .. }));
    }

    #[test]
    fn test_payment_result_variants() {
        let ok: PaymentResult = serde_json::from_value(json!({
            "status": "success",
            "transaction_id": "tx_1",
            "original_amount": 100,
            "fees": 3.5,
            "total_amount": 103.5,
            "psp_used": "stripe",
            "psp_reference": "ch_1",
            "processing_time_ms": 420
        }))
        .unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.error_message(), None);

        let failed: PaymentResult = serde_json::from_value(json!({
            "status": "failed",
            "error_message": "Card declined",
            "transaction_id": "tx_2",
            "original_amount": "100.00"
        }))
        .unwrap();
        assert_eq!(failed.error_message(), Some("Card declined"));
        match failed {
            PaymentResult::Failed(f) => assert_eq!(f.original_amount, Some(dec!(100))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_create_request_sends_numbers() {
        let request = CreatePaymentLinkRequest {
            merchant_id: "merchant-1".into(),
            amount_usd: dec!(123.45),
            currency_from: CurrencyCode::usd(),
            currency_to: CurrencyCode::mxn(),
            description: "Ten chars at least".into(),
            expires_at: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["amount_usd"], json!(123.45));
        assert_eq!(value["expires_at"], serde_json::Value::Null);
    }

    #[test]
    fn test_card_input_debug_is_masked() {
        let card = CardInput::new("4532 0151 1283 0366", "Ada Lovelace", "12/30", "123");
        let debug = format!("{card:?}");
        assert!(!debug.contains("4532015112830366"));
        assert!(!debug.contains("123\""));
        assert_eq!(card.last4(), "0366");
    }
}
