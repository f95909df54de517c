//! Card Validation
//!
//! Deterministic, side-effect-free validation of raw card form fields and
//! card brand detection.
//!
//! ```text
//!   number ──▶ strip ──▶ brand ──▶ length rule ──▶ Luhn
//!   cvv    ──▶ brand-specific length (amex 4, others 3)
//!   expiry ──▶ MM/YY ──▶ month range ──▶ not before current month
//!   holder ──▶ trim ──▶ letters/spaces, ≥ 3 chars
//! ```

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

use crate::model::CardInput;

/// Card network inferred from the leading digits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Unknown,
}

impl CardBrand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::Amex => "amex",
            Self::Unknown => "unknown",
        }
    }

    /// Whether a digit count is allowed for this brand
    pub fn accepts_length(self, len: usize) -> bool {
        match self {
            Self::Amex => len == 15,
            Self::Visa | Self::Mastercard => len == 16,
            Self::Unknown => (13..=19).contains(&len),
        }
    }

    pub fn cvv_length(self) -> usize {
        if self == Self::Amex { 4 } else { 3 }
    }

    /// Display mask for the card face
    pub fn number_mask(self) -> &'static str {
        if self == Self::Amex {
            "#### ###### #####"
        } else {
            "#### #### #### ####"
        }
    }
}

impl std::fmt::Display for CardBrand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Detect the brand. Evaluated in priority order: visa, mastercard, amex.
pub fn detect_brand(number: &str) -> CardBrand {
    let clean = strip_whitespace(number);
    match clean.as_bytes() {
        [b'4', ..] => CardBrand::Visa,
        [b'5', b'1'..=b'5', ..] => CardBrand::Mastercard,
        [b'3', b'4' | b'7', ..] => CardBrand::Amex,
        _ => CardBrand::Unknown,
    }
}

/// Luhn mod-10 checksum. Non-digit input never passes.
pub fn luhn_check(number: &str) -> bool {
    let clean = strip_whitespace(number);
    if clean.is_empty() || !clean.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = clean
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                digit
            }
        })
        .sum();

    sum % 10 == 0
}

// ============================================================================
// Field errors
// ============================================================================

/// Form field being validated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardField {
    CardNumber,
    CardHolder,
    ExpirationDate,
    Cvv,
}

impl CardField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CardNumber => "card_number",
            Self::CardHolder => "card_holder",
            Self::ExpirationDate => "expiration_date",
            Self::Cvv => "cvv",
        }
    }
}

/// Why a field failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardErrorKind {
    Required,
    InvalidLength,
    FailedChecksum,
    WrongLength { expected: usize },
    InvalidFormat,
    Expired,
}

/// A failed field check, carrying its user-facing message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CardFieldError {
    pub field: CardField,
    pub kind: CardErrorKind,
}

impl CardFieldError {
    pub fn new(field: CardField, kind: CardErrorKind) -> Self {
        Self { field, kind }
    }

    pub fn message(&self) -> String {
        use CardErrorKind as K;
        use CardField as F;

        match (self.field, self.kind) {
            (F::CardNumber, K::Required) => "El número de tarjeta es requerido".into(),
            (F::CardNumber, K::InvalidLength) => "Longitud de tarjeta inválida".into(),
            (F::CardNumber, _) => "Número de tarjeta inválido".into(),
            (F::CardHolder, K::Required) => "El nombre del titular es requerido".into(),
            (F::CardHolder, _) => "Solo se permiten letras y espacios (mínimo 3 caracteres)".into(),
            (F::ExpirationDate, K::Required) => "La fecha de expiración es requerida".into(),
            (F::ExpirationDate, _) => "Fecha inválida o expirada (MM/YY)".into(),
            (F::Cvv, K::Required) => "El CVV es requerido".into(),
            (F::Cvv, K::WrongLength { expected }) => format!("CVV debe tener {expected} dígitos"),
            (F::Cvv, _) => "CVV inválido".into(),
        }
    }
}

impl std::fmt::Display for CardFieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for CardFieldError {}

impl Serialize for CardFieldError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.message())
    }
}

type FieldResult = std::result::Result<(), CardFieldError>;

// ============================================================================
// Field validators
// ============================================================================

pub fn validate_number(number: &str) -> FieldResult {
    let fail = |kind| Err(CardFieldError::new(CardField::CardNumber, kind));
    let clean = strip_whitespace(number);

    if clean.is_empty() {
        return fail(CardErrorKind::Required);
    }
    if !detect_brand(&clean).accepts_length(clean.chars().count()) {
        return fail(CardErrorKind::InvalidLength);
    }
    if !luhn_check(&clean) {
        return fail(CardErrorKind::FailedChecksum);
    }
    Ok(())
}

/// CVV length depends on the brand of `number`
pub fn validate_cvv(cvv: &str, number: &str) -> FieldResult {
    if cvv.is_empty() {
        return Err(CardFieldError::new(CardField::Cvv, CardErrorKind::Required));
    }

    let expected = detect_brand(number).cvv_length();
    if cvv.len() != expected || !cvv.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CardFieldError::new(
            CardField::Cvv,
            CardErrorKind::WrongLength { expected },
        ));
    }
    Ok(())
}

/// `MM/YY`, compared against the current two-digit year and month.
/// No day-of-month granularity.
pub fn validate_expiration(date: &str, today: NaiveDate) -> FieldResult {
    let fail = |kind| Err(CardFieldError::new(CardField::ExpirationDate, kind));

    if date.is_empty() {
        return fail(CardErrorKind::Required);
    }

    let (month, year) = match date.as_bytes() {
        [m1, m2, b'/', y1, y2] if [m1, m2, y1, y2].iter().all(|b| b.is_ascii_digit()) => (
            u32::from(m1 - b'0') * 10 + u32::from(m2 - b'0'),
            u32::from(y1 - b'0') * 10 + u32::from(y2 - b'0'),
        ),
        _ => return fail(CardErrorKind::InvalidFormat),
    };

    if !(1..=12).contains(&month) {
        return fail(CardErrorKind::InvalidFormat);
    }

    #[allow(clippy::cast_sign_loss)]
    let current_year = today.year().rem_euclid(100) as u32;
    let current_month = today.month();

    if year < current_year || (year == current_year && month < current_month) {
        return fail(CardErrorKind::Expired);
    }
    Ok(())
}

/// ASCII letters and spaces only, at least 3 characters after trimming
pub fn validate_holder(name: &str) -> FieldResult {
    let fail = |kind| Err(CardFieldError::new(CardField::CardHolder, kind));
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return fail(CardErrorKind::Required);
    }

    let letters_and_spaces = trimmed
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_whitespace());
    if !letters_and_spaces || trimmed.chars().count() < 3 {
        return fail(CardErrorKind::InvalidFormat);
    }
    Ok(())
}

// ============================================================================
// Form state
// ============================================================================

/// Presentation state of a single field
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FieldValidation {
    pub is_valid: bool,
    pub error: Option<CardFieldError>,
}

impl From<FieldResult> for FieldValidation {
    fn from(result: FieldResult) -> Self {
        match result {
            Ok(()) => Self {
                is_valid: true,
                error: None,
            },
            Err(e) => Self {
                is_valid: false,
                error: Some(e),
            },
        }
    }
}

/// Per-field validation record for the card form.
///
/// Purely derived: every field can be recomputed from the inputs at any
/// time, so re-running a validator simply overwrites its slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CardValidationState {
    pub card_number: FieldValidation,
    pub card_holder: FieldValidation,
    pub expiration_date: FieldValidation,
    pub cvv: FieldValidation,
}

impl CardValidationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_number(&mut self, card: &CardInput) -> bool {
        self.card_number = validate_number(&card.number).into();
        self.card_number.is_valid
    }

    pub fn validate_holder(&mut self, card: &CardInput) -> bool {
        self.card_holder = validate_holder(&card.holder).into();
        self.card_holder.is_valid
    }

    pub fn validate_expiration(&mut self, card: &CardInput, today: NaiveDate) -> bool {
        self.expiration_date = validate_expiration(&card.expiration, today).into();
        self.expiration_date.is_valid
    }

    pub fn validate_cvv(&mut self, card: &CardInput) -> bool {
        self.cvv = validate_cvv(&card.cvv, &card.number).into();
        self.cvv.is_valid
    }

    /// Run every field validator (no short-circuit, so all slots refresh)
    /// and AND the results with the terms flag.
    pub fn validate_all(&mut self, card: &CardInput, terms_accepted: bool, today: NaiveDate) -> bool {
        let number = self.validate_number(card);
        let holder = self.validate_holder(card);
        let expiration = self.validate_expiration(card, today);
        let cvv = self.validate_cvv(card);

        number && holder && expiration && cvv && terms_accepted
    }

    /// Fresh state for `card`
    pub fn evaluate(card: &CardInput, today: NaiveDate) -> Self {
        let mut state = Self::new();
        state.validate_all(card, false, today);
        state
    }

    pub fn is_form_valid(&self, terms_accepted: bool) -> bool {
        self.fields().iter().all(|f| f.is_valid) && terms_accepted
    }

    /// Field errors in form order
    pub fn errors(&self) -> Vec<CardFieldError> {
        self.fields().iter().filter_map(|f| f.error).collect()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn fields(&self) -> [&FieldValidation; 4] {
        [&self.card_number, &self.card_holder, &self.expiration_date, &self.cvv]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    /// Append the digit that makes `body` pass Luhn
    fn with_check_digit(body: &str) -> String {
        (0..=9)
            .map(|d| format!("{body}{d}"))
            .find(|candidate| luhn_check(candidate))
            .unwrap()
    }

    fn random_digits(rng: &mut impl Rng, len: usize) -> String {
        (0..len).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
    }

    #[test]
    fn test_valid_visa() {
        let number = "4532015112830366";
        assert_eq!(detect_brand(number), CardBrand::Visa);
        assert!(luhn_check(number));
        assert_eq!(validate_number(number), Ok(()));
    }

    #[test]
    fn test_altered_digit_fails_checksum() {
        let err = validate_number("4532015112830367").unwrap_err();
        assert_eq!(err.kind, CardErrorKind::FailedChecksum);
        assert_eq!(err.to_string(), "Número de tarjeta inválido");
    }

    #[test]
    fn test_brand_priority() {
        assert_eq!(detect_brand("4111 1111 1111 1111"), CardBrand::Visa);
        assert_eq!(detect_brand("5105105105105100"), CardBrand::Mastercard);
        assert_eq!(detect_brand("5605105105105100"), CardBrand::Unknown);
        assert_eq!(detect_brand("378282246310005"), CardBrand::Amex);
        assert_eq!(detect_brand("341111111111111"), CardBrand::Amex);
        assert_eq!(detect_brand("3530111333300000"), CardBrand::Unknown);
        assert_eq!(detect_brand(""), CardBrand::Unknown);
    }

    #[test]
    fn test_brand_is_pure_function_of_prefix() {
        let mut rng = rand::thread_rng();
        for prefix in ["4", "51", "55", "34", "37", "6011", "2"] {
            let expected = detect_brand(prefix);
            for _ in 0..20 {
                let tail = random_digits(&mut rng, 12);
                assert_eq!(detect_brand(&format!("{prefix}{tail}")), expected);
            }
        }
    }

    #[test]
    fn test_length_rules() {
        // amex needs 15
        assert_eq!(
            validate_number("3782822463100051").unwrap_err().kind,
            CardErrorKind::InvalidLength
        );
        // visa needs 16
        assert_eq!(
            validate_number("4111111111111").unwrap_err().kind,
            CardErrorKind::InvalidLength
        );
        // unknown accepts 13-19
        assert_eq!(validate_number(&with_check_digit("600000000000")), Ok(()));
        assert_eq!(
            validate_number(&with_check_digit("60000000000")).unwrap_err().kind,
            CardErrorKind::InvalidLength
        );
        assert_eq!(
            validate_number("   ").unwrap_err().kind,
            CardErrorKind::Required
        );
    }

    #[test]
    fn test_luhn_property_with_random_mutation() {
        let mut rng = rand::thread_rng();
        let mut caught = 0;
        let trials = 500;

        for trial in 0..trials {
            let (prefix, len) = match trial % 4 {
                0 => ("34", 15),
                1 => ("37", 15),
                2 => ("4", 16),
                _ => ("52", 16),
            };
            let body = format!("{prefix}{}", random_digits(&mut rng, len - prefix.len() - 1));
            let number = with_check_digit(&body);
            assert_eq!(validate_number(&number), Ok(()), "{number}");

            // Flip one digit (keep the prefix so brand and length stay put)
            let pos = rng.gen_range(prefix.len()..len);
            let mut digits: Vec<u8> = number.bytes().collect();
            let old = digits[pos] - b'0';
            let new = (old + rng.gen_range(1..10u8)) % 10;
            digits[pos] = b'0' + new;
            let mutated = String::from_utf8(digits).unwrap();

            if validate_number(&mutated).is_err() {
                caught += 1;
            }
        }

        // Luhn catches every single-digit substitution
        assert_eq!(caught, trials);
    }

    #[test]
    fn test_cvv_by_brand() {
        assert_eq!(validate_cvv("1234", "378282246310005"), Ok(()));
        let err = validate_cvv("123", "378282246310005").unwrap_err();
        assert_eq!(err.kind, CardErrorKind::WrongLength { expected: 4 });
        assert_eq!(err.to_string(), "CVV debe tener 4 dígitos");

        assert_eq!(validate_cvv("123", "4532015112830366"), Ok(()));
        assert!(validate_cvv("12a", "4532015112830366").is_err());
        assert_eq!(
            validate_cvv("", "4532015112830366").unwrap_err().kind,
            CardErrorKind::Required
        );
    }

    #[test]
    fn test_expiration_rules() {
        let today = today();
        assert_eq!(
            validate_expiration("01/20", today).unwrap_err().kind,
            CardErrorKind::Expired
        );
        assert_eq!(
            validate_expiration("05/26", today).unwrap_err().kind,
            CardErrorKind::Expired
        );
        assert_eq!(validate_expiration("06/26", today), Ok(()));
        assert_eq!(validate_expiration("01/27", today), Ok(()));
        assert_eq!(
            validate_expiration("13/27", today).unwrap_err().kind,
            CardErrorKind::InvalidFormat
        );
        assert_eq!(
            validate_expiration("00/27", today).unwrap_err().kind,
            CardErrorKind::InvalidFormat
        );
        assert_eq!(
            validate_expiration("1/27", today).unwrap_err().kind,
            CardErrorKind::InvalidFormat
        );
        assert_eq!(
            validate_expiration("", today).unwrap_err().kind,
            CardErrorKind::Required
        );
    }

    #[test]
    fn test_expired_in_any_later_year() {
        for year in [2021, 2024, 2030] {
            let today = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
            assert!(validate_expiration("01/20", today).is_err());
        }
    }

    #[test]
    fn test_holder_rules() {
        assert_eq!(validate_holder("  Ada Lovelace "), Ok(()));
        assert_eq!(
            validate_holder("   ").unwrap_err().kind,
            CardErrorKind::Required
        );
        assert_eq!(
            validate_holder("Al").unwrap_err().kind,
            CardErrorKind::InvalidFormat
        );
        assert_eq!(
            validate_holder("R2 D2").unwrap_err().kind,
            CardErrorKind::InvalidFormat
        );
    }

    #[test]
    fn test_validate_all_requires_terms() {
        let card = CardInput::new("4532 0151 1283 0366", "Ada Lovelace", "12/30", "123");
        let mut state = CardValidationState::new();

        assert!(!state.validate_all(&card, false, today()));
        assert!(!state.is_form_valid(false));
        assert!(state.validate_all(&card, true, today()));
        assert!(state.is_form_valid(true));
        assert!(state.errors().is_empty());
    }

    #[test]
    fn test_validate_all_refreshes_every_field() {
        let card = CardInput::new("", "x", "99/99", "");
        let mut state = CardValidationState::new();
        assert!(!state.validate_all(&card, true, today()));

        let fields: Vec<CardField> = state.errors().iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                CardField::CardNumber,
                CardField::CardHolder,
                CardField::ExpirationDate,
                CardField::Cvv
            ]
        );

        // Derived state: recomputing from the same input is identical
        assert_eq!(state, CardValidationState::evaluate(&card, today()));

        state.reset();
        assert_eq!(state, CardValidationState::default());
    }

    #[test]
    fn test_state_serializes_messages() {
        let card = CardInput::new("4532015112830367", "Ada Lovelace", "12/30", "123");
        let state = CardValidationState::evaluate(&card, today());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["card_number"]["is_valid"], false);
        assert_eq!(json["card_number"]["error"], "Número de tarjeta inválido");
        assert_eq!(json["cvv"]["error"], serde_json::Value::Null);
    }
}
