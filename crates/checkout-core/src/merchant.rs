//! Merchant identifiers: `merchant-{uuid v4}`

use uuid::Uuid;

const PREFIX: &str = "merchant-";

/// Fresh merchant id
pub fn generate_merchant_id() -> String {
    format!("{PREFIX}{}", Uuid::new_v4())
}

/// `merchant-` followed by a hyphenated UUID, any case
pub fn is_valid_merchant_id(id: &str) -> bool {
    extract_merchant_uid(id).is_some()
}

/// The UUID part of a well-formed merchant id
pub fn extract_merchant_uid(id: &str) -> Option<&str> {
    let uid = id.strip_prefix(PREFIX)?;
    (uid.len() == 36 && Uuid::try_parse(uid).is_ok()).then_some(uid)
}
