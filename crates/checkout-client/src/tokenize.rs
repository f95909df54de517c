//! Tokenization stub
//!
//! Stands in for a card-network SDK: waits a fixed delay and hands back the
//! same token every time. No cryptography happens here.

use std::time::Duration;

use async_trait::async_trait;
use checkout_core::model::{CardInput, CardToken};
use checkout_core::{Result, Tokenizer, detect_brand};

/// Token returned for every card
pub const MOCK_TOKEN: &str = "tok_1234567890abcdefghijklmnop";

/// Fixed-delay tokenizer
#[derive(Clone, Debug)]
pub struct MockTokenizer {
    delay: Duration,
}

impl MockTokenizer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockTokenizer {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl Tokenizer for MockTokenizer {
    async fn tokenize(&self, card: &CardInput) -> Result<CardToken> {
        tokio::time::sleep(self.delay).await;

        let token = CardToken {
            token: MOCK_TOKEN.to_string(),
            card_brand: detect_brand(&card.number),
            last4: card.last4(),
        };
        tracing::debug!(brand = %token.card_brand, last4 = %token.last4, "Card tokenized");
        Ok(token)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
