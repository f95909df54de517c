//! Conversion Orchestrator
//!
//! ```text
//!   amount ──▶ fee calculation ──▶ final_amount ──▶ FX conversion ──▶ Quote
//!                    │                                   │
//!                    └─ Err: stop here                   └─ Err: fee result
//!                                                           still handed back
//! ```
//!
//! The two stages always run in that order, one after the other.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CheckoutError;
use crate::fees::{FeesByType, aggregate};
use crate::model::{CurrencyPair, FeeCalculation, FxConversion, FxConversionRequest};
use crate::ports::FxConverter;
use crate::usecase::CalculateFees;

/// Fee breakdown plus the converted total
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub fee_calculation: FeeCalculation,
    pub fx_conversion: FxConversion,
}

impl Quote {
    pub fn fees_by_type(&self) -> FeesByType {
        aggregate(&self.fee_calculation)
    }
}

/// Where the pipeline stopped
#[derive(Error, Debug)]
pub enum QuoteError {
    /// Nothing was converted
    #[error("Fee calculation failed: {0}")]
    Fee(#[source] CheckoutError),

    /// The fee step committed; only the conversion is missing
    #[error("Currency conversion failed: {source}")]
    Conversion {
        fee_calculation: Box<FeeCalculation>,
        source: CheckoutError,
    },
}

impl QuoteError {
    /// The committed fee breakdown, if the fee step got that far
    pub fn fee_calculation(&self) -> Option<&FeeCalculation> {
        match self {
            Self::Fee(_) => None,
            Self::Conversion { fee_calculation, .. } => Some(fee_calculation.as_ref()),
        }
    }

    pub fn error(&self) -> &CheckoutError {
        match self {
            Self::Fee(source) | Self::Conversion { source, .. } => source,
        }
    }
}

/// Sequences fee calculation and conversion
#[derive(Clone)]
pub struct ConversionOrchestrator {
    fees: CalculateFees,
    converter: Arc<dyn FxConverter>,
}

impl ConversionOrchestrator {
    pub fn new(fees: CalculateFees, converter: Arc<dyn FxConverter>) -> Self {
        Self { fees, converter }
    }

    pub async fn compute_total(
        &self,
        amount: Decimal,
        transaction_number: u32,
        pair: &CurrencyPair,
    ) -> Result<Quote, QuoteError> {
        let fee_calculation = self
            .fees
            .execute(amount, transaction_number, pair)
            .await
            .map_err(QuoteError::Fee)?;

        tracing::debug!(
            final_amount = %fee_calculation.final_amount,
            total_fee = %fee_calculation.total_fee,
            "Fee step complete, converting"
        );

        if fee_calculation.final_amount <= Decimal::ZERO {
            tracing::warn!(
                final_amount = %fee_calculation.final_amount,
                "Fee step produced a non-positive total, not converting"
            );
            return Err(QuoteError::Conversion {
                fee_calculation: Box::new(fee_calculation),
                source: CheckoutError::validation(
                    "amount",
                    "El monto final debe ser mayor a 0",
                ),
            });
        }

        let request = FxConversionRequest {
            from_currency: pair.from.clone(),
            to_currency: pair.to.clone(),
            amount: fee_calculation.final_amount,
        };

        match self.converter.convert(&request).await {
            Ok(fx_conversion) => Ok(Quote {
                fee_calculation,
                fx_conversion,
            }),
            Err(source) => {
                tracing::warn!(error = %source, "Conversion failed after fee step");
                Err(QuoteError::Conversion {
                    fee_calculation: Box::new(fee_calculation),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeFeeCalculator, FakeFxConverter};
    use rust_decimal_macros::dec;

    fn orchestrator(
        fees: &Arc<FakeFeeCalculator>,
        fx: &Arc<FakeFxConverter>,
    ) -> ConversionOrchestrator {
        ConversionOrchestrator::new(CalculateFees::new(fees.clone()), fx.clone())
    }

    #[tokio::test]
    async fn test_fee_failure_skips_conversion() {
        let fees = Arc::new(FakeFeeCalculator::failing());
        let fx = Arc::new(FakeFxConverter::succeeding(dec!(17.5)));

        let err = orchestrator(&fees, &fx)
            .compute_total(dec!(100), 1, &CurrencyPair::default())
            .await
            .unwrap_err();

        assert!(matches!(err, QuoteError::Fee(_)));
        assert!(err.fee_calculation().is_none());
        assert_eq!(fees.calls(), 1);
        assert_eq!(fx.calls(), 0);
    }

    #[tokio::test]
    async fn test_validation_failure_skips_both_stages() {
        let fees = Arc::new(FakeFeeCalculator::succeeding());
        let fx = Arc::new(FakeFxConverter::succeeding(dec!(17.5)));

        let err = orchestrator(&fees, &fx)
            .compute_total(dec!(0), 1, &CurrencyPair::default())
            .await
            .unwrap_err();

        assert!(matches!(err.error(), CheckoutError::Validation { .. }));
        assert_eq!(fees.calls(), 0);
        assert_eq!(fx.calls(), 0);
    }

    #[tokio::test]
    async fn test_converts_final_amount() {
        let fees = Arc::new(FakeFeeCalculator::succeeding());
        let fx = Arc::new(FakeFxConverter::succeeding(dec!(17.5)));

        let quote = orchestrator(&fees, &fx)
            .compute_total(dec!(100), 1, &CurrencyPair::default())
            .await
            .unwrap();

        // The fake charges a flat 5 on top of the amount
        assert_eq!(quote.fee_calculation.final_amount, dec!(105));
        assert_eq!(fx.last_request().unwrap().amount, dec!(105));
        assert_eq!(quote.fx_conversion.converted_amount, dec!(1837.5));
        assert!(quote.fees_by_type().fixed.is_some());
    }

    #[tokio::test]
    async fn test_non_positive_total_is_never_converted() {
        for fee in [dec!(-100), dec!(-150)] {
            let fees = Arc::new(FakeFeeCalculator::with_fee(fee));
            let fx = Arc::new(FakeFxConverter::succeeding(dec!(17.5)));

            let err = orchestrator(&fees, &fx)
                .compute_total(dec!(100), 1, &CurrencyPair::default())
                .await
                .unwrap_err();

            match err.error() {
                CheckoutError::Validation { field, .. } => assert_eq!(*field, "amount"),
                other => panic!("expected validation error, got {other:?}"),
            }
            assert_eq!(err.fee_calculation().unwrap().final_amount, dec!(100) + fee);
            assert_eq!(fees.calls(), 1);
            assert_eq!(fx.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_conversion_failure_keeps_fee_result() {
        let fees = Arc::new(FakeFeeCalculator::succeeding());
        let fx = Arc::new(FakeFxConverter::failing());

        let err = orchestrator(&fees, &fx)
            .compute_total(dec!(100), 1, &CurrencyPair::default())
            .await
            .unwrap_err();

        let committed = err.fee_calculation().unwrap();
        assert_eq!(committed.final_amount, dec!(105));
        assert!(matches!(err.error(), CheckoutError::Transport(_)));
        assert_eq!(fx.calls(), 1);
    }
}
