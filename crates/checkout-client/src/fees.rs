//! Fee calculator and FX converter over HTTP

use async_trait::async_trait;
use checkout_core::model::{FeeCalculation, FeeCalculationRequest, FxConversion, FxConversionRequest};
use checkout_core::{FeeCalculator, FxConverter, Result};

use crate::http::ApiClient;

const CALCULATE_PATH: &str = "/fee-calculator/calculate";
const CONVERT_PATH: &str = "/mock-services/fx/convert";

/// `POST /fee-calculator/calculate`
#[derive(Clone, Debug)]
pub struct HttpFeeCalculator {
    api: ApiClient,
}

impl HttpFeeCalculator {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl FeeCalculator for HttpFeeCalculator {
    async fn calculate(&self, request: &FeeCalculationRequest) -> Result<FeeCalculation> {
        let calc: FeeCalculation = self.api.post(CALCULATE_PATH, request).await?;
        tracing::debug!(
            total_fee = %calc.total_fee,
            rules = calc.applied_rules.len(),
            "Fees calculated"
        );
        Ok(calc)
    }
}

/// `POST /mock-services/fx/convert`
#[derive(Clone, Debug)]
pub struct HttpFxConverter {
    api: ApiClient,
}

impl HttpFxConverter {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl FxConverter for HttpFxConverter {
    async fn convert(&self, request: &FxConversionRequest) -> Result<FxConversion> {
        let fx: FxConversion = self.api.post(CONVERT_PATH, request).await?;
        tracing::debug!(
            from = %fx.from_currency,
            to = %fx.to_currency,
            rate = %fx.exchange_rate,
            "Currency converted"
        );
        Ok(fx)
    }
}
