//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use checkout_core::card::{CardFieldError, CardValidationState};
use checkout_core::fees::FeeLine;
use checkout_core::format::{format_amount, format_card_number};
use checkout_core::merchant::{generate_merchant_id, is_valid_merchant_id};
use checkout_core::model::{CardInput, CurrencyPair, FeeCalculation, FxConversion, PaymentLink};
use checkout_core::usecase::CreateLinkForm;
use checkout_core::{
    CardBrand, CheckoutError, CheckoutSession, FeesByType, LinkLifecycle, LinkStatus,
    PaymentResult, QuoteError,
};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub tokenizer: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

#[derive(Debug, Deserialize)]
pub struct CardValidationRequest {
    #[serde(flatten)]
    pub card: CardInput,
    #[serde(default)]
    pub accept_terms: bool,
}

#[derive(Debug, Serialize)]
pub struct CardValidationResponse {
    pub brand: CardBrand,
    pub card_mask: &'static str,
    pub formatted_number: String,
    pub validation: CardValidationState,
    pub errors: Vec<CardFieldError>,
    pub is_form_valid: bool,
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub amount: Decimal,
    #[serde(default = "default_transaction_number")]
    pub transaction_number: u32,
    #[serde(default = "default_currency_from")]
    pub currency_from: String,
    #[serde(default = "default_currency_to")]
    pub currency_to: String,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub fee_calculation: FeeCalculation,
    pub fees_by_type: FeesByType,
    pub fees: Vec<FeeLine>,
    pub fx_conversion: FxConversion,
    pub formatted_total: String,
}

/// Conversion failed after fees were committed
#[derive(Debug, Serialize)]
pub struct QuoteFailureResponse {
    pub error: String,
    pub code: String,
    pub fee_calculation: FeeCalculation,
    pub fees: Vec<FeeLine>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    /// Generated when absent
    #[serde(default)]
    pub merchant_id: Option<String>,
    pub merchant_name: String,
    pub description: String,
    pub amount: Decimal,
    #[serde(default = "default_has_expiration")]
    pub has_expiration: bool,
    #[serde(default = "default_currency_from")]
    pub currency_from: String,
    #[serde(default = "default_currency_to")]
    pub currency_to: String,
}

/// A link plus its display state at request time
#[derive(Debug, Serialize)]
pub struct LinkView {
    pub link: PaymentLink,
    pub status: LinkStatus,
    pub is_payable: bool,
    pub time_remaining: String,
    pub is_expiring_rapidly: bool,
    pub formatted_amount: String,
}

#[derive(Debug, Deserialize)]
pub struct PayRequest {
    #[serde(flatten)]
    pub card: CardInput,
    #[serde(default)]
    pub accept_terms: bool,
}

const fn default_transaction_number() -> u32 {
    1
}

const fn default_has_expiration() -> bool {
    true
}

fn default_currency_from() -> String {
    "USD".into()
}

fn default_currency_to() -> String {
    "MXN".into()
}

// ============================================================================
// Error mapping
// ============================================================================

fn error_response(err: &CheckoutError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code, field) = match err {
        CheckoutError::Validation { field, .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", Some(*field))
        }
        CheckoutError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
        CheckoutError::Transport(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", None),
        CheckoutError::Decode(_) | CheckoutError::Json(_) => {
            (StatusCode::BAD_GATEWAY, "UPSTREAM_DECODE_ERROR", None)
        }
        CheckoutError::InvalidTransition { .. } => {
            (StatusCode::CONFLICT, "INVALID_TRANSITION", None)
        }
        CheckoutError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR", None),
    };

    if status.is_server_error() {
        tracing::warn!(error = %err, code, "Request failed");
    }

    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: code.into(),
            field,
        }),
    )
}

fn quote_error_response(err: &QuoteError) -> Response {
    match err {
        QuoteError::Fee(source) => error_response(source).into_response(),
        QuoteError::Conversion {
            fee_calculation,
            source,
        } => {
            tracing::warn!(error = %source, "Conversion failed, returning fee breakdown");
            let fees = checkout_core::aggregate(fee_calculation).lines();
            (
                StatusCode::BAD_GATEWAY,
                Json(QuoteFailureResponse {
                    error: source.user_message(),
                    code: "CONVERSION_FAILED".into(),
                    fee_calculation: fee_calculation.as_ref().clone(),
                    fees,
                }),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        tokenizer: state.backend.tokenizer.name(),
    })
}

/// Per-field card validation, as the checkout form would show it
pub async fn validate_card(
    State(state): State<AppState>,
    Json(payload): Json<CardValidationRequest>,
) -> Json<CardValidationResponse> {
    let validation = CardValidationState::evaluate(&payload.card, state.clock.today());
    let brand = payload.card.brand();

    Json(CardValidationResponse {
        brand,
        card_mask: brand.number_mask(),
        formatted_number: format_card_number(&payload.card.number),
        errors: validation.errors(),
        is_form_valid: validation.is_form_valid(payload.accept_terms),
        validation,
    })
}

/// Fees, then conversion of the fee-inclusive total
pub async fn quote(
    State(state): State<AppState>,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, Response> {
    let pair = CurrencyPair::parse(&payload.currency_from, &payload.currency_to)
        .map_err(|e| error_response(&e).into_response())?;

    let quote = state
        .orchestrator()
        .compute_total(payload.amount, payload.transaction_number, &pair)
        .await
        .map_err(|e| quote_error_response(&e))?;

    let fees_by_type = quote.fees_by_type();
    let formatted_total = format_amount(
        quote.fx_conversion.converted_amount,
        quote.fx_conversion.to_currency.as_str(),
    );

    Ok(Json(QuoteResponse {
        fees: fees_by_type.lines(),
        fees_by_type,
        formatted_total,
        fee_calculation: quote.fee_calculation,
        fx_conversion: quote.fx_conversion,
    }))
}

/// Create a payment link from the merchant form
pub async fn create_link(
    State(state): State<AppState>,
    Json(payload): Json<CreateLinkRequest>,
) -> ApiResult<LinkView> {
    let merchant_id = match payload.merchant_id {
        Some(id) if !is_valid_merchant_id(&id) => {
            return Err(error_response(&CheckoutError::validation(
                "merchant_id",
                "Merchant ID must look like merchant-{uuid}",
            )));
        }
        Some(id) => id,
        None => generate_merchant_id(),
    };

    let pair = CurrencyPair::parse(&payload.currency_from, &payload.currency_to)
        .map_err(|e| error_response(&e))?;

    let form = CreateLinkForm {
        merchant_name: payload.merchant_name,
        description: payload.description,
        amount: payload.amount,
        has_expiration: payload.has_expiration,
    };
    let request = form
        .into_request(merchant_id, pair, state.clock.now())
        .map_err(|e| error_response(&e))?;

    let link = state
        .create_link()
        .execute(&request)
        .await
        .map_err(|e| error_response(&e))?;

    tracing::info!(link_id = %link.id, merchant_id = %link.merchant_id, "Payment link created");
    Ok(Json(link_view(&state, link)))
}

/// Link with derived status and countdown label
pub async fn get_link(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<LinkView> {
    let link = state
        .get_link()
        .execute(&id)
        .await
        .map_err(|e| error_response(&e))?;

    Ok(Json(link_view(&state, link)))
}

/// Validate the card, tokenize it and submit the payment
pub async fn pay_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<PayRequest>,
) -> ApiResult<PaymentResult> {
    let link = state
        .get_link()
        .execute(&id)
        .await
        .map_err(|e| error_response(&e))?;

    let mut session = CheckoutSession::new(
        link,
        Arc::clone(&state.backend.tokenizer),
        state.payments(),
        Arc::clone(&state.clock),
    );

    let result = session
        .pay(&payload.card, payload.accept_terms)
        .await
        .map_err(|e| error_response(&e))?;

    tracing::info!(
        link_id = %id,
        session_id = %session.id(),
        transaction_id = %result.transaction_id(),
        status = %session.lifecycle().status(),
        "Payment submitted"
    );
    Ok(Json(result))
}

fn link_view(state: &AppState, link: PaymentLink) -> LinkView {
    let now = state.clock.now();
    let formatted_amount = format_amount(link.amount_usd, link.currency_from.as_str());
    let lifecycle = LinkLifecycle::new(link, now);

    LinkView {
        status: lifecycle.status(),
        is_payable: lifecycle.is_payable(),
        time_remaining: lifecycle.time_remaining(now),
        is_expiring_rapidly: lifecycle.is_expiring_rapidly(now),
        formatted_amount,
        link: lifecycle.link().clone(),
    }
}
