// Onboarding handlers: plan selection, contract acceptance, payment
// completion, progress

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    services::contract::{
        AcceptContractRequest, CompletePaymentRequest, ContractService, SelectPlanRequest,
    },
    services::plans::PlanDefinition,
    utils::booking_errors::BookingError,
};

fn parse_user_id(auth_user: &AuthenticatedUser) -> Result<Uuid, BookingError> {
    Uuid::parse_str(&auth_user.user_id)
        .map_err(|_| BookingError::BadRequest("Invalid user ID format".to_string()))
}

/// GET /onboarding/status - Current onboarding progress and next step
pub async fn get_status(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> impl IntoResponse {
    let owner_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match ContractService::new(&state).onboarding_status(owner_id).await {
        Ok(status) => Json(json!({ "success": true, "data": status })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /onboarding/plans - Plans offered during onboarding
pub async fn list_plans() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "data": PlanDefinition::all()
    }))
}

/// POST /onboarding/select-plan - Pick a plan (requires approval)
pub async fn select_plan(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(request): Json<SelectPlanRequest>,
) -> impl IntoResponse {
    let owner_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match ContractService::new(&state).select_plan(owner_id, request).await {
        Ok(contract) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": contract,
                "message": "Plan selected; contract offered"
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /onboarding/accept-contract - Accept the offered contract.
/// Free plans activate the restaurant immediately.
pub async fn accept_contract(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(request): Json<AcceptContractRequest>,
) -> impl IntoResponse {
    let owner_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match ContractService::new(&state)
        .accept_contract(owner_id, request)
        .await
    {
        Ok(status) => Json(json!({
            "success": true,
            "data": status,
            "message": "Contract accepted"
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /onboarding/complete-payment - Record a completed payment and
/// activate the restaurant. Idempotent on idempotency_key.
pub async fn complete_payment(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(request): Json<CompletePaymentRequest>,
) -> impl IntoResponse {
    let owner_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match ContractService::new(&state)
        .complete_payment(owner_id, request)
        .await
    {
        Ok(status) => Json(json!({
            "success": true,
            "data": status,
            "message": "Payment recorded"
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}
