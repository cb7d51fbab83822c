use axum::{Json, extract::State};

use crate::{
    AppState,
    extract::ApiJson,
    auth::AuthDealer,
    error::{AppError, AppResult},
    handlers::required,
    models::{BankDetailsInput, BankDetailsRequest, BankDetailsResponse, MessageResponse},
};

pub const NUBAN_LENGTH: usize = 10;
pub const ACCOUNT_TYPES: [&str; 2] = ["savings", "current"];

/// validate_bank_details
///
/// Required: account name, a 10-digit NUBAN account number, bank name.
/// `account_type` defaults to `savings`.
pub fn validate_bank_details(payload: BankDetailsRequest) -> AppResult<BankDetailsInput> {
    let (Some(account_name), Some(account_number), Some(bank_name)) = (
        required(payload.account_name),
        required(payload.account_number),
        required(payload.bank_name),
    ) else {
        return Err(AppError::validation("Missing required fields"));
    };

    if account_number.len() != NUBAN_LENGTH || !account_number.chars().all(|c| c.is_ascii_digit())
    {
        return Err(AppError::validation("Account number must be exactly 10 digits"));
    }

    let account_type = required(payload.account_type)
        .map(|t| t.to_lowercase())
        .unwrap_or_else(|| "savings".to_string());
    if !ACCOUNT_TYPES.contains(&account_type.as_str()) {
        return Err(AppError::validation(
            "Account type must be either 'savings' or 'current'",
        ));
    }

    Ok(BankDetailsInput {
        account_name,
        account_number,
        bank_name,
        bank_code: required(payload.bank_code),
        account_type,
    })
}

/// get_bank_details
///
/// [Dealer Route] Returns `{ "bankDetails": null }` when nothing has been saved yet.
#[utoipa::path(
    get,
    path = "/api/dealer/bank-details",
    responses((status = 200, description = "Payout account", body = BankDetailsResponse))
)]
pub async fn get_bank_details(
    AuthDealer { dealer, .. }: AuthDealer,
    State(state): State<AppState>,
) -> AppResult<Json<BankDetailsResponse>> {
    let bank_details = state.repo.get_bank_details(dealer.id).await?;
    Ok(Json(BankDetailsResponse {
        message: None,
        bank_details,
    }))
}

/// save_bank_details
///
/// [Dealer Route] Insert-or-update. Saved details always go back to unverified.
#[utoipa::path(
    post,
    path = "/api/dealer/bank-details",
    request_body = BankDetailsRequest,
    responses(
        (status = 200, description = "Saved", body = BankDetailsResponse),
        (status = 400, description = "Invalid bank details")
    )
)]
pub async fn save_bank_details(
    AuthDealer { dealer, .. }: AuthDealer,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<BankDetailsRequest>,
) -> AppResult<Json<BankDetailsResponse>> {
    let input = validate_bank_details(payload)?;
    let saved = state.repo.upsert_bank_details(dealer.id, input).await?;

    tracing::info!(dealer_id = %dealer.id, "bank details saved, verification pending");
    Ok(Json(BankDetailsResponse {
        message: Some("Bank details saved successfully".into()),
        bank_details: Some(saved),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/dealer/bank-details",
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Nothing to delete")
    )
)]
pub async fn delete_bank_details(
    AuthDealer { dealer, .. }: AuthDealer,
    State(state): State<AppState>,
) -> AppResult<Json<MessageResponse>> {
    if !state.repo.delete_bank_details(dealer.id).await? {
        return Err(AppError::not_found("No bank details on file"));
    }
    Ok(Json(MessageResponse {
        success: true,
        message: "Bank details deleted successfully".into(),
    }))
}
