use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::stock_movement;
use crate::errors::ServiceError;
use crate::services::stock::{ReturnLine, SaleLine};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaleLineRequest {
    pub sku: String,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordSaleRequest {
    pub lines: Vec<SaleLineRequest>,
    pub customer_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnLineRequest {
    pub sku: String,
    pub quantity: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordReturnRequest {
    pub lines: Vec<ReturnLineRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustQuantityRequest {
    pub delta: i32,
    pub reason: String,
    /// One of sale, return, adjustment, purchase, initial; inferred from the
    /// delta's sign when omitted.
    pub movement_type: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReverseMovementRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MovementHistoryQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Continuation quantity from the previous page; omit on the first page.
    pub anchor_quantity: Option<i32>,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub movement_type: String,
    pub delta: i32,
    pub customer_name: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<stock_movement::Model> for MovementResponse {
    fn from(model: stock_movement::Model) -> Self {
        Self {
            id: model.id,
            item_id: model.item_id,
            movement_type: model.movement_type,
            delta: model.delta,
            customer_name: model.customer_name,
            reason: model.reason,
            created_at: model.created_at,
        }
    }
}

/// Record a multi-line sale
#[utoipa::path(
    post,
    path = "/api/v1/stock/sales",
    request_body = RecordSaleRequest,
    responses(
        (status = 200, description = "Sale recorded"),
        (status = 404, description = "Unknown SKU", body = crate::errors::ErrorResponse),
        (status = 422, description = "Unknown SKU or insufficient stock", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stock"
)]
pub async fn record_sale(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<RecordSaleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let lines = payload
        .lines
        .into_iter()
        .map(|l| SaleLine {
            sku: l.sku,
            quantity: l.quantity,
        })
        .collect();

    let outcome = state
        .services
        .stock
        .record_sale(auth_user.user_id, lines, payload.customer_name)
        .await?;

    Ok(Json(json!({
        "message": "Sale recorded",
        "lines_applied": outcome.lines_applied,
    })))
}

/// Record a multi-line return
#[utoipa::path(
    post,
    path = "/api/v1/stock/returns",
    request_body = RecordReturnRequest,
    responses(
        (status = 200, description = "Return recorded"),
        (status = 404, description = "Unknown SKU", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stock"
)]
pub async fn record_return(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<RecordReturnRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let lines = payload
        .lines
        .into_iter()
        .map(|l| ReturnLine {
            sku: l.sku,
            quantity: l.quantity,
            reason: l.reason,
        })
        .collect();

    let outcome = state
        .services
        .stock
        .record_return(auth_user.user_id, lines)
        .await?;

    Ok(Json(json!({
        "message": "Return recorded",
        "lines_applied": outcome.lines_applied,
    })))
}

/// Adjust one item's quantity by a signed delta
#[utoipa::path(
    post,
    path = "/api/v1/items/{id}/adjust",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = AdjustQuantityRequest,
    responses(
        (status = 201, description = "Adjustment recorded", body = MovementResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stock"
)]
pub async fn adjust_quantity(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustQuantityRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    if payload.reason.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "A reason is required for adjustments".to_string(),
        ));
    }

    let (item_row, movement) = state
        .services
        .stock
        .adjust_quantity(
            auth_user.user_id,
            id,
            payload.delta,
            payload.reason,
            payload.movement_type.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "movement": MovementResponse::from(movement),
            "quantity": item_row.quantity,
        })),
    ))
}

/// Reverse a previously recorded sale movement
#[utoipa::path(
    post,
    path = "/api/v1/stock/movements/{id}/reverse",
    params(("id" = Uuid, Path, description = "Sale movement ID")),
    request_body = ReverseMovementRequest,
    responses(
        (status = 201, description = "Reversal recorded", body = MovementResponse),
        (status = 400, description = "Movement is not a sale", body = crate::errors::ErrorResponse),
        (status = 404, description = "Movement not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stock"
)]
pub async fn reverse_movement(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReverseMovementRequest>>,
) -> Result<impl IntoResponse, ServiceError> {
    let reason = payload.and_then(|Json(body)| body.reason);

    let (item_row, movement) = state
        .services
        .stock
        .reverse_sale_movement(auth_user.user_id, id, reason)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "movement": MovementResponse::from(movement),
            "quantity": item_row.quantity,
        })),
    ))
}

/// List an item's movements newest-first with running quantities
#[utoipa::path(
    get,
    path = "/api/v1/items/{id}/movements",
    params(("id" = Uuid, Path, description = "Item ID"), MovementHistoryQuery),
    responses(
        (status = 200, description = "Movement history returned"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stock"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<MovementHistoryQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let limit = query.limit.clamp(1, 100);

    let history = state
        .services
        .history
        .list_for_item(
            auth_user.user_id,
            id,
            query.page,
            limit,
            query.anchor_quantity,
        )
        .await?;

    Ok(Json(history))
}
