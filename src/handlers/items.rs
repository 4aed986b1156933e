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
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::item;
use crate::errors::ServiceError;
use crate::services::items::{CreateItemInput, ItemFilters, UpdateItemInput};
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    #[validate(length(min = 1))]
    pub name: String,
    /// Generated when omitted.
    pub sku: Option<String>,
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub low_stock_threshold: i32,
    pub supplier_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(range(min = 0))]
    pub low_stock_threshold: Option<i32>,
    /// An empty string clears the supplier.
    pub supplier_name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ItemListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub search: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemResponse {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub low_stock_threshold: i32,
    pub low_stock: bool,
    pub supplier_name: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<item::Model> for ItemResponse {
    fn from(model: item::Model) -> Self {
        let low_stock = model.is_low_stock();
        Self {
            id: model.id,
            sku: model.sku,
            name: model.name,
            quantity: model.quantity,
            low_stock_threshold: model.low_stock_threshold,
            low_stock,
            supplier_name: model.supplier_name,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Create an item together with its `initial` stock movement
#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let (created, _initial) = state
        .services
        .items
        .create_item(
            auth_user.user_id,
            CreateItemInput {
                name: payload.name,
                sku: payload.sku,
                quantity: payload.quantity,
                low_stock_threshold: payload.low_stock_threshold,
                supplier_name: payload.supplier_name,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ItemResponse::from(created))))
}

/// List the caller's items
#[utoipa::path(
    get,
    path = "/api/v1/items",
    params(ItemListQuery),
    responses(
        (status = 200, description = "Item list returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ItemListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let limit = query.limit.clamp(1, 100);
    let page = query.page.max(1);

    let (items, total) = state
        .services
        .items
        .list_items(
            auth_user.user_id,
            page,
            limit,
            ItemFilters {
                search: query.search,
                low_stock: query.low_stock,
            },
        )
        .await?;

    let items: Vec<ItemResponse> = items.into_iter().map(ItemResponse::from).collect();
    Ok(Json(json!({
        "items": items,
        "total": total,
        "page": page,
        "limit": limit,
    })))
}

/// Fetch one item
#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item returned", body = ItemResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let found = state.services.items.get_item(auth_user.user_id, id).await?;
    Ok(Json(ItemResponse::from(found)))
}

/// Update item attributes (quantity moves only through stock operations)
#[utoipa::path(
    put,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ItemResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let updated = state
        .services
        .items
        .update_item(
            auth_user.user_id,
            id,
            UpdateItemInput {
                name: payload.name,
                low_stock_threshold: payload.low_stock_threshold,
                supplier_name: payload.supplier_name,
                status: payload.status,
            },
        )
        .await?;

    Ok(Json(ItemResponse::from(updated)))
}

/// Delete an item and all of its movements
#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let movements_removed = state
        .services
        .items
        .delete_item(auth_user.user_id, id)
        .await?;

    Ok(Json(json!({
        "deleted_id": id,
        "movements_removed": movements_removed,
    })))
}
