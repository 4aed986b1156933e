use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockledger API",
        version = "0.3.0",
        description = r#"
Multi-tenant inventory tracking with an append-only stock movement ledger.

Every quantity change is applied as a single conditional update and paired
with an immutable movement record. Batch sales and returns are all-or-nothing
from the caller's point of view: a failing line rolls back the lines already
applied. Movement history is served newest-first with a running quantity per
row; pass each page's `continuation_quantity` as the next page's
`anchor_quantity`.

Authenticate with `Authorization: Bearer <token>` from the register or login
endpoints.
"#
    ),
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::health::health_check,
        crate::handlers::items::create_item,
        crate::handlers::items::list_items,
        crate::handlers::items::get_item,
        crate::handlers::items::update_item,
        crate::handlers::items::delete_item,
        crate::handlers::stock::record_sale,
        crate::handlers::stock::record_return,
        crate::handlers::stock::adjust_quantity,
        crate::handlers::stock::reverse_movement,
        crate::handlers::stock::list_movements,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::handlers::auth::RegisterRequest,
        crate::handlers::auth::LoginRequest,
        crate::handlers::auth::UserResponse,
        crate::handlers::auth::AuthResponse,
        crate::handlers::items::CreateItemRequest,
        crate::handlers::items::UpdateItemRequest,
        crate::handlers::items::ItemResponse,
        crate::handlers::stock::SaleLineRequest,
        crate::handlers::stock::RecordSaleRequest,
        crate::handlers::stock::ReturnLineRequest,
        crate::handlers::stock::RecordReturnRequest,
        crate::handlers::stock::AdjustQuantityRequest,
        crate::handlers::stock::ReverseMovementRequest,
        crate::handlers::stock::MovementResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and identity"),
        (name = "items", description = "Stock item management"),
        (name = "stock", description = "Sales, returns, adjustments and movement history"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Swagger UI mounted at `/docs`, serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
