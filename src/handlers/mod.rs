pub mod auth;
pub mod health;
pub mod items;
pub mod stock;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::AuthService;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<crate::services::users::UserService>,
    pub items: Arc<crate::services::items::ItemService>,
    pub stock: Arc<crate::services::stock::StockService>,
    pub history: Arc<crate::services::history::MovementHistoryService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        auth_service: Arc<AuthService>,
    ) -> Self {
        let stock = crate::services::stock::StockService::new(db.clone(), event_sender.clone());
        let items = Arc::new(crate::services::items::ItemService::new(
            db.clone(),
            stock.clone(),
            event_sender.clone(),
        ));
        let users = Arc::new(crate::services::users::UserService::new(
            db.clone(),
            auth_service,
            event_sender,
        ));
        let history = Arc::new(crate::services::history::MovementHistoryService::new(db));

        Self {
            users,
            items,
            stock: Arc::new(stock),
            history,
        }
    }
}

/// All `/api/v1` routes. Everything except register/login/health sits behind
/// the bearer-auth middleware.
pub fn api_v1_routes(auth_service: Arc<AuthService>) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health::health_check));

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/items", get(items::list_items).post(items::create_item))
        .route(
            "/items/:id",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        .route("/items/:id/adjust", post(stock::adjust_quantity))
        .route("/items/:id/movements", get(stock::list_movements))
        .route("/stock/sales", post(stock::record_sale))
        .route("/stock/returns", post(stock::record_return))
        .route("/stock/movements/:id/reverse", post(stock::reverse_movement))
        .layer(middleware::from_fn_with_state(
            auth_service,
            crate::auth::require_auth,
        ));

    public.merge(protected)
}
