use std::sync::Arc;

use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{item, stock_movement};
use crate::errors::ServiceError;

/// One ledger row annotated with the quantity the item held immediately
/// after this movement was applied.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectedMovement {
    #[serde(flatten)]
    pub movement: stock_movement::Model,
    pub quantity_after: i32,
}

/// A page of newest-first movement history.
#[derive(Debug, Serialize)]
pub struct MovementHistoryPage {
    pub movements: Vec<ProjectedMovement>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    /// Anchor to pass when requesting the next (older) page.
    pub continuation_quantity: i32,
}

/// Annotates a newest-first page of movements with running quantities.
///
/// `anchor_quantity` is the item's quantity as of immediately after the
/// newest movement in the page: the live quantity for the first page, or the
/// previous page's continuation value after that. Each row reports the
/// current anchor, then the anchor is rolled back by the row's delta to
/// reconstruct the state just before it. Returns the annotated rows and the
/// final anchor, which becomes the next page's `anchor_quantity`.
///
/// Pure function of its inputs; correctness requires pages to be requested
/// strictly newest-first, which the caller enforces by threading the
/// continuation value rather than accepting arbitrary offsets.
pub fn project_running_quantities(
    movements: Vec<stock_movement::Model>,
    anchor_quantity: i32,
) -> (Vec<ProjectedMovement>, i32) {
    let mut anchor = anchor_quantity;
    let mut rows = Vec::with_capacity(movements.len());
    for movement in movements {
        let quantity_after = anchor;
        anchor -= movement.delta;
        rows.push(ProjectedMovement {
            movement,
            quantity_after,
        });
    }
    (rows, anchor)
}

/// Read-only consumer of the ledger: pages an item's movement history and
/// projects historical running quantities onto it.
#[derive(Clone)]
pub struct MovementHistoryService {
    db: Arc<DatabaseConnection>,
}

impl MovementHistoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists an item's movements newest-first with running quantities.
    ///
    /// `anchor_quantity` must be omitted on the first page (the item's live
    /// quantity anchors the projection) and must carry the previous page's
    /// `continuation_quantity` on every later page.
    #[instrument(skip(self))]
    pub async fn list_for_item(
        &self,
        owner_id: Uuid,
        item_id: Uuid,
        page: u64,
        limit: u64,
        anchor_quantity: Option<i32>,
    ) -> Result<MovementHistoryPage, ServiceError> {
        if page == 0 {
            return Err(ServiceError::ValidationError(
                "Page numbers start at 1".to_string(),
            ));
        }
        if page > 1 && anchor_quantity.is_none() {
            return Err(ServiceError::ValidationError(
                "anchor_quantity is required beyond the first page; pass the previous page's continuation_quantity".to_string(),
            ));
        }

        let item_row = item::Entity::find_by_id(item_id)
            .filter(item::Column::OwnerId.eq(owner_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        let paginator = stock_movement::Entity::find()
            .filter(stock_movement::Column::ItemId.eq(item_id))
            .filter(stock_movement::Column::OwnerId.eq(owner_id))
            .order_by_desc(stock_movement::Column::CreatedAt)
            .order_by_desc(stock_movement::Column::Id)
            .paginate(&*self.db, limit);

        let total = paginator.num_items().await?;
        let movements = paginator.fetch_page(page - 1).await?;

        let anchor = anchor_quantity.unwrap_or(item_row.quantity);
        let (movements, continuation_quantity) = project_running_quantities(movements, anchor);

        Ok(MovementHistoryPage {
            movements,
            total,
            page,
            limit,
            continuation_quantity,
        })
    }
}
