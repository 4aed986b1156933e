use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{item, stock_movement, stock_movement::MovementType};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock::StockService;

/// Input for creating an item.
#[derive(Debug, Clone)]
pub struct CreateItemInput {
    pub name: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub low_stock_threshold: i32,
    pub supplier_name: Option<String>,
}

/// Editable item attributes. Quantity is deliberately absent: it only moves
/// through the stock service's mutation path.
#[derive(Debug, Clone, Default)]
pub struct UpdateItemInput {
    pub name: Option<String>,
    pub low_stock_threshold: Option<i32>,
    /// `Some("")` clears the supplier.
    pub supplier_name: Option<String>,
    pub status: Option<String>,
}

/// Filters for listing items.
#[derive(Debug, Clone, Default)]
pub struct ItemFilters {
    pub search: Option<String>,
    pub low_stock: bool,
}

/// Manages item records and their lifecycle. Creation writes the item and its
/// correlated `initial` movement; deletion cascades to the item's movements.
#[derive(Clone)]
pub struct ItemService {
    db: Arc<DatabaseConnection>,
    stock: StockService,
    event_sender: EventSender,
}

impl ItemService {
    pub fn new(db: Arc<DatabaseConnection>, stock: StockService, event_sender: EventSender) -> Self {
        Self {
            db,
            stock,
            event_sender,
        }
    }

    /// Creates an item with its starting quantity and appends the `initial`
    /// movement recording that quantity. The insert itself establishes the
    /// quantity, so the movement is recorded directly after it; the two
    /// writes are not atomic, which is acceptable for a brand-new item no
    /// other request can observe yet.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_item(
        &self,
        owner_id: Uuid,
        input: CreateItemInput,
    ) -> Result<(item::Model, stock_movement::Model), ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Item name must not be empty".to_string(),
            ));
        }
        if input.quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Initial quantity must not be negative".to_string(),
            ));
        }
        if input.low_stock_threshold < 0 {
            return Err(ServiceError::ValidationError(
                "Low stock threshold must not be negative".to_string(),
            ));
        }

        let sku = match input.sku {
            Some(sku) if !sku.trim().is_empty() => sku.trim().to_uppercase(),
            _ => generate_sku(),
        };

        let existing = item::Entity::find()
            .filter(item::Column::OwnerId.eq(owner_id))
            .filter(item::Column::Sku.eq(&sku))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "An item with SKU {} already exists",
                sku
            )));
        }

        let now = Utc::now();
        let model = item::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            sku: Set(sku),
            name: Set(input.name.trim().to_string()),
            quantity: Set(input.quantity),
            low_stock_threshold: Set(input.low_stock_threshold),
            supplier_name: Set(input.supplier_name),
            status: Set(item::STATUS_ACTIVE.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;

        let movement = self
            .stock
            .record_movement(
                created.id,
                owner_id,
                MovementType::Initial,
                created.quantity,
                None,
                Some("Initial stock".to_string()),
            )
            .await?;

        self.event_sender
            .send(Event::ItemCreated {
                item_id: created.id,
                owner_id,
                initial_quantity: created.quantity,
            })
            .await;

        info!(item_id = %created.id, sku = %created.sku, "Item created");
        Ok((created, movement))
    }

    #[instrument(skip(self))]
    pub async fn get_item(
        &self,
        owner_id: Uuid,
        item_id: Uuid,
    ) -> Result<item::Model, ServiceError> {
        item::Entity::find_by_id(item_id)
            .filter(item::Column::OwnerId.eq(owner_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))
    }

    /// Lists the owner's items, newest first, with optional name/SKU search
    /// and a low-stock filter.
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        owner_id: Uuid,
        page: u64,
        limit: u64,
        filters: ItemFilters,
    ) -> Result<(Vec<item::Model>, u64), ServiceError> {
        let mut query = item::Entity::find().filter(item::Column::OwnerId.eq(owner_id));

        if let Some(search) = filters.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let term = search.trim();
            query = query.filter(
                Condition::any()
                    .add(item::Column::Name.contains(term))
                    .add(item::Column::Sku.contains(term)),
            );
        }
        if filters.low_stock {
            query = query.filter(
                Expr::col(item::Column::Quantity).lte(Expr::col(item::Column::LowStockThreshold)),
            );
        }

        let paginator = query
            .order_by_desc(item::Column::CreatedAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update_item(
        &self,
        owner_id: Uuid,
        item_id: Uuid,
        input: UpdateItemInput,
    ) -> Result<item::Model, ServiceError> {
        let existing = self.get_item(owner_id, item_id).await?;

        let mut active: item::ActiveModel = existing.into();
        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Item name must not be empty".to_string(),
                ));
            }
            active.name = Set(name.trim().to_string());
        }
        if let Some(threshold) = input.low_stock_threshold {
            if threshold < 0 {
                return Err(ServiceError::ValidationError(
                    "Low stock threshold must not be negative".to_string(),
                ));
            }
            active.low_stock_threshold = Set(threshold);
        }
        if let Some(supplier_name) = input.supplier_name {
            let trimmed = supplier_name.trim();
            active.supplier_name = Set(if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            });
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    /// Deletes an item and then its movements. The two deletes are not
    /// atomic: if the second fails, the orphaned movements reference a gone
    /// item and are inert garbage rather than a consistency hazard.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, owner_id: Uuid, item_id: Uuid) -> Result<u64, ServiceError> {
        let deleted = item::Entity::delete_many()
            .filter(item::Column::Id.eq(item_id))
            .filter(item::Column::OwnerId.eq(owner_id))
            .exec(&*self.db)
            .await?;
        if deleted.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Item {} not found", item_id)));
        }

        let removed = stock_movement::Entity::delete_many()
            .filter(stock_movement::Column::ItemId.eq(item_id))
            .exec(&*self.db)
            .await?;

        self.event_sender
            .send(Event::ItemDeleted {
                item_id,
                owner_id,
                movements_removed: removed.rows_affected,
            })
            .await;

        info!(item_id = %item_id, movements = removed.rows_affected, "Item deleted");
        Ok(removed.rows_affected)
    }
}

fn generate_sku() -> String {
    use rand::{distributions::Alphanumeric, thread_rng, Rng};

    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("SKU-{}", suffix.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::generate_sku;

    #[test]
    fn generated_skus_have_the_expected_shape() {
        let sku = generate_sku();
        assert!(sku.starts_with("SKU-"));
        assert_eq!(sku.len(), 12);
        assert_ne!(sku, generate_sku());
    }
}
