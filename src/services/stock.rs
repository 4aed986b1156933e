use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::entities::{
    item,
    stock_movement::{self, MovementType},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// How a mutation locates its item. Every key is combined with the owner
/// filter, so a foreign item behaves exactly like a missing one.
#[derive(Debug, Clone, Copy)]
pub enum ItemKey<'a> {
    Sku(&'a str),
    Id(Uuid),
}

/// One line of a batch sale.
#[derive(Debug, Clone)]
pub struct SaleLine {
    pub sku: String,
    pub quantity: i32,
}

/// One line of a batch return.
#[derive(Debug, Clone)]
pub struct ReturnLine {
    pub sku: String,
    pub quantity: i32,
    pub reason: Option<String>,
}

/// Bookkeeping for a successfully applied batch line, kept so the batch can
/// be unwound in reverse order if a later line fails.
#[derive(Debug)]
struct AppliedLine {
    item_id: Uuid,
    applied_delta: i32,
    movement_id: Uuid,
}

/// Summary returned for a fully applied batch.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchOutcome {
    pub lines_applied: usize,
}

/// The inventory ledger core. Quantity changes go through [`apply_delta`]'s
/// single conditional update; ledger rows are written by `record_movement`
/// strictly after the paired update is confirmed. Batches are made
/// all-or-nothing from the caller's view by best-effort reverse-order
/// compensation, not by a database transaction: the storage tier is treated
/// as offering per-statement atomicity only.
///
/// [`apply_delta`]: StockService::apply_delta
#[derive(Clone)]
pub struct StockService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl StockService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Applies a signed delta to one item's quantity in a single conditional
    /// update. For decreases the filter additionally requires
    /// `quantity >= |delta|`, so no interleaving of concurrent calls can
    /// drive the quantity negative.
    ///
    /// Returns `Ok(None)` when the update matched nothing — item missing for
    /// this owner, or insufficient stock. That is a normal domain outcome,
    /// not an error; both causes lead the caller to the same abort path.
    #[instrument(skip(self))]
    pub async fn apply_delta(
        &self,
        owner_id: Uuid,
        key: ItemKey<'_>,
        delta: i32,
    ) -> Result<Option<item::Model>, ServiceError> {
        let mut update = item::Entity::update_many()
            .col_expr(
                item::Column::Quantity,
                Expr::col(item::Column::Quantity).add(delta),
            )
            .col_expr(item::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(item::Column::OwnerId.eq(owner_id));

        update = match key {
            ItemKey::Sku(sku) => update.filter(item::Column::Sku.eq(sku)),
            ItemKey::Id(id) => update.filter(item::Column::Id.eq(id)),
        };
        if delta < 0 {
            update = update.filter(item::Column::Quantity.gte(-delta));
        }

        let result = update.exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Ok(None);
        }

        // The conditional update above is the atomic step; this read only
        // reports the post-update state.
        let mut select = item::Entity::find().filter(item::Column::OwnerId.eq(owner_id));
        select = match key {
            ItemKey::Sku(sku) => select.filter(item::Column::Sku.eq(sku)),
            ItemKey::Id(id) => select.filter(item::Column::Id.eq(id)),
        };
        let updated = select.one(&*self.db).await?.ok_or_else(|| {
            ServiceError::InternalError("Item disappeared after quantity update".to_string())
        })?;

        Ok(Some(updated))
    }

    /// Appends one immutable ledger row. Must only be called after
    /// [`apply_delta`](StockService::apply_delta) confirmed the paired
    /// quantity change; never speculatively.
    pub(crate) async fn record_movement(
        &self,
        item_id: Uuid,
        owner_id: Uuid,
        movement_type: MovementType,
        delta: i32,
        customer_name: Option<String>,
        reason: Option<String>,
    ) -> Result<stock_movement::Model, ServiceError> {
        let movement = stock_movement::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            item_id: Set(item_id),
            movement_type: Set(movement_type.as_str().to_string()),
            delta: Set(delta),
            customer_name: Set(customer_name),
            reason: Set(reason),
            created_at: Set(Utc::now()),
        };

        Ok(movement.insert(&*self.db).await?)
    }

    /// Mutate-then-record for one item. `Ok(None)` propagates the mutator's
    /// not-applied outcome; nothing is recorded in that case.
    async fn apply_and_record(
        &self,
        owner_id: Uuid,
        key: ItemKey<'_>,
        delta: i32,
        movement_type: MovementType,
        customer_name: Option<String>,
        reason: Option<String>,
    ) -> Result<Option<(item::Model, stock_movement::Model)>, ServiceError> {
        let Some(updated) = self.apply_delta(owner_id, key, delta).await? else {
            return Ok(None);
        };

        let movement = self
            .record_movement(
                updated.id,
                owner_id,
                movement_type,
                delta,
                customer_name,
                reason,
            )
            .await?;

        self.event_sender
            .send(Event::MovementRecorded {
                movement_id: movement.id,
                item_id: updated.id,
                movement_type: movement.movement_type.clone(),
                delta,
                new_quantity: updated.quantity,
            })
            .await;
        if delta < 0 && updated.is_low_stock() {
            self.event_sender
                .send(Event::LowStock {
                    item_id: updated.id,
                    owner_id,
                    quantity: updated.quantity,
                    threshold: updated.low_stock_threshold,
                })
                .await;
        }

        Ok(Some((updated, movement)))
    }

    /// Records a multi-line sale. Lines are applied strictly in input order,
    /// one at a time, so repeated SKUs observe each other's effect. The first
    /// line that cannot be applied aborts the batch: everything applied so
    /// far is unwound in reverse order and a single error names the SKU.
    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn record_sale(
        &self,
        owner_id: Uuid,
        lines: Vec<SaleLine>,
        customer_name: Option<String>,
    ) -> Result<BatchOutcome, ServiceError> {
        validate_line_quantities(lines.iter().map(|l| (&l.sku, l.quantity)))?;

        let mut applied: Vec<AppliedLine> = Vec::with_capacity(lines.len());
        for line in &lines {
            let delta = -line.quantity;
            match self
                .apply_and_record(
                    owner_id,
                    ItemKey::Sku(&line.sku),
                    delta,
                    MovementType::Sale,
                    customer_name.clone(),
                    None,
                )
                .await
            {
                Ok(Some((item_row, movement))) => {
                    applied.push(AppliedLine {
                        item_id: item_row.id,
                        applied_delta: delta,
                        movement_id: movement.id,
                    });
                }
                Ok(None) => {
                    self.compensate(owner_id, &applied).await;
                    return Err(ServiceError::InsufficientStock(format!(
                        "Item with SKU {} not found or insufficient stock",
                        line.sku
                    )));
                }
                Err(err) => {
                    self.compensate(owner_id, &applied).await;
                    return Err(err);
                }
            }
        }

        info!(owner_id = %owner_id, lines = applied.len(), "Sale recorded");
        Ok(BatchOutcome {
            lines_applied: applied.len(),
        })
    }

    /// Records a multi-line return; the increasing twin of
    /// [`record_sale`](StockService::record_sale). A missing SKU aborts and
    /// unwinds the batch the same way.
    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn record_return(
        &self,
        owner_id: Uuid,
        lines: Vec<ReturnLine>,
    ) -> Result<BatchOutcome, ServiceError> {
        validate_line_quantities(lines.iter().map(|l| (&l.sku, l.quantity)))?;

        let mut applied: Vec<AppliedLine> = Vec::with_capacity(lines.len());
        for line in &lines {
            let delta = line.quantity;
            match self
                .apply_and_record(
                    owner_id,
                    ItemKey::Sku(&line.sku),
                    delta,
                    MovementType::Return,
                    None,
                    line.reason.clone(),
                )
                .await
            {
                Ok(Some((item_row, movement))) => {
                    applied.push(AppliedLine {
                        item_id: item_row.id,
                        applied_delta: delta,
                        movement_id: movement.id,
                    });
                }
                Ok(None) => {
                    self.compensate(owner_id, &applied).await;
                    return Err(ServiceError::NotFound(format!(
                        "Item with SKU {} not found",
                        line.sku
                    )));
                }
                Err(err) => {
                    self.compensate(owner_id, &applied).await;
                    return Err(err);
                }
            }
        }

        info!(owner_id = %owner_id, lines = applied.len(), "Return recorded");
        Ok(BatchOutcome {
            lines_applied: applied.len(),
        })
    }

    /// Ad-hoc quantity adjustment for a single item. Any non-zero signed
    /// delta is allowed; decreases still carry the mutator's non-negativity
    /// filter. The movement type is the caller's when it names one of the
    /// known kinds; otherwise a positive untyped delta is recorded as a
    /// purchase and everything else as an adjustment.
    #[instrument(skip(self, reason))]
    pub async fn adjust_quantity(
        &self,
        owner_id: Uuid,
        item_id: Uuid,
        delta: i32,
        reason: String,
        explicit_type: Option<&str>,
    ) -> Result<(item::Model, stock_movement::Model), ServiceError> {
        if delta == 0 {
            return Err(ServiceError::ValidationError(
                "Adjustment delta must be non-zero".to_string(),
            ));
        }

        let movement_type = match explicit_type {
            Some(raw) => MovementType::from_str(raw).unwrap_or(MovementType::Adjustment),
            None if delta > 0 => MovementType::Purchase,
            None => MovementType::Adjustment,
        };

        match self
            .apply_and_record(
                owner_id,
                ItemKey::Id(item_id),
                delta,
                movement_type,
                None,
                Some(reason),
            )
            .await?
        {
            Some(pair) => Ok(pair),
            None if delta < 0 => Err(ServiceError::InsufficientStock(format!(
                "Item {} not found or insufficient stock",
                item_id
            ))),
            None => Err(ServiceError::NotFound(format!("Item {} not found", item_id))),
        }
    }

    /// Reverses a prior sale movement: applies the negated (positive) delta
    /// and records a `return` movement inheriting the sale's customer. Only
    /// sales are reversible; reversing a reversal is ambiguous and rejected
    /// before anything is mutated.
    #[instrument(skip(self, reason))]
    pub async fn reverse_sale_movement(
        &self,
        owner_id: Uuid,
        movement_id: Uuid,
        reason: Option<String>,
    ) -> Result<(item::Model, stock_movement::Model), ServiceError> {
        let original = stock_movement::Entity::find_by_id(movement_id)
            .filter(stock_movement::Column::OwnerId.eq(owner_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Movement {} not found", movement_id))
            })?;

        if original.movement_type != MovementType::Sale.as_str() {
            return Err(ServiceError::InvalidOperation(
                "Only sale movements can be reversed".to_string(),
            ));
        }

        // A sale's delta is negative, so its reversal is the positive inverse.
        let delta = -original.delta;
        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| {
                format!(
                    "Return of sale recorded on {}",
                    original.created_at.format("%Y-%m-%d")
                )
            });

        match self
            .apply_and_record(
                owner_id,
                ItemKey::Id(original.item_id),
                delta,
                MovementType::Return,
                original.customer_name.clone(),
                Some(reason),
            )
            .await?
        {
            Some((item_row, movement)) => {
                self.event_sender
                    .send(Event::MovementReversed {
                        original_movement_id: original.id,
                        reversal_movement_id: movement.id,
                        item_id: item_row.id,
                    })
                    .await;
                Ok((item_row, movement))
            }
            None => Err(ServiceError::NotFound(format!(
                "Item for movement {} no longer exists",
                movement_id
            ))),
        }
    }

    /// Best-effort rollback of already-applied batch lines, newest first.
    /// Each step re-applies the negated delta through the same conditional
    /// update and deletes the paired movement. Failures here are logged and
    /// swallowed: with no multi-statement atomicity available, visibility is
    /// preferred over a retry loop that could wedge the request. A skipped
    /// compensation leaves quantity or history transiently inconsistent;
    /// that residual window is a documented property of this design.
    async fn compensate(&self, owner_id: Uuid, applied: &[AppliedLine]) {
        for line in applied.iter().rev() {
            match self
                .apply_delta(owner_id, ItemKey::Id(line.item_id), -line.applied_delta)
                .await
            {
                Ok(Some(_)) => {}
                Ok(None) => warn!(
                    item_id = %line.item_id,
                    delta = -line.applied_delta,
                    "Compensating update not applied; item missing or stock already consumed"
                ),
                Err(e) => error!(
                    item_id = %line.item_id,
                    error = %e,
                    "Compensating update failed"
                ),
            }

            if let Err(e) = stock_movement::Entity::delete_by_id(line.movement_id)
                .exec(&*self.db)
                .await
            {
                error!(
                    movement_id = %line.movement_id,
                    error = %e,
                    "Failed to delete movement during rollback"
                );
            }
        }
    }
}

fn validate_line_quantities<'a>(
    lines: impl ExactSizeIterator<Item = (&'a String, i32)>,
) -> Result<(), ServiceError> {
    if lines.len() == 0 {
        return Err(ServiceError::ValidationError(
            "At least one line is required".to_string(),
        ));
    }
    for (sku, quantity) in lines {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for SKU {} must be a positive integer",
                sku
            )));
        }
    }
    Ok(())
}
