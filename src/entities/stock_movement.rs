use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of stock movement. `Initial` is written exactly once per item at
/// creation time; the rest are produced by the mutation endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Sale,
    Return,
    Adjustment,
    Purchase,
    Initial,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Sale => "sale",
            MovementType::Return => "return",
            MovementType::Adjustment => "adjustment",
            MovementType::Purchase => "purchase",
            MovementType::Initial => "initial",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sale" => Some(MovementType::Sale),
            "return" => Some(MovementType::Return),
            "adjustment" => Some(MovementType::Adjustment),
            "purchase" => Some(MovementType::Purchase),
            "initial" => Some(MovementType::Initial),
            _ => None,
        }
    }
}

/// Append-only ledger row recording one applied quantity change. Rows are
/// created strictly after the paired quantity update succeeded, never edited,
/// and deleted only as rollback compensation or item-deletion cascade.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub item_id: Uuid,
    pub movement_type: String,
    pub delta: i32,
    pub customer_name: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn movement_type(&self) -> Option<MovementType> {
        MovementType::from_str(&self.movement_type)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::MovementType;

    #[test]
    fn movement_type_round_trips_known_kinds() {
        for t in [
            MovementType::Sale,
            MovementType::Return,
            MovementType::Adjustment,
            MovementType::Purchase,
            MovementType::Initial,
        ] {
            assert_eq!(MovementType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(MovementType::from_str("restock"), None);
    }
}
