use crate::database::DbResult;
use crate::utils::types::SectorIndex;
use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::Serialize;
use std::future::Future;

/// Row for the trading port owned by a sector. Ports exist 1:1 with
/// their sector; the sector index is the key.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub sector_index: SectorIndex,
    /// Display name of the port
    pub name: String,
    /// Whether the port has been destroyed
    pub dead: bool,
    /// Remaining build time in days, zero when operational
    pub build_time: i32,
    /// Trade class 1..8, 9 for Stardock, 0 for no port, -1 unknown
    pub class_index: i32,
    /// Whether the port buys fuel ore
    pub buy_fuel_ore: bool,
    pub percent_fuel_ore: i32,
    pub amount_fuel_ore: i64,
    /// Whether the port buys organics
    pub buy_organics: bool,
    pub percent_organics: i32,
    pub amount_organics: i64,
    /// Whether the port buys equipment
    pub buy_equipment: bool,
    pub percent_equipment: i32,
    pub amount_equipment: i64,
    pub last_update: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sectors::Entity",
        from = "Column::SectorIndex",
        to = "super::sectors::Column::SectorIndex",
        on_delete = "Cascade"
    )]
    Sector,
}

impl Related<super::sectors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sector.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Attempts to find the port owned by the provided sector
    pub fn by_sector(
        db: &DatabaseConnection,
        index: SectorIndex,
    ) -> impl Future<Output = DbResult<Option<Self>>> + Send + '_ {
        Entity::find_by_id(index).one(db)
    }
}
