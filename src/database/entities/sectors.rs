use crate::database::DbResult;
use crate::utils::types::SectorIndex;
use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Row for a single known sector of the universe. Warp targets are
/// stored in six fixed slots where zero marks an unused slot.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sectors")]
pub struct Model {
    /// The 1-based sector number
    #[sea_orm(primary_key, auto_increment = false)]
    pub sector_index: SectorIndex,
    /// Constellation the sector belongs to
    pub constellation: String,
    /// Text of a placed marker beacon, empty when none
    pub beacon: String,
    /// Navigation hazard percentage
    pub nav_haz: i32,
    /// Scanner reported density, -1 when never density scanned
    pub density: i64,
    /// Whether a density scan reported an anomaly
    pub anomaly: bool,
    /// Deepest level of knowledge recorded for this sector
    pub explored: ExploredLevel,
    /// Count of outbound warps. Matches the non-zero slots below unless
    /// the count came from a density scan of an unvisited sector.
    pub warps: i32,
    pub warp1: SectorIndex,
    pub warp2: SectorIndex,
    pub warp3: SectorIndex,
    pub warp4: SectorIndex,
    pub warp5: SectorIndex,
    pub warp6: SectorIndex,
    /// Deployed fighter slot
    pub figs_quantity: i64,
    pub figs_owner: String,
    pub figs_type: FighterType,
    /// Armid mine slot
    pub mines_armid_quantity: i64,
    pub mines_armid_owner: String,
    /// Limpet mine slot
    pub mines_limpet_quantity: i64,
    pub mines_limpet_owner: String,
    /// When this sector was last updated from the stream
    pub last_update: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::ports::Entity")]
    Port,
    #[sea_orm(has_many = "super::ships::Entity")]
    Ships,
    #[sea_orm(has_many = "super::traders::Entity")]
    Traders,
    #[sea_orm(has_many = "super::planets::Entity")]
    Planets,
    #[sea_orm(has_many = "super::sector_vars::Entity")]
    Vars,
}

impl Related<super::ports::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Port.def()
    }
}

impl Related<super::ships::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ships.def()
    }
}

impl Related<super::traders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Traders.def()
    }
}

impl Related<super::planets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Planets.def()
    }
}

impl Related<super::sector_vars::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vars.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// How much the stream has revealed about a sector, deepest last
#[derive(
    Deserialize, Serialize, Debug, Default, Copy, Clone, PartialEq, PartialOrd, Ord, Eq, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "u8", db_type = "TinyUnsigned")]
#[repr(u8)]
pub enum ExploredLevel {
    /// Never seen beyond being a warp target
    #[default]
    #[sea_orm(num_value = 0)]
    NotVisited = 0,

    /// Inferred from port trade data only
    #[sea_orm(num_value = 1)]
    Calc = 1,

    /// Seen through a density scan
    #[sea_orm(num_value = 2)]
    Density = 2,

    /// Fully visited with a holo scanner display
    #[sea_orm(num_value = 3)]
    Holo = 3,
}

/// Mode deployed fighters are left in
#[derive(
    Deserialize, Serialize, Debug, Default, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "u8", db_type = "TinyUnsigned")]
#[repr(u8)]
pub enum FighterType {
    #[default]
    #[sea_orm(num_value = 0)]
    None = 0,

    #[sea_orm(num_value = 1)]
    Toll = 1,

    #[sea_orm(num_value = 2)]
    Defensive = 2,

    #[sea_orm(num_value = 3)]
    Offensive = 3,
}

impl Model {
    /// Attempts to find the sector row with the provided index
    pub fn by_index(
        db: &DatabaseConnection,
        index: SectorIndex,
    ) -> impl Future<Output = DbResult<Option<Self>>> + Send + '_ {
        Entity::find_by_id(index).one(db)
    }

    /// The warp slots as a fixed array
    pub fn warp_slots(&self) -> [SectorIndex; 6] {
        [
            self.warp1, self.warp2, self.warp3, self.warp4, self.warp5, self.warp6,
        ]
    }
}
