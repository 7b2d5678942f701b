use crate::utils::types::SectorIndex;
use sea_orm::entity::prelude::*;
use serde::Serialize;

/// A trader sighted in a sector along with the ship they fly
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "traders")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip)]
    pub id: i32,
    #[serde(skip)]
    pub sector_index: SectorIndex,
    pub name: String,
    pub ship_type: String,
    pub ship_name: String,
    pub figs: i64,
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
