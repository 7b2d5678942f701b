use crate::database::DbResult;
use sea_orm::{entity::prelude::*, DeleteResult};
use serde::Serialize;
use std::future::Future;

/// Persisted form of a trigger owned by a script. Kind specific data
/// such as delay durations travels in the params JSON column.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "script_triggers")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip)]
    pub id: i32,
    pub script_id: String,
    /// Registry key, `trigger_<n>`
    pub trigger_id: String,
    /// Trigger kind discriminant
    pub kind: i32,
    pub pattern: String,
    pub label: String,
    pub response: String,
    /// Remaining fires, -1 for permanent
    pub lifecycle: i32,
    pub active: bool,
    /// Kind specific payload as JSON
    pub params: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::scripts::Entity",
        from = "Column::ScriptId",
        to = "super::scripts::Column::Id",
        on_delete = "Cascade"
    )]
    Script,
}

impl Related<super::scripts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Script.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn by_script<'a>(
        db: &'a DatabaseConnection,
        script_id: &str,
    ) -> impl Future<Output = DbResult<Vec<Self>>> + Send + 'a {
        Entity::find()
            .filter(Column::ScriptId.eq(script_id))
            .all(db)
    }

    pub fn clear<'a>(
        db: &'a DatabaseConnection,
        script_id: &str,
    ) -> impl Future<Output = DbResult<DeleteResult>> + Send + 'a {
        Entity::delete_many()
            .filter(Column::ScriptId.eq(script_id))
            .exec(db)
    }
}
