use crate::database::DbResult;
use sea_orm::{entity::prelude::*, DeleteResult, QueryOrder};
use serde::Serialize;
use std::future::Future;

/// GOSUB frame persisted when a script is unloaded while suspended so
/// the call stack can be restored on the next load
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "script_call_stack")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip)]
    pub id: i32,
    pub script_id: String,
    /// Position of this frame from the bottom of the stack
    pub ordinal: i32,
    pub label: String,
    pub saved_pc: i32,
    pub return_pc: i32,
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
            .order_by_asc(Column::Ordinal)
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
