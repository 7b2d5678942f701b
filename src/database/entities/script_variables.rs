use crate::database::DbResult;
use sea_orm::{entity::prelude::*, DeleteResult};
use serde::Serialize;
use std::future::Future;

/// Variable node persisted for one loaded script. Array children point
/// back at their parent node and carry their index path as JSON so the
/// tree can be rebuilt in order.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "script_variables")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip)]
    pub id: i32,
    pub script_id: String,
    pub name: String,
    pub value: String,
    /// Parent node row for array children, NULL for roots
    pub parent_id: Option<i32>,
    /// JSON array of index strings addressing this node from its root
    pub index_path: String,
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
    /// All persisted nodes for the provided script, roots first
    pub fn by_script<'a>(
        db: &'a DatabaseConnection,
        script_id: &str,
    ) -> impl Future<Output = DbResult<Vec<Self>>> + Send + 'a {
        Entity::find()
            .filter(Column::ScriptId.eq(script_id))
            .all(db)
    }

    /// Removes every persisted node for the provided script
    pub fn clear<'a>(
        db: &'a DatabaseConnection,
        script_id: &str,
    ) -> impl Future<Output = DbResult<DeleteResult>> + Send + 'a {
        Entity::delete_many()
            .filter(Column::ScriptId.eq(script_id))
            .exec(db)
    }
}
