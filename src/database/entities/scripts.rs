use crate::database::DbResult;
use chrono::NaiveDateTime;
use sea_orm::{entity::prelude::*, ActiveValue::Set, DeleteResult, IntoActiveModel};
use serde::Serialize;
use std::future::Future;

/// Metadata row for a loaded script
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "scripts")]
pub struct Model {
    /// Opaque script identity (uuid)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name shown in script listings
    pub name: String,
    /// Path the source was loaded from
    pub path: String,
    /// Language version the script targets
    pub version: i32,
    pub running: bool,
    /// System scripts survive a stop-all
    pub system: bool,
    pub loaded_at: NaiveDateTime,
    pub stopped_at: Option<NaiveDateTime>,
    /// JSON list of files inlined through includes
    pub includes: String,
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::script_triggers::Entity")]
    Triggers,
    #[sea_orm(has_many = "super::script_variables::Entity")]
    Variables,
    #[sea_orm(has_many = "super::script_call_stack::Entity")]
    CallStack,
}

impl Related<super::script_triggers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Triggers.def()
    }
}

impl Related<super::script_variables::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variables.def()
    }
}

impl Related<super::script_call_stack::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CallStack.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn by_id<'a>(
        db: &'a DatabaseConnection,
        id: &str,
    ) -> impl Future<Output = DbResult<Option<Self>>> + Send + 'a {
        Entity::find_by_id(id.to_string()).one(db)
    }

    pub fn all(db: &DatabaseConnection) -> impl Future<Output = DbResult<Vec<Self>>> + Send + '_ {
        Entity::find().all(db)
    }

    /// Marks the script as stopped recording the stop time
    pub async fn mark_stopped(db: &DatabaseConnection, id: &str) -> DbResult<()> {
        let Some(script) = Self::by_id(db, id).await? else {
            return Ok(());
        };
        let mut model = script.into_active_model();
        model.running = Set(false);
        model.stopped_at = Set(Some(chrono::Utc::now().naive_utc()));
        model.update(db).await?;
        Ok(())
    }

    /// Removes the script row. Triggers, variables and call stack rows
    /// follow through the cascade.
    pub fn remove<'a>(
        db: &'a DatabaseConnection,
        id: &str,
    ) -> impl Future<Output = DbResult<DeleteResult>> + Send + 'a {
        Entity::delete_by_id(id.to_string()).exec(db)
    }
}
