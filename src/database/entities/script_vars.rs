use crate::database::DbResult;
use sea_orm::{
    entity::prelude::*,
    sea_query::OnConflict,
    ActiveValue::Set,
    DeleteResult, InsertResult,
};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Globally persisted script variable leaf. Array leaves are stored
/// one row per element under their full dotted path, for example
/// `route[1][2]`; a `name[ARRAYSIZE]` row records a static array's
/// declared size.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "script_vars")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub value: String,
    pub var_type: VarType,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Storage type tag for a persisted variable
#[derive(
    Deserialize, Serialize, Debug, Default, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "u8", db_type = "TinyUnsigned")]
#[repr(u8)]
pub enum VarType {
    #[default]
    #[sea_orm(num_value = 0)]
    String = 0,

    #[sea_orm(num_value = 1)]
    Number = 1,

    #[sea_orm(num_value = 2)]
    Array = 2,
}

impl Model {
    /// Sets the named variable, replacing any previous value
    pub fn set(
        db: &DatabaseConnection,
        name: String,
        value: String,
        var_type: VarType,
    ) -> impl Future<Output = DbResult<InsertResult<ActiveModel>>> + Send + '_ {
        Entity::insert(ActiveModel {
            name: Set(name),
            value: Set(value),
            var_type: Set(var_type),
        })
        .on_conflict(
            OnConflict::column(Column::Name)
                .update_columns([Column::Value, Column::VarType])
                .to_owned(),
        )
        .exec(db)
    }

    /// Gets the named variable if it has been saved
    pub fn get<'a>(
        db: &'a DatabaseConnection,
        name: &str,
    ) -> impl Future<Output = DbResult<Option<Self>>> + Send + 'a {
        Entity::find_by_id(name.to_string()).one(db)
    }

    /// Gets every saved leaf beneath the provided base name, used to
    /// restore array variables saved across multiple rows
    pub fn get_tree<'a>(
        db: &'a DatabaseConnection,
        base: &str,
    ) -> impl Future<Output = DbResult<Vec<Self>>> + Send + 'a {
        Entity::find()
            .filter(
                Column::Name
                    .eq(base)
                    .or(Column::Name.starts_with(format!("{base}["))),
            )
            .all(db)
    }

    /// Deletes the named variable and any array leaves beneath it
    pub fn delete<'a>(
        db: &'a DatabaseConnection,
        name: &str,
    ) -> impl Future<Output = DbResult<DeleteResult>> + Send + 'a {
        Entity::delete_many()
            .filter(
                Column::Name
                    .eq(name)
                    .or(Column::Name.starts_with(format!("{name}["))),
            )
            .exec(db)
    }
}
