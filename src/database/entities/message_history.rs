use crate::database::DbResult;
use chrono::NaiveDateTime;
use sea_orm::{entity::prelude::*, ActiveValue::Set, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Append-only log of messages mined from the stream
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "message_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip)]
    pub id: i32,
    pub kind: MessageKind,
    pub timestamp: NaiveDateTime,
    pub content: String,
    pub sender: String,
    pub channel: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Channel a mined message arrived over
#[derive(
    Deserialize, Serialize, Debug, Default, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "u8", db_type = "TinyUnsigned")]
#[repr(u8)]
pub enum MessageKind {
    #[default]
    #[sea_orm(num_value = 0)]
    General = 0,

    #[sea_orm(num_value = 1)]
    Fighter = 1,

    #[sea_orm(num_value = 2)]
    Computer = 2,

    #[sea_orm(num_value = 3)]
    Radio = 3,

    #[sea_orm(num_value = 4)]
    Fedlink = 4,

    #[sea_orm(num_value = 5)]
    Planet = 5,
}

impl Model {
    /// Appends a message to the history
    pub async fn append(
        db: &DatabaseConnection,
        kind: MessageKind,
        content: String,
        sender: String,
        channel: String,
    ) -> DbResult<Self> {
        ActiveModel {
            kind: Set(kind),
            timestamp: Set(chrono::Utc::now().naive_utc()),
            content: Set(content),
            sender: Set(sender),
            channel: Set(channel),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// The most recent `count` messages, newest first
    pub fn recent(
        db: &DatabaseConnection,
        count: u64,
    ) -> impl Future<Output = DbResult<Vec<Self>>> + Send + '_ {
        Entity::find()
            .order_by_desc(Column::Id)
            .limit(count)
            .all(db)
    }
}
