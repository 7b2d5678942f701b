use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MessageHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MessageHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MessageHistory::Kind)
                            .tiny_unsigned()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageHistory::Timestamp)
                            .date_time()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MessageHistory::Content).string().not_null())
                    .col(ColumnDef::new(MessageHistory::Sender).string().not_null())
                    .col(ColumnDef::new(MessageHistory::Channel).string().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MessageHistory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MessageHistory {
    Table,
    Id,
    Kind,
    Timestamp,
    Content,
    Sender,
    Channel,
}
