use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Scripts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Scripts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Scripts::Name).string().not_null())
                    .col(ColumnDef::new(Scripts::Path).string().not_null())
                    .col(ColumnDef::new(Scripts::Version).integer().not_null())
                    .col(ColumnDef::new(Scripts::Running).boolean().not_null())
                    .col(ColumnDef::new(Scripts::System).boolean().not_null())
                    .col(ColumnDef::new(Scripts::LoadedAt).date_time().not_null())
                    .col(ColumnDef::new(Scripts::StoppedAt).date_time().null())
                    .col(ColumnDef::new(Scripts::Includes).string().not_null())
                    .col(ColumnDef::new(Scripts::Description).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ScriptTriggers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScriptTriggers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScriptTriggers::ScriptId).string().not_null())
                    .col(
                        ColumnDef::new(ScriptTriggers::TriggerId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ScriptTriggers::Kind).integer().not_null())
                    .col(ColumnDef::new(ScriptTriggers::Pattern).string().not_null())
                    .col(ColumnDef::new(ScriptTriggers::Label).string().not_null())
                    .col(ColumnDef::new(ScriptTriggers::Response).string().not_null())
                    .col(
                        ColumnDef::new(ScriptTriggers::Lifecycle)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ScriptTriggers::Active).boolean().not_null())
                    .col(ColumnDef::new(ScriptTriggers::Params).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(ScriptTriggers::Table, ScriptTriggers::ScriptId)
                            .to(Scripts::Table, Scripts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ScriptVariables::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScriptVariables::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ScriptVariables::ScriptId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ScriptVariables::Name).string().not_null())
                    .col(ColumnDef::new(ScriptVariables::Value).string().not_null())
                    .col(ColumnDef::new(ScriptVariables::ParentId).integer().null())
                    .col(
                        ColumnDef::new(ScriptVariables::IndexPath)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ScriptVariables::Table, ScriptVariables::ScriptId)
                            .to(Scripts::Table, Scripts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ScriptCallStack::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScriptCallStack::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ScriptCallStack::ScriptId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ScriptCallStack::Ordinal).integer().not_null())
                    .col(ColumnDef::new(ScriptCallStack::Label).string().not_null())
                    .col(ColumnDef::new(ScriptCallStack::SavedPc).integer().not_null())
                    .col(
                        ColumnDef::new(ScriptCallStack::ReturnPc)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ScriptCallStack::Table, ScriptCallStack::ScriptId)
                            .to(Scripts::Table, Scripts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ScriptVars::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScriptVars::Name)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScriptVars::Value).string().not_null())
                    .col(ColumnDef::new(ScriptVars::VarType).tiny_unsigned().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScriptVars::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ScriptCallStack::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ScriptVariables::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ScriptTriggers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Scripts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Scripts {
    Table,
    Id,
    Name,
    Path,
    Version,
    Running,
    System,
    LoadedAt,
    StoppedAt,
    Includes,
    Description,
}

#[derive(Iden)]
enum ScriptTriggers {
    Table,
    Id,
    ScriptId,
    TriggerId,
    Kind,
    Pattern,
    Label,
    Response,
    Lifecycle,
    Active,
    Params,
}

#[derive(Iden)]
enum ScriptVariables {
    Table,
    Id,
    ScriptId,
    Name,
    Value,
    ParentId,
    IndexPath,
}

#[derive(Iden)]
enum ScriptCallStack {
    Table,
    Id,
    ScriptId,
    Ordinal,
    Label,
    SavedPc,
    ReturnPc,
}

#[derive(Iden)]
enum ScriptVars {
    Table,
    Name,
    Value,
    VarType,
}
