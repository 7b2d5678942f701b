use sea_orm_migration::prelude::*;

use super::m20240812_101000_sectors_table::Sectors;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Creates one child table per dynamic sector list. Rows are rewritten
/// whenever their sector is committed so each carries a cascade back to
/// the sectors table.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ships::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ships::SectorIndex).integer().not_null())
                    .col(ColumnDef::new(Ships::Name).string().not_null())
                    .col(ColumnDef::new(Ships::Owner).string().not_null())
                    .col(ColumnDef::new(Ships::ShipType).string().not_null())
                    .col(ColumnDef::new(Ships::Figs).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Ships::Table, Ships::SectorIndex)
                            .to(Sectors::Table, Sectors::SectorIndex)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ships-sector")
                    .table(Ships::Table)
                    .col(Ships::SectorIndex)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Traders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Traders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Traders::SectorIndex).integer().not_null())
                    .col(ColumnDef::new(Traders::Name).string().not_null())
                    .col(ColumnDef::new(Traders::ShipType).string().not_null())
                    .col(ColumnDef::new(Traders::ShipName).string().not_null())
                    .col(ColumnDef::new(Traders::Figs).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Traders::Table, Traders::SectorIndex)
                            .to(Sectors::Table, Sectors::SectorIndex)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-traders-sector")
                    .table(Traders::Table)
                    .col(Traders::SectorIndex)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Planets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Planets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Planets::SectorIndex).integer().not_null())
                    .col(ColumnDef::new(Planets::Name).string().not_null())
                    .col(ColumnDef::new(Planets::Owner).string().not_null())
                    .col(ColumnDef::new(Planets::Figs).big_integer().not_null())
                    .col(ColumnDef::new(Planets::Citadel).boolean().not_null())
                    .col(ColumnDef::new(Planets::Stardock).boolean().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Planets::Table, Planets::SectorIndex)
                            .to(Sectors::Table, Sectors::SectorIndex)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-planets-sector")
                    .table(Planets::Table)
                    .col(Planets::SectorIndex)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SectorVars::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SectorVars::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SectorVars::SectorIndex).integer().not_null())
                    .col(ColumnDef::new(SectorVars::Name).string().not_null())
                    .col(ColumnDef::new(SectorVars::Value).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(SectorVars::Table, SectorVars::SectorIndex)
                            .to(Sectors::Table, Sectors::SectorIndex)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sector-vars-sector")
                    .table(SectorVars::Table)
                    .col(SectorVars::SectorIndex)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SectorVars::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Planets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Traders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Ships::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Ships {
    Table,
    Id,
    SectorIndex,
    Name,
    Owner,
    ShipType,
    Figs,
}

#[derive(Iden)]
enum Traders {
    Table,
    Id,
    SectorIndex,
    Name,
    ShipType,
    ShipName,
    Figs,
}

#[derive(Iden)]
enum Planets {
    Table,
    Id,
    SectorIndex,
    Name,
    Owner,
    Figs,
    Citadel,
    Stardock,
}

#[derive(Iden)]
enum SectorVars {
    Table,
    Id,
    SectorIndex,
    Name,
    Value,
}
