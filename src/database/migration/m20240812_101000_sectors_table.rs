use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sectors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sectors::SectorIndex)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sectors::Constellation).string().not_null())
                    .col(ColumnDef::new(Sectors::Beacon).string().not_null())
                    .col(ColumnDef::new(Sectors::NavHaz).integer().not_null())
                    .col(ColumnDef::new(Sectors::Density).big_integer().not_null())
                    .col(ColumnDef::new(Sectors::Anomaly).boolean().not_null())
                    .col(ColumnDef::new(Sectors::Explored).tiny_unsigned().not_null())
                    .col(ColumnDef::new(Sectors::Warps).integer().not_null())
                    .col(ColumnDef::new(Sectors::Warp1).integer().not_null())
                    .col(ColumnDef::new(Sectors::Warp2).integer().not_null())
                    .col(ColumnDef::new(Sectors::Warp3).integer().not_null())
                    .col(ColumnDef::new(Sectors::Warp4).integer().not_null())
                    .col(ColumnDef::new(Sectors::Warp5).integer().not_null())
                    .col(ColumnDef::new(Sectors::Warp6).integer().not_null())
                    .col(
                        ColumnDef::new(Sectors::FigsQuantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sectors::FigsOwner).string().not_null())
                    .col(ColumnDef::new(Sectors::FigsType).tiny_unsigned().not_null())
                    .col(
                        ColumnDef::new(Sectors::MinesArmidQuantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sectors::MinesArmidOwner).string().not_null())
                    .col(
                        ColumnDef::new(Sectors::MinesLimpetQuantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sectors::MinesLimpetOwner)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sectors::LastUpdate).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ports::SectorIndex)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ports::Name).string().not_null())
                    .col(ColumnDef::new(Ports::Dead).boolean().not_null())
                    .col(ColumnDef::new(Ports::BuildTime).integer().not_null())
                    .col(ColumnDef::new(Ports::ClassIndex).integer().not_null())
                    .col(ColumnDef::new(Ports::BuyFuelOre).boolean().not_null())
                    .col(ColumnDef::new(Ports::PercentFuelOre).integer().not_null())
                    .col(ColumnDef::new(Ports::AmountFuelOre).big_integer().not_null())
                    .col(ColumnDef::new(Ports::BuyOrganics).boolean().not_null())
                    .col(ColumnDef::new(Ports::PercentOrganics).integer().not_null())
                    .col(
                        ColumnDef::new(Ports::AmountOrganics)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Ports::BuyEquipment).boolean().not_null())
                    .col(ColumnDef::new(Ports::PercentEquipment).integer().not_null())
                    .col(
                        ColumnDef::new(Ports::AmountEquipment)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Ports::LastUpdate).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Ports::Table, Ports::SectorIndex)
                            .to(Sectors::Table, Sectors::SectorIndex)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ports::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Sectors::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Sectors {
    Table,
    SectorIndex,
    Constellation,
    Beacon,
    NavHaz,
    Density,
    Anomaly,
    Explored,
    Warps,
    Warp1,
    Warp2,
    Warp3,
    Warp4,
    Warp5,
    Warp6,
    FigsQuantity,
    FigsOwner,
    FigsType,
    MinesArmidQuantity,
    MinesArmidOwner,
    MinesLimpetQuantity,
    MinesLimpetOwner,
    LastUpdate,
}

#[derive(Iden)]
enum Ports {
    Table,
    SectorIndex,
    Name,
    Dead,
    BuildTime,
    ClassIndex,
    BuyFuelOre,
    PercentFuelOre,
    AmountFuelOre,
    BuyOrganics,
    PercentOrganics,
    AmountOrganics,
    BuyEquipment,
    PercentEquipment,
    AmountEquipment,
    LastUpdate,
}
