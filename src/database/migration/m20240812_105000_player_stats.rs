use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PlayerStats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PlayerStats::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PlayerStats::Turns).big_integer().not_null())
                    .col(ColumnDef::new(PlayerStats::Credits).big_integer().not_null())
                    .col(
                        ColumnDef::new(PlayerStats::Fighters)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PlayerStats::Shields).big_integer().not_null())
                    .col(
                        ColumnDef::new(PlayerStats::TotalHolds)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlayerStats::OreHolds)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlayerStats::OrgHolds)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlayerStats::EquHolds)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlayerStats::ColHolds)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlayerStats::EmptyHolds)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PlayerStats::Photons).big_integer().not_null())
                    .col(ColumnDef::new(PlayerStats::Armids).big_integer().not_null())
                    .col(ColumnDef::new(PlayerStats::Limpets).big_integer().not_null())
                    .col(
                        ColumnDef::new(PlayerStats::GenTorps)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PlayerStats::TwarpType).integer().not_null())
                    .col(ColumnDef::new(PlayerStats::Cloaks).big_integer().not_null())
                    .col(ColumnDef::new(PlayerStats::Beacons).big_integer().not_null())
                    .col(ColumnDef::new(PlayerStats::Atomics).big_integer().not_null())
                    .col(
                        ColumnDef::new(PlayerStats::Corbomite)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PlayerStats::Eprobes).big_integer().not_null())
                    .col(
                        ColumnDef::new(PlayerStats::MineDisrs)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlayerStats::Alignment)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlayerStats::Experience)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PlayerStats::Corp).integer().not_null())
                    .col(ColumnDef::new(PlayerStats::ShipNumber).integer().not_null())
                    .col(
                        ColumnDef::new(PlayerStats::LongRangeScanner)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlayerStats::PsychicProbe)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlayerStats::PlanetScanner)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PlayerStats::ShipClass).string().not_null())
                    .col(ColumnDef::new(PlayerStats::PlayerName).string().not_null())
                    .col(
                        ColumnDef::new(PlayerStats::CurrentSector)
                            .integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PlayerStats::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PlayerStats {
    Table,
    Id,
    Turns,
    Credits,
    Fighters,
    Shields,
    TotalHolds,
    OreHolds,
    OrgHolds,
    EquHolds,
    ColHolds,
    EmptyHolds,
    Photons,
    Armids,
    Limpets,
    GenTorps,
    TwarpType,
    Cloaks,
    Beacons,
    Atomics,
    Corbomite,
    Eprobes,
    MineDisrs,
    Alignment,
    Experience,
    Corp,
    ShipNumber,
    LongRangeScanner,
    PsychicProbe,
    PlanetScanner,
    ShipClass,
    PlayerName,
    CurrentSector,
}
