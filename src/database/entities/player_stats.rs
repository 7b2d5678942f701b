use crate::database::DbResult;
use crate::utils::types::SectorIndex;
use sea_orm::{entity::prelude::*, sea_query::OnConflict, ActiveValue::Set, IntoActiveModel};
use serde::Serialize;

/// The fixed row id used for the single player stats record
const STATS_ROW_ID: i32 = 1;

/// Single-row record of everything known about the player, refreshed
/// from the quick-stats display
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel, Default)]
#[sea_orm(table_name = "player_stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(skip)]
    pub id: i32,
    pub turns: i64,
    pub credits: i64,
    pub fighters: i64,
    pub shields: i64,
    pub total_holds: i64,
    pub ore_holds: i64,
    pub org_holds: i64,
    pub equ_holds: i64,
    pub col_holds: i64,
    pub empty_holds: i64,
    pub photons: i64,
    pub armids: i64,
    pub limpets: i64,
    pub gen_torps: i64,
    pub twarp_type: i32,
    pub cloaks: i64,
    pub beacons: i64,
    pub atomics: i64,
    pub corbomite: i64,
    pub eprobes: i64,
    pub mine_disrs: i64,
    pub alignment: i64,
    pub experience: i64,
    pub corp: i32,
    pub ship_number: i32,
    pub long_range_scanner: i32,
    pub psychic_probe: bool,
    pub planet_scanner: bool,
    pub ship_class: String,
    pub player_name: String,
    pub current_sector: SectorIndex,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Loads the stats row if one has been saved
    pub async fn get(db: &DatabaseConnection) -> DbResult<Option<Self>> {
        Entity::find_by_id(STATS_ROW_ID).one(db).await
    }

    /// Upserts the single stats row
    pub async fn save(db: &DatabaseConnection, mut stats: Self) -> DbResult<()> {
        stats.id = STATS_ROW_ID;
        let mut model = stats.into_active_model().reset_all();
        model.id = Set(STATS_ROW_ID);
        Entity::insert(model)
            .on_conflict(
                OnConflict::column(Column::Id)
                    .update_columns([
                        Column::Turns,
                        Column::Credits,
                        Column::Fighters,
                        Column::Shields,
                        Column::TotalHolds,
                        Column::OreHolds,
                        Column::OrgHolds,
                        Column::EquHolds,
                        Column::ColHolds,
                        Column::EmptyHolds,
                        Column::Photons,
                        Column::Armids,
                        Column::Limpets,
                        Column::GenTorps,
                        Column::TwarpType,
                        Column::Cloaks,
                        Column::Beacons,
                        Column::Atomics,
                        Column::Corbomite,
                        Column::Eprobes,
                        Column::MineDisrs,
                        Column::Alignment,
                        Column::Experience,
                        Column::Corp,
                        Column::ShipNumber,
                        Column::LongRangeScanner,
                        Column::PsychicProbe,
                        Column::PlanetScanner,
                        Column::ShipClass,
                        Column::PlayerName,
                        Column::CurrentSector,
                    ])
                    .to_owned(),
            )
            .exec(db)
            .await?;
        Ok(())
    }
}
