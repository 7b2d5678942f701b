//! Prepared load/save operations over the persistent store. All
//! mutations for a sector and its dependent lists run inside a single
//! transaction.

use super::models::{
    FighterSlot, MineSlot, Planet, PortData, ProductLine, SectorData, SectorVar, Ship, Trader,
};
use crate::database::entities::{
    message_history, planets, player_stats, ports, sector_vars, sectors, ships, traders, Message,
    MessageKind, PlayerStatsRow,
};
use crate::database::DbResult;
use crate::utils::types::SectorIndex;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait,
    ActiveValue::Set,
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    TransactionTrait,
};

/// Owners whose deployed fighters belong to the player, used by the
/// bulk clear issued when the game reports no deployed fighters
const PERSONAL_OWNERS: [&str; 2] = ["yours", "belong to your Corp"];

#[derive(Clone)]
pub struct GameStore {
    db: DatabaseConnection,
}

impl GameStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection for callers issuing entity queries
    /// directly
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Loads a sector and its dependent lists
    pub async fn load_sector(&self, index: SectorIndex) -> DbResult<Option<SectorData>> {
        let Some(row) = sectors::Model::by_index(&self.db, index).await? else {
            return Ok(None);
        };

        let ships = ships::Entity::find()
            .filter(ships::Column::SectorIndex.eq(index))
            .all(&self.db)
            .await?;
        let traders = traders::Entity::find()
            .filter(traders::Column::SectorIndex.eq(index))
            .all(&self.db)
            .await?;
        let planets = planets::Entity::find()
            .filter(planets::Column::SectorIndex.eq(index))
            .all(&self.db)
            .await?;
        let vars = sector_vars::Entity::find()
            .filter(sector_vars::Column::SectorIndex.eq(index))
            .all(&self.db)
            .await?;

        let warp = row.warp_slots();
        Ok(Some(SectorData {
            index: row.sector_index,
            constellation: row.constellation,
            beacon: row.beacon,
            nav_haz: row.nav_haz,
            density: row.density,
            anomaly: row.anomaly,
            explored: row.explored,
            warps: row.warps,
            warp,
            figs: FighterSlot {
                quantity: row.figs_quantity,
                owner: row.figs_owner,
                fig_type: row.figs_type,
            },
            mines_armid: MineSlot {
                quantity: row.mines_armid_quantity,
                owner: row.mines_armid_owner,
            },
            mines_limpet: MineSlot {
                quantity: row.mines_limpet_quantity,
                owner: row.mines_limpet_owner,
            },
            last_update: row.last_update,
            ships: ships
                .into_iter()
                .map(|ship| Ship {
                    name: ship.name,
                    owner: ship.owner,
                    ship_type: ship.ship_type,
                    figs: ship.figs,
                })
                .collect(),
            traders: traders
                .into_iter()
                .map(|trader| Trader {
                    name: trader.name,
                    ship_type: trader.ship_type,
                    ship_name: trader.ship_name,
                    figs: trader.figs,
                })
                .collect(),
            planets: planets
                .into_iter()
                .map(|planet| Planet {
                    name: planet.name,
                    owner: planet.owner,
                    figs: planet.figs,
                    citadel: planet.citadel,
                    stardock: planet.stardock,
                })
                .collect(),
            vars: vars
                .into_iter()
                .map(|var| SectorVar {
                    name: var.name,
                    value: var.value,
                })
                .collect(),
        }))
    }

    /// Commits a staged sector: the main row is upserted then the four
    /// dependent lists are rewritten, all inside one transaction
    pub async fn save_sector(&self, sector: &SectorData) -> DbResult<()> {
        let txn = self.db.begin().await?;

        sectors::Entity::insert(sectors::ActiveModel {
            sector_index: Set(sector.index),
            constellation: Set(sector.constellation.clone()),
            beacon: Set(sector.beacon.clone()),
            nav_haz: Set(sector.nav_haz),
            density: Set(sector.density),
            anomaly: Set(sector.anomaly),
            explored: Set(sector.explored),
            warps: Set(sector.warps),
            warp1: Set(sector.warp[0]),
            warp2: Set(sector.warp[1]),
            warp3: Set(sector.warp[2]),
            warp4: Set(sector.warp[3]),
            warp5: Set(sector.warp[4]),
            warp6: Set(sector.warp[5]),
            figs_quantity: Set(sector.figs.quantity),
            figs_owner: Set(sector.figs.owner.clone()),
            figs_type: Set(sector.figs.fig_type),
            mines_armid_quantity: Set(sector.mines_armid.quantity),
            mines_armid_owner: Set(sector.mines_armid.owner.clone()),
            mines_limpet_quantity: Set(sector.mines_limpet.quantity),
            mines_limpet_owner: Set(sector.mines_limpet.owner.clone()),
            last_update: Set(sector.last_update),
        })
        .on_conflict(
            OnConflict::column(sectors::Column::SectorIndex)
                .update_columns([
                    sectors::Column::Constellation,
                    sectors::Column::Beacon,
                    sectors::Column::NavHaz,
                    sectors::Column::Density,
                    sectors::Column::Anomaly,
                    sectors::Column::Explored,
                    sectors::Column::Warps,
                    sectors::Column::Warp1,
                    sectors::Column::Warp2,
                    sectors::Column::Warp3,
                    sectors::Column::Warp4,
                    sectors::Column::Warp5,
                    sectors::Column::Warp6,
                    sectors::Column::FigsQuantity,
                    sectors::Column::FigsOwner,
                    sectors::Column::FigsType,
                    sectors::Column::MinesArmidQuantity,
                    sectors::Column::MinesArmidOwner,
                    sectors::Column::MinesLimpetQuantity,
                    sectors::Column::MinesLimpetOwner,
                    sectors::Column::LastUpdate,
                ])
                .to_owned(),
        )
        .exec(&txn)
        .await?;

        Self::rewrite_lists(&txn, sector).await?;

        txn.commit().await
    }

    async fn rewrite_lists<C: ConnectionTrait>(connection: &C, sector: &SectorData) -> DbResult<()> {
        ships::Entity::delete_many()
            .filter(ships::Column::SectorIndex.eq(sector.index))
            .exec(connection)
            .await?;
        if !sector.ships.is_empty() {
            ships::Entity::insert_many(sector.ships.iter().map(|ship| ships::ActiveModel {
                sector_index: Set(sector.index),
                name: Set(ship.name.clone()),
                owner: Set(ship.owner.clone()),
                ship_type: Set(ship.ship_type.clone()),
                figs: Set(ship.figs),
                ..Default::default()
            }))
            .exec(connection)
            .await?;
        }

        traders::Entity::delete_many()
            .filter(traders::Column::SectorIndex.eq(sector.index))
            .exec(connection)
            .await?;
        if !sector.traders.is_empty() {
            traders::Entity::insert_many(sector.traders.iter().map(|trader| {
                traders::ActiveModel {
                    sector_index: Set(sector.index),
                    name: Set(trader.name.clone()),
                    ship_type: Set(trader.ship_type.clone()),
                    ship_name: Set(trader.ship_name.clone()),
                    figs: Set(trader.figs),
                    ..Default::default()
                }
            }))
            .exec(connection)
            .await?;
        }

        planets::Entity::delete_many()
            .filter(planets::Column::SectorIndex.eq(sector.index))
            .exec(connection)
            .await?;
        if !sector.planets.is_empty() {
            planets::Entity::insert_many(sector.planets.iter().map(|planet| {
                planets::ActiveModel {
                    sector_index: Set(sector.index),
                    name: Set(planet.name.clone()),
                    owner: Set(planet.owner.clone()),
                    figs: Set(planet.figs),
                    citadel: Set(planet.citadel),
                    stardock: Set(planet.stardock),
                    ..Default::default()
                }
            }))
            .exec(connection)
            .await?;
        }

        sector_vars::Entity::delete_many()
            .filter(sector_vars::Column::SectorIndex.eq(sector.index))
            .exec(connection)
            .await?;
        if !sector.vars.is_empty() {
            sector_vars::Entity::insert_many(sector.vars.iter().map(|var| {
                sector_vars::ActiveModel {
                    sector_index: Set(sector.index),
                    name: Set(var.name.clone()),
                    value: Set(var.value.clone()),
                    ..Default::default()
                }
            }))
            .exec(connection)
            .await?;
        }

        Ok(())
    }

    /// Loads the port owned by the provided sector
    pub async fn load_port(&self, index: SectorIndex) -> DbResult<Option<PortData>> {
        let Some(row) = ports::Model::by_sector(&self.db, index).await? else {
            return Ok(None);
        };
        Ok(Some(PortData {
            sector_index: row.sector_index,
            name: row.name,
            dead: row.dead,
            build_time: row.build_time,
            class_index: row.class_index,
            products: [
                ProductLine {
                    buying: row.buy_fuel_ore,
                    percent: row.percent_fuel_ore,
                    amount: row.amount_fuel_ore,
                },
                ProductLine {
                    buying: row.buy_organics,
                    percent: row.percent_organics,
                    amount: row.amount_organics,
                },
                ProductLine {
                    buying: row.buy_equipment,
                    percent: row.percent_equipment,
                    amount: row.amount_equipment,
                },
            ],
            last_update: row.last_update,
        }))
    }

    /// Upserts a port row. The owning sector row is created first when
    /// missing so the foreign key holds.
    pub async fn save_port(&self, port: &PortData) -> DbResult<()> {
        self.ensure_sector(port.sector_index).await?;

        ports::Entity::insert(ports::ActiveModel {
            sector_index: Set(port.sector_index),
            name: Set(port.name.clone()),
            dead: Set(port.dead),
            build_time: Set(port.build_time),
            class_index: Set(port.class_index),
            buy_fuel_ore: Set(port.products[0].buying),
            percent_fuel_ore: Set(port.products[0].percent),
            amount_fuel_ore: Set(port.products[0].amount),
            buy_organics: Set(port.products[1].buying),
            percent_organics: Set(port.products[1].percent),
            amount_organics: Set(port.products[1].amount),
            buy_equipment: Set(port.products[2].buying),
            percent_equipment: Set(port.products[2].percent),
            amount_equipment: Set(port.products[2].amount),
            last_update: Set(port.last_update),
        })
        .on_conflict(
            OnConflict::column(ports::Column::SectorIndex)
                .update_columns([
                    ports::Column::Name,
                    ports::Column::Dead,
                    ports::Column::BuildTime,
                    ports::Column::ClassIndex,
                    ports::Column::BuyFuelOre,
                    ports::Column::PercentFuelOre,
                    ports::Column::AmountFuelOre,
                    ports::Column::BuyOrganics,
                    ports::Column::PercentOrganics,
                    ports::Column::AmountOrganics,
                    ports::Column::BuyEquipment,
                    ports::Column::PercentEquipment,
                    ports::Column::AmountEquipment,
                    ports::Column::LastUpdate,
                ])
                .to_owned(),
        )
        .exec(&self.db)
        .await?;
        Ok(())
    }

    /// Creates an empty sector row when none exists yet, used when data
    /// arrives for a sector before it has ever been displayed
    pub async fn ensure_sector(&self, index: SectorIndex) -> DbResult<()> {
        if sectors::Model::by_index(&self.db, index).await?.is_some() {
            return Ok(());
        }
        self.save_sector(&SectorData::new(index)).await
    }

    /// Clears the deployed fighter slot of every sector owned by the
    /// player or their corp
    pub async fn clear_deployed_fighters(&self) -> DbResult<u64> {
        let result = sectors::Entity::update_many()
            .col_expr(sectors::Column::FigsQuantity, Expr::value(0i64))
            .col_expr(sectors::Column::FigsOwner, Expr::value(""))
            .col_expr(sectors::Column::FigsType, Expr::value(0))
            .filter(sectors::Column::FigsOwner.is_in(PERSONAL_OWNERS))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Sets a named variable on a sector, creating the sector row when
    /// missing
    pub async fn set_sector_var(
        &self,
        index: SectorIndex,
        name: &str,
        value: &str,
    ) -> DbResult<()> {
        self.ensure_sector(index).await?;

        let existing = sector_vars::Entity::find()
            .filter(
                sector_vars::Column::SectorIndex
                    .eq(index)
                    .and(sector_vars::Column::Name.eq(name)),
            )
            .one(&self.db)
            .await?;

        match existing {
            Some(row) => {
                let mut model = row.into_active_model();
                model.value = Set(value.to_string());
                model.update(&self.db).await?;
            }
            None => {
                sector_vars::Entity::insert(sector_vars::ActiveModel {
                    sector_index: Set(index),
                    name: Set(name.to_string()),
                    value: Set(value.to_string()),
                    ..Default::default()
                })
                .exec(&self.db)
                .await?;
            }
        }
        Ok(())
    }

    pub async fn get_sector_var(&self, index: SectorIndex, name: &str) -> DbResult<Option<String>> {
        let row = sector_vars::Entity::find()
            .filter(
                sector_vars::Column::SectorIndex
                    .eq(index)
                    .and(sector_vars::Column::Name.eq(name)),
            )
            .one(&self.db)
            .await?;
        Ok(row.map(|row| row.value))
    }

    pub async fn add_message(
        &self,
        kind: MessageKind,
        content: &str,
        sender: &str,
        channel: &str,
    ) -> DbResult<()> {
        message_history::Model::append(
            &self.db,
            kind,
            content.to_string(),
            sender.to_string(),
            channel.to_string(),
        )
        .await?;
        Ok(())
    }

    pub async fn recent_messages(&self, count: u64) -> DbResult<Vec<Message>> {
        message_history::Model::recent(&self.db, count).await
    }

    pub async fn save_player_stats(&self, stats: PlayerStatsRow) -> DbResult<()> {
        player_stats::Model::save(&self.db, stats).await
    }

    pub async fn load_player_stats(&self) -> DbResult<Option<PlayerStatsRow>> {
        player_stats::Model::get(&self.db).await
    }
}

#[cfg(test)]
mod test {
    use super::GameStore;
    use crate::database::connect_in_memory;
    use crate::database::entities::{ExploredLevel, FighterType};
    use crate::game::models::{PortData, SectorData, SectorVar, Ship, Trader};

    async fn store() -> GameStore {
        GameStore::new(connect_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_sector_round_trip() {
        let store = store().await;

        let mut sector = SectorData::new(123);
        // Whole seconds so the value survives the column round trip
        sector.last_update = chrono::NaiveDate::from_ymd_opt(2024, 8, 12)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        sector.constellation = "Sol".to_string();
        sector.beacon = "FedSpace".to_string();
        sector.nav_haz = 5;
        sector.explored = ExploredLevel::Holo;
        sector.add_warp(2);
        sector.add_warp(3);
        sector.add_warp(4);
        sector.figs.quantity = 200;
        sector.figs.owner = "yours".to_string();
        sector.figs.fig_type = FighterType::Defensive;
        sector.ships.push(Ship {
            name: "Dauntless".to_string(),
            owner: "Harkonnen".to_string(),
            ship_type: "Merchant Cruiser".to_string(),
            figs: 50,
        });
        sector.traders.push(Trader {
            name: "Rammar".to_string(),
            ship_type: "Scout".to_string(),
            ship_name: "Swift".to_string(),
            figs: 10,
        });
        sector.vars.push(SectorVar {
            name: "note".to_string(),
            value: "avoid".to_string(),
        });

        store.save_sector(&sector).await.unwrap();
        let loaded = store.load_sector(123).await.unwrap().unwrap();
        assert_eq!(loaded, sector);
    }

    #[tokio::test]
    async fn test_sector_commit_replaces_lists() {
        let store = store().await;

        let mut sector = SectorData::new(5);
        sector.ships.push(Ship {
            name: "One".to_string(),
            ..Default::default()
        });
        store.save_sector(&sector).await.unwrap();

        sector.ships.clear();
        sector.ships.push(Ship {
            name: "Two".to_string(),
            ..Default::default()
        });
        store.save_sector(&sector).await.unwrap();

        let loaded = store.load_sector(5).await.unwrap().unwrap();
        assert_eq!(loaded.ships.len(), 1);
        assert_eq!(loaded.ships[0].name, "Two");
    }

    #[tokio::test]
    async fn test_port_round_trip_creates_sector() {
        let store = store().await;

        let mut port = PortData::new(77);
        port.last_update = chrono::NaiveDate::from_ymd_opt(2024, 8, 12)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        port.name = "Stargate Alpha".to_string();
        port.class_index = 8;
        port.products[0].buying = true;
        port.products[0].amount = 100;
        port.products[0].percent = 100;
        store.save_port(&port).await.unwrap();

        let loaded = store.load_port(77).await.unwrap().unwrap();
        assert_eq!(loaded, port);
        // Owning sector row was created to satisfy the foreign key
        assert!(store.load_sector(77).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_deployed_fighters() {
        let store = store().await;

        let mut own = SectorData::new(1);
        own.figs.quantity = 10;
        own.figs.owner = "yours".to_string();
        store.save_sector(&own).await.unwrap();

        let mut corp = SectorData::new(2);
        corp.figs.quantity = 20;
        corp.figs.owner = "belong to your Corp".to_string();
        store.save_sector(&corp).await.unwrap();

        let mut other = SectorData::new(3);
        other.figs.quantity = 30;
        other.figs.owner = "Harkonnen".to_string();
        store.save_sector(&other).await.unwrap();

        let cleared = store.clear_deployed_fighters().await.unwrap();
        assert_eq!(cleared, 2);
        assert_eq!(store.load_sector(1).await.unwrap().unwrap().figs.quantity, 0);
        assert_eq!(
            store.load_sector(3).await.unwrap().unwrap().figs.quantity,
            30
        );
    }
}
