//! Translation layer between parser records and the external UI.
//! Callbacks run on the pipeline consumer task and must return
//! promptly; anything slow belongs on the UI's own scheduler.

use crate::database::entities::{ExploredLevel, PlayerStatsRow};
use crate::game::models::{class_type, PortData, SectorData, Trader};
use crate::utils::types::SectorIndex;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// State of the connection to the game server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// UI facing view of a sector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorInfo {
    pub number: SectorIndex,
    pub nav_haz: i32,
    pub has_traders_count: usize,
    pub constellation: String,
    pub beacon: String,
    /// Outbound warps, unused slots omitted
    pub warps: Vec<SectorIndex>,
    pub has_port: bool,
    /// True only for holo-level exploration
    pub visited: bool,
}

impl SectorInfo {
    pub fn from_sector(sector: &SectorData, has_port: bool) -> Self {
        Self {
            number: sector.index,
            nav_haz: sector.nav_haz,
            has_traders_count: sector.traders.len(),
            constellation: sector.constellation.clone(),
            beacon: sector.beacon.clone(),
            warps: sector.warp.iter().copied().filter(|warp| *warp > 0).collect(),
            has_port,
            visited: sector.explored == ExploredLevel::Holo,
        }
    }
}

/// UI facing view of one product line at a port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortProductInfo {
    pub product_type: &'static str,
    /// `Buying` or `Selling`
    pub status: &'static str,
    pub quantity: i64,
    pub percentage: i32,
}

/// UI facing view of a port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub sector: SectorIndex,
    pub name: String,
    pub class: i32,
    pub class_type: &'static str,
    pub build_time: i32,
    pub products: [PortProductInfo; 3],
    pub last_update: chrono::NaiveDateTime,
    pub dead: bool,
}

impl PortInfo {
    pub fn from_port(port: &PortData) -> Self {
        let product = |name: &'static str, line: &crate::game::models::ProductLine| {
            PortProductInfo {
                product_type: name,
                status: if line.buying { "Buying" } else { "Selling" },
                quantity: line.amount,
                percentage: line.percent,
            }
        };
        Self {
            sector: port.sector_index,
            name: port.name.clone(),
            class: port.class_index,
            class_type: class_type(port.class_index),
            build_time: port.build_time,
            products: [
                product("Fuel Ore", &port.products[0]),
                product("Organics", &port.products[1]),
                product("Equipment", &port.products[2]),
            ],
            last_update: port.last_update,
            dead: port.dead,
        }
    }
}

/// Summary of the loaded script set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptStatusInfo {
    pub active_count: usize,
    pub total_count: usize,
    pub names: Vec<String>,
}

/// Details of the database backing the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStateInfo {
    pub game_name: String,
    pub server_host: String,
    pub server_port: u16,
    pub database_name: String,
    pub is_loaded: bool,
}

/// Callbacks published to the external UI. Every method must return
/// promptly; defaults are no-ops so listeners implement only what they
/// consume.
#[allow(unused_variables)]
pub trait ProxyListener: Send + Sync {
    fn on_connection_status_changed(&self, status: ConnectionStatus, address: &str) {}
    fn on_connection_error(&self, error: &str) {}
    /// Decoded UTF-8 terminal output
    fn on_data(&self, bytes: &[u8]) {}
    fn on_script_status_changed(&self, status: &ScriptStatusInfo) {}
    fn on_script_error(&self, name: &str, error: &str) {}
    fn on_database_state_changed(&self, state: &DatabaseStateInfo) {}
    fn on_current_sector_changed(&self, sector: &SectorInfo) {}
    fn on_sector_updated(&self, sector: &SectorInfo) {}
    fn on_port_updated(&self, port: &PortInfo) {}
    fn on_trader_data_updated(&self, sector: SectorIndex, traders: &[Trader]) {}
    fn on_player_stats_updated(&self, stats: &PlayerStatsRow) {}
}

#[derive(Default)]
struct PublisherState {
    /// Last current-sector value emitted or pending, used to fire the
    /// change event exactly once per distinct transition
    last_sector: Option<SectorIndex>,
    pending_sector: Option<SectorInfo>,
    /// Bumped per transition so a stale debounce task drops its emit
    generation: u64,
}

/// Debounced fan-out of state change notifications
#[derive(Clone)]
pub struct EventPublisher {
    listener: Arc<dyn ProxyListener>,
    debounce: Duration,
    state: Arc<Mutex<PublisherState>>,
}

impl EventPublisher {
    pub fn new(listener: Arc<dyn ProxyListener>, debounce: Duration) -> Self {
        Self {
            listener,
            debounce,
            state: Arc::new(Mutex::new(PublisherState::default())),
        }
    }

    pub fn listener(&self) -> &Arc<dyn ProxyListener> {
        &self.listener
    }

    pub fn connection_status(&self, status: ConnectionStatus, address: &str) {
        self.listener.on_connection_status_changed(status, address);
    }

    pub fn connection_error(&self, error: &str) {
        self.listener.on_connection_error(error);
    }

    pub fn data(&self, bytes: &[u8]) {
        self.listener.on_data(bytes);
    }

    pub fn script_status(&self, status: &ScriptStatusInfo) {
        self.listener.on_script_status_changed(status);
    }

    pub fn script_error(&self, name: &str, error: &str) {
        self.listener.on_script_error(name, error);
    }

    pub fn database_state(&self, state: &DatabaseStateInfo) {
        self.listener.on_database_state_changed(state);
    }

    /// Publishes a current sector transition. Repeat values are
    /// swallowed; bursts are coalesced over the debounce window with
    /// only the newest value emitted.
    pub fn current_sector_changed(&self, info: SectorInfo) {
        let generation = {
            let mut state = self.state.lock();
            if state.last_sector == Some(info.number) {
                return;
            }
            state.last_sector = Some(info.number);
            state.generation += 1;
            if self.debounce.is_zero() {
                None
            } else {
                state.pending_sector = Some(info.clone());
                Some(state.generation)
            }
        };

        let Some(generation) = generation else {
            self.listener.on_current_sector_changed(&info);
            return;
        };

        let publisher = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(publisher.debounce).await;
            let pending = {
                let mut state = publisher.state.lock();
                if state.generation != generation {
                    return;
                }
                state.pending_sector.take()
            };
            if let Some(info) = pending {
                publisher.listener.on_current_sector_changed(&info);
            }
        });
    }

    pub fn sector_updated(&self, info: &SectorInfo) {
        self.listener.on_sector_updated(info);
    }

    pub fn port_updated(&self, info: &PortInfo) {
        self.listener.on_port_updated(info);
    }

    pub fn trader_data_updated(&self, sector: SectorIndex, traders: &[Trader]) {
        self.listener.on_trader_data_updated(sector, traders);
    }

    pub fn player_stats_updated(&self, stats: &PlayerStatsRow) {
        self.listener.on_player_stats_updated(stats);
    }
}

#[cfg(test)]
mod test {
    use super::{EventPublisher, ProxyListener, SectorInfo};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingListener {
        sectors: Mutex<Vec<i32>>,
    }

    impl ProxyListener for RecordingListener {
        fn on_current_sector_changed(&self, sector: &SectorInfo) {
            self.sectors.lock().push(sector.number);
        }
    }

    fn info(number: i32) -> SectorInfo {
        SectorInfo {
            number,
            nav_haz: 0,
            has_traders_count: 0,
            constellation: String::new(),
            beacon: String::new(),
            warps: Vec::new(),
            has_port: false,
            visited: true,
        }
    }

    #[tokio::test]
    async fn test_distinct_transitions_fire_once() {
        let listener = Arc::new(RecordingListener::default());
        let publisher = EventPublisher::new(listener.clone(), Duration::ZERO);

        publisher.current_sector_changed(info(1));
        publisher.current_sector_changed(info(1));
        publisher.current_sector_changed(info(2));
        publisher.current_sector_changed(info(2));

        assert_eq!(&*listener.sectors.lock(), &[1, 2]);
    }

    #[tokio::test]
    async fn test_burst_coalesced_to_newest() {
        let listener = Arc::new(RecordingListener::default());
        let publisher = EventPublisher::new(listener.clone(), Duration::from_millis(20));

        publisher.current_sector_changed(info(1));
        publisher.current_sector_changed(info(2));
        publisher.current_sector_changed(info(3));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(&*listener.sectors.lock(), &[3]);
    }
}
