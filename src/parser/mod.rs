//! Line oriented parser reconstructing typed game records from the
//! decoded stream. A display automaton tracks which screen the game is
//! printing; staged records are committed to the store at well defined
//! completion points.

mod bulk;
mod port;
mod sector;
mod stats;

use crate::database::entities::{ExploredLevel, MessageKind};
use crate::game::models::{PortData, SectorData, Trader};
use crate::game::state::GameState;
use crate::game::store::GameStore;
use crate::services::events::{EventPublisher, PortInfo, SectorInfo};
use crate::utils::parsing::{int_commas, strip_ansi};
use crate::utils::types::SectorIndex;
use chrono::Utc;
use log::{debug, warn};
use std::sync::Arc;

/// Which display the game is currently printing
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    #[default]
    None,
    Sector,
    Density,
    WarpLane,
    Cim,
    PortCim,
    Port,
    PortCr,
    WarpCim,
    FigScan,
}

/// Which multi-line list a sector display is continuing
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SectorPosition {
    #[default]
    Normal,
    Ports,
    Planets,
    Ships,
    Mines,
    Traders,
}

/// Whose deployed fighters a fig scan is listing
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FigScanType {
    #[default]
    Personal,
    Corp,
}

/// Message transmission waiting on its content line
pub(crate) struct PendingTransmission {
    pub kind: MessageKind,
    pub sender: String,
    pub channel: String,
}

pub struct GameParser {
    store: GameStore,
    events: EventPublisher,
    state: Arc<GameState>,

    display: Display,
    sector_position: SectorPosition,
    pub(crate) fig_scan_type: FigScanType,

    /// Sector block being staged, index zero when nothing is staged
    pub(crate) current_sector: SectorData,
    /// Port staged alongside the sector block
    pub(crate) staged_port: Option<PortData>,
    /// Commerce report being staged
    pub(crate) current_port: PortData,
    /// Product rows seen in the current commerce report
    pub(crate) product_rows: usize,
    /// Sector a computer port report was requested for
    pub(crate) port_sector: SectorIndex,
    /// Trader spanning two display lines
    pub(crate) current_trader: Option<Trader>,
    /// Carry value linking warp lane paths across lines
    pub(crate) last_warp: SectorIndex,
    /// Prevents duplicate commits of the same staged sector
    sector_saved: bool,
    /// Set once a port update has been published since the last sector
    /// commit
    port_published: bool,
    /// Sector displays arriving from an ether probe describe remote
    /// sectors and must not move the current sector
    probe_active: bool,

    pub(crate) pending_transmission: Option<PendingTransmission>,

    /// Partial line carried between chunks
    line_buffer: String,
}

impl GameParser {
    pub fn new(store: GameStore, events: EventPublisher, state: Arc<GameState>) -> Self {
        Self {
            store,
            events,
            state,
            display: Display::None,
            sector_position: SectorPosition::Normal,
            fig_scan_type: FigScanType::Personal,
            current_sector: SectorData::new(0),
            staged_port: None,
            current_port: PortData::new(0),
            product_rows: 0,
            port_sector: 0,
            current_trader: None,
            last_warp: 0,
            sector_saved: false,
            port_published: false,
            probe_active: false,
            pending_transmission: None,
            line_buffer: String::new(),
        }
    }

    pub(crate) fn store(&self) -> &GameStore {
        &self.store
    }

    pub(crate) fn events(&self) -> &EventPublisher {
        &self.events
    }

    pub fn display(&self) -> Display {
        self.display
    }

    pub(crate) fn set_display(&mut self, display: Display) {
        self.display = display;
    }

    /// Splits a chunk of decoded text into complete lines. The
    /// earliest of `\n`/`\r` terminates a line; partial trailing text
    /// stays buffered for the next chunk. Lines keep their ANSI
    /// escapes so trigger matching can see them.
    pub fn take_lines(&mut self, text: &str) -> Vec<String> {
        self.line_buffer.push_str(text);
        let mut lines = Vec::new();

        loop {
            let Some(position) = self.line_buffer.find(['\n', '\r']) else {
                break;
            };
            let mut line: String = self.line_buffer.drain(..position).collect();
            let terminator = self.line_buffer.remove(0);
            if terminator == '\r' && self.line_buffer.starts_with('\n') {
                self.line_buffer.remove(0);
            }
            // Stray carriage return artifacts from mid-line redraws
            if let Some(stripped) = line.strip_suffix('\r') {
                line.truncate(stripped.len());
            }
            lines.push(line);
        }

        // Command prompts never carry a terminator; a buffered fragment
        // shaped like one is treated as a complete line
        let stripped = strip_ansi(&self.line_buffer);
        if stripped.starts_with("Command [TL=") && stripped.ends_with(": ") {
            lines.push(std::mem::take(&mut self.line_buffer));
        }

        lines
    }

    /// Feeds a chunk end to end, splitting and parsing in one step
    pub async fn process_chunk(&mut self, text: &str) {
        for line in self.take_lines(text) {
            self.process_line(&line).await;
        }
    }

    /// Handles a single complete line
    pub async fn process_line(&mut self, raw: &str) {
        let line = strip_ansi(raw);

        self.detect_display(&line).await;
        self.mine_prompt(&line).await;
        self.mine_misc(&line).await;

        match self.display {
            Display::Sector => self.process_sector_line(&line).await,
            Display::Port | Display::PortCr => self.process_port_line(&line).await,
            Display::WarpLane => self.process_warp_line(&line).await,
            Display::Density => self.process_density_line(&line).await,
            Display::Cim | Display::PortCim | Display::WarpCim => {
                self.process_cim_line(&line).await
            }
            Display::FigScan => self.process_fig_scan_line(&line).await,
            Display::None => {}
        }
    }

    /// Updates the display automaton from leading substring probes
    async fn detect_display(&mut self, line: &str) {
        if line.starts_with("Sector  : ") {
            self.commit_sector().await;
            self.begin_sector_block(line);
            self.display = Display::Sector;
        } else if line.starts_with("Docking...") {
            // Capture the docked sector before staging resets
            let sector = if self.current_sector.index > 0 {
                self.current_sector.index
            } else {
                self.state.current_sector()
            };
            self.commit_sector().await;
            self.begin_port_block(sector);
            self.display = Display::Port;
        } else if line.starts_with("What sector is the port in? ") {
            let sector = line
                .rsplit(']')
                .next()
                .and_then(|typed| typed.trim().parse().ok())
                .filter(|sector| *sector > 0)
                .unwrap_or_else(|| self.state.current_sector());
            self.begin_port_block(sector);
            self.display = Display::PortCr;
        } else if line.starts_with("Computer Information Matrix") {
            self.display = Display::Cim;
        } else if line.starts_with("The shortest path (") || line.starts_with("  TO > ") {
            self.display = Display::WarpLane;
            self.last_warp = 0;
        } else if slice_eq(line, 26, 42, "Relative Density") {
            self.display = Display::Density;
        } else if slice_eq(line, 17, 40, "Deployed  Fighter  Scan") {
            self.display = Display::FigScan;
        } else if line.contains("Command [TL=")
            || line.starts_with("Stop in this sector")
            || line.starts_with("Engage the Autopilot?")
        {
            if self.display == Display::Sector {
                self.commit_sector().await;
            }
            self.display = Display::None;
            self.sector_position = SectorPosition::Normal;
        }
    }

    /// Command prompts are always mined for the current sector number
    async fn mine_prompt(&mut self, line: &str) {
        if !line.contains("Command [TL=") {
            return;
        }
        let Some(sector) = line
            .split("]:[")
            .nth(1)
            .and_then(|rest| rest.split(']').next())
            .and_then(|value| value.trim().parse::<SectorIndex>().ok())
        else {
            return;
        };
        if sector <= 0 {
            return;
        }
        self.set_current_sector(sector).await;
    }

    /// Records a new current sector and publishes the transition
    pub(crate) async fn set_current_sector(&mut self, sector: SectorIndex) {
        if !self.state.set_current_sector(sector) {
            return;
        }
        debug!("Current sector changed: {sector}");
        let info = match self.store.load_sector(sector).await {
            Ok(Some(data)) => {
                let has_port = matches!(self.store.load_port(sector).await, Ok(Some(_)));
                SectorInfo::from_sector(&data, has_port)
            }
            _ => SectorInfo::from_sector(&SectorData::new(sector), false),
        };
        self.events.current_sector_changed(info);
    }

    /// Lines mined regardless of the active display
    async fn mine_misc(&mut self, line: &str) {
        if line.starts_with("Probe entering sector :") {
            self.commit_sector().await;
            self.probe_active = true;
        }
        if line.starts_with("Probe Self Destructs") {
            self.commit_sector().await;
            self.probe_active = false;
        }
        if line.starts_with("Citadel treasury contains") {
            self.commit_sector().await;
        }

        if line.starts_with("No fighters deployed") {
            match self.store.clear_deployed_fighters().await {
                Ok(cleared) => debug!("Cleared deployed fighters in {cleared} sectors"),
                Err(err) => warn!("Failed clearing deployed fighters: {err}"),
            }
        }

        self.mine_quick_stats(line).await;
        self.mine_messages(line).await;
    }

    pub(crate) fn begin_sector_block(&mut self, line: &str) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let index = parts
            .get(2)
            .and_then(|value| int_commas(value).ok())
            .unwrap_or(0) as SectorIndex;

        let mut sector = SectorData::new(index);
        if let Some(position) = line.find(" in ") {
            sector.constellation = line[position + 4..].trim().trim_end_matches('.').to_string();
        }
        sector.explored = ExploredLevel::Holo;
        sector.last_update = Utc::now().naive_utc();

        self.current_sector = sector;
        self.staged_port = None;
        self.current_trader = None;
        self.sector_saved = false;
        self.sector_position = SectorPosition::Normal;
    }

    pub(crate) fn begin_port_block(&mut self, sector: SectorIndex) {
        self.current_port = PortData::new(sector);
        self.port_sector = sector;
        self.product_rows = 0;
    }

    pub(crate) fn sector_position(&self) -> SectorPosition {
        self.sector_position
    }

    pub(crate) fn set_sector_position(&mut self, position: SectorPosition) {
        self.sector_position = position;
    }

    /// Commits the staged sector and its dependent lists. A store
    /// failure rolls the transaction back and drops the staged record
    /// without taking the pipeline down.
    pub(crate) async fn commit_sector(&mut self) {
        self.flush_trader();
        if self.sector_saved || self.current_sector.index <= 0 {
            return;
        }

        if let Err(err) = self.store.save_sector(&self.current_sector).await {
            warn!(
                "Failed to commit sector {}: {err}",
                self.current_sector.index
            );
            self.reset_sector_staging();
            return;
        }

        let mut has_port = false;
        if let Some(port) = self.staged_port.take() {
            has_port = true;
            if let Err(err) = self.store.save_port(&port).await {
                warn!("Failed to save port for sector {}: {err}", port.sector_index);
            }
        }

        self.sector_saved = true;
        self.port_published = false;

        let info = SectorInfo::from_sector(&self.current_sector, has_port);
        self.events.sector_updated(&info);
        self.events
            .trader_data_updated(self.current_sector.index, &self.current_sector.traders);

        // A fully displayed sector is where the ship is, unless the
        // display arrived through a probe
        if !self.probe_active {
            self.set_current_sector(self.current_sector.index).await;
        }
    }

    /// Saves a port outside the sector block flow (commerce reports and
    /// CIM rows), publishing the first update after a sector commit
    pub(crate) async fn commit_port(&mut self, port: &PortData) {
        if let Err(err) = self.store.save_port(port).await {
            warn!("Failed to save port for sector {}: {err}", port.sector_index);
            return;
        }
        if !self.port_published {
            self.port_published = true;
            self.events.port_updated(&PortInfo::from_port(port));
        }
    }

    fn reset_sector_staging(&mut self) {
        self.current_sector = SectorData::new(0);
        self.staged_port = None;
        self.current_trader = None;
        self.sector_saved = false;
        self.sector_position = SectorPosition::Normal;
    }

    /// Pushes a staged two-line trader into the sector list
    pub(crate) fn flush_trader(&mut self) {
        if let Some(trader) = self.current_trader.take() {
            self.current_sector.traders.push(trader);
        }
    }
}

/// Compares a fixed column slice of the line against the expected
/// text, false when the line is too short
fn slice_eq(line: &str, start: usize, end: usize, expected: &str) -> bool {
    line.get(start..end)
        .map(|slice| slice == expected)
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::GameParser;
    use crate::database::connect_in_memory;
    use crate::database::entities::ExploredLevel;
    use crate::game::state::GameState;
    use crate::game::store::GameStore;
    use crate::services::events::{EventPublisher, ProxyListener, SectorInfo};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingListener {
        current_sectors: Mutex<Vec<SectorInfo>>,
        ports: Mutex<Vec<i32>>,
    }

    impl ProxyListener for RecordingListener {
        fn on_current_sector_changed(&self, sector: &SectorInfo) {
            self.current_sectors.lock().push(sector.clone());
        }

        fn on_port_updated(&self, port: &crate::services::events::PortInfo) {
            self.ports.lock().push(port.sector);
        }
    }

    async fn parser() -> (GameParser, GameStore, Arc<RecordingListener>) {
        let store = GameStore::new(connect_in_memory().await.unwrap());
        let listener = Arc::new(RecordingListener::default());
        let events = EventPublisher::new(listener.clone(), Duration::ZERO);
        let parser = GameParser::new(store.clone(), events, Arc::new(GameState::default()));
        (parser, store, listener)
    }

    #[tokio::test]
    async fn test_sector_block_commit() {
        let (mut parser, store, listener) = parser().await;

        parser
            .process_chunk(
                "Sector  : 123 in Sol\nBeacon  : FedSpace\nNavHaz  : 5%\nWarps to Sector(s) :  (2) - (3) - (4)\n",
            )
            .await;

        let sector = store.load_sector(123).await.unwrap().unwrap();
        assert_eq!(sector.constellation, "Sol");
        assert_eq!(sector.beacon, "FedSpace");
        assert_eq!(sector.nav_haz, 5);
        assert_eq!(sector.warp, [2, 3, 4, 0, 0, 0]);
        assert_eq!(sector.warps, 3);
        assert_eq!(sector.explored, ExploredLevel::Holo);

        let events = listener.current_sectors.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].number, 123);
        assert!(events[0].visited);
        assert_eq!(events[0].warps, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_duplicate_commit_suppressed() {
        let (mut parser, store, _listener) = parser().await;

        parser
            .process_chunk("Sector  : 9 in The Void\nWarps to Sector(s) :  (1)\n")
            .await;
        // The prompt would commit again were the block not marked saved
        parser
            .process_chunk("Command [TL=00:10:00]:[9] (?=Help)? : \n")
            .await;

        let sector = store.load_sector(9).await.unwrap().unwrap();
        assert_eq!(sector.warps, 1);
    }

    #[tokio::test]
    async fn test_port_class_derived_from_commerce_report() {
        let (mut parser, store, listener) = parser().await;

        parser
            .process_chunk(
                "Sector  : 321 in Sol\nPorts   : Sol, Class 0 (Special) BBB\nWarps to Sector(s) :  (2)\n",
            )
            .await;

        let port = store.load_port(321).await.unwrap().unwrap();
        assert_eq!(port.name, "Sol");
        assert!(port.products.iter().all(|product| product.buying));

        parser
            .process_chunk(
                "Docking...\nCommerce report for Sol: 12:30:00 PM\nFuel Ore    Buying        100     100%\nOrganics    Buying         50     100%\nEquipment   Buying         25     100%\n",
            )
            .await;

        let port = store.load_port(321).await.unwrap().unwrap();
        assert_eq!(port.class_index, 8);
        assert_eq!(port.products[0].amount, 100);
        assert_eq!(port.products[2].amount, 25);
        assert!(listener.ports.lock().contains(&321));
    }

    #[tokio::test]
    async fn test_density_only_sector() {
        let (mut parser, store, _listener) = parser().await;

        let header = format!("{:26}Relative Density Scan\n", "");
        parser.process_chunk(&header).await;
        parser
            .process_chunk("Sector (42) :    1,200  (3 warps)  5% Navhaz  Anomaly: Yes\n")
            .await;

        let sector = store.load_sector(42).await.unwrap().unwrap();
        assert_eq!(sector.density, 1200);
        assert_eq!(sector.warps, 3);
        assert_eq!(sector.nav_haz, 5);
        assert!(sector.anomaly);
        assert_eq!(sector.warp, [0; 6]);
        assert_eq!(sector.explored, ExploredLevel::Density);
        assert_eq!(sector.constellation, "??? (Density only)");
    }

    #[tokio::test]
    async fn test_warp_lane_split_across_chunks() {
        let (mut parser, store, _listener) = parser().await;

        parser
            .process_chunk("The shortest path (2 hops, 2 turns) from sector 1 to sector 3 is:\n")
            .await;
        parser.process_chunk("1 > 2 ").await;
        parser.process_chunk("> 3\n").await;

        let first = store.load_sector(1).await.unwrap().unwrap();
        assert_eq!(first.warp[0], 2);
        let second = store.load_sector(2).await.unwrap().unwrap();
        assert_eq!(second.warp, [1, 3, 0, 0, 0, 0]);
        let third = store.load_sector(3).await.unwrap().unwrap();
        assert_eq!(third.warp[0], 2);
    }

    #[tokio::test]
    async fn test_warp_lane_carries_across_lines() {
        let (mut parser, store, _listener) = parser().await;

        parser.process_chunk("  TO > 99\n").await;
        parser.process_chunk("5 > 6 >\n").await;
        parser.process_chunk("7\n").await;

        let second = store.load_sector(6).await.unwrap().unwrap();
        assert_eq!(second.warp, [5, 7, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_prompt_without_newline_mines_sector() {
        let (mut parser, _store, listener) = parser().await;

        parser
            .process_chunk("Command [TL=00:10:00]:[55] (?=Help)? : ")
            .await;

        let events = listener.current_sectors.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].number, 55);
        // Never visited, so the view reports an unexplored sector
        assert!(!events[0].visited);
    }

    #[tokio::test]
    async fn test_fighter_clear_on_report() {
        let (mut parser, store, _listener) = parser().await;

        parser
            .process_chunk("Sector  : 8 in Uncharted\nFighters: 2,500 (yours) [Defensive]\nWarps to Sector(s) :  (1)\n")
            .await;
        assert_eq!(store.load_sector(8).await.unwrap().unwrap().figs.quantity, 2500);

        parser.process_chunk("No fighters deployed\n").await;
        assert_eq!(store.load_sector(8).await.unwrap().unwrap().figs.quantity, 0);
    }

    #[tokio::test]
    async fn test_port_cim_rows() {
        let (mut parser, store, _listener) = parser().await;

        parser.process_chunk("Computer Information Matrix\n").await;
        parser
            .process_chunk(" 938   - 2,200 100%    1,845  90%   - 1,990  80%\n")
            .await;

        let port = store.load_port(938).await.unwrap().unwrap();
        assert!(port.products[0].buying);
        assert_eq!(port.products[0].amount, 2200);
        assert!(!port.products[1].buying);
        assert_eq!(port.products[1].percent, 90);
        assert!(port.products[2].buying);

        let sector = store.load_sector(938).await.unwrap().unwrap();
        assert_eq!(sector.explored, ExploredLevel::Calc);
        assert_eq!(sector.constellation, "??? (port data/calc only)");
    }

    #[tokio::test]
    async fn test_warp_cim_rows() {
        let (mut parser, store, _listener) = parser().await;

        parser.process_chunk("Computer Information Matrix\n").await;
        parser.process_chunk("   12     3   44  100\n").await;

        let sector = store.load_sector(12).await.unwrap().unwrap();
        assert_eq!(sector.warp, [3, 44, 100, 0, 0, 0]);
        assert_eq!(sector.warps, 3);
    }

    #[tokio::test]
    async fn test_fig_scan_updates_owners() {
        let (mut parser, store, _listener) = parser().await;

        let header = format!("{:17}Deployed  Fighter  Scan\n", "");
        parser.process_chunk(&header).await;
        parser.process_chunk("Your Personal fighters:\n").await;
        parser.process_chunk("  204        2,500      Defensive\n").await;

        let sector = store.load_sector(204).await.unwrap().unwrap();
        assert_eq!(sector.figs.quantity, 2500);
        assert_eq!(sector.figs.owner, "yours");
    }

    #[tokio::test]
    async fn test_radio_transmission_recorded() {
        let (mut parser, store, _listener) = parser().await;

        parser
            .process_chunk("Incoming transmission from Gypsy on channel 90210:\n")
            .await;
        parser.process_chunk("Meet me at the stardock\n").await;

        let messages = store.recent_messages(5).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, "Gypsy");
        assert_eq!(messages[0].channel, "90210");
        assert_eq!(messages[0].content, "Meet me at the stardock");
    }

    #[tokio::test]
    async fn test_quick_stats_mined() {
        let (mut parser, store, _listener) = parser().await;

        parser
            .process_chunk("Sect 77│Turns 1,600│Creds 25,000│Figs 300│Shlds 150│Hlds 40│Ore 10│Org 5│Equ 5│Col 0│Ship 1 MerCru\n")
            .await;

        let stats = store.load_player_stats().await.unwrap().unwrap();
        assert_eq!(stats.turns, 1600);
        assert_eq!(stats.credits, 25000);
        assert_eq!(stats.current_sector, 77);
        assert_eq!(stats.empty_holds, 20);
        assert_eq!(stats.ship_class, "MerCru");
    }
}
