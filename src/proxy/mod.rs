//! Proxy surface: the telnet data plane and the API handle the UI
//! drives it through.

pub mod encoding;
pub mod pipeline;
pub mod server;
pub mod telnet;

use crate::database::entities::PlayerStatsRow;
use crate::database::DbResult;
use crate::game::state::GameState;
use crate::game::store::GameStore;
use crate::script::{ScriptError, ScriptResult};
use crate::services::events::{PortInfo, ScriptStatusInfo, SectorInfo};
use crate::utils::types::SectorIndex;
use bytes::Bytes;
use self::pipeline::PipelineCommand;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Commands the UI issues to the proxy. Script and transport commands
/// are messages to the pipeline consumer; reads go straight to the
/// store.
#[derive(Clone)]
pub struct ProxyHandle {
    commands: mpsc::UnboundedSender<PipelineCommand>,
    store: GameStore,
    game_state: Arc<GameState>,
    connected: Arc<AtomicBool>,
}

impl ProxyHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<PipelineCommand>,
        store: GameStore,
        game_state: Arc<GameState>,
        connected: Arc<AtomicBool>,
    ) -> Self {
        Self {
            commands,
            store,
            game_state,
            connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Stops the pipeline; the server tears the sockets down when the
    /// consumer goes away
    pub fn disconnect(&self) {
        let _ = self.commands.send(PipelineCommand::Shutdown);
    }

    /// Sends raw bytes to the game server as if the user typed them
    pub fn send_data(&self, bytes: Bytes) {
        let _ = self.commands.send(PipelineCommand::SendData(bytes));
    }

    /// Loads and starts a script; compile errors come back directly
    pub async fn load_script(&self, path: &str) -> ScriptResult<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(PipelineCommand::LoadScript {
                path: path.to_string(),
                reply,
            })
            .map_err(|_| ScriptError::runtime("proxy is not running"))?;
        response
            .await
            .map_err(|_| ScriptError::runtime("proxy is not running"))?
    }

    pub async fn stop_all_scripts(&self) {
        let (reply, response) = oneshot::channel();
        if self
            .commands
            .send(PipelineCommand::StopAllScripts { reply })
            .is_ok()
        {
            let _ = response.await;
        }
    }

    /// Resumes a paused script (the PAUSE checkpoint consumer)
    pub fn resume_script(&self, name: Option<String>) {
        let _ = self.commands.send(PipelineCommand::ResumeScript(name));
    }

    pub async fn get_script_status(&self) -> Option<ScriptStatusInfo> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(PipelineCommand::ScriptStatus { reply })
            .ok()?;
        response.await.ok()
    }

    pub fn get_current_sector(&self) -> SectorIndex {
        self.game_state.current_sector()
    }

    pub async fn get_sector_info(&self, sector: SectorIndex) -> DbResult<Option<SectorInfo>> {
        let Some(data) = self.store.load_sector(sector).await? else {
            return Ok(None);
        };
        let has_port = self.store.load_port(sector).await?.is_some();
        Ok(Some(SectorInfo::from_sector(&data, has_port)))
    }

    pub async fn get_port_info(&self, sector: SectorIndex) -> DbResult<Option<PortInfo>> {
        let port = self.store.load_port(sector).await?;
        Ok(port.map(|port| PortInfo::from_port(&port)))
    }

    pub async fn get_player_stats(&self) -> DbResult<Option<PlayerStatsRow>> {
        self.store.load_player_stats().await
    }

    /// Player identity view; the stats row carries name, ship and
    /// location so it doubles as the info record
    pub async fn get_player_info(&self) -> DbResult<Option<PlayerStatsRow>> {
        self.store.load_player_stats().await
    }
}
