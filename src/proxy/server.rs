//! TCP front end. A terminal client connects locally; the proxy opens
//! the matching connection to the game server and shuttles bytes
//! through the pipeline. One client session is served at a time.

use super::pipeline::{Pipeline, PipelineCommand};
use super::telnet::TelnetFilter;
use super::ProxyHandle;
use crate::config::Config;
use crate::game::state::GameState;
use crate::game::store::GameStore;
use crate::parser::GameParser;
use crate::script::engine::ScriptEngine;
use crate::services::events::{
    ConnectionStatus, DatabaseStateInfo, EventPublisher, PortInfo, ProxyListener,
    ScriptStatusInfo, SectorInfo,
};
use bytes::Bytes;
use futures_util::StreamExt;
use log::{error, info};
use parking_lot::Mutex;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{BytesCodec, FramedRead};

/// Decoded output sink for the currently attached terminal client
#[derive(Default)]
pub struct TerminalSink {
    client: Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
}

impl TerminalSink {
    fn attach(&self, sender: mpsc::UnboundedSender<Bytes>) {
        *self.client.lock() = Some(sender);
    }

    fn detach(&self) {
        *self.client.lock() = None;
    }

    fn send(&self, bytes: Bytes) {
        if let Some(client) = self.client.lock().as_ref() {
            let _ = client.send(bytes);
        }
    }
}

/// Listener wrapper forwarding decoded output to the attached terminal
/// while delegating every event to the embedding UI
struct TerminalListener {
    sink: Arc<TerminalSink>,
    inner: Arc<dyn ProxyListener>,
}

impl ProxyListener for TerminalListener {
    fn on_connection_status_changed(&self, status: ConnectionStatus, address: &str) {
        self.inner.on_connection_status_changed(status, address);
    }

    fn on_connection_error(&self, error: &str) {
        self.inner.on_connection_error(error);
    }

    fn on_data(&self, bytes: &[u8]) {
        self.sink.send(Bytes::copy_from_slice(bytes));
        self.inner.on_data(bytes);
    }

    fn on_script_status_changed(&self, status: &ScriptStatusInfo) {
        self.inner.on_script_status_changed(status);
    }

    fn on_script_error(&self, name: &str, error: &str) {
        self.inner.on_script_error(name, error);
    }

    fn on_database_state_changed(&self, state: &DatabaseStateInfo) {
        self.inner.on_database_state_changed(state);
    }

    fn on_current_sector_changed(&self, sector: &SectorInfo) {
        self.inner.on_current_sector_changed(sector);
    }

    fn on_sector_updated(&self, sector: &SectorInfo) {
        self.inner.on_sector_updated(sector);
    }

    fn on_port_updated(&self, port: &PortInfo) {
        self.inner.on_port_updated(port);
    }

    fn on_trader_data_updated(&self, sector: i32, traders: &[crate::game::models::Trader]) {
        self.inner.on_trader_data_updated(sector, traders);
    }

    fn on_player_stats_updated(&self, stats: &crate::database::entities::PlayerStatsRow) {
        self.inner.on_player_stats_updated(stats);
    }
}

/// Starts the proxy: the pipeline consumer, the outbound writer router
/// and the client accept loop. Returns the API handle.
pub async fn serve(
    config: Arc<Config>,
    store: GameStore,
    ui: Arc<dyn ProxyListener>,
) -> io::Result<ProxyHandle> {
    let sink = Arc::new(TerminalSink::default());
    let listener_wrapper: Arc<dyn ProxyListener> = Arc::new(TerminalListener {
        sink: sink.clone(),
        inner: ui,
    });
    let events = EventPublisher::new(
        listener_wrapper,
        Duration::from_millis(config.event_debounce_ms),
    );
    let game_state = Arc::new(GameState::default());
    let connected = Arc::new(AtomicBool::new(false));

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (writer_tx, writer_rx) = mpsc::unbounded_channel::<Bytes>();

    // The writer router forwards outbound bytes to whichever game
    // server connection is current
    let server_writer: Arc<tokio::sync::Mutex<Option<tokio::net::tcp::OwnedWriteHalf>>> =
        Arc::new(tokio::sync::Mutex::new(None));
    tokio::spawn(route_outbound(writer_rx, server_writer.clone()));

    let parser = GameParser::new(store.clone(), events.clone(), game_state.clone());
    let engine = ScriptEngine::new(
        store.clone(),
        events.clone(),
        game_state.clone(),
        writer_tx.clone(),
        PathBuf::from(&config.script_dir),
    );

    let pipeline = Pipeline::new();
    {
        let pipeline = pipeline.clone();
        let events = events.clone();
        let writer_tx = writer_tx.clone();
        tokio::spawn(async move {
            pipeline
                .run(parser, engine, events, writer_tx, commands_rx)
                .await;
        });
    }

    events.database_state(&DatabaseStateInfo {
        game_name: config.server.game_name.clone(),
        server_host: config.server.host.clone(),
        server_port: config.server.port,
        database_name: config.database_file.clone(),
        is_loaded: true,
    });

    let listen_addr = format!("{}:{}", config.listen_host, config.listen_port);
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening for terminal clients on {listen_addr}");

    let handle = ProxyHandle::new(commands_tx.clone(), store, game_state, connected.clone());

    tokio::spawn(accept_loop(
        listener,
        config,
        pipeline,
        events,
        sink,
        server_writer,
        commands_tx,
        connected,
    ));

    Ok(handle)
}

/// Writes queued outbound bytes to the current game server connection,
/// dropping them while disconnected
async fn route_outbound(
    mut writer_rx: mpsc::UnboundedReceiver<Bytes>,
    server_writer: Arc<tokio::sync::Mutex<Option<tokio::net::tcp::OwnedWriteHalf>>>,
) {
    while let Some(bytes) = writer_rx.recv().await {
        let mut guard = server_writer.lock().await;
        if let Some(writer) = guard.as_mut() {
            if writer.write_all(&bytes).await.is_err() {
                *guard = None;
            }
        }
    }
}

/// Serves one terminal client at a time, the way a local proxy is used
#[allow(clippy::too_many_arguments)]
async fn accept_loop(
    listener: TcpListener,
    config: Arc<Config>,
    pipeline: Pipeline,
    events: EventPublisher,
    sink: Arc<TerminalSink>,
    server_writer: Arc<tokio::sync::Mutex<Option<tokio::net::tcp::OwnedWriteHalf>>>,
    commands: mpsc::UnboundedSender<PipelineCommand>,
    connected: Arc<AtomicBool>,
) {
    loop {
        let (client, addr) = match listener.accept().await {
            Ok(value) => value,
            Err(err) => {
                error!("Failed to accept terminal client: {err}");
                continue;
            }
        };
        info!("Terminal client connected from {addr}");

        if let Err(err) = handle_session(
            client,
            &config,
            &pipeline,
            &events,
            &sink,
            &server_writer,
            &commands,
            &connected,
        )
        .await
        {
            error!("Session ended with error: {err}");
        }

        sink.detach();
        *server_writer.lock().await = None;
        connected.store(false, Ordering::Release);
        let address = format!("{}:{}", config.server.host, config.server.port);
        events.connection_status(ConnectionStatus::Disconnected, &address);
        let _ = commands.send(PipelineCommand::FireEvent("DISCONNECT".to_string()));
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_session(
    client: TcpStream,
    config: &Arc<Config>,
    pipeline: &Pipeline,
    events: &EventPublisher,
    sink: &Arc<TerminalSink>,
    server_writer: &Arc<tokio::sync::Mutex<Option<tokio::net::tcp::OwnedWriteHalf>>>,
    commands: &mpsc::UnboundedSender<PipelineCommand>,
    connected: &Arc<AtomicBool>,
) -> io::Result<()> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    events.connection_status(ConnectionStatus::Connecting, &address);

    let server = match TcpStream::connect(&address).await {
        Ok(server) => server,
        Err(err) => {
            events.connection_error(&format!("Unable to reach {address}: {err}"));
            events.connection_status(ConnectionStatus::Disconnected, &address);
            return Err(err);
        }
    };
    info!("Connected to game server at {address}");

    let (server_read, mut server_write) = server.into_split();
    // Announce our telnet options before any game data flows
    if let Err(err) = server_write.write_all(&TelnetFilter::hello()).await {
        events.connection_error(&format!("Failed negotiating with {address}: {err}"));
        return Err(err);
    }
    *server_writer.lock().await = Some(server_write);
    connected.store(true, Ordering::Release);
    events.connection_status(ConnectionStatus::Connected, &address);
    let _ = commands.send(PipelineCommand::FireEvent("CONNECT".to_string()));

    // Decoded output for the terminal
    let (client_tx, mut client_rx) = mpsc::unbounded_channel::<Bytes>();
    sink.attach(client_tx);

    let (mut client_read, mut client_write) = client.into_split();

    let client_writer = tokio::spawn(async move {
        while let Some(bytes) = client_rx.recv().await {
            if client_write.write_all(&bytes).await.is_err() {
                break;
            }
        }
    });

    // Game server bytes feed the pipeline; the reader never blocks on
    // the consumer
    let reader_pipeline = pipeline.clone();
    let mut server_frames = FramedRead::new(server_read, BytesCodec::new());
    let mut server_reader = tokio::spawn(async move {
        while let Some(Ok(frame)) = server_frames.next().await {
            reader_pipeline.write(frame.freeze());
        }
    });

    // Terminal input goes through the consumer so scripts observe it;
    // the session ends when either side hangs up
    let mut buffer = [0u8; 1024];
    loop {
        tokio::select! {
            read = client_read.read(&mut buffer) => {
                match read {
                    Ok(0) | Err(_) => break,
                    Ok(count) => {
                        let _ = commands.send(PipelineCommand::SendData(
                            Bytes::copy_from_slice(&buffer[..count]),
                        ));
                    }
                }
            }
            _ = &mut server_reader => break,
        }
    }

    server_reader.abort();
    client_writer.abort();
    Ok(())
}
