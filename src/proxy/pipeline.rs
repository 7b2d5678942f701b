//! Streaming pipeline: a bounded single-producer/single-consumer chunk
//! queue and the consumer loop ordering telnet filtering, trigger
//! pre-pass, decoding, parsing and UI forwarding. Script execution and
//! proxy API commands are serviced on the same task so the VM and its
//! variable store stay thread confined.

use super::encoding;
use super::telnet::TelnetFilter;
use crate::parser::GameParser;
use crate::script::engine::ScriptEngine;
use crate::script::ScriptResult;
use crate::services::events::{EventPublisher, ScriptStatusInfo};
use crate::utils::parsing::strip_ansi;
use bytes::Bytes;
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Notify};

/// Most chunks the queue holds before the oldest is dropped
const QUEUE_CAPACITY: usize = 100;

/// How often delay triggers are swept
const SWEEP_INTERVAL: Duration = Duration::from_millis(250);

/// Bounded chunk queue with drop-oldest overflow. The network reader
/// must never block on a slow consumer.
#[derive(Default)]
pub struct ChunkQueue {
    chunks: Mutex<VecDeque<Bytes>>,
    notify: Notify,
    dropped: AtomicU64,
}

impl ChunkQueue {
    pub fn push(&self, chunk: Bytes) {
        {
            let mut chunks = self.chunks.lock();
            if chunks.len() >= QUEUE_CAPACITY {
                chunks.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            chunks.push_back(chunk);
        }
        self.notify.notify_one();
    }

    pub async fn pop(&self) -> Bytes {
        loop {
            if let Some(chunk) = self.chunks.lock().pop_front() {
                return chunk;
            }
            self.notify.notified().await;
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Commands the proxy API sends onto the consumer task
pub enum PipelineCommand {
    /// Outbound user input headed for the game server
    SendData(Bytes),
    LoadScript {
        path: String,
        reply: oneshot::Sender<ScriptResult<()>>,
    },
    StopAllScripts {
        reply: oneshot::Sender<()>,
    },
    ResumeScript(Option<String>),
    ScriptStatus {
        reply: oneshot::Sender<ScriptStatusInfo>,
    },
    FireEvent(String),
    /// Stop the consumer after draining in-flight work
    Shutdown,
}

/// Producer-facing half of the pipeline
#[derive(Clone)]
pub struct Pipeline {
    queue: Arc<ChunkQueue>,
    pub bytes_processed: Arc<AtomicU64>,
    pub chunks_processed: Arc<AtomicU64>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(ChunkQueue::default()),
            bytes_processed: Arc::new(AtomicU64::new(0)),
            chunks_processed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Called from the network reader; never blocks
    pub fn write(&self, chunk: Bytes) {
        self.queue.push(chunk);
    }

    pub fn dropped_chunks(&self) -> u64 {
        self.queue.dropped()
    }

    /// Runs the consumer loop until shutdown. Owns the telnet filter,
    /// parser and script engine for the connection.
    pub async fn run(
        &self,
        mut parser: GameParser,
        mut engine: ScriptEngine,
        events: EventPublisher,
        writer: mpsc::UnboundedSender<Bytes>,
        mut commands: mpsc::UnboundedReceiver<PipelineCommand>,
    ) {
        let mut filter = TelnetFilter::new();
        let mut sweep = tokio::time::interval(SWEEP_INTERVAL);

        loop {
            tokio::select! {
                chunk = self.queue.pop() => {
                    self.process_chunk(
                        chunk,
                        &mut filter,
                        &mut parser,
                        &mut engine,
                        &events,
                        &writer,
                    )
                    .await;
                }
                command = commands.recv() => {
                    match command {
                        Some(command) => {
                            if self
                                .handle_command(command, &mut engine, &writer)
                                .await
                            {
                                break;
                            }
                        }
                        // All senders gone: cooperative stop
                        None => break,
                    }
                }
                _ = sweep.tick() => {
                    engine.sweep_delay_triggers().await;
                }
            }
        }

        // Drain whatever is already queued before stopping
        loop {
            let chunk = self.queue.chunks.lock().pop_front();
            match chunk {
                Some(chunk) => {
                    self.process_chunk(chunk, &mut filter, &mut parser, &mut engine, &events, &writer)
                        .await;
                }
                None => break,
            }
        }

        info!(
            "Pipeline stopped ({} chunks, {} bytes, {} dropped)",
            self.chunks_processed.load(Ordering::Relaxed),
            self.bytes_processed.load(Ordering::Relaxed),
            self.queue.dropped()
        );
    }

    async fn process_chunk(
        &self,
        chunk: Bytes,
        filter: &mut TelnetFilter,
        parser: &mut GameParser,
        engine: &mut ScriptEngine,
        events: &EventPublisher,
        writer: &mpsc::UnboundedSender<Bytes>,
    ) {
        self.chunks_processed.fetch_add(1, Ordering::Relaxed);
        self.bytes_processed
            .fetch_add(chunk.len() as u64, Ordering::Relaxed);

        let output = filter.process(&chunk);
        if !output.responses.is_empty() {
            let _ = writer.send(output.responses);
        }
        if output.payload.is_empty() {
            return;
        }

        // Chunk-scoped triggers observe the text before decoding, ANSI
        // intact
        let raw_text: String = output.payload.iter().map(|byte| *byte as char).collect();
        engine.process_text(&raw_text).await;

        let decoded = encoding::decode(&output.payload);

        // Line triggers run ahead of the parser for each completed line
        for raw_line in parser.take_lines(&decoded) {
            let stripped = strip_ansi(&raw_line);
            engine.process_line(&stripped, &raw_line).await;
            parser.process_line(&raw_line).await;
        }

        events.data(decoded.as_bytes());
    }

    /// Returns true when the loop should stop
    async fn handle_command(
        &self,
        command: PipelineCommand,
        engine: &mut ScriptEngine,
        writer: &mpsc::UnboundedSender<Bytes>,
    ) -> bool {
        match command {
            PipelineCommand::SendData(bytes) => {
                let text: String = bytes.iter().map(|byte| *byte as char).collect();
                // A script blocked on getInput consumes the line whole
                if engine.handle_user_input(text.trim_end_matches(['\r', '\n'])).await {
                    return false;
                }
                engine.process_text_out(&text).await;
                let _ = writer.send(bytes);
            }
            PipelineCommand::LoadScript { path, reply } => {
                let result = engine.load_script(&path, false).await.map(|_| ());
                let _ = reply.send(result);
            }
            PipelineCommand::StopAllScripts { reply } => {
                engine.stop_all(false).await;
                let _ = reply.send(());
            }
            PipelineCommand::ResumeScript(name) => {
                engine.resume(name.as_deref()).await;
            }
            PipelineCommand::ScriptStatus { reply } => {
                let _ = reply.send(engine.status());
            }
            PipelineCommand::FireEvent(event) => {
                engine.fire_event(&event).await;
            }
            PipelineCommand::Shutdown => {
                debug!("Pipeline shutdown requested");
                return true;
            }
        }
        false
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::{ChunkQueue, QUEUE_CAPACITY};
    use bytes::Bytes;

    #[tokio::test]
    async fn test_queue_orders_chunks() {
        let queue = ChunkQueue::default();
        queue.push(Bytes::from_static(b"a"));
        queue.push(Bytes::from_static(b"b"));
        assert_eq!(queue.pop().await, Bytes::from_static(b"a"));
        assert_eq!(queue.pop().await, Bytes::from_static(b"b"));
    }

    #[tokio::test]
    async fn test_queue_drops_oldest_on_overflow() {
        let queue = ChunkQueue::default();
        for index in 0..(QUEUE_CAPACITY + 5) {
            queue.push(Bytes::from(index.to_string()));
        }
        assert_eq!(queue.dropped(), 5);
        // The oldest five are gone
        assert_eq!(queue.pop().await, Bytes::from("5"));
    }
}
