//! WebSocket Game Server
//!
//! Accepts WebSocket connections, runs the join handshake with a
//! timeout, and relays binary frames between each connection and the
//! game session task. Transport failures stay local to one connection
//! and never reach the tick loop.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::network::session::{self, GameCommand, SessionConfig, FRAME_BUFFER};
use crate::protocol::packets::JoinPacket;
use crate::protocol::{ClientPacket, PacketReader, MAX_POSITION};

/// Fallback display name for blank join requests.
const DEFAULT_NAME: &str = "Player";

/// Smallest usable world dimension; spawn margins need room on both
/// sides of every axis.
const MIN_WORLD_SIZE: u16 = 16;

/// Server configuration, loadable from a JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Milliseconds a connection may idle before sending its join.
    pub join_timeout_ms: u64,
    /// Simulation rate in ticks per second.
    pub tick_rate: u32,
    /// World width in units.
    pub world_width: u16,
    /// World height in units.
    pub world_height: u16,
    /// Minimum live obstacle count.
    pub obstacle_floor: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().expect("static addr"),
            max_connections: 256,
            join_timeout_ms: 1000,
            tick_rate: 30,
            world_width: 128,
            world_height: 128,
            obstacle_floor: 16,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file. Missing fields take their
    /// defaults; out-of-range values are rejected.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GameServerError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration against the protocol and spawn limits.
    pub fn validate(&self) -> Result<(), GameServerError> {
        if self.tick_rate == 0 {
            return Err(GameServerError::InvalidConfig(
                "tick_rate must be at least 1".to_string(),
            ));
        }
        let dims = [
            (self.world_width, "world_width"),
            (self.world_height, "world_height"),
        ];
        for (dim, name) in dims {
            if dim < MIN_WORLD_SIZE {
                return Err(GameServerError::InvalidConfig(format!(
                    "{name} must be at least {MIN_WORLD_SIZE}"
                )));
            }
            if dim as f32 > MAX_POSITION {
                return Err(GameServerError::InvalidConfig(format!(
                    "{name} exceeds the encodable position range of {MAX_POSITION}"
                )));
            }
        }
        Ok(())
    }

    /// Join handshake deadline.
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            tick_rate: self.tick_rate,
            world_width: self.world_width,
            world_height: self.world_height,
            obstacle_floor: self.obstacle_floor,
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind or read from the network.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Bad configuration file.
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration value outside its usable range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// The game server: one listener, one game session.
pub struct GameServer {
    config: ServerConfig,
    connections: Arc<AtomicUsize>,
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a server. Nothing binds until [`run`](Self::run).
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Bind and serve until shutdown.
    pub async fn run(&self) -> Result<(), GameServerError> {
        self.config.validate()?;
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("listening on {}", self.config.bind_addr);

        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let session_handle = tokio::spawn(session::run_session(
            self.config.session_config(),
            cmd_rx,
        ));

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.connections.load(Ordering::Relaxed) >= self.config.max_connections {
                                warn!(%addr, "connection limit reached, rejecting");
                                continue;
                            }
                            self.handle_connection(stream, addr, cmd_tx.clone());
                        }
                        Err(e) => error!("accept error: {e}"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        // Closing the command channel stops the session loop.
        drop(cmd_tx);
        let _ = session_handle.await;
        Ok(())
    }

    /// Signal the accept loop to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Active connection count.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr, cmd_tx: mpsc::Sender<GameCommand>) {
        let connections = self.connections.clone();
        let join_timeout = self.config.join_timeout();
        connections.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, addr, cmd_tx, join_timeout).await {
                debug!(%addr, "connection ended: {e}");
            }
            connections.fetch_sub(1, Ordering::Relaxed);
        });
    }
}

async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    cmd_tx: mpsc::Sender<GameCommand>,
    join_timeout: Duration,
) -> Result<(), GameServerError> {
    let ws = accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws.split();
    debug!(%addr, "websocket open");

    // A connection that never joins within the window is closed.
    let join = match tokio::time::timeout(join_timeout, read_join(&mut ws_rx, addr)).await {
        Ok(Some(join)) => join,
        Ok(None) => {
            debug!(%addr, "closed before joining");
            return Ok(());
        }
        Err(_) => {
            info!(%addr, "join timeout, closing");
            let _ = ws_tx.send(Message::Close(None)).await;
            return Ok(());
        }
    };

    let name = if join.name.trim().is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        join.name
    };

    let (frame_tx, mut frame_rx) = mpsc::channel::<Vec<u8>>(FRAME_BUFFER);
    let (reply_tx, reply_rx) = oneshot::channel();
    if cmd_tx
        .send(GameCommand::Join {
            name,
            class: join.class,
            frames: frame_tx,
            reply: reply_tx,
        })
        .await
        .is_err()
    {
        return Ok(());
    }
    let player = match reply_rx.await {
        Ok(Some(id)) => id,
        _ => {
            warn!(%addr, "join rejected");
            let _ = ws_tx.send(Message::Close(None)).await;
            return Ok(());
        }
    };
    info!(%addr, %player, "joined");

    // Outbound pump: one binary websocket message per tick frame. The
    // channel closing (death or backpressure kick) ends the task.
    let send_task = tokio::spawn(async move {
        while let Some(bytes) = frame_rx.recv().await {
            if ws_tx.send(Message::Binary(bytes)).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    // Inbound: decode every packet in each binary frame. A malformed
    // message is dropped; the connection stays open.
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Binary(data)) => {
                let mut reader = PacketReader::new(&data);
                while let Some(packet) = reader.next_client_packet() {
                    match packet {
                        Ok(ClientPacket::Input(input)) => {
                            if cmd_tx
                                .send(GameCommand::Input { player, input })
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                        Ok(ClientPacket::Join(_)) => {
                            debug!(%addr, "duplicate join ignored");
                        }
                        Err(e) => {
                            warn!(%addr, error = %e, "dropping malformed message");
                            break;
                        }
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(%addr, "websocket error: {e}");
                break;
            }
        }
    }

    let _ = cmd_tx.send(GameCommand::Leave { player }).await;
    send_task.abort();
    debug!(%addr, %player, "connection cleaned up");
    Ok(())
}

/// Wait for the first decodable join packet. Anything else received
/// before it is dropped.
async fn read_join(
    ws_rx: &mut SplitStream<WebSocketStream<TcpStream>>,
    addr: SocketAddr,
) -> Option<JoinPacket> {
    while let Some(msg) = ws_rx.next().await {
        let data = match msg {
            Ok(Message::Binary(data)) => data,
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        };
        let mut reader = PacketReader::new(&data);
        while let Some(packet) = reader.next_client_packet() {
            match packet {
                Ok(ClientPacket::Join(join)) => return Some(join),
                Ok(other) => debug!(%addr, "ignoring pre-join packet: {other:?}"),
                Err(e) => {
                    warn!(%addr, error = %e, "dropping malformed pre-join message");
                    break;
                }
            }
        }
    }
    None
}
