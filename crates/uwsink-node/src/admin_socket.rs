//! Unix socket server for admin commands.
//!
//! Provides a local IPC interface for driving a running sink: periodic
//! traffic, statistics, tracing and priority.

use crate::error::Result;
use crate::node::SinkHandle;
use crate::packet::Priority;
use crate::sink::{InvalidPacket, StatsSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Admin command sent over the socket.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Start periodic traffic
    Start,
    /// Stop periodic traffic
    Stop,
    /// Report statistics
    Stats,
    /// Zero the reception statistics
    ResetStats,
    /// Open a trace file
    SetTrace {
        suffix: String,
        #[serde(default)]
        precision: Option<usize>,
    },
    /// List recently dropped invalid packets
    ListInvalid,
    /// Send one packet now
    SendPacket {
        #[serde(default)]
        priority: Option<Priority>,
    },
    /// Change the default priority
    SetPriority { priority: Priority },
    /// Ping (health check)
    Ping,
}

/// Response from admin command.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdminResponse {
    Ok { message: String },
    Error { error: String },
    Stats { stats: StatsSnapshot },
    Invalid { packets: Vec<InvalidPacket> },
    Pong,
}

/// Admin socket server.
pub struct AdminSocket {
    handle: Arc<SinkHandle>,
    socket_path: String,
}

impl AdminSocket {
    /// Create a new admin socket server.
    pub fn new(handle: Arc<SinkHandle>, socket_path: &str) -> Self {
        Self {
            handle,
            socket_path: socket_path.to_string(),
        }
    }

    /// Run the admin socket server.
    pub async fn run(&self) -> Result<()> {
        // Remove existing socket file if present
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Admin socket listening on {}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let handle = Arc::clone(&self.handle);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, handle).await {
                            tracing::error!("Admin connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept admin connection: {}", e);
                }
            }
        }
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }
}

async fn handle_connection(stream: UnixStream, handle: Arc<SinkHandle>) -> Result<()> {
    let (reader, writer) = stream.into_split();
    serve_lines(reader, writer, &handle).await
}

/// Answer newline-delimited JSON commands until the reader is exhausted.
async fn serve_lines<R, W>(reader: R, mut writer: W, handle: &Arc<SinkHandle>) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<AdminCommand>(&line) {
            Ok(cmd) => execute_command(cmd, handle).await,
            Err(e) => AdminResponse::Error {
                error: format!("Invalid command: {}", e),
            },
        };

        let response_json = serde_json::to_string(&response)? + "\n";
        writer.write_all(response_json.as_bytes()).await?;
        line.clear();
    }

    Ok(())
}

/// Run one command against the sink.
pub async fn execute_command(cmd: AdminCommand, handle: &Arc<SinkHandle>) -> AdminResponse {
    match cmd {
        AdminCommand::Start => {
            handle.start().await;
            tracing::info!("Periodic traffic started via admin socket");
            AdminResponse::Ok {
                message: "Periodic traffic started".to_string(),
            }
        }
        AdminCommand::Stop => {
            let message = if handle.stop().await {
                "Periodic traffic stopped"
            } else {
                "Periodic traffic was not running"
            };
            AdminResponse::Ok {
                message: message.to_string(),
            }
        }
        AdminCommand::Stats => AdminResponse::Stats {
            stats: handle.sink().lock().await.snapshot(),
        },
        AdminCommand::ResetStats => {
            handle.sink().lock().await.reset_stats();
            AdminResponse::Ok {
                message: "Statistics reset".to_string(),
            }
        }
        AdminCommand::SetTrace { suffix, precision } => {
            match handle.sink().lock().await.set_trace(&suffix, precision) {
                Ok(true) => AdminResponse::Ok {
                    message: format!("Tracing to {}", crate::tracer::trace_file_name(&suffix)),
                },
                Ok(false) => AdminResponse::Error {
                    error: "Tracing is disabled (start the node with UWSINK_TRACE=true)".to_string(),
                },
                Err(e) => AdminResponse::Error {
                    error: e.to_string(),
                },
            }
        }
        AdminCommand::ListInvalid => AdminResponse::Invalid {
            packets: handle.sink().lock().await.invalid_packets(),
        },
        AdminCommand::SendPacket { priority } => {
            let packet = handle.send_packet(priority).await;
            AdminResponse::Ok {
                message: format!("Sent packet {} (seq {})", packet.uid, packet.seq),
            }
        }
        AdminCommand::SetPriority { priority } => {
            handle.sink().lock().await.set_priority(priority);
            AdminResponse::Ok {
                message: format!("Priority set to {:?}", priority),
            }
        }
        AdminCommand::Ping => AdminResponse::Pong,
    }
}
