//! Connection supervision with exponential reconnect backoff
//!
//! The supervisor runs as a background task that owns the RPC session and
//! the voice state source. Commands arrive over a channel; observations and
//! connectivity transitions leave through an event channel.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::VoiceConfig;
use crate::error::{Result, VoiceError};
use crate::event::VoiceEvent;
use crate::rpc::{RpcConnector, RpcSession, VoiceRpc};
use crate::source::{SourceExit, VoiceStateSource};

/// Connectivity as seen by the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Not connected and not trying to
    Disconnected,
    /// Opening a session or waiting to retry
    Connecting,
    Connected,
    /// The reconnect budget ran out; waiting for an explicit connect
    Failed,
}

/// Commands sent from the handle to the supervisor task
#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    Shutdown,
}

/// Handle to the background supervisor task
pub struct ConnectionSupervisor {
    commands: mpsc::UnboundedSender<Command>,
    poll_interval: watch::Sender<Duration>,
    status: Arc<RwLock<ConnectionStatus>>,
    task: JoinHandle<()>,
}

impl ConnectionSupervisor {
    /// Spawn the supervisor task
    ///
    /// The task starts disconnected; call [`connect`](Self::connect) to open
    /// the first session. Must be called from within a tokio runtime.
    pub fn spawn(
        connector: Arc<dyn RpcConnector>,
        config: VoiceConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<VoiceEvent>)> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (interval_tx, interval_rx) = watch::channel(config.poll_interval);
        let status = Arc::new(RwLock::new(ConnectionStatus::Disconnected));

        let worker = SupervisorTask {
            connector,
            config,
            commands: command_rx,
            events: event_tx,
            poll_interval: interval_rx,
            status: Arc::clone(&status),
            connected: false,
        };
        let task = tokio::spawn(worker.run());

        Ok((
            Self {
                commands: command_tx,
                poll_interval: interval_tx,
                status,
                task,
            },
            event_rx,
        ))
    }

    /// Request a connection
    ///
    /// Resets the reconnect budget. A no-op while already connected.
    pub fn connect(&self) -> Result<()> {
        self.send(Command::Connect)
    }

    /// Close the current session and stop reconnecting
    pub fn disconnect(&self) -> Result<()> {
        self.send(Command::Disconnect)
    }

    /// Change the poll interval of the current and future sessions
    pub fn set_poll_interval(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(VoiceError::Configuration(
                "Poll interval must be greater than 0".to_string(),
            ));
        }
        self.poll_interval
            .send(interval)
            .map_err(|_| VoiceError::SupervisorStopped)
    }

    pub fn poll_interval(&self) -> Duration {
        *self.poll_interval.borrow()
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    /// Stop the supervisor, closing any open session
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            tracing::warn!("Connection supervisor task failed: {}", e);
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| VoiceError::SupervisorStopped)
    }
}

/// What the supervisor does after a connection cycle ends
enum Flow {
    /// Wait for the next command
    Idle,
    Shutdown,
}

/// Why a live session ended
enum SessionExit {
    Lost(Option<String>),
    Disconnect,
    Shutdown,
}

/// How a connect attempt ended
enum Attempt {
    Finished(rpc_client::Result<RpcSession>),
    Disconnect,
    Shutdown,
}

/// What interrupted a reconnect delay
enum Wake {
    Elapsed,
    Connect,
    Disconnect,
    Shutdown,
}

struct SupervisorTask {
    connector: Arc<dyn RpcConnector>,
    config: VoiceConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<VoiceEvent>,
    poll_interval: watch::Receiver<Duration>,
    status: Arc<RwLock<ConnectionStatus>>,
    connected: bool,
}

impl SupervisorTask {
    async fn run(mut self) {
        tracing::debug!("Connection supervisor started");

        loop {
            match self.commands.recv().await {
                Some(Command::Connect) => {}
                Some(Command::Disconnect) => {
                    self.set_status(ConnectionStatus::Disconnected);
                    continue;
                }
                Some(Command::Shutdown) | None => break,
            }

            if let Flow::Shutdown = self.maintain().await {
                break;
            }
        }

        self.set_status(ConnectionStatus::Disconnected);
        tracing::debug!("Connection supervisor stopped");
    }

    /// Connect, then keep the session alive until told otherwise or the
    /// reconnect budget runs out
    async fn maintain(&mut self) -> Flow {
        let mut attempts: u32 = 0;

        loop {
            self.set_status(ConnectionStatus::Connecting);

            let outcome = match self.attempt_connect().await {
                Attempt::Finished(outcome) => outcome,
                Attempt::Disconnect => {
                    self.set_status(ConnectionStatus::Disconnected);
                    return Flow::Idle;
                }
                Attempt::Shutdown => return Flow::Shutdown,
            };

            match outcome {
                Ok((rpc, events)) => {
                    attempts = 0;
                    self.mark_connected(true);
                    let exit = self.run_session(Arc::clone(&rpc), events).await;
                    rpc.close().await;
                    self.mark_connected(false);

                    match exit {
                        SessionExit::Lost(reason) => {
                            tracing::info!(
                                "Voice client connection lost: {}",
                                reason.as_deref().unwrap_or("no reason given")
                            );
                        }
                        SessionExit::Disconnect => {
                            self.set_status(ConnectionStatus::Disconnected);
                            return Flow::Idle;
                        }
                        SessionExit::Shutdown => return Flow::Shutdown,
                    }
                }
                Err(e) => {
                    tracing::debug!("Failed to connect to voice client: {}", e);
                }
            }

            if attempts >= self.config.max_reconnect_attempts {
                tracing::warn!(
                    "Giving up on voice client after {} reconnect attempts",
                    attempts
                );
                self.set_status(ConnectionStatus::Failed);
                let _ = self.events.send(VoiceEvent::ReconnectExhausted { attempts });
                return Flow::Idle;
            }

            let delay = self.config.reconnect_delay(attempts);
            attempts += 1;
            tracing::info!(
                "Reconnecting to voice client in {:?} (attempt {}/{})",
                delay,
                attempts,
                self.config.max_reconnect_attempts
            );

            match self.wait(delay).await {
                Wake::Elapsed => {}
                Wake::Connect => attempts = 0,
                Wake::Disconnect => {
                    self.set_status(ConnectionStatus::Disconnected);
                    return Flow::Idle;
                }
                Wake::Shutdown => return Flow::Shutdown,
            }
        }
    }

    /// Open a session while still answering commands
    async fn attempt_connect(&mut self) -> Attempt {
        let connector = Arc::clone(&self.connector);
        let connect = connector.connect();
        tokio::pin!(connect);

        loop {
            tokio::select! {
                outcome = &mut connect => return Attempt::Finished(outcome),
                command = self.commands.recv() => match command {
                    Some(Command::Connect) => tracing::debug!("Already connecting to voice client"),
                    Some(Command::Disconnect) => return Attempt::Disconnect,
                    Some(Command::Shutdown) | None => return Attempt::Shutdown,
                },
            }
        }
    }

    /// Drive the voice state source while watching for commands
    async fn run_session(
        &mut self,
        rpc: Arc<dyn VoiceRpc>,
        events: mpsc::UnboundedReceiver<rpc_client::RpcEvent>,
    ) -> SessionExit {
        let source = VoiceStateSource::new(rpc, self.events.clone());
        let run = source.run(events, self.poll_interval.clone());
        tokio::pin!(run);

        loop {
            tokio::select! {
                exit = &mut run => {
                    return match exit {
                        SourceExit::ConnectionLost(reason) => SessionExit::Lost(reason),
                        SourceExit::Stopped => SessionExit::Shutdown,
                    };
                }
                command = self.commands.recv() => match command {
                    Some(Command::Connect) => tracing::debug!("Already connected to voice client"),
                    Some(Command::Disconnect) => return SessionExit::Disconnect,
                    Some(Command::Shutdown) | None => return SessionExit::Shutdown,
                },
            }
        }
    }

    async fn wait(&mut self, delay: Duration) -> Wake {
        tokio::select! {
            _ = tokio::time::sleep(delay) => Wake::Elapsed,
            command = self.commands.recv() => match command {
                Some(Command::Connect) => Wake::Connect,
                Some(Command::Disconnect) => Wake::Disconnect,
                Some(Command::Shutdown) | None => Wake::Shutdown,
            },
        }
    }

    /// Emit a connectivity event on transitions only
    fn mark_connected(&mut self, connected: bool) {
        if self.connected == connected {
            return;
        }
        self.connected = connected;

        if connected {
            tracing::info!("Connected to voice client");
            self.set_status(ConnectionStatus::Connected);
            let _ = self.events.send(VoiceEvent::Connected);
        } else {
            tracing::info!("Disconnected from voice client");
            let _ = self.events.send(VoiceEvent::Disconnected);
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        *self.status.write() = status;
    }
}
