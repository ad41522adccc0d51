//! `ServerBuilder` and the accept loop.
//!
//! This is the entry point for running a McLord server. It ties together
//! all the layers: transport → protocol → session → room, plus the
//! watchdog that drives every room's clock.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mclord_room::{RoomRegistry, RulesEngine};
use mclord_session::{Admission, AdmissionDecision};
use mclord_tick::TickConfig;
use mclord_transport::TcpTransport;

use crate::handler::handle_connection;
use crate::{McLordError, ServerConfig, TaskSpawner, spawn_watchdog};

/// Shared server state passed to each session.
pub(crate) struct ServerState<R> {
    pub(crate) registry: Arc<RoomRegistry<R>>,
    pub(crate) admission: Admission,
    pub(crate) read_timeout: Duration,
}

/// Builder for configuring and starting a McLord server.
///
/// # Example
///
/// ```rust,ignore
/// let config = ServerConfig { port: 0, ..ServerConfig::default() };
/// let server = ServerBuilder::new(config).build::<ChessRules>().await?;
/// println!("listening on {}", server.local_addr()?);
/// server.run().await
/// ```
pub struct ServerBuilder {
    config: ServerConfig,
    tick: TickConfig,
}

impl ServerBuilder {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            tick: TickConfig::default(),
        }
    }

    /// Overrides the watchdog's tick settings.
    pub fn tick_config(mut self, tick: TickConfig) -> Self {
        self.tick = tick;
        self
    }

    /// Validates the config and binds the listener.
    ///
    /// # Errors
    /// [`McLordError::Config`] for an unusable config,
    /// [`McLordError::Transport`] if the address cannot be bound.
    pub async fn build<R>(self) -> Result<Server<R>, McLordError>
    where
        R: RulesEngine + Default,
    {
        self.config.validate()?;
        let transport = TcpTransport::bind(self.config.bind_addr()).await?;

        let state = Arc::new(ServerState {
            registry: Arc::new(RoomRegistry::new(self.config.room_config())),
            admission: Admission::new(self.config.admission_limits()),
            read_timeout: self.config.read_timeout(),
        });

        Ok(Server {
            transport,
            state,
            spawner: self.config.spawner(),
            tick: self.tick,
        })
    }
}

/// A bound McLord server.
///
/// Call [`run()`](Self::run) to start the watchdog and accept connections.
pub struct Server<R> {
    transport: TcpTransport,
    state: Arc<ServerState<R>>,
    spawner: TaskSpawner,
    tick: TickConfig,
}

impl<R> Server<R>
where
    R: RulesEngine + Default,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, McLordError> {
        Ok(self.transport.local_addr()?)
    }

    /// Starts the watchdog, then accepts connections until the process
    /// ends.
    ///
    /// Every accepted socket is counted and classified before anything is
    /// read from it. Sockets over the hard limit are dropped on the spot;
    /// the rest get their own session via the configured [`TaskSpawner`].
    pub async fn run(self) -> Result<(), McLordError> {
        spawn_watchdog(Arc::clone(&self.state.registry), self.tick.clone());
        tracing::info!(spawner = ?self.spawner, "McLord server running");

        loop {
            let (stream, addr) = match self.transport.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            };

            let (decision, permit) = self.state.admission.admit();
            if decision == AdmissionDecision::Reject {
                tracing::debug!(%addr, "over hard limit, dropping connection");
                drop(stream);
                drop(permit);
                continue;
            }

            let state = Arc::clone(&self.state);
            self.spawner.spawn(
                format!("session-{addr}"),
                handle_connection(stream, addr, decision, permit, state),
            );
        }
    }
}
