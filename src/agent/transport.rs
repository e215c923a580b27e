// src/agent/transport.rs

//! Line-oriented TCP transport to the agency.
//!
//! The agent connects, announces itself with `REGISTER <agent-id>`, and then
//! listens. A `STOP` line raises the stop signal; anything else belongs to
//! the agency's test-run conversation and is only logged here. Losing the
//! connection before `STOP` is a transport error, never a silent wait.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::agent::{BoxFuture, RemoteAgent, RemoteAgentFactory};
use crate::errors::{AgentError, Result};

/// Creates [`TcpRemoteAgent`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpAgentFactory;

impl RemoteAgentFactory for TcpAgentFactory {
    fn create(&self, agent_id: Uuid, agency_url: &str) -> Box<dyn RemoteAgent> {
        Box::new(TcpRemoteAgent::new(agent_id, agency_url))
    }
}

/// What the listener has heard from the agency so far.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkState {
    Listening,
    StopRequested,
    Disconnected(String),
}

pub struct TcpRemoteAgent {
    agent_id: Uuid,
    agency_url: String,
    link_tx: Arc<watch::Sender<LinkState>>,
    link_rx: watch::Receiver<LinkState>,
    /// Write side of the registration; kept open while the agent lives.
    _connection: Option<OwnedWriteHalf>,
    listener: Option<JoinHandle<()>>,
}

impl TcpRemoteAgent {
    pub fn new(agent_id: Uuid, agency_url: impl Into<String>) -> Self {
        let (link_tx, link_rx) = watch::channel(LinkState::Listening);
        Self {
            agent_id,
            agency_url: agency_url.into(),
            link_tx: Arc::new(link_tx),
            link_rx,
            _connection: None,
            listener: None,
        }
    }

    async fn connect_and_register(&mut self) -> Result<()> {
        let address = socket_address(&self.agency_url)?;
        let stream = TcpStream::connect(address).await?;
        let (read_half, mut write_half) = stream.into_split();

        write_half
            .write_all(format!("REGISTER {}\n", self.agent_id).as_bytes())
            .await?;
        write_half.flush().await?;

        let link_tx = Arc::clone(&self.link_tx);
        let agent_id = self.agent_id;
        self.listener = Some(tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            let state = loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match line.trim() {
                        "STOP" => {
                            info!(%agent_id, "stop signal received from agency");
                            break LinkState::StopRequested;
                        }
                        "" => {}
                        other => debug!(%agent_id, command = %other, "agency message"),
                    },
                    Ok(None) => break LinkState::Disconnected("connection closed by agency".into()),
                    Err(e) => break LinkState::Disconnected(e.to_string()),
                }
            };
            if let LinkState::Disconnected(reason) = &state {
                warn!(%agent_id, reason = %reason, "lost connection to agency before stop signal");
            }
            link_tx.send_replace(state);
        }));
        self._connection = Some(write_half);

        Ok(())
    }
}

impl RemoteAgent for TcpRemoteAgent {
    fn start(&mut self) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            match self.connect_and_register().await {
                Ok(()) => {
                    info!(agent_id = %self.agent_id, agency_url = %self.agency_url, "registered with agency");
                    Ok(true)
                }
                Err(e) => {
                    error!(
                        agent_id = %self.agent_id,
                        agency_url = %self.agency_url,
                        error = %e,
                        "unable to register with agency"
                    );
                    Ok(false)
                }
            }
        })
    }

    /// `Err` once the agency link is gone without a stop signal.
    fn wait_for_stop(&mut self, timeout: Duration) -> BoxFuture<'_, Result<bool>> {
        let mut rx = self.link_rx.clone();
        Box::pin(async move {
            let changed = async {
                rx.wait_for(|state| *state != LinkState::Listening)
                    .await
                    .map(|state| state.clone())
            };
            let state = match tokio::time::timeout(timeout, changed).await {
                Ok(Ok(state)) => state,
                Ok(Err(_)) => LinkState::Disconnected("agency listener dropped".into()),
                Err(_elapsed) => return Ok(false),
            };

            match state {
                LinkState::StopRequested => Ok(true),
                LinkState::Disconnected(reason) => Err(AgentError::TransportError(format!(
                    "agency connection lost before stop signal: {reason}"
                ))),
                LinkState::Listening => Ok(false),
            }
        })
    }
}

impl Drop for TcpRemoteAgent {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

/// Turn `tcp://host:port[/]` or `host:port` into a connectable address.
fn socket_address(agency_url: &str) -> Result<String> {
    let trimmed = agency_url.trim();
    let rest = match trimmed.split_once("://") {
        Some(("tcp", rest)) => rest,
        Some((scheme, _)) => {
            return Err(AgentError::TransportError(format!(
                "unsupported agency scheme '{scheme}' in {agency_url:?}"
            )));
        }
        None => trimmed,
    };
    let address = rest.trim_end_matches('/');

    match address.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            Ok(address.to_string())
        }
        _ => Err(AgentError::TransportError(format!(
            "agency address {agency_url:?} is not of the form tcp://host:port"
        ))),
    }
}
