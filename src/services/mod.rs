use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info};

use crate::{
    agent::{AgentHandle, PenConfig},
    config::SimulatorConfig,
    net::{ReceiveError, SendError},
    shutdown::Shutdown,
    sim_protocol::{
        service_request::Call, service_response::Outcome, ServiceError, SpawnRequest,
        SpawnResponse,
    },
};

pub mod udp_services;

pub const SPAWN_SERVICE: &str = "spawn";
pub const KILL_SERVICE: &str = "kill";

/// Per agent pen service, `<agent>/set_pen`.
pub fn set_pen_service(agent: &str) -> String {
    format!("{agent}/set_pen")
}

/// Name of the service handling `call`.
pub fn service_name(call: &Call) -> String {
    match call {
        Call::Spawn(_) => SPAWN_SERVICE.to_string(),
        Call::SetPen(request) => set_pen_service(&request.agent),
        Call::Kill(_) => KILL_SERVICE.to_string(),
        Call::ListServices(_) => "list_services".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("couldn't send request: {0}")]
    Send(#[from] SendError),
    #[error("couldn't receive response: {0}")]
    Receive(#[from] ReceiveError),
    #[error("response had no outcome")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("`{service}` service wasn't advertised within {waited:?}")]
    ServiceUnavailable { service: String, waited: Duration },
    #[error("`{service}` request failed: {reason}")]
    RequestFailed { service: String, reason: String },
    #[error("`{service}` call couldn't complete: {source}")]
    Transport {
        service: String,
        #[source]
        source: TransportError,
    },
    #[error("shutting down while waiting on `{service}`")]
    Interrupted { service: String },
}

/// Request/response link to the simulator.
pub trait SimulatorTransport {
    /// Names of the services the simulator currently advertises.
    async fn list_services(&mut self) -> Result<Vec<String>, TransportError>;

    /// Submits `call` and waits for its outcome.
    async fn call(&mut self, call: Call) -> Result<Outcome, TransportError>;
}

/// Blocking style access to the simulator services.
///
/// Every operation first waits for its service to be advertised, then for the response. Failures
/// are logged and come back as `None`, nothing is retried.
pub struct ServiceGateway<T: SimulatorTransport> {
    transport: T,
    shutdown: Shutdown,
    availability_poll: Duration,
    service_wait_timeout: Option<Duration>,
}

impl<T: SimulatorTransport> ServiceGateway<T> {
    pub fn new(transport: T, shutdown: Shutdown, config: &SimulatorConfig) -> Self {
        Self {
            transport,
            shutdown,
            availability_poll: config.availability_poll(),
            service_wait_timeout: config.service_wait_timeout(),
        }
    }

    pub async fn spawn(&mut self, request: SpawnRequest) -> Option<AgentHandle> {
        match self.call(Call::Spawn(request)).await {
            Ok(Outcome::Spawned(SpawnResponse { name })) => {
                info!("successfully spawned agent named: {}", name);
                Some(AgentHandle::new(name))
            }
            Ok(other) => {
                error!("spawn failed due to an unexpected reply: {:?}", other);
                None
            }
            Err(e) => {
                error!("spawn failed due to: {}", e);
                None
            }
        }
    }

    pub async fn set_pen(&mut self, agent: &str, pen: PenConfig) -> Option<()> {
        match self.call(Call::SetPen(pen.request_for(agent))).await {
            Ok(Outcome::Ack(_)) => {
                info!(agent, ?pen, "pen settings applied successfully");
                Some(())
            }
            Ok(other) => {
                error!("failed to set pen settings, unexpected reply: {:?}", other);
                None
            }
            Err(e) => {
                error!("failed to set pen settings: {}", e);
                None
            }
        }
    }

    pub async fn kill(&mut self, agent: &AgentHandle) -> Option<()> {
        match self.call(Call::Kill(agent.kill_request())).await {
            Ok(Outcome::Ack(_)) => {
                info!("agent named {} terminated", agent);
                Some(())
            }
            Ok(other) => {
                error!("termination failed, unexpected reply: {:?}", other);
                None
            }
            Err(e) => {
                error!("termination failed: {}", e);
                None
            }
        }
    }

    async fn call(&mut self, call: Call) -> Result<Outcome, GatewayError> {
        let service = service_name(&call);
        self.wait_for_service(&service).await?;

        debug!(service = %service, "sending request");
        let outcome = tokio::select! {
            outcome = self.transport.call(call) => outcome.map_err(|source| GatewayError::Transport {
                service: service.clone(),
                source,
            })?,
            _ = self.shutdown.wait() => return Err(GatewayError::Interrupted { service }),
        };
        match outcome {
            Outcome::Error(ServiceError { message }) => Err(GatewayError::RequestFailed {
                service,
                reason: message,
            }),
            outcome => Ok(outcome),
        }
    }

    /// Polls the advertised services until `service` shows up. Only gives up on shutdown, or when
    /// a service wait timeout is configured.
    async fn wait_for_service(&mut self, service: &str) -> Result<(), GatewayError> {
        info!("waiting for {} service...", service);
        let start = Instant::now();
        let deadline = self.service_wait_timeout.map(|timeout| start + timeout);
        loop {
            match self.transport.list_services().await {
                Ok(names) if names.iter().any(|name| name == service) => return Ok(()),
                Ok(_) => debug!(service, "service not advertised yet"),
                Err(e) => debug!(service, "couldn't query advertised services: {}", e),
            }

            let next_poll = Instant::now() + self.availability_poll;
            let wake_up = match deadline {
                Some(deadline) if deadline <= Instant::now() => {
                    return Err(GatewayError::ServiceUnavailable {
                        service: service.to_string(),
                        waited: start.elapsed(),
                    })
                }
                Some(deadline) => next_poll.min(deadline),
                None => next_poll,
            };
            tokio::select! {
                _ = sleep_until(wake_up) => {}
                _ = self.shutdown.wait() => {
                    return Err(GatewayError::Interrupted {
                        service: service.to_string(),
                    })
                }
            }
        }
    }
}
