use std::{
    collections::BTreeSet,
    net::{Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex},
};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    net::{udp_responder::UdpResponder, CreationError},
    services::{set_pen_service, KILL_SERVICE, SPAWN_SERVICE},
    sim_protocol::{
        service_request::Call, service_response::Outcome, Ack, MotionPacket, ServiceError,
        ServiceList, ServiceRequest, ServiceResponse, SetPenRequest, SpawnResponse, Twist,
    },
    IgnoreMutexErr,
};

/// Agent present when the simulator starts.
pub const FIRST_TURTLE: &str = "turtle1";

/// Something the simulator did.
#[derive(Clone, PartialEq, Debug)]
pub enum SimEvent {
    Spawned(String),
    PenSet(SetPenRequest),
    Killed(String),
    Moved { agent: String, twist: Twist },
}

struct SimState {
    turtles: BTreeSet<String>,
    events: Vec<SimEvent>,
}

impl SimState {
    fn advertised(&self) -> Vec<String> {
        let mut services = vec![SPAWN_SERVICE.to_string(), KILL_SERVICE.to_string()];
        services.extend(self.turtles.iter().map(|t| set_pen_service(t)));
        services
    }

    fn free_name(&self) -> String {
        (1..)
            .map(|i| format!("turtle{i}"))
            .find(|name| !self.turtles.contains(name))
            .unwrap_or_default()
    }

    fn handle(&mut self, call: Call) -> Outcome {
        match call {
            Call::ListServices(_) => Outcome::Services(ServiceList {
                names: self.advertised(),
            }),
            Call::Spawn(request) => {
                let name = if request.name.is_empty() {
                    self.free_name()
                } else {
                    request.name
                };
                if !self.turtles.insert(name.clone()) {
                    return error(format!("a turtle named [{name}] already exists"));
                }
                info!(x = request.x, y = request.y, theta = request.theta, "spawned {}", name);
                self.events.push(SimEvent::Spawned(name.clone()));
                Outcome::Spawned(SpawnResponse { name })
            }
            Call::SetPen(request) => {
                if !self.turtles.contains(&request.agent) {
                    return error(format!("no turtle named [{}]", request.agent));
                }
                info!(?request, "pen set");
                self.events.push(SimEvent::PenSet(request));
                Outcome::Ack(Ack {})
            }
            Call::Kill(request) => {
                if !self.turtles.remove(&request.name) {
                    return error(format!("no turtle named [{}]", request.name));
                }
                info!("killed {}", request.name);
                self.events.push(SimEvent::Killed(request.name));
                Outcome::Ack(Ack {})
            }
        }
    }
}

fn error(message: String) -> Outcome {
    Outcome::Error(ServiceError { message })
}

/// Simulator serving spawn, kill and per turtle set_pen, and recording motion commands.
///
/// Tasks run on the current tokio runtime and stop when this is dropped.
pub struct TurtleSim {
    state: Arc<Mutex<SimState>>,
    service_addr: SocketAddr,
    motion_addr: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

impl TurtleSim {
    /// Binds both ports (0 picks free ones) and starts serving.
    pub fn start(ip: Ipv4Addr, service_port: u16, motion_port: u16) -> Result<Self, CreationError> {
        let service_socket = UdpResponder::new(ip, service_port)?;
        let motion_socket = UdpResponder::new(ip, motion_port)?;
        let service_addr = service_socket
            .local_addr()
            .map_err(CreationError::SocketBindError)?;
        let motion_addr = motion_socket
            .local_addr()
            .map_err(CreationError::SocketBindError)?;

        let state = Arc::new(Mutex::new(SimState {
            turtles: BTreeSet::from([FIRST_TURTLE.to_string()]),
            events: Vec::new(),
        }));
        let tasks = vec![
            tokio::spawn(serve_services(service_socket, state.clone())),
            tokio::spawn(record_motion(motion_socket, state.clone())),
        ];
        info!(%service_addr, %motion_addr, "turtle simulator started");

        Ok(Self {
            state,
            service_addr,
            motion_addr,
            tasks,
        })
    }

    pub fn service_addr(&self) -> SocketAddr {
        self.service_addr
    }

    pub fn motion_addr(&self) -> SocketAddr {
        self.motion_addr
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.state.lock().unwrap_ignore_poison().events.clone()
    }

    pub fn turtles(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_ignore_poison()
            .turtles
            .iter()
            .cloned()
            .collect()
    }
}

impl Drop for TurtleSim {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn serve_services(mut socket: UdpResponder, state: Arc<Mutex<SimState>>) {
    loop {
        let (request, peer) = match socket.receive::<ServiceRequest>().await {
            Ok(received) => received,
            Err(e) => {
                warn!("couldn't receive service request: {}", e);
                continue;
            }
        };
        let outcome = match request.call {
            Some(call) => state.lock().unwrap_ignore_poison().handle(call),
            None => error("empty request".to_string()),
        };
        let response = ServiceResponse {
            request_id: request.request_id,
            outcome: Some(outcome),
        };
        if let Err(e) = socket.reply(&response, peer).await {
            warn!("couldn't answer {}: {}", peer, e);
        }
    }
}

async fn record_motion(mut socket: UdpResponder, state: Arc<Mutex<SimState>>) {
    loop {
        match socket.receive::<MotionPacket>().await {
            Ok((MotionPacket { agent, twist }, _)) => {
                let mut state = state.lock().unwrap_ignore_poison();
                if !state.turtles.contains(&agent) {
                    debug!("motion command for unknown turtle {}", agent);
                    continue;
                }
                let twist = twist.unwrap_or_default();
                debug!(agent = %agent, ?twist, "motion command");
                state.events.push(SimEvent::Moved { agent, twist });
            }
            Err(e) => warn!("couldn't receive motion command: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim_protocol::{KillRequest, ListServices, SpawnRequest};

    fn state() -> SimState {
        SimState {
            turtles: BTreeSet::from([FIRST_TURTLE.to_string()]),
            events: Vec::new(),
        }
    }

    fn spawn(name: &str) -> Call {
        Call::Spawn(SpawnRequest {
            x: 1.,
            y: 2.,
            theta: 0.,
            name: name.to_string(),
        })
    }

    #[test]
    fn advertises_a_pen_service_per_turtle() {
        let mut sim = state();
        sim.handle(spawn("turtle2"));
        match sim.handle(Call::ListServices(ListServices {})) {
            Outcome::Services(list) => assert_eq!(
                list.names,
                vec!["spawn", "kill", "turtle1/set_pen", "turtle2/set_pen"]
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unnamed_spawn_gets_the_first_free_name() {
        let mut sim = state();
        assert_eq!(
            sim.handle(spawn("")),
            Outcome::Spawned(SpawnResponse {
                name: "turtle2".to_string()
            })
        );
    }

    #[test]
    fn duplicate_spawn_and_unknown_kill_are_errors() {
        let mut sim = state();
        assert!(matches!(sim.handle(spawn("turtle1")), Outcome::Error(_)));
        let kill = Call::Kill(KillRequest {
            name: "turtle9".to_string(),
        });
        assert!(matches!(sim.handle(kill), Outcome::Error(_)));
        assert!(sim.events.is_empty());
    }
}
