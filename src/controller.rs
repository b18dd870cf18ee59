use tracing::{debug, error, info, warn};

use crate::{
    agent::AgentHandle,
    config::DriverConfig,
    keyboard::{Key, KeySource, KeyWatcher},
    motion::{MotionPublisher, MotionSink},
    services::{ServiceGateway, SimulatorTransport},
    shutdown::Shutdown,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Lifecycle {
    Initializing,
    Configuring,
    Running,
    Terminating,
    Terminated,
}

/// How a controller run ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunOutcome {
    /// the termination key was pressed
    Finished,
    /// interrupt signal or Ctrl+C
    Interrupted,
    /// the agent couldn't be created, nothing else was attempted
    SpawnFailed,
    /// the keyboard couldn't be watched, the agent was cleaned up right away
    KeyboardUnavailable,
    /// the config was rejected before anything was sent to the simulator
    InvalidConfig,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Finished | RunOutcome::Interrupted)
    }
}

/// Drives the spawned agent from creation to destruction.
pub struct AgentController<T: SimulatorTransport, M: MotionSink, K: KeySource> {
    gateway: ServiceGateway<T>,
    motion: M,
    keys: K,
    shutdown: Shutdown,
    config: DriverConfig,
    state: Lifecycle,
    agent: Option<AgentHandle>,
    destroy_issued: bool,
}

fn enter(state: &mut Lifecycle, next: Lifecycle) {
    debug!(from = ?*state, to = ?next, "lifecycle transition");
    *state = next;
}

impl<T: SimulatorTransport, M: MotionSink, K: KeySource> AgentController<T, M, K> {
    pub fn new(
        gateway: ServiceGateway<T>,
        motion: M,
        keys: K,
        shutdown: Shutdown,
        config: DriverConfig,
    ) -> Self {
        Self {
            gateway,
            motion,
            keys,
            shutdown,
            config,
            state: Lifecycle::Initializing,
            agent: None,
            destroy_issued: false,
        }
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn agent(&self) -> Option<&AgentHandle> {
        self.agent.as_ref()
    }

    /// Runs the whole lifecycle. Errors are logged along the way, only the outcome comes back.
    pub async fn run(&mut self) -> RunOutcome {
        let outcome = self.run_until_terminated().await;
        enter(&mut self.state, Lifecycle::Terminated);
        info!(?outcome, "controller terminated");
        outcome
    }

    async fn run_until_terminated(&mut self) -> RunOutcome {
        enter(&mut self.state, Lifecycle::Initializing);
        if let Err(e) = self.config.validate() {
            error!("{}", e);
            return RunOutcome::InvalidConfig;
        }
        match self.gateway.spawn(self.config.spawn.request()).await {
            Some(agent) => self.agent = Some(agent),
            None if !self.shutdown.is_ok() => return RunOutcome::Interrupted,
            None => {
                error!("couldn't create the agent, not going any further");
                return RunOutcome::SpawnFailed;
            }
        }

        enter(&mut self.state, Lifecycle::Configuring);
        let pen_applied = self
            .gateway
            .set_pen(&self.config.driven_agent, self.config.pen)
            .await;
        if pen_applied.is_none() && !self.shutdown.is_ok() {
            return RunOutcome::Interrupted;
        }

        enter(&mut self.state, Lifecycle::Running);
        self.drive().await
    }

    /// Running then Terminating. The keyboard stays in raw mode until this returns.
    async fn drive(&mut self) -> RunOutcome {
        let Self {
            gateway,
            motion,
            keys,
            shutdown,
            config,
            state,
            agent,
            destroy_issued,
        } = self;

        let mut watcher = match KeyWatcher::acquire(keys) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                error!("couldn't put the keyboard in raw mode: {}", e);
                None
            }
        };

        let outcome = match watcher.as_mut() {
            Some(watcher) => {
                let command = config.motion.command();
                let mut publisher =
                    MotionPublisher::start(motion, config.motion.period(), move || command);
                info!("press \"Q\" to terminate the agent");
                let outcome = loop {
                    if !shutdown.is_ok() {
                        break RunOutcome::Interrupted;
                    }
                    match watcher.poll() {
                        Ok(Some(key)) if key.is_termination() => {
                            info!("{:?} key pressed, terminating agent...", key);
                            break RunOutcome::Finished;
                        }
                        Ok(Some(Key::Interrupt)) => {
                            info!("interrupted from the keyboard");
                            shutdown.trigger();
                            break RunOutcome::Interrupted;
                        }
                        Ok(Some(Key::Char(c))) => debug!(key = %c, "ignoring key"),
                        Ok(None) => {}
                        Err(e) => {
                            error!("couldn't read the keyboard: {}", e);
                            break RunOutcome::KeyboardUnavailable;
                        }
                    }
                    publisher.service(config.spin_timeout()).await;
                };
                let published = publisher.stop();
                debug!(published, "stopped publishing motion commands");
                outcome
            }
            None => RunOutcome::KeyboardUnavailable,
        };

        if outcome == RunOutcome::Interrupted {
            return outcome;
        }

        enter(state, Lifecycle::Terminating);
        if let Some(agent) = agent.as_ref() {
            destroy_agent(gateway, shutdown, agent, destroy_issued).await;
        }
        info!("closing in {:?}", config.cooldown());
        tokio::select! {
            _ = tokio::time::sleep(config.cooldown()) => {}
            _ = shutdown.wait() => info!("shutting down, cutting the cooldown short"),
        }
        outcome
    }
}

/// Kills `agent` unless the process is already shutting down. Never issues more than one kill.
async fn destroy_agent<T: SimulatorTransport>(
    gateway: &mut ServiceGateway<T>,
    shutdown: &Shutdown,
    agent: &AgentHandle,
    destroy_issued: &mut bool,
) {
    if *destroy_issued {
        warn!("agent {} was already destroyed", agent);
        return;
    }
    if !shutdown.is_ok() {
        info!("shutting down, no need to kill {}", agent);
        return;
    }
    *destroy_issued = true;
    if gateway.kill(agent).await.is_none() {
        warn!("{} may still be alive in the simulator", agent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::SimulatorConfig,
        keyboard::tests::ScriptedKeys,
        motion::{tests::RecordingSink, MotionCommand},
        services::{tests::FakeTransport, KILL_SERVICE, SPAWN_SERVICE},
        sim_protocol::service_request::Call,
    };
    use std::time::Duration;
    use tokio::time::Instant;

    const ALL_SERVICES: [&str; 3] = [SPAWN_SERVICE, "turtle1/set_pen", KILL_SERVICE];

    fn controller(
        transport: &FakeTransport,
        sink: &RecordingSink,
        keys: &ScriptedKeys,
        shutdown: &Shutdown,
    ) -> AgentController<FakeTransport, RecordingSink, ScriptedKeys> {
        let config = DriverConfig::default();
        let gateway = ServiceGateway::new(transport.clone(), shutdown.clone(), &config.simulator);
        AgentController::new(
            gateway,
            sink.clone(),
            keys.clone(),
            shutdown.clone(),
            config,
        )
    }

    fn kills(transport: &FakeTransport) -> Vec<String> {
        transport
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Kill(request) => Some(request.name),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_running_until_q_then_kills_once() {
        let transport = FakeTransport::serving(ALL_SERVICES);
        let sink = RecordingSink::default();
        let script = std::iter::once(Some(Key::Char('a')))
            .chain(std::iter::repeat(None).take(25))
            .chain(std::iter::once(Some(Key::Char('q'))));
        let keys = ScriptedKeys::new(script);
        let shutdown = Shutdown::new();
        let mut controller = controller(&transport, &sink, &keys, &shutdown);

        let start = Instant::now();
        assert_eq!(controller.run().await, RunOutcome::Finished);
        assert_eq!(controller.state(), Lifecycle::Terminated);
        assert!(start.elapsed() >= Duration::from_secs(15), "cooldown is honored");

        // 'a' didn't stop the loop, 'q' did
        assert_eq!(keys.state.lock().unwrap().reads, 27);

        assert_eq!(kills(&transport), vec!["turtle2".to_string()]);
        let calls = transport.calls();
        assert!(matches!(calls.first(), Some(Call::Spawn(_))));
        assert!(matches!(calls.last(), Some(Call::Kill(_))));

        let published = sink.published();
        assert_eq!(published.len(), 2);
        assert!(published
            .iter()
            .all(|c| *c == MotionCommand::circle(1.3, 0.7)));

        assert!(!keys.is_raw(), "terminal mode is restored");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_refused_before_spawning() {
        let transport = FakeTransport::serving(ALL_SERVICES);
        let sink = RecordingSink::default();
        let keys = ScriptedKeys::new([Some(Key::Char('q'))]);
        let shutdown = Shutdown::new();
        let mut config = DriverConfig::default();
        config.motion.period_ms = 0;
        let gateway = ServiceGateway::new(transport.clone(), shutdown.clone(), &config.simulator);
        let mut controller =
            AgentController::new(gateway, sink.clone(), keys.clone(), shutdown, config);

        assert_eq!(controller.run().await, RunOutcome::InvalidConfig);
        assert!(!RunOutcome::InvalidConfig.is_success());
        assert_eq!(controller.state(), Lifecycle::Terminated);
        assert!(controller.agent().is_none());
        assert!(transport.calls().is_empty());
        assert!(sink.published().is_empty());
        assert_eq!(keys.state.lock().unwrap().entered, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stays_initializing_while_spawn_is_unavailable() {
        let transport = FakeTransport::serving(["turtle1/set_pen", KILL_SERVICE]);
        let sink = RecordingSink::default();
        let keys = ScriptedKeys::new([Some(Key::Char('q'))]);
        let shutdown = Shutdown::new();
        let mut controller = controller(&transport, &sink, &keys, &shutdown);

        let ran = tokio::time::timeout(Duration::from_secs(3600), controller.run()).await;
        assert!(ran.is_err());
        assert_eq!(controller.state(), Lifecycle::Initializing);
        assert!(controller.agent().is_none());
        assert!(transport.calls().is_empty());
        assert!(sink.published().is_empty());
        assert_eq!(keys.state.lock().unwrap().entered, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_failure_is_fatal() {
        let transport = FakeTransport::serving(ALL_SERVICES);
        transport.fail(SPAWN_SERVICE);
        let sink = RecordingSink::default();
        let keys = ScriptedKeys::new([Some(Key::Char('q'))]);
        let shutdown = Shutdown::new();
        let mut controller = controller(&transport, &sink, &keys, &shutdown);

        assert_eq!(controller.run().await, RunOutcome::SpawnFailed);
        assert_eq!(controller.state(), Lifecycle::Terminated);
        assert_eq!(transport.calls().len(), 1);
        assert!(kills(&transport).is_empty());
        assert!(sink.published().is_empty());
        assert_eq!(keys.state.lock().unwrap().entered, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pen_failure_is_only_logged() {
        let transport = FakeTransport::serving(ALL_SERVICES);
        transport.fail("turtle1/set_pen");
        let sink = RecordingSink::default();
        let keys = ScriptedKeys::new([None, Some(Key::Char('q'))]);
        let shutdown = Shutdown::new();
        let mut controller = controller(&transport, &sink, &keys, &shutdown);

        assert_eq!(controller.run().await, RunOutcome::Finished);
        assert_eq!(kills(&transport), vec!["turtle2".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_skips_the_kill_and_restores_the_terminal() {
        let transport = FakeTransport::serving(ALL_SERVICES);
        let sink = RecordingSink::default();
        let keys = ScriptedKeys::default();
        let shutdown = Shutdown::new();
        let mut controller = controller(&transport, &sink, &keys, &shutdown);

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.trigger();
        });

        let start = Instant::now();
        assert_eq!(controller.run().await, RunOutcome::Interrupted);
        assert!(start.elapsed() < Duration::from_secs(15), "no cooldown");
        assert_eq!(controller.state(), Lifecycle::Terminated);
        assert!(kills(&transport).is_empty());
        assert_eq!(sink.published().len(), 2);
        assert!(!keys.is_raw());
    }

    #[tokio::test(start_paused = true)]
    async fn ctrl_c_key_interrupts() {
        let transport = FakeTransport::serving(ALL_SERVICES);
        let sink = RecordingSink::default();
        let keys = ScriptedKeys::new([Some(Key::Char('x')), Some(Key::Interrupt)]);
        let shutdown = Shutdown::new();
        let mut controller = controller(&transport, &sink, &keys, &shutdown);

        assert_eq!(controller.run().await, RunOutcome::Interrupted);
        assert!(!shutdown.is_ok());
        assert!(kills(&transport).is_empty());
        assert!(!keys.is_raw());
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_keyboard_still_cleans_up() {
        let transport = FakeTransport::serving(ALL_SERVICES);
        let sink = RecordingSink::default();
        let keys = ScriptedKeys::refusing_raw_mode();
        let shutdown = Shutdown::new();
        let mut controller = controller(&transport, &sink, &keys, &shutdown);

        assert_eq!(controller.run().await, RunOutcome::KeyboardUnavailable);
        assert!(!RunOutcome::KeyboardUnavailable.is_success());
        assert_eq!(kills(&transport), vec!["turtle2".to_string()]);
        assert!(sink.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_is_skipped_during_shutdown_and_issued_at_most_once() {
        let transport = FakeTransport::serving(ALL_SERVICES);
        let mut gateway =
            ServiceGateway::new(transport.clone(), Shutdown::new(), &SimulatorConfig::default());
        let agent = AgentHandle::new("turtle2");

        let dying = Shutdown::new();
        dying.trigger();
        let mut issued = false;
        destroy_agent(&mut gateway, &dying, &agent, &mut issued).await;
        assert!(!issued);
        assert!(transport.calls().is_empty());

        let alive = Shutdown::new();
        destroy_agent(&mut gateway, &alive, &agent, &mut issued).await;
        destroy_agent(&mut gateway, &alive, &agent, &mut issued).await;
        assert!(issued);
        assert_eq!(kills(&transport), vec!["turtle2".to_string()]);
    }
}
