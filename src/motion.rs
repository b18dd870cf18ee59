use std::{net::Ipv4Addr, time::Duration};

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::{
    net::{udp_transceiver::UdpTransceiver, CreationError, SendError},
    sim_protocol::{MotionPacket, Twist, Vector3},
};

/// Planar velocity command: forward speed and turn rate.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct MotionCommand {
    pub linear: f64,
    pub angular: f64,
}

impl MotionCommand {
    /// Command driving a circle of `radius` at `speed`.
    pub fn circle(speed: f64, radius: f64) -> Self {
        Self {
            linear: speed,
            angular: speed / radius,
        }
    }

    pub fn twist(&self) -> Twist {
        Twist {
            linear: Some(Vector3 {
                x: self.linear,
                y: 0.,
                z: 0.,
            }),
            angular: Some(Vector3 {
                x: 0.,
                y: 0.,
                z: self.angular,
            }),
        }
    }
}

/// Somewhere motion commands can be sent to, without waiting for any answer.
pub trait MotionSink {
    async fn publish(&mut self, command: MotionCommand) -> Result<(), SendError>;
}

/// Sends motion commands for one agent to the simulator's motion port.
pub struct UdpMotionSink {
    socket: UdpTransceiver,
    agent: String,
}

impl UdpMotionSink {
    pub async fn new(ip: Ipv4Addr, port: u16, agent: &str) -> Result<Self, CreationError> {
        Ok(Self {
            socket: UdpTransceiver::new(ip, port).await?,
            agent: agent.to_string(),
        })
    }
}

impl MotionSink for UdpMotionSink {
    async fn publish(&mut self, command: MotionCommand) -> Result<(), SendError> {
        let packet = MotionPacket {
            agent: self.agent.clone(),
            twist: Some(command.twist()),
        };
        self.socket.send(&packet).await.map(|_| ())
    }
}

/// Periodically publishes the command yielded by `supplier`.
///
/// The publisher doesn't run on its own: the owner calls [`MotionPublisher::service`] from its
/// loop, which keeps keyboard polling and publishing on the same task.
pub struct MotionPublisher<'s, S: MotionSink, F: FnMut() -> MotionCommand> {
    sink: &'s mut S,
    supplier: F,
    interval: Interval,
    published: u64,
}

impl<'s, S: MotionSink, F: FnMut() -> MotionCommand> MotionPublisher<'s, S, F> {
    /// The first tick happens one `period` after the start.
    pub fn start(sink: &'s mut S, period: Duration, supplier: F) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(?period, "motion publisher started");
        Self {
            sink,
            supplier,
            interval,
            published: 0,
        }
    }

    /// Waits at most `max_wait` for the next tick, publishing if it fired.
    /// Returns whether a tick was handled.
    pub async fn service(&mut self, max_wait: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.interval.tick() => {
                let command = (self.supplier)();
                if let Err(e) = self.sink.publish(command).await {
                    warn!("couldn't publish motion command: {}", e);
                }
                self.published += 1;
                true
            }
            _ = tokio::time::sleep(max_wait) => false,
        }
    }

    /// Stops publishing for good. Returns how many ticks were published.
    pub fn stop(self) -> u64 {
        debug!(published = self.published, "motion publisher stopped");
        self.published
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every published command.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingSink {
        pub(crate) published: Arc<Mutex<Vec<MotionCommand>>>,
    }

    impl RecordingSink {
        pub(crate) fn published(&self) -> Vec<MotionCommand> {
            self.published.lock().unwrap().clone()
        }
    }

    impl MotionSink for RecordingSink {
        async fn publish(&mut self, command: MotionCommand) -> Result<(), SendError> {
            self.published.lock().unwrap().push(command);
            Ok(())
        }
    }

    #[test]
    fn circle_command() {
        let command = MotionCommand::circle(1.3, 0.7);
        assert_eq!(command.linear, 1.3);
        assert!((command.angular - 1.857_142_857).abs() < 1e-6);

        let twist = command.twist();
        let linear = twist.linear.unwrap();
        let angular = twist.angular.unwrap();
        assert_eq!((linear.x, linear.y, linear.z), (1.3, 0., 0.));
        assert_eq!((angular.x, angular.y), (0., 0.));
        assert_eq!(angular.z, 1.3 / 0.7);
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_the_same_command_every_period() {
        let mut sink = RecordingSink::default();
        let command = MotionCommand::circle(1.3, 0.7);
        let mut publisher = MotionPublisher::start(&mut sink, Duration::from_secs(1), || command);

        let start = Instant::now();
        let mut ticks = 0;
        while start.elapsed() < Duration::from_millis(3500) {
            if publisher.service(Duration::from_millis(100)).await {
                ticks += 1;
            }
        }
        assert_eq!(publisher.stop(), 3);
        assert_eq!(ticks, 3);

        let published = sink.published();
        assert_eq!(published.len(), 3);
        assert!(published.iter().all(|c| *c == command));
    }

    #[tokio::test(start_paused = true)]
    async fn service_waits_no_longer_than_asked() {
        let mut sink = RecordingSink::default();
        let mut publisher = MotionPublisher::start(&mut sink, Duration::from_secs(1), || {
            MotionCommand::circle(1.3, 0.7)
        });

        let start = Instant::now();
        assert!(!publisher.service(Duration::from_millis(100)).await);
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert!(start.elapsed() < Duration::from_secs(1));
        publisher.stop();
        assert!(sink.published().is_empty());
    }
}
