use std::process::ExitCode;

use tracing::{error, info};
use turtle_driver::{
    config::DriverConfig,
    controller::AgentController,
    keyboard::TerminalKeys,
    logging,
    motion::UdpMotionSink,
    services::{udp_services::UdpServiceClient, ServiceGateway},
    shutdown::{self, Shutdown},
};

/// Spawns a turtle, draws circles with the driven one and kills the spawned turtle on "Q".
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();

    let config = match DriverConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(simulator = %config.simulator.ip, "starting turtle driver");

    let shutdown = Shutdown::new();
    shutdown::install_signal_handler(shutdown.clone());

    let transport = match UdpServiceClient::from_config(&config.simulator).await {
        Ok(transport) => transport,
        Err(e) => {
            error!("failed to setup the simulator service client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let motion = match UdpMotionSink::new(
        config.simulator.ip,
        config.simulator.motion_port,
        &config.driven_agent,
    )
    .await
    {
        Ok(motion) => motion,
        Err(e) => {
            error!("failed to setup the motion command sender: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let gateway = ServiceGateway::new(transport, shutdown.clone(), &config.simulator);
    let mut controller = AgentController::new(gateway, motion, TerminalKeys, shutdown, config);
    if controller.run().await.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
