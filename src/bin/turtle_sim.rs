use std::process::ExitCode;

use tracing::{error, info};
use turtle_driver::{
    config::{DEFAULT_MOTION_PORT, DEFAULT_SERVICE_PORT, DEFAULT_SIMULATOR_IP},
    logging,
    testing::turtle_sim::TurtleSim,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();
    let _sim = match TurtleSim::start(
        DEFAULT_SIMULATOR_IP,
        DEFAULT_SERVICE_PORT,
        DEFAULT_MOTION_PORT,
    ) {
        Ok(sim) => sim,
        Err(e) => {
            error!("couldn't start the simulator: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("couldn't listen for the interrupt signal: {}", e);
        return ExitCode::FAILURE;
    }
    info!("simulator stopped");
    ExitCode::SUCCESS
}
