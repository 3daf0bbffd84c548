//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::client::ClientConfig;
use crate::driver::DriverConfig;
use crate::error::{Result, SamplerError};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "signal-sampler",
    version,
    about = "Sample one traffic signal from a running simulation into a CSV log"
)]
pub struct Cli {
    /// Base URL of the simulation server's control API.
    #[arg(long, env = "SIM_SERVER_URL", default_value = "http://localhost:5000")]
    pub server_base_url: String,

    /// Id of the traffic signal to sample.
    #[arg(long, env = "SIM_SIGNAL_ID", default_value = "16916")]
    pub signal_id: String,

    /// Simulated seconds added per tick.
    #[arg(long, env = "SIM_STEP_SECONDS", default_value_t = 3)]
    pub sim_step_seconds: u64,

    /// Wall-clock pause between ticks, in milliseconds.
    #[arg(long, env = "SIM_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Record store to create and append to.
    #[arg(long, short, env = "SIM_OUTPUT", default_value = "data.csv")]
    pub output: PathBuf,

    /// Timeout for each request to the simulation server, in milliseconds.
    #[arg(long, env = "SIM_REQUEST_TIMEOUT_MS", default_value_t = 5000)]
    pub request_timeout_ms: u64,

    /// Exit if the initial reset fails instead of polling anyway.
    #[arg(long, env = "SIM_FAIL_FAST_ON_RESET")]
    pub fail_fast_on_reset_error: bool,

    /// Stop after this many ticks. Runs until interrupted when unset.
    #[arg(long, env = "SIM_MAX_TICKS")]
    pub max_ticks: Option<u64>,
}

/// Validated settings for one sampler run.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub client: ClientConfig,
    pub driver: DriverConfig,
    pub output: PathBuf,
    pub max_ticks: Option<u64>,
}

impl TryFrom<Cli> for SamplerConfig {
    type Error = SamplerError;

    fn try_from(cli: Cli) -> Result<Self> {
        if cli.sim_step_seconds == 0 {
            return Err(SamplerError::InvalidConfig(
                "sim step must be at least one second".into(),
            ));
        }
        if cli.request_timeout_ms == 0 {
            return Err(SamplerError::InvalidConfig(
                "request timeout must be non-zero".into(),
            ));
        }
        if cli.signal_id.trim().is_empty() {
            return Err(SamplerError::InvalidConfig("signal id is empty".into()));
        }

        Ok(Self {
            client: ClientConfig {
                base_url: cli.server_base_url,
                request_timeout: Duration::from_millis(cli.request_timeout_ms),
                fail_fast_on_reset_error: cli.fail_fast_on_reset_error,
            },
            driver: DriverConfig {
                signal_id: cli.signal_id,
                sim_step: Duration::from_secs(cli.sim_step_seconds),
                poll_interval: Duration::from_millis(cli.poll_interval_ms),
            },
            output: cli.output,
            max_ticks: cli.max_ticks,
        })
    }
}
