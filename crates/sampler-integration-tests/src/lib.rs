//! Integration testing infrastructure for the signal sampler.
//!
//! Provides [`FakeSimServer`], an in-process stand-in for the simulation
//! server's control API with scriptable failures, so the sampler can be
//! driven end to end without a real simulator.
//!
//! # Example
//!
//! ```rust,ignore
//! use sampler_integration_tests::FakeSimServer;
//!
//! #[tokio::test]
//! async fn test_fetch() {
//!     let server = FakeSimServer::builder().signal("16916", 0).spawn().await.unwrap();
//!     let client = SimClient::connect(&server.client_config()).await.unwrap();
//!     assert!(client.fetch_all_signal_states().await.unwrap().contains_key("16916"));
//! }
//! ```

pub mod server;

pub use server::{FakeSimServer, FakeSimServerBuilder};

use std::time::Duration;

use signal_sampler::{DriverConfig, Sample, SignalPhase};

/// Driver settings for tests: default step, short poll interval.
#[must_use]
pub fn fast_driver_config(signal_id: &str) -> DriverConfig {
    DriverConfig {
        signal_id: signal_id.to_string(),
        sim_step: Duration::from_secs(3),
        poll_interval: Duration::from_millis(10),
    }
}

/// Shorthand for building expected samples.
#[must_use]
pub const fn sample(elapsed_seconds: u32, phase: SignalPhase) -> Sample {
    Sample {
        elapsed_seconds,
        phase,
    }
}
