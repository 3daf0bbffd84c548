//! Traffic-signal sampler for a microsimulation server.
//!
//! Drives the simulator through its HTTP control API, reads the phase of one
//! traffic signal at fixed simulated-time steps, and appends each reading to
//! a CSV record store that a separate viewer can tail.
//!
//! # Example
//!
//! ```rust,ignore
//! use signal_sampler::{ClientConfig, Driver, DriverConfig, SampleRecorder, SimClient};
//!
//! let client = SimClient::connect(&ClientConfig::default()).await?;
//! let recorder = SampleRecorder::initialize("data.csv")?;
//! let mut driver = Driver::new(client, recorder, DriverConfig::default());
//! driver.run().await;
//! ```

pub mod client;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod phase;
pub mod recorder;

pub use client::{ClientConfig, SimClient};
pub use clock::SimClock;
pub use config::{Cli, SamplerConfig};
pub use driver::{Driver, DriverConfig, TickOutcome, TickStats};
pub use error::{Result, SamplerError};
pub use phase::{SignalPhase, SignalState, SignalStates, map_phase};
pub use recorder::{HEADER, Sample, SampleRecorder, read_samples};
