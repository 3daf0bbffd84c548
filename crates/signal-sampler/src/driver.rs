//! Polling loop.
//!
//! ```text
//! IDLE -> FETCH -> MAP -> RECORD -> ADVANCE -> SLEEP -> IDLE
//! ```
//!
//! A tick whose fetch or map fails records nothing; the simulated clock is
//! still advanced so the time axis keeps moving at a fixed step.

use std::time::Duration;

use tracing::{info, warn};

use crate::client::SimClient;
use crate::clock::SimClock;
use crate::error::{Result, SamplerError};
use crate::phase::map_phase;
use crate::recorder::{Sample, SampleRecorder};

/// Loop settings for [`Driver`].
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Signal whose phase is sampled.
    pub signal_id: String,
    /// Simulated time added per tick.
    pub sim_step: Duration,
    /// Wall-clock pause after each tick.
    pub poll_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            signal_id: "16916".to_string(),
            sim_step: Duration::from_secs(3),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// What happened to the sample of one tick.
#[derive(Debug)]
pub enum TickOutcome {
    Recorded(Sample),
    /// Fetch or map failed; nothing was written.
    Skipped(SamplerError),
    /// The sample was observed but could not be written.
    StoreFailed(SamplerError),
}

impl TickOutcome {
    pub const fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }
}

/// Counters over the lifetime of a [`Driver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub ticks: u64,
    pub recorded: u64,
    pub skipped: u64,
    pub store_failures: u64,
    pub advance_failures: u64,
}

/// Owns the simulated clock and runs ticks against the server.
#[derive(Debug)]
pub struct Driver {
    client: SimClient,
    recorder: SampleRecorder,
    clock: SimClock,
    config: DriverConfig,
    stats: TickStats,
}

impl Driver {
    pub fn new(client: SimClient, recorder: SampleRecorder, config: DriverConfig) -> Self {
        Self {
            client,
            recorder,
            clock: SimClock::new(),
            config,
            stats: TickStats::default(),
        }
    }

    /// Runs one tick without sleeping.
    pub async fn tick(&mut self) -> TickOutcome {
        let outcome = match self.observe().await {
            Ok(sample) => match self.recorder.append(sample) {
                Ok(()) => {
                    info!(
                        "{} {} ({})",
                        sample.elapsed_seconds,
                        sample.phase.ordinal(),
                        sample.phase
                    );
                    self.stats.recorded += 1;
                    TickOutcome::Recorded(sample)
                }
                Err(e) => {
                    warn!("Dropping sample at {}: {e}", sample.elapsed_seconds);
                    self.stats.store_failures += 1;
                    TickOutcome::StoreFailed(e)
                }
            },
            Err(e) => {
                warn!("Skipping tick at {}: {e}", self.clock);
                self.stats.skipped += 1;
                TickOutcome::Skipped(e)
            }
        };

        if let Err(e) = self
            .client
            .advance_time(&mut self.clock, self.config.sim_step)
            .await
        {
            warn!("Could not advance simulation to {}, server time may lag: {e}", self.clock);
            self.stats.advance_failures += 1;
        }

        self.stats.ticks += 1;
        outcome
    }

    /// Runs `count` ticks, sleeping the poll interval after each.
    pub async fn run_ticks(&mut self, count: u64) -> TickStats {
        for _ in 0..count {
            self.tick().await;
            tokio::time::sleep(self.config.poll_interval).await;
        }
        self.stats
    }

    /// Runs until the process is terminated.
    pub async fn run(&mut self) {
        loop {
            self.tick().await;
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    pub const fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub const fn stats(&self) -> TickStats {
        self.stats
    }

    pub const fn recorder(&self) -> &SampleRecorder {
        &self.recorder
    }

    /// FETCH and MAP, reading the clock before it is advanced.
    async fn observe(&self) -> Result<Sample> {
        let states = self.client.fetch_all_signal_states().await?;
        let phase = map_phase(&states, &self.config.signal_id)?;
        Ok(Sample {
            elapsed_seconds: self.clock.elapsed_seconds_of_day(),
            phase,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;

    #[tokio::test]
    async fn unreachable_server_skips_but_advances() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = SampleRecorder::initialize(dir.path().join("data.csv")).unwrap();
        let client = SimClient::connect(&ClientConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            request_timeout: Duration::from_secs(2),
            fail_fast_on_reset_error: false,
        })
        .await
        .unwrap();
        let mut driver = Driver::new(
            client,
            recorder,
            DriverConfig {
                poll_interval: Duration::from_millis(1),
                ..DriverConfig::default()
            },
        );

        let stats = driver.run_ticks(3).await;

        assert_eq!(
            stats,
            TickStats {
                ticks: 3,
                recorded: 0,
                skipped: 3,
                store_failures: 0,
                advance_failures: 3,
            }
        );
        assert_eq!(driver.clock().elapsed_seconds_of_day(), 9);
        assert_eq!(driver.recorder().rows_written(), 0);
    }
}
