//! HTTP client for the simulation server's control API.

use std::time::Duration;

use reqwest::Response;
use tracing::{debug, info, warn};

use crate::clock::SimClock;
use crate::error::{Result, SamplerError};
use crate::phase::SignalStates;

const RESET: &str = "/sim/reset";
const GOTO_TIME: &str = "/sim/goto-time";
const ALL_SIGNAL_STATES: &str = "/traffic-signals/get-all-current-state";

/// Connection settings for [`SimClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// e.g. `http://localhost:5000`
    pub base_url: String,
    /// Upper bound on every request, connect included.
    pub request_timeout: Duration,
    /// Refuse to start when the initial reset fails instead of polling anyway.
    pub fail_fast_on_reset_error: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout: Duration::from_secs(5),
            fail_fast_on_reset_error: false,
        }
    }
}

/// Session with the simulation server.
///
/// Every call is attempted exactly once. A failed call is reported to the
/// caller and the next tick is the retry.
#[derive(Debug)]
pub struct SimClient {
    http: reqwest::Client,
    base_url: String,
    server_is_running: bool,
}

impl SimClient {
    /// Builds the session and resets the simulation.
    ///
    /// A failed reset is logged and leaves [`SimClient::is_server_running`]
    /// false. It only becomes an error with `fail_fast_on_reset_error`.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SamplerError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        let mut client = Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            server_is_running: true,
        };

        match client.reset().await {
            Ok(()) => info!("Simulation reset at {}", client.base_url),
            Err(e) if config.fail_fast_on_reset_error => return Err(e),
            Err(e) => warn!("Simulation server not running, polling anyway: {e}"),
        }

        Ok(client)
    }

    /// `GET /sim/reset`.
    pub async fn reset(&mut self) -> Result<()> {
        let result = self.get(RESET, None).await.map(drop);
        self.server_is_running = result.is_ok();
        result
    }

    /// Advances `clock` by `step`, then asks the server to jump to the new time.
    ///
    /// The clock moves even if the request fails. In that case the server is
    /// now behind the cursor until a later `goto-time` succeeds.
    pub async fn advance_time(&self, clock: &mut SimClock, step: Duration) -> Result<()> {
        clock.advance(step);
        let time = clock.format_hms();
        self.get(GOTO_TIME, Some(("t", &time))).await?;
        debug!("Server time set to {time}");
        Ok(())
    }

    /// `GET /traffic-signals/get-all-current-state`.
    ///
    /// Pulls every signal in the map even though the sampler looks at one;
    /// the API has no per-signal query.
    pub async fn fetch_all_signal_states(&self) -> Result<SignalStates> {
        let response = self.get(ALL_SIGNAL_STATES, None).await?;
        response
            .json::<SignalStates>()
            .await
            .map_err(|source| SamplerError::InvalidResponse {
                endpoint: self.endpoint(ALL_SIGNAL_STATES),
                source,
            })
    }

    /// Whether the last reset succeeded.
    pub const fn is_server_running(&self) -> bool {
        self.server_is_running
    }

    async fn get(&self, path: &str, query: Option<(&str, &str)>) -> Result<Response> {
        let endpoint = self.endpoint(path);

        let mut request = self.http.get(&endpoint);
        if let Some(pair) = query {
            request = request.query(&[pair]);
        }

        debug!("GET {endpoint}");
        let response = request
            .send()
            .await
            .map_err(|source| SamplerError::ServerUnreachable {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SamplerError::ServerError { endpoint, status });
        }
        Ok(response)
    }

    fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(
            join_url("http://localhost:5000/", "/sim/reset"),
            "http://localhost:5000/sim/reset"
        );
        assert_eq!(
            join_url("http://localhost:5000", "sim/reset"),
            "http://localhost:5000/sim/reset"
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_not_running() {
        // Port 1 on loopback refuses connections.
        let config = ClientConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            request_timeout: Duration::from_secs(2),
            fail_fast_on_reset_error: false,
        };

        let client = SimClient::connect(&config).await.unwrap();
        assert!(!client.is_server_running());

        let err = client.fetch_all_signal_states().await.unwrap_err();
        assert!(
            matches!(err, SamplerError::ServerUnreachable { .. }),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn fail_fast_surfaces_reset_error() {
        let config = ClientConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            request_timeout: Duration::from_secs(2),
            fail_fast_on_reset_error: true,
        };

        let err = SimClient::connect(&config).await.unwrap_err();
        assert!(err.is_server_failure(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn failed_advance_still_moves_clock() {
        let config = ClientConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            request_timeout: Duration::from_secs(2),
            fail_fast_on_reset_error: false,
        };
        let client = SimClient::connect(&config).await.unwrap();
        let mut clock = SimClock::new();

        let result = client.advance_time(&mut clock, Duration::from_secs(3)).await;

        assert!(result.is_err());
        assert_eq!(clock.elapsed_seconds_of_day(), 3);
    }
}
