//! Fake simulation server for integration tests.

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use eyre::Result;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use signal_sampler::ClientConfig;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Shared = Arc<Mutex<FakeState>>;

struct FakeState {
    /// Stage sequence per signal, indexed by fetch number modulo length.
    signals: BTreeMap<String, Vec<usize>>,
    reset_status: StatusCode,
    fail_fetches: HashSet<u64>,
    malformed_fetches: HashSet<u64>,
    omit_signal_fetches: HashSet<(String, u64)>,
    fail_gotos: HashSet<u64>,
    fetch_delay: Option<Duration>,
    resets: u64,
    fetches: u64,
    goto_times: Vec<String>,
}

/// Builder for [`FakeSimServer`].
///
/// Fetch and goto numbers are 0-based and count every request received,
/// failed ones included.
pub struct FakeSimServerBuilder {
    state: FakeState,
}

impl FakeSimServerBuilder {
    /// Adds a signal that always reports `stage`.
    #[must_use]
    pub fn signal(self, id: &str, stage: usize) -> Self {
        self.signal_stages(id, vec![stage])
    }

    /// Adds a signal whose stage cycles through `stages`, one per fetch.
    ///
    /// # Panics
    /// Panics if `stages` is empty.
    #[must_use]
    pub fn signal_stages(mut self, id: &str, stages: Vec<usize>) -> Self {
        assert!(!stages.is_empty(), "stage sequence must not be empty");
        self.state.signals.insert(id.to_string(), stages);
        self
    }

    #[must_use]
    pub fn reset_status(mut self, status: StatusCode) -> Self {
        self.state.reset_status = status;
        self
    }

    /// Answers these fetches with a 500.
    #[must_use]
    pub fn fail_fetches(mut self, fetches: impl IntoIterator<Item = u64>) -> Self {
        self.state.fail_fetches.extend(fetches);
        self
    }

    /// Answers these fetches with a 200 and a body that is not JSON.
    #[must_use]
    pub fn malformed_fetches(mut self, fetches: impl IntoIterator<Item = u64>) -> Self {
        self.state.malformed_fetches.extend(fetches);
        self
    }

    /// Leaves signal `id` out of the state map on these fetches.
    #[must_use]
    pub fn omit_signal(mut self, id: &str, fetches: impl IntoIterator<Item = u64>) -> Self {
        self.state
            .omit_signal_fetches
            .extend(fetches.into_iter().map(|n| (id.to_string(), n)));
        self
    }

    /// Answers these goto-time requests with a 500.
    #[must_use]
    pub fn fail_gotos(mut self, gotos: impl IntoIterator<Item = u64>) -> Self {
        self.state.fail_gotos.extend(gotos);
        self
    }

    /// Delays every state fetch, for timeout tests.
    #[must_use]
    pub fn fetch_delay(mut self, delay: Duration) -> Self {
        self.state.fetch_delay = Some(delay);
        self
    }

    /// Binds to an auto-assigned loopback port and starts serving.
    ///
    /// # Errors
    /// Returns an error if the listener cannot be bound.
    pub async fn spawn(self) -> Result<FakeSimServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(self.state));

        let router = Router::new()
            .route("/sim/reset", get(reset))
            .route("/sim/goto-time", get(goto_time))
            .route(
                "/traffic-signals/get-all-current-state",
                get(all_current_state),
            )
            .with_state(Arc::clone(&state));

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                warn!("Fake simulation server stopped: {e}");
            }
        });

        info!("Fake simulation server listening on {addr}");

        Ok(FakeSimServer { addr, state, task })
    }
}

/// A running fake simulation server.
pub struct FakeSimServer {
    addr: SocketAddr,
    state: Shared,
    task: JoinHandle<()>,
}

impl FakeSimServer {
    #[must_use]
    pub fn builder() -> FakeSimServerBuilder {
        FakeSimServerBuilder {
            state: FakeState {
                signals: BTreeMap::new(),
                reset_status: StatusCode::OK,
                fail_fetches: HashSet::new(),
                malformed_fetches: HashSet::new(),
                omit_signal_fetches: HashSet::new(),
                fail_gotos: HashSet::new(),
                fetch_delay: None,
                resets: 0,
                fetches: 0,
                goto_times: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client settings pointing at this server.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url(),
            request_timeout: Duration::from_secs(5),
            fail_fast_on_reset_error: false,
        }
    }

    pub async fn resets(&self) -> u64 {
        self.state.lock().await.resets
    }

    pub async fn fetches(&self) -> u64 {
        self.state.lock().await.fetches
    }

    /// Every `t` received by goto-time, in arrival order.
    pub async fn goto_times(&self) -> Vec<String> {
        self.state.lock().await.goto_times.clone()
    }
}

impl Drop for FakeSimServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn reset(State(state): State<Shared>) -> StatusCode {
    let mut state = state.lock().await;
    state.resets += 1;
    debug!("reset -> {}", state.reset_status);
    state.reset_status
}

#[derive(Deserialize)]
struct GotoTime {
    t: String,
}

async fn goto_time(State(state): State<Shared>, Query(query): Query<GotoTime>) -> StatusCode {
    let mut state = state.lock().await;
    let n = state.goto_times.len() as u64;
    state.goto_times.push(query.t);

    if state.fail_gotos.contains(&n) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn all_current_state(State(state): State<Shared>) -> Response {
    let (n, delay) = {
        let mut state = state.lock().await;
        let n = state.fetches;
        state.fetches += 1;
        (n, state.fetch_delay)
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let state = state.lock().await;

    if state.fail_fetches.contains(&n) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "simulation crashed").into_response();
    }
    if state.malformed_fetches.contains(&n) {
        return (StatusCode::OK, "<html>not json</html>").into_response();
    }

    let mut body = Map::new();
    for (id, stages) in &state.signals {
        if state.omit_signal_fetches.contains(&(id.clone(), n)) {
            continue;
        }
        let stage = stages[(n as usize) % stages.len()];
        body.insert(
            id.clone(),
            json!({
                "current_stage_idx": stage,
                "remaining_time": 10.0,
                "accepted_agents": [],
            }),
        );
    }

    axum::Json(Value::Object(body)).into_response()
}
