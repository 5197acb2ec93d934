//! Polling service driving the Sol-Ark Cloud client on a fixed interval.
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::integration::solark::{self, Error, ErrorDescriptor, Host, ProtocolHint, normalize};
use crate::snapshot::Snapshot;

/// Floor for the polling interval, protecting the cloud API.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Last published polling outcome.
///
/// Consumers read this; only the poller writes it. A failed cycle keeps
/// the last snapshot so readers can distinguish stale from absent data.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PollState {
    pub last_snapshot: Option<Snapshot>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<ErrorDescriptor>,
    pub consecutive_failures: u32,
    pub next_attempt_after: Option<DateTime<Utc>>,
    pub halted: bool,
}

pub struct PollerBackgroundService {
    client: Arc<solark::Client>,
    state: Arc<RwLock<PollState>>,
    poll_interval: Duration,
    rate_limit_cooldown: Duration,
}

impl PollerBackgroundService {
    /// Creates a new instance of `PollerBackgroundService`.
    pub fn new(
        client: Arc<solark::Client>,
        poll_interval: Duration,
        rate_limit_cooldown: Duration,
    ) -> Self {
        let poll_interval = if poll_interval < MIN_POLL_INTERVAL {
            log::warn!(
                "Poll interval below the {}s floor, clamping",
                MIN_POLL_INTERVAL.as_secs()
            );
            MIN_POLL_INTERVAL
        } else {
            poll_interval
        };
        PollerBackgroundService {
            client,
            state: Arc::new(RwLock::new(PollState::default())),
            poll_interval,
            rate_limit_cooldown,
        }
    }

    /// Shared handle to the published state.
    pub fn state(&self) -> Arc<RwLock<PollState>> {
        Arc::clone(&self.state)
    }

    /// Effective polling interval after clamping.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Run the polling loop until the token is cancelled.
    ///
    /// Cycles never overlap: a cycle that outlasts the interval simply
    /// causes the missed ticks to be skipped.
    pub async fn run(&self, shutdown_token: CancellationToken) {
        log::info!(
            "Polling every {}s (rate limit cooldown {}s)",
            self.poll_interval.as_secs(),
            self.rate_limit_cooldown.as_secs()
        );
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => self.poll_once().await,
                _ = shutdown_token.cancelled() => {
                    log::info!("Poller stopped");
                    return;
                }
            }
        }
    }

    /// Execute one polling cycle and publish the outcome.
    pub async fn poll_once(&self) {
        {
            let state = self.state.read().await;
            if state.halted {
                return;
            }
            if let Some(after) = state.next_attempt_after {
                if Utc::now() < after {
                    log::debug!("Skipping cycle, backing off until {after}");
                    return;
                }
            }
        }
        match self.run_cycle().await {
            Ok(snapshot) => self.publish_success(snapshot).await,
            Err(err) => self.publish_failure(err).await,
        }
    }

    /// Fetch and normalize, with one re-authentication and one host
    /// fallback allowed per cycle.
    async fn run_cycle(&self) -> solark::Result<Snapshot> {
        let mut host = Host::Primary;
        let mut reauthenticated = false;
        let mut fell_back = false;
        loop {
            match self.client.fetch_plant_data(host).await {
                Ok(raw) => {
                    let hint = ProtocolHint::detect(&raw);
                    return Ok(normalize(&raw, hint));
                }
                Err(Error::TokenExpired | Error::Unauthorized) if !reauthenticated => {
                    log::debug!("Session rejected, re-authenticating");
                    self.client.invalidate_session().await;
                    reauthenticated = true;
                }
                Err(Error::TokenExpired | Error::Unauthorized) => {
                    return Err(Error::AuthFailed(
                        "session rejected twice within one cycle".into(),
                    ));
                }
                Err(Error::Timeout | Error::Unreachable(_))
                    if host == Host::Primary && !fell_back =>
                {
                    log::warn!("Primary host unavailable, trying the fallback host");
                    host = Host::Fallback;
                    fell_back = true;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn publish_success(&self, snapshot: Snapshot) {
        log::debug!("Cycle succeeded: {snapshot:?}");
        let mut state = self.state.write().await;
        state.last_snapshot = Some(snapshot);
        state.last_success = Some(Utc::now());
        state.last_error = None;
        state.consecutive_failures = 0;
        state.next_attempt_after = None;
        state.halted = false;
    }

    async fn publish_failure(&self, err: Error) {
        let mut state = self.state.write().await;
        state.consecutive_failures += 1;
        if let Error::RateLimited = err {
            let cooldown = chrono::Duration::seconds(self.rate_limit_cooldown.as_secs() as i64);
            state.next_attempt_after = Some(Utc::now() + cooldown);
            log::warn!(
                "Rate limited, backing off for {}s",
                self.rate_limit_cooldown.as_secs()
            );
        }
        if err.is_permanent() {
            state.halted = true;
            log::error!("Polling halted, reconfiguration required: {err}");
        } else {
            log::warn!(
                "Cycle failed ({} consecutive): {err}",
                state.consecutive_failures
            );
        }
        state.last_error = Some(err.descriptor());
    }
}
