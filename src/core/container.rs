//! Dependency injection container.
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::core::config::Config;
use crate::integration::solark::{self, Credentials};
use crate::services::{PollState, PollerBackgroundService};

pub struct Container {
    config: Arc<Config>,
    solark: Arc<solark::Client>,
    poller: Arc<PollerBackgroundService>,
}

impl Container {
    /// Creates a new instance of `Container`.
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let credentials = Credentials {
            email: config.solark_email.clone(),
            password: config.solark_password.clone(),
            plant_id: config.solark_plant_id.clone(),
            auth_mode: config.solark_auth_mode,
        };
        let solark = Arc::new(solark::Client::new(
            credentials,
            config.solark_base_url.clone(),
            config.solark_fallback_url.clone(),
            config.request_timeout.into(),
        ));
        let poller = Arc::new(PollerBackgroundService::new(
            Arc::clone(&solark),
            config.poll_interval.into(),
            config.rate_limit_cooldown.into(),
        ));
        Container {
            config,
            solark,
            poller,
        }
    }

    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    pub fn solark_client(&self) -> Arc<solark::Client> {
        Arc::clone(&self.solark)
    }

    pub fn poller(&self) -> Arc<PollerBackgroundService> {
        Arc::clone(&self.poller)
    }

    pub fn poll_state(&self) -> Arc<RwLock<PollState>> {
        self.poller.state()
    }

    /// Release the cloud session before shutdown.
    pub async fn shutdown(&self) {
        self.solark.logout().await;
        log::info!("Container shutdown complete");
    }
}
