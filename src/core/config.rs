//! Application configuration loaded from environment variables.
use envconfig::Envconfig;
use humantime::Duration;
use reqwest::Url;

use crate::integration::solark::AuthMode;

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Envconfig)]
pub struct Config {
    #[allow(dead_code)]
    #[envconfig(from = "APP_LOG", default = "error")]
    pub app_log: String,
    #[allow(dead_code)]
    #[envconfig(from = "APP_LOG_STYLE", default = "always")]
    pub app_log_style: String,
    #[envconfig(from = "SOLARK_EMAIL")]
    pub solark_email: String,
    #[envconfig(from = "SOLARK_PASSWORD")]
    pub solark_password: String,
    #[envconfig(from = "SOLARK_PLANT_ID")]
    pub solark_plant_id: String,
    #[envconfig(from = "SOLARK_BASE_URL", default = "https://api.solarkcloud.com")]
    pub solark_base_url: Url,
    #[envconfig(from = "SOLARK_FALLBACK_URL", default = "https://www.solarkcloud.com")]
    pub solark_fallback_url: Url,
    #[envconfig(from = "SOLARK_AUTH_MODE", default = "auto")]
    pub solark_auth_mode: AuthMode,
    #[envconfig(from = "POLL_INTERVAL", default = "120s")]
    pub poll_interval: Duration,
    #[envconfig(from = "REQUEST_TIMEOUT", default = "10s")]
    pub request_timeout: Duration,
    #[envconfig(from = "RATE_LIMIT_COOLDOWN", default = "600s")]
    pub rate_limit_cooldown: Duration,
}

pub fn configure_logger() {
    let env = env_logger::Env::default()
        .filter_or("APP_LOG", "info")
        .write_style_or("APP_LOG_STYLE", "always");
    env_logger::init_from_env(env);
}
