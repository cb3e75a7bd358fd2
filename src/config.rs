use std::time::Duration;

use url::Url;
use validator::{Validate, ValidationError};

#[derive(Deserialize, Debug, Validate)]
pub struct Config {
    database_url: String,
    api_host: Option<String>,
    api_port: Option<usize>,
    #[validate(length(min = 32))]
    session_private_key: String,
    /// only send the session cookie over https
    #[serde(default)]
    secure_cookies: bool,
    /// origin of the frontend, allowed to send credentialed requests
    allowed_origin: Option<String>,
    #[validate(custom = "valid_url")]
    #[serde(default = "default_frontend_url")]
    frontend_url: String,
    #[validate(custom = "valid_url")]
    #[serde(default = "default_mail_api_url")]
    mail_api_url: String,
    /// when missing, emails are logged instead of sent
    mail_api_key: Option<String>,
    #[serde(default = "default_mail_from")]
    mail_from: String,
    /// the interval in seconds between cleanup sweeps
    #[serde(default = "default_cleanup_interval")]
    cleanup_interval: u64,
    /// matches and events are removed this many hours after they ended
    #[serde(default = "default_cleanup_grace_hours")]
    cleanup_grace_hours: i64,
    sentry_dsn: Option<String>,
    /// defaults to localhost, which shouldn't cause issues if you're using udp
    opentelemetry_endpoint: Option<String>,
}

fn default_frontend_url() -> String {
    String::from("http://localhost:3000")
}

fn default_mail_api_url() -> String {
    String::from("https://api.resend.com/emails")
}

fn default_mail_from() -> String {
    String::from("padelhub <no-reply@padelhub.app>")
}

fn default_cleanup_interval() -> u64 {
    600
}

fn default_cleanup_grace_hours() -> i64 {
    2
}

fn valid_url(url: &str) -> Result<(), ValidationError> {
    Url::parse(url)
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_url"))
}

lazy_static! {
    static ref CONFIG: Config = match envy::from_env::<Config>() {
        Ok(config) => {
            match config.validate() {
                Ok(()) => config,
                Err(e) => panic!("invalid environment variable: {}", e),
            }
        }
        Err(error) => panic!("Missing or incorrect environment variable: {}", error),
    };
}

impl Config {
    /// load and validate the environment, panics on invalid configuration
    pub fn init() {
        lazy_static::initialize(&CONFIG);
    }

    pub fn database_url() -> &'static str {
        CONFIG.database_url.as_ref()
    }

    pub fn api_host() -> &'static str {
        match &CONFIG.api_host {
            Some(host) => host.as_ref(),
            None => "localhost",
        }
    }

    pub fn api_port() -> usize {
        CONFIG.api_port.unwrap_or(8080)
    }

    pub fn session_private_key() -> &'static str {
        CONFIG.session_private_key.as_ref()
    }

    pub fn secure_cookies() -> bool {
        CONFIG.secure_cookies
    }

    pub fn allowed_origin() -> Option<&'static str> {
        CONFIG.allowed_origin.as_ref().map(|origin| origin.as_ref())
    }

    pub fn frontend_url() -> &'static str {
        CONFIG.frontend_url.trim_end_matches('/')
    }

    pub fn mail_api_url() -> &'static str {
        CONFIG.mail_api_url.as_ref()
    }

    pub fn mail_api_key() -> Option<&'static str> {
        CONFIG.mail_api_key.as_ref().map(|key| key.as_ref())
    }

    pub fn mail_from() -> &'static str {
        CONFIG.mail_from.as_ref()
    }

    pub fn cleanup_interval() -> Duration {
        Duration::from_secs(CONFIG.cleanup_interval)
    }

    pub fn cleanup_grace() -> chrono::Duration {
        chrono::Duration::hours(CONFIG.cleanup_grace_hours)
    }

    pub fn sentry_dsn() -> Option<&'static str> {
        CONFIG.sentry_dsn.as_ref().map(|dsn| dsn.as_ref())
    }

    pub fn opentelemetry_endpoint() -> &'static str {
        match &CONFIG.opentelemetry_endpoint {
            Some(endpoint) => endpoint.as_ref(),
            None => "127.0.0.1:6831",
        }
    }
}
