use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::{warn, LevelFilter};
use secrecy::{ExposeSecret, SecretString};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "0.0.0.0")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 8080)]
    pub port: u16,

    /// Shared secret clients must present as `Authorization: Bearer <token>`.
    /// Leave unset to accept every request.
    #[arg(long, env, hide_env_values = true)]
    auth_token: Option<SecretString>,

    /// Path to a file holding the shared secret. Takes precedence over
    /// `AUTH_TOKEN` when the file is readable.
    #[arg(long, env)]
    auth_token_file: Option<PathBuf>,

    /// Milliseconds between two data events on a stream
    #[arg(long, env, default_value_t = 1000)]
    pub event_interval_ms: u64,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("0.0.0.0")
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.interface(), self.port)
    }

    pub fn event_interval(&self) -> Duration {
        Duration::from_millis(self.event_interval_ms)
    }

    pub fn set_auth_token(mut self, auth_token: Option<String>) -> Self {
        self.auth_token = auth_token.map(SecretString::from);
        self
    }

    pub fn set_auth_token_file(mut self, auth_token_file: Option<PathBuf>) -> Self {
        self.auth_token_file = auth_token_file;
        self
    }

    /// The effective shared secret, if any.
    ///
    /// A readable token file wins over the plain value. Either source is trimmed,
    /// and an empty result means no token is configured.
    pub fn auth_token(&self) -> Option<SecretString> {
        let from_file = self
            .auth_token_file
            .as_ref()
            .and_then(|path| match fs::read_to_string(path) {
                Ok(contents) => Some(contents),
                Err(e) => {
                    warn!("Unable to read auth token file {}: {e}", path.display());
                    None
                }
            });

        from_file
            .or_else(|| {
                self.auth_token
                    .as_ref()
                    .map(|token| token.expose_secret().clone())
            })
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .map(SecretString::from)
    }
}
