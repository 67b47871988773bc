use serde::Deserialize;
use serde_with::serde_as;
use strum::{Display, EnumString};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub upstream: UpstreamSettings,
}

#[serde_as]
#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    /// Browser origins allowed by CORS; an empty list allows any origin.
    pub cors_allowed_origins: Vec<String>,
}

#[serde_as]
#[derive(Deserialize, Clone)]
pub struct UpstreamSettings {
    /// Redmine used when a request carries no `x-redmine-url` header.
    pub default_url: Option<String>,
    /// The relay exists to bridge self-signed Redmine installs, so upstream
    /// certificate verification can be switched off.
    pub accept_invalid_certs: bool,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub timeout_seconds: u64,
}

/// Layered load: `config/base.yaml`, then the environment file picked by
/// `TAKT_ENVIRONMENT` (default `local`), then `TAKT__`-prefixed env vars.
pub fn read_config() -> Result<Settings, config::ConfigError> {
    let cwd = std::env::current_dir().expect("Failed to determine the current directory");
    let config_dir = cwd.join("config");

    let environment: Environment = std::env::var("TAKT_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .parse()
        .expect("TAKT_ENVIRONMENT must be 'local' or 'production'");
    let env_file = config_dir.join(format!("{}.yaml", environment));

    config::Config::builder()
        .add_source(config::File::from(config_dir.join("base.yaml")))
        .add_source(config::File::from(env_file))
        .add_source(
            config::Environment::with_prefix("TAKT")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize::<Settings>()
}

#[derive(Display, Debug, EnumString)]
pub enum Environment {
    #[strum(ascii_case_insensitive, serialize = "local")]
    Local,
    #[strum(ascii_case_insensitive, serialize = "production")]
    Production,
}
