use thiserror::Error;

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no backend configured: set SUPABASE_URL and SUPABASE_ANON_KEY, or DATABASE_URL")]
    NoBackend,

    #[error("REST backend requested but {0} is not set")]
    MissingRest(&'static str),

    #[error("Postgres backend requested but DATABASE_URL is not set")]
    MissingDatabaseUrl,

    #[error("invalid DIAG_TIMEOUT_SECS value {0:?}: expected a positive number of seconds")]
    InvalidTimeout(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    Auto,
    Rest,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendTarget {
    Rest { url: String, anon_key: String },
    Postgres { database_url: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub supabase_url: Option<String>,
    pub anon_key: Option<String>,
    pub database_url: Option<String>,
    pub timeout_secs: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_secs = match get("DIAG_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            supabase_url: get("SUPABASE_URL"),
            anon_key: get("SUPABASE_ANON_KEY").or_else(|| get("SUPABASE_KEY")),
            database_url: get("DATABASE_URL"),
            timeout_secs,
        })
    }

    pub fn target(&self, kind: BackendKind) -> Result<BackendTarget, ConfigError> {
        match kind {
            BackendKind::Rest => self.rest_target(),
            BackendKind::Postgres => self.postgres_target(),
            BackendKind::Auto => {
                if self.supabase_url.is_some() && self.anon_key.is_some() {
                    self.rest_target()
                } else if self.database_url.is_some() {
                    self.postgres_target()
                } else {
                    Err(ConfigError::NoBackend)
                }
            }
        }
    }

    fn rest_target(&self) -> Result<BackendTarget, ConfigError> {
        let url = self
            .supabase_url
            .clone()
            .ok_or(ConfigError::MissingRest("SUPABASE_URL"))?;
        let anon_key = self
            .anon_key
            .clone()
            .ok_or(ConfigError::MissingRest("SUPABASE_ANON_KEY"))?;
        Ok(BackendTarget::Rest { url, anon_key })
    }

    fn postgres_target(&self) -> Result<BackendTarget, ConfigError> {
        self.database_url
            .clone()
            .map(|database_url| BackendTarget::Postgres { database_url })
            .ok_or(ConfigError::MissingDatabaseUrl)
    }
}
