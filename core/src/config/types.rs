use serde::{Deserialize, Serialize};

/// Per-class synchronisation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassConfig {
    /// Prepended to every external key of the class.
    #[serde(default)]
    pub url_prefix: String,

    /// Delete external parameters the class does not own on every write.
    #[serde(default = "default_true")]
    pub url_selfish: bool,

    /// A null value removes the parameter instead of writing an empty string.
    #[serde(default = "default_true")]
    pub ignore_none_url: bool,

    /// Re-assert missing owned parameters on every access.
    #[serde(default = "default_true")]
    pub restore_url_on_touch: bool,

    /// Classes whose parameters survive this class's selfish cleanup.
    #[serde(default)]
    pub share_url_with: Vec<String>,

    /// Expiry override for the persistence adapter.
    #[serde(default)]
    pub ttl: Option<Ttl>,
}

fn default_true() -> bool {
    true
}

impl Default for ClassConfig {
    fn default() -> Self {
        Self {
            url_prefix: String::new(),
            url_selfish: true,
            ignore_none_url: true,
            restore_url_on_touch: true,
            share_url_with: Vec::new(),
            ttl: None,
        }
    }
}

impl ClassConfig {
    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    pub fn url_selfish(mut self, selfish: bool) -> Self {
        self.url_selfish = selfish;
        self
    }

    pub fn ignore_none_url(mut self, ignore: bool) -> Self {
        self.ignore_none_url = ignore;
        self
    }

    pub fn restore_url_on_touch(mut self, restore: bool) -> Self {
        self.restore_url_on_touch = restore;
        self
    }

    pub fn share_url_with<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.share_url_with = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Expiry of a persisted class namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ttl {
    NoExpiry,
    Seconds(u64),
}

impl Ttl {
    pub fn as_secs(self) -> Option<u64> {
        match self {
            Ttl::NoExpiry => None,
            Ttl::Seconds(s) => Some(s),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "page_state=debug" or "page_state.persistence=trace".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "warn,page_state=info,pstate=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Namespace of every stored key: `<key_prefix>:<session>:<Class>`.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Seconds before a stored namespace expires; unset means never.
    #[serde(default)]
    pub default_ttl: Option<u64>,

    /// Fixed session identity. Unset uses the runtime session id.
    #[serde(default)]
    pub session_id: Option<String>,
}

fn default_key_prefix() -> String {
    "st_page_state".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            key_prefix: default_key_prefix(),
            default_ttl: None,
            session_id: None,
        }
    }
}
