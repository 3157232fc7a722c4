pub mod load;
pub mod types;

pub use load::{load_default, load_from_path, DEFAULT_CONFIG_FILE};
pub use types::{AppConfig, ClassConfig, LoggingConfig, PersistenceConfig, Ttl};
