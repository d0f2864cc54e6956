use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Receituario";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Logo image looked up inside the static directory.
pub const LOGO_FILE_NAME: &str = "perobal_logo.png";
pub const DATABASE_FILE_NAME: &str = "receitas.db";

pub const DEFAULT_ADDR: &str = "0.0.0.0:5001";
pub const DEFAULT_STATIC_DIR: &str = "static";

pub const ENV_ADDR: &str = "RECEITUARIO_ADDR";
pub const ENV_DB: &str = "RECEITUARIO_DB";
pub const ENV_STATIC_DIR: &str = "RECEITUARIO_STATIC_DIR";

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "receituario_lib=info,receituario=info"
}

/// Per-user data directory, or the working directory when the platform has none.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub static_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Blank values
    /// count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let default_addr = SocketAddr::from(([0, 0, 0, 0], 5001));
        let addr = match get(ENV_ADDR) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
                tracing::warn!(value = %raw, error = %e, "Invalid {ENV_ADDR}, using {DEFAULT_ADDR}");
                default_addr
            }),
            None => default_addr,
        };

        Self {
            addr,
            db_path: get(ENV_DB)
                .map(PathBuf::from)
                .unwrap_or_else(|| app_data_dir().join(DATABASE_FILE_NAME)),
            static_dir: get(ENV_STATIC_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
        }
    }

    pub fn logo_path(&self) -> PathBuf {
        self.static_dir.join(LOGO_FILE_NAME)
    }
}
