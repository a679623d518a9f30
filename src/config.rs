//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) una sola vez y expone `AppConfig`.
use std::env;

use steps_persistence::{init_dotenv, DbConfig};

/// Variable propia para el filtro de logs; si falta se usa `RUST_LOG`.
pub const LOG_ENV: &str = "STEPFLOW_LOG";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Directiva de `EnvFilter` (p.ej. `info,steps_core=debug`).
    pub log_filter: String,
    /// `None` si no hay `DATABASE_URL`: sólo está disponible la demo en memoria.
    pub database: Option<DbConfig>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        init_dotenv();
        Self { log_filter: resolve_log_filter(env::var(LOG_ENV).ok(), env::var("RUST_LOG").ok()),
               database: DbConfig::from_env().ok() }
    }

    pub fn with_log_filter(mut self, filter: Option<String>) -> Self {
        if let Some(f) = filter.filter(|f| !f.trim().is_empty()) {
            self.log_filter = f;
        }
        self
    }
}

fn resolve_log_filter(own: Option<String>, rust_log: Option<String>) -> String {
    own.into_iter()
       .chain(rust_log)
       .find(|v| !v.trim().is_empty())
       .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}
