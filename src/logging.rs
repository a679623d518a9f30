//! Inicialización de logs: `tracing-subscriber` con `EnvFilter`.
//! Los crates de la librería emiten con `log`; el puente `tracing-log`
//! que instala `try_init` los redirige a este subscriber.
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::DEFAULT_LOG_FILTER;
use crate::errors::AppError;

pub fn init_logging(filter: &str) -> Result<(), AppError> {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|e| {
                                                   eprintln!("invalid log filter '{filter}': {e}; using '{DEFAULT_LOG_FILTER}'");
                                                   EnvFilter::new(DEFAULT_LOG_FILTER)
                                               });
    tracing_subscriber::registry().with(env_filter)
                                  .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                                  .try_init()
                                  .map_err(|e| AppError::Config(format!("logger: {e}")))
}
