//! stepflow
//!
//! Binario y utilidades de aplicación sobre los crates del workspace:
//! - `config`: carga de `.env` y filtro de logs.
//! - `logging`: subscriber de `tracing` con `EnvFilter`.
//! - `cli`: comandos clap sobre `WorkflowService`.
//! - `demo`: flujo de siniestros en memoria.

pub mod cli;
pub mod config;
pub mod demo;
pub mod errors;
pub mod logging;

pub use cli::{run, Cli, Command};
pub use config::AppConfig;
pub use errors::AppError;
