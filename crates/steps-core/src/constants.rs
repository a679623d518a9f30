//! Constantes del motor core.
//!
//! Valores que participan en decisiones del state machine y que deben
//! mantenerse estables entre backends (in-memory y Postgres).

/// Nombre del status de cancelación que `cancel()` crea sobre el step final
/// cuando éste no define ninguno.
pub const DEFAULT_CANCELLATION_STATUS_NAME: &str = "Cancelled";

/// Descripción asociada al status de cancelación creado dinámicamente.
pub const DEFAULT_CANCELLATION_STATUS_DESCRIPTION: &str = "Created automatically when the workflow instance was cancelled";
