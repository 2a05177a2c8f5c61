//! Built-in plugins shipped with apiferry.

mod auth;
mod headers;
mod telemetry;

pub use auth::{SsoAuthPlugin, AUTH_PRIORITY};
pub use headers::{HeaderInjectPlugin, HEADERS_PRIORITY};
pub use telemetry::{TelemetryPlugin, TELEMETRY_PRIORITY};
