//! Observability infrastructure for apiferry (logging and analytics).

pub mod analytics;
pub mod logging;

pub use analytics::{AnalyticsSink, TracingSink};
pub use logging::init_logging;
