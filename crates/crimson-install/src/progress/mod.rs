//! Progress tracking and throttling.
//!
//! Turns raw engine output into `InstallItem` metrics and rate-limits the
//! resulting progress events.

mod parser;
mod reporter;
mod throttle;

pub use parser::{EngineLine, LineParseError, parse_line, to_mib};
pub use reporter::ProgressReporter;
pub use throttle::ProgressThrottle;
