//! Install job domain types.
//!
//! An install job is identified by the title's `app_name` and moves through a
//! small state machine:
//!
//! ```text
//! Pending ──promote──▶ Processing ──▶ Success | Failed
//!    │                   │   ▲
//!    │                 pause resume
//!    │                   ▼   │
//!    │                  Paused
//!    │                   │
//!    └──cancel──▶ Cancelled ◀── Cancelling ◀── cancel (Processing | Paused)
//! ```

mod errors;
mod types;

pub use errors::{InstallError, InstallResult};
pub use types::{InstallAction, InstallItem, InstallStatus};
