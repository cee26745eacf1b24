//! Parsing of legendary's console output.
//!
//! legendary logs progress as free-form text on stderr. Only a handful of
//! line shapes carry metrics; each maps 1:1 to an [`EngineLine`] variant:
//!
//! ```text
//! [DLManager] INFO: = Progress: 41.30% (1186/2871), Running for 00:01:12, ETA: 00:01:43
//! [DLManager] INFO:  - Downloaded: 1.21 GiB, Written: 1.35 GiB
//! [DLManager] INFO:  + Download	- 17.42 MiB/s (raw) / 28.90 MiB/s (decompressed)
//! [cli] INFO: Install size: 3.27 GiB
//! [cli] INFO: Verification progress: 120/345 (34.8%) [88.1 MiB/s]
//! [cli] ERROR: Game is not installed or does not exist.
//! ```
//!
//! Anything else is reported as [`LineParseError::Unrecognized`] and dropped
//! by the caller.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Why a line could not be turned into an [`EngineLine`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineParseError {
    #[error("Line does not carry progress information")]
    Unrecognized,

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Unknown size unit: {0}")]
    UnknownUnit(String),
}

// ============================================================================
// Engine Lines
// ============================================================================

/// A recognised engine output line, sizes already converted to MiB.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineLine {
    /// Overall completion.
    Progress {
        /// Percentage as printed (not yet clamped).
        percentage: f64,
    },

    /// Cumulative transfer counters.
    Written {
        /// MiB downloaded so far.
        downloaded_mib: f64,
        /// MiB written to disk so far.
        written_mib: f64,
    },

    /// Instantaneous raw download throughput.
    DownloadSpeed {
        /// MiB per second.
        raw_mib_per_sec: f64,
    },

    /// Expected size on disk after install.
    InstallSize {
        /// Total MiB.
        total_mib: f64,
    },

    /// Repair/verify progress.
    Verification {
        /// Percentage as printed (not yet clamped).
        percentage: f64,
        /// Read throughput in MiB per second.
        mib_per_sec: f64,
    },

    /// An error reported by the engine.
    Error {
        /// Message text after `ERROR:`.
        message: String,
    },
}

// ============================================================================
// Parsing
// ============================================================================

const NUM: &str = r"([0-9]+(?:\.[0-9]+)?)";
const UNIT: &str = r"([KMGT]i?B|B)";

static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| compile(&format!(r"= Progress: {NUM}%")));

static WRITTEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"- Downloaded: {NUM} {UNIT}, Written: {NUM} {UNIT}"
    ))
});

static SPEED_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"\+ Download\s*-\s*{NUM} {UNIT}/s \(raw\)")));

static INSTALL_SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"Install size: {NUM} {UNIT}")));

static VERIFY_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"Verification progress: \d+/\d+ \({NUM}%\) \[{NUM} {UNIT}/s\]"
    ))
});

static ERROR_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?:^|[\s\]])ERROR: (.+?)\s*$"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("engine line patterns are valid regexes")
}

/// Parse one line of engine output.
pub fn parse_line(line: &str) -> Result<EngineLine, LineParseError> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(caps) = PROGRESS_RE.captures(line) {
        return Ok(EngineLine::Progress {
            percentage: number(&caps, 1)?,
        });
    }
    if let Some(caps) = WRITTEN_RE.captures(line) {
        return Ok(EngineLine::Written {
            downloaded_mib: size_mib(&caps, 1, 2)?,
            written_mib: size_mib(&caps, 3, 4)?,
        });
    }
    if let Some(caps) = SPEED_RE.captures(line) {
        return Ok(EngineLine::DownloadSpeed {
            raw_mib_per_sec: size_mib(&caps, 1, 2)?,
        });
    }
    if let Some(caps) = INSTALL_SIZE_RE.captures(line) {
        return Ok(EngineLine::InstallSize {
            total_mib: size_mib(&caps, 1, 2)?,
        });
    }
    if let Some(caps) = VERIFY_RE.captures(line) {
        return Ok(EngineLine::Verification {
            percentage: number(&caps, 1)?,
            mib_per_sec: size_mib(&caps, 2, 3)?,
        });
    }
    if let Some(caps) = ERROR_RE.captures(line) {
        let message = caps.get(1).map_or("", |m| m.as_str()).to_string();
        if !message.is_empty() {
            return Ok(EngineLine::Error { message });
        }
    }

    Err(LineParseError::Unrecognized)
}

/// Convert `value` in `unit` to MiB. KB/MB/GB/TB are read as binary units.
pub fn to_mib(value: f64, unit: &str) -> Result<f64, LineParseError> {
    let factor = match unit {
        "B" => 1.0 / (1024.0 * 1024.0),
        "KiB" | "KB" => 1.0 / 1024.0,
        "MiB" | "MB" => 1.0,
        "GiB" | "GB" => 1024.0,
        "TiB" | "TB" => 1024.0 * 1024.0,
        other => return Err(LineParseError::UnknownUnit(other.to_string())),
    };
    Ok(value * factor)
}

fn number(caps: &Captures<'_>, idx: usize) -> Result<f64, LineParseError> {
    let raw = caps.get(idx).map_or("", |m| m.as_str());
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LineParseError::InvalidNumber(raw.to_string()))
}

fn size_mib(caps: &Captures<'_>, value_idx: usize, unit_idx: usize) -> Result<f64, LineParseError> {
    let value = number(caps, value_idx)?;
    let unit = caps.get(unit_idx).map_or("", |m| m.as_str());
    to_mib(value, unit)
}

// ============================================================================
// Tests
// ============================================================================
