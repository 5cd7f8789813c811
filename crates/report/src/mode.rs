//! Conversion modes
//!
//! Each call carries a [`ConversionMode`]. A process-wide default exists for
//! tooling that cannot thread a mode through (test harnesses, operators);
//! it is read once from [`BYPASS_ENV`] and can be changed with
//! [`set_bypass`]. Concurrent callers that toggle the default race with each
//! other, so prefer an explicit per-call mode.
//!
//! The default is off even under test runners: tests that want bypass ask for
//! [`ConversionMode::Bypass`] explicitly or set [`BYPASS_ENV`].

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

/// Environment variable that enables bypass at process start (`1`, `true`, `yes`)
pub const BYPASS_ENV: &str = "RSREPORT_BYPASS_CONVERSION";

/// Whether binary formats run the real engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    /// Run the conversion engine
    Real,
    /// Skip the engine and return a placeholder payload
    Bypass,
}

impl ConversionMode {
    /// Mode derived from the process-wide bypass flag
    pub fn process_default() -> Self {
        if bypass_enabled() {
            ConversionMode::Bypass
        } else {
            ConversionMode::Real
        }
    }

    pub fn is_bypass(self) -> bool {
        self == ConversionMode::Bypass
    }
}

fn flag() -> &'static AtomicBool {
    static FLAG: OnceLock<AtomicBool> = OnceLock::new();
    FLAG.get_or_init(|| AtomicBool::new(parse_flag(std::env::var(BYPASS_ENV).ok().as_deref())))
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// Set the process-wide bypass default
pub fn set_bypass(enabled: bool) {
    flag().store(enabled, Ordering::SeqCst);
}

/// Current process-wide bypass default
pub fn bypass_enabled() -> bool {
    flag().load(Ordering::SeqCst)
}
