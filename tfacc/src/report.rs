//! Batch reports
//!
//! The text format mirrors `go test -v` output: one `--- PASS`/`--- FAIL`
//! line per scenario followed by its failures (all of them, in the order
//! they were recorded) and cleanup warnings, then a summary line.
//!
//! ```text
//! --- FAIL: rename (41ms)
//!     step 1 [verify] field_equals(name): expected name to be "b", got "a"
//!     warning: [destroy]: Transport error during destroy: 503
//! FAIL: 3 passed, 1 failed
//! ```

use crate::error::Result;
use crate::result::ScenarioResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub results: Vec<ScenarioResult>,
}

impl Report {
    pub fn new(results: Vec<ScenarioResult>) -> Self {
        Self {
            generated_at: Utc::now(),
            results,
        }
    }

    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }

    pub fn result(&self, name: &str) -> Option<&ScenarioResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for result in &self.results {
            let status = if result.passed { "PASS" } else { "FAIL" };
            let _ = writeln!(out, "--- {}: {} ({}ms)", status, result.name, result.duration_ms);
            for failure in &result.failures {
                let _ = writeln!(out, "    {}: {}", failure.location(), failure.message);
            }
            for warning in &result.warnings {
                let _ = writeln!(out, "    warning: {}: {}", warning.location(), warning.message);
            }
        }
        let status = if self.passed() { "PASS" } else { "FAIL" };
        let _ = writeln!(
            out,
            "{}: {} passed, {} failed",
            status,
            self.passed_count(),
            self.failed_count()
        );
        out
    }
}
