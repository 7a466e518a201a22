//! Optional JSON configuration file.
//!
//! Every section falls back to the library defaults, so a file only needs the
//! values it changes:
//!
//! ```json
//! { "screening": { "reporting_delay_days": 60, "detectors": { "sigma_threshold": 2.5 } } }
//! ```

use anyhow::{Context, Result};
use ronda_data::PointInTimePolicy;
use ronda_eval::ForwardReturnConfig;
use ronda_screen::ScreeningConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings read from `--config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct CliConfig {
    pub(crate) screening: ScreeningConfig,
    pub(crate) policy: PointInTimePolicy,
    pub(crate) forward: ForwardReturnConfig,
}

impl CliConfig {
    /// Read the file at `path`, or the defaults when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}
