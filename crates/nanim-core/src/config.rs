//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::ik::IkSettings;

/// Tunables shared by graphs created from one registry. Defaults match the
/// shipped behavior; expand as needed without breaking API.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Capture interval for the recorder, seconds per sample (~30 Hz).
    pub record_sample_rate: f32,
    /// Sampling step used when baking an editing session.
    pub bake_sample_rate: f32,
    /// Retained undo entries before the oldest are dropped.
    pub max_history_entries: usize,
    pub ik: IkSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            record_sample_rate: 1.0 / 30.0,
            bake_sample_rate: 1.0 / 30.0,
            max_history_entries: 64,
            ik: IkSettings::default(),
        }
    }
}
