//! # Engine Settings
//!
//! Tunable knobs for the blank engine. The defaults reproduce the reference
//! behavior; settings documents are plain JSON so they can live next to the
//! formula table.
//!
//! ```rust
//! use blank_core::settings::EngineSettings;
//!
//! let settings = EngineSettings::from_json(r#"{ "max_passes": 8 }"#).unwrap();
//! assert_eq!(settings.max_passes, 8);
//! assert_eq!(settings.glue_flap_width_mm, 35.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};

/// Number of fixed-point passes run over a model's formula rows
pub const DEFAULT_MAX_PASSES: usize = 5;

/// Standard glue-flap width bound to `GLWidth` (mm)
pub const DEFAULT_GLUE_FLAP_WIDTH_MM: f64 = 35.0;

/// Allowance added on each axis by the generic fallback (mm)
pub const DEFAULT_GENERIC_MARGIN_MM: f64 = 50.0;

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Pass budget for the fixed-point resolver
    pub max_passes: usize,

    /// Stop resolving once a full pass changes no binding
    pub stop_when_stable: bool,

    /// Value returned by the `GLWidth` correction function
    pub glue_flap_width_mm: f64,

    /// Margin used by the generic `2L + 2W + m` / `H + W + m` estimate
    pub generic_margin_mm: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            max_passes: DEFAULT_MAX_PASSES,
            stop_when_stable: true,
            glue_flap_width_mm: DEFAULT_GLUE_FLAP_WIDTH_MM,
            generic_margin_mm: DEFAULT_GENERIC_MARGIN_MM,
        }
    }
}

impl EngineSettings {
    /// Parse and validate a JSON settings document. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let settings: EngineSettings = serde_json::from_str(json).map_err(|e| {
            EngineError::invalid_input("settings", "<json>", e.to_string())
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings values.
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_passes == 0 {
            return Err(EngineError::invalid_input(
                "max_passes",
                "0",
                "At least one resolution pass is required",
            ));
        }
        if !(self.glue_flap_width_mm.is_finite() && self.glue_flap_width_mm > 0.0) {
            return Err(EngineError::invalid_input(
                "glue_flap_width_mm",
                self.glue_flap_width_mm.to_string(),
                "Glue flap width must be positive",
            ));
        }
        if !(self.generic_margin_mm.is_finite() && self.generic_margin_mm > 0.0) {
            return Err(EngineError::invalid_input(
                "generic_margin_mm",
                self.generic_margin_mm.to_string(),
                "Generic margin must be positive",
            ));
        }
        Ok(())
    }
}
