//! # Blank Input
//!
//! The caller's side of a computation: model code, internal dimensions and
//! board thickness. Shared by the engine and the assembler.

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};

/// Internal box dimensions and board thickness for one blank.
///
/// ## JSON Example
///
/// ```json
/// { "model": "0201", "length": 300.0, "width": 200.0, "height": 150.0, "thickness": 3.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlankInput {
    /// Model code, with or without leading zeros
    pub model: String,
    /// Internal length L (mm)
    pub length: f64,
    /// Internal width W (mm)
    pub width: f64,
    /// Internal height H (mm)
    pub height: f64,
    /// Board thickness d (mm)
    pub thickness: f64,
}

impl BlankInput {
    pub fn new(model: impl Into<String>, length: f64, width: f64, height: f64, thickness: f64) -> Self {
        BlankInput {
            model: model.into(),
            length,
            width,
            height,
            thickness,
        }
    }

    /// Reject non-finite or non-positive dimensions.
    pub fn validate(&self) -> EngineResult<()> {
        let fields = [
            ("L", self.length),
            ("W", self.width),
            ("H", self.height),
            ("d", self.thickness),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(EngineError::invalid_input(field, value.to_string(), "Value must be finite"));
            }
            if value <= 0.0 {
                return Err(EngineError::invalid_input(field, value.to_string(), "Value must be positive"));
            }
        }
        Ok(())
    }
}
