//! # Calibration Profiles
//!
//! Per-family correction constants that account for board thickness at the
//! folds. Glued tubular styles crush the flutes at each crease, so they lose
//! almost no length per 90° fold but gain height; tray styles roll the board
//! over each crease and cost one full thickness per fold.
//!
//! | Family  | C90 (setback) | HC90 (height gain) | Glue correction | Slot width |
//! |---------|---------------|--------------------|-----------------|------------|
//! | Tubular | 0.5           | 1.7·d              | 0.5             | d + 1.0    |
//! | Tray    | d             | d                  | d               | d + 2.0    |
//! | Generic | d             | d                  | d               | d + 2.0    |
//!
//! ## Example
//!
//! ```rust
//! use blank_core::calibration::{classify, CalibrationConstants, ModelFamily};
//!
//! let family = classify("0201");
//! assert_eq!(family, ModelFamily::Tubular);
//!
//! let c = CalibrationConstants::for_family(family, 3.0);
//! assert!((c.height_gain_90 - 5.1).abs() < 1e-9);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::normalize_model_code;

/// Board family derived from the first digit of a model code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    /// Glued/folded carton styles (02xx, 05xx, 06xx, 07xx)
    Tubular,
    /// Tray and telescoping styles (03xx, 04xx)
    Tray,
    /// Anything else
    Generic,
}

impl ModelFamily {
    /// Display name for the family
    pub fn label(&self) -> &'static str {
        match self {
            ModelFamily::Tubular => "Tubular",
            ModelFamily::Tray => "Tray",
            ModelFamily::Generic => "Generic",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a model code by its first significant digit.
///
/// The code is normalized first, so "0201" and "201" are both tubular.
pub fn classify(model: &str) -> ModelFamily {
    match normalize_model_code(model).chars().next() {
        Some('2' | '5' | '6' | '7') => ModelFamily::Tubular,
        Some('3' | '4') => ModelFamily::Tray,
        _ => ModelFamily::Generic,
    }
}

/// Thickness corrections for one (family, d) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConstants {
    /// Length lost per 90° crease (mm), bound to `C90x` / `C90y`
    pub crease_setback_90: f64,
    /// Height gained per 90° crease (mm), bound to `HC90x`
    pub height_gain_90: f64,
    /// Glue-flap correction (mm), bound to `GlueCorr`
    pub glue_correction: f64,
    /// Slot width (mm), bound to `SlotWidth`
    pub slot_width: f64,
}

impl CalibrationConstants {
    /// Derive the constants for a family and board thickness `d` (mm).
    pub fn for_family(family: ModelFamily, d: f64) -> Self {
        match family {
            ModelFamily::Tubular => CalibrationConstants {
                crease_setback_90: 0.5,
                height_gain_90: 1.7 * d,
                glue_correction: 0.5,
                slot_width: d + 1.0,
            },
            ModelFamily::Tray | ModelFamily::Generic => CalibrationConstants {
                crease_setback_90: d,
                height_gain_90: d,
                glue_correction: d,
                slot_width: d + 2.0,
            },
        }
    }
}

/// Corrugation profile, which fixes the nominal board thickness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flute {
    /// Single wall B flute
    B,
    /// Single wall C flute
    C,
    /// Double wall B+C
    BC,
    /// Micro flute
    E,
    /// Double wall E+B
    EB,
}

impl Flute {
    pub const ALL: [Flute; 5] = [Flute::B, Flute::C, Flute::BC, Flute::E, Flute::EB];

    /// Nominal thickness `d` in mm
    pub fn thickness_mm(&self) -> f64 {
        match self {
            Flute::B => 3.0,
            Flute::C => 4.0,
            Flute::BC => 6.9,
            Flute::E => 1.5,
            Flute::EB => 4.4,
        }
    }

    /// Short code as printed on board specs
    pub fn code(&self) -> &'static str {
        match self {
            Flute::B => "B",
            Flute::C => "C",
            Flute::BC => "BC",
            Flute::E => "E",
            Flute::EB => "EB",
        }
    }

    /// Parse a flute code, case-insensitive.
    pub fn from_code(code: &str) -> Option<Flute> {
        let code = code.trim();
        Flute::ALL.into_iter().find(|f| f.code().eq_ignore_ascii_case(code))
    }
}
