//! # Topology Assembly
//!
//! Turns a resolved variable set into the two blank dimensions. Shell sizes
//! come from the catalog when it provides them (`Lss`, `Wss`, `Hss`, `HssY`,
//! `GL`) and from the calibration constants otherwise; any such fallback marks
//! the result as estimated.
//!
//! ## Assembly Rules
//!
//! | Rule            | Applies to                                  | Width                    | Height                  |
//! |-----------------|---------------------------------------------|--------------------------|-------------------------|
//! | Glued tubular   | tubular family with a glue flap             | GL + 2(Lss + Wss) - s    | top + Hss + bottom      |
//! | Fixed mailer    | model 0427                                  | closed form (see below)  | closed form             |
//! | Telescope tray  | tray family, 03xx                           | Lss + 2·Hss              | Wss + 2·Hss             |
//! | Generic         | everything else                             | 2L + 2W + 50             | H + W + 50              |
//!
//! `s` is `2d` for crash-lock styles (07xx) and zero otherwise. Results that
//! are not finite and strictly positive fall back to the generic rule.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calibration::{classify, CalibrationConstants, ModelFamily};
use crate::catalog::normalize_model_code;
use crate::input::BlankInput;
use crate::resolver::ResolvedVariableSet;
use crate::settings::EngineSettings;

/// Which assembly rule produced a blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssemblyRule {
    /// Tubular styles joined by a glue flap
    GluedTubular,
    /// The 0427 mailer with asymmetric ear flaps
    FixedMailer,
    /// One half of a telescoping tray
    TelescopeTray,
    /// Production-unvalidated estimate
    Generic,
}

impl AssemblyRule {
    /// Display name for the rule
    pub fn label(&self) -> &'static str {
        match self {
            AssemblyRule::GluedTubular => "Glued tubular",
            AssemblyRule::FixedMailer => "Mailer with ear flaps",
            AssemblyRule::TelescopeTray => "Telescope tray",
            AssemblyRule::Generic => "Generic estimate",
        }
    }

    /// Pick the rule for a normalized model code.
    pub fn select(
        model: &str,
        family: ModelFamily,
        resolved: &ResolvedVariableSet,
        mentions_glue_flap: bool,
    ) -> Self {
        match family {
            ModelFamily::Tubular if resolved.contains_key("GL") || mentions_glue_flap => {
                AssemblyRule::GluedTubular
            }
            ModelFamily::Tray if model == "427" => AssemblyRule::FixedMailer,
            ModelFamily::Tray if model.starts_with('3') => AssemblyRule::TelescopeTray,
            _ => AssemblyRule::Generic,
        }
    }
}

impl fmt::Display for AssemblyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Flat blank size in mm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlankDimensions {
    /// Blank width (across the panels)
    pub width: f64,
    /// Blank height (flap to flap)
    pub height: f64,
    /// Human-readable profile, e.g. "FEFCO 0201 - Glued tubular"
    pub profile_label: String,
    /// Some value came from a fallback rather than the catalog
    pub estimated: bool,
    /// Rule that produced the dimensions
    pub rule: AssemblyRule,
}

impl BlankDimensions {
    /// Blank area in square meters.
    pub fn area_m2(&self) -> f64 {
        self.width * self.height / 1_000_000.0
    }
}

/// Pad a normalized code back to the four-digit catalog form ("201" -> "0201").
pub fn display_code(model: &str) -> String {
    if !model.is_empty() && model.len() < 4 && model.chars().all(|c| c.is_ascii_digit()) {
        format!("{model:0>4}")
    } else {
        model.to_string()
    }
}

/// Resolved values with calibration fallbacks, remembering whether any fallback was used.
struct Shell<'a> {
    resolved: &'a ResolvedVariableSet,
    estimated: bool,
}

impl Shell<'_> {
    fn get(&mut self, name: &str, fallback: f64) -> f64 {
        match self.resolved.get(name) {
            Some(value) => *value,
            None => {
                debug!("'{name}' not resolved, using fallback {fallback}");
                self.estimated = true;
                fallback
            }
        }
    }

    fn optional(&self, name: &str) -> Option<f64> {
        self.resolved.get(name).copied()
    }
}

/// Assembles blanks from resolved variables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopologyAssembler {
    glue_flap_width: f64,
    generic_margin: f64,
}

impl Default for TopologyAssembler {
    fn default() -> Self {
        TopologyAssembler::from_settings(&EngineSettings::default())
    }
}

impl TopologyAssembler {
    pub fn from_settings(settings: &EngineSettings) -> Self {
        TopologyAssembler {
            glue_flap_width: settings.glue_flap_width_mm,
            generic_margin: settings.generic_margin_mm,
        }
    }

    /// Assemble the blank for `input` from its resolved variables.
    ///
    /// `mentions_glue_flap` tells whether the model's formula text references
    /// the glue-flap width function.
    pub fn assemble(
        &self,
        input: &BlankInput,
        resolved: &ResolvedVariableSet,
        mentions_glue_flap: bool,
    ) -> BlankDimensions {
        let model = normalize_model_code(&input.model);
        let family = classify(&model);
        let constants = CalibrationConstants::for_family(family, input.thickness);
        let rule = AssemblyRule::select(&model, family, resolved, mentions_glue_flap);

        let mut shell = Shell {
            resolved,
            estimated: false,
        };
        let assembled = match rule {
            AssemblyRule::GluedTubular => Some(self.glued_tubular(&model, input, &constants, &mut shell)),
            AssemblyRule::FixedMailer => Some(fixed_mailer(input, &constants, &mut shell)),
            AssemblyRule::TelescopeTray => Some(telescope_tray(input, &constants, &mut shell)),
            AssemblyRule::Generic => None,
        };

        match assembled {
            Some((width, height)) if is_positive(width) && is_positive(height) => BlankDimensions {
                width,
                height,
                profile_label: format!("FEFCO {} - {}", display_code(&model), rule.label()),
                estimated: shell.estimated,
                rule,
            },
            Some((width, height)) => {
                debug!("Model {model}: {rule} gave {width} x {height}, using generic estimate");
                self.generic(&model, input)
            }
            None => self.generic(&model, input),
        }
    }

    fn glued_tubular(
        &self,
        model: &str,
        input: &BlankInput,
        constants: &CalibrationConstants,
        shell: &mut Shell<'_>,
    ) -> (f64, f64) {
        let d = input.thickness;
        let lss = shell.get("Lss", input.length + constants.crease_setback_90 * 2.0);
        let wss = shell.get("Wss", input.width + constants.crease_setback_90 * 2.0);
        let hss = shell.get("Hss", input.height + constants.height_gain_90);
        let gl = shell.get("GL", self.glue_flap_width);

        let setback = if model.starts_with('7') { 2.0 * d } else { 0.0 };
        let width = gl + 2.0 * (lss + wss) - setback;

        // 0203 flaps overlap fully, everything else meets in the middle
        let flap = shell.optional("FH").unwrap_or(match model {
            "203" => wss - d,
            _ => wss / 2.0,
        });
        // 0200 has no top flaps
        let top = if model == "200" { 0.0 } else { flap };
        let bottom = shell
            .optional("FH_B")
            .or_else(|| shell.optional("Ext"))
            .unwrap_or(match model {
                "215" => wss / 2.0 + wss / 3.0,
                _ => flap,
            });

        (width, top + hss + bottom)
    }

    fn generic(&self, model: &str, input: &BlankInput) -> BlankDimensions {
        BlankDimensions {
            width: 2.0 * input.length + 2.0 * input.width + self.generic_margin,
            height: input.height + input.width + self.generic_margin,
            profile_label: format!("FEFCO {} - {}", display_code(model), AssemblyRule::Generic.label()),
            estimated: true,
            rule: AssemblyRule::Generic,
        }
    }
}

fn fixed_mailer(input: &BlankInput, constants: &CalibrationConstants, shell: &mut Shell<'_>) -> (f64, f64) {
    let (h, d) = (input.height, input.thickness);
    let lss = shell.get("Lss", input.length + constants.crease_setback_90 * 2.0);
    let wss = shell.get("Wss", input.width + constants.crease_setback_90 * 2.0);
    let hss_y = shell.get("HssY", h + 2.0 * d);

    let width = (h - (3.0 * d + 1.0)) + wss + hss_y + wss + (hss_y + 1.5 * d);
    let height = 2.0 * (hss_y + 14.0) + 2.0 * (hss_y - 0.5 * d) + lss;
    (width, height)
}

fn telescope_tray(input: &BlankInput, constants: &CalibrationConstants, shell: &mut Shell<'_>) -> (f64, f64) {
    let lss = shell.get("Lss", input.length + constants.crease_setback_90 * 2.0);
    let wss = shell.get("Wss", input.width + constants.crease_setback_90 * 2.0);
    let hss = shell.get("Hss", input.height + constants.height_gain_90);
    (lss + 2.0 * hss, wss + 2.0 * hss)
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
