//! # Blank Engine
//!
//! Facade over the whole pipeline:
//!
//! ```text
//! inputs -> CalibrationConstants -> VariableContext -> FormulaResolver -> TopologyAssembler
//!                                                           ^
//!                                                  FormulaCatalog (shared, read-only)
//! ```
//!
//! Every call builds its own constants, context and resolution; nothing is
//! cached between calls, so results depend only on the inputs and the catalog.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use blank_core::catalog::FormulaCatalog;
//! use blank_core::engine::BlankEngine;
//!
//! let engine = BlankEngine::new(Arc::new(FormulaCatalog::reference()));
//! let blank = engine.compute_blank("0201", 300.0, 200.0, 150.0, 3.0).unwrap();
//! assert_eq!(blank.profile_label, "FEFCO 0201 - Glued tubular");
//! assert!(!blank.estimated);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calibration::{classify, CalibrationConstants, ModelFamily};
use crate::catalog::{normalize_model_code, FormulaCatalog};
use crate::context::VariableContext;
use crate::errors::{EngineError, EngineResult};
pub use crate::input::BlankInput;
use crate::resolver::{FormulaResolver, ResolvedVariableSet, UnresolvedRow};
use crate::settings::EngineSettings;
use crate::topology::{BlankDimensions, TopologyAssembler};

/// Name of the glue-flap width function
const GLUE_FLAP_FUNCTION: &str = "GLWidth";

/// Blank plus everything that went into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlankReport {
    pub dimensions: BlankDimensions,
    pub family: ModelFamily,
    pub constants: CalibrationConstants,
    pub resolved: ResolvedVariableSet,
    pub unresolved: Vec<UnresolvedRow>,
    pub passes_run: usize,
}

/// Computes blanks against a shared catalog.
#[derive(Debug, Clone)]
pub struct BlankEngine {
    catalog: Arc<FormulaCatalog>,
    settings: EngineSettings,
}

impl BlankEngine {
    /// Engine with default settings.
    pub fn new(catalog: Arc<FormulaCatalog>) -> Self {
        BlankEngine {
            catalog,
            settings: EngineSettings::default(),
        }
    }

    /// Replace the settings.
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn catalog(&self) -> &FormulaCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Sorted normalized model codes.
    pub fn available_models(&self) -> Vec<String> {
        self.catalog.available_models()
    }

    /// Blank for a model and its internal dimensions.
    pub fn compute_blank(&self, model: &str, l: f64, w: f64, h: f64, d: f64) -> EngineResult<BlankDimensions> {
        self.compute(&BlankInput::new(model, l, w, h, d))
    }

    /// Blank for a [`BlankInput`].
    pub fn compute(&self, input: &BlankInput) -> EngineResult<BlankDimensions> {
        self.compute_report(input).map(|report| report.dimensions)
    }

    /// Blank with resolution diagnostics.
    pub fn compute_report(&self, input: &BlankInput) -> EngineResult<BlankReport> {
        input.validate()?;

        let model = normalize_model_code(&input.model);
        let rows = self.catalog.rows_for(&model);
        if rows.is_empty() {
            return Err(EngineError::unknown_model(input.model.trim()));
        }

        let family = classify(&model);
        let constants = CalibrationConstants::for_family(family, input.thickness);
        let context = VariableContext::build_with_glue_width(
            input.length,
            input.width,
            input.height,
            input.thickness,
            &constants,
            self.settings.glue_flap_width_mm,
        );

        let resolution = FormulaResolver::from_settings(&self.settings).resolve(rows, context);
        let mentions_glue_flap = self.catalog.mentions_function(&model, GLUE_FLAP_FUNCTION);
        let dimensions = TopologyAssembler::from_settings(&self.settings).assemble(
            input,
            &resolution.variables,
            mentions_glue_flap,
        );

        debug!(
            "Model {}: {:.1} x {:.1} mm ({}, estimated: {})",
            model, dimensions.width, dimensions.height, dimensions.rule, dimensions.estimated
        );

        Ok(BlankReport {
            dimensions,
            family,
            constants,
            resolved: resolution.variables,
            unresolved: resolution.unresolved,
            passes_run: resolution.passes_run,
        })
    }
}
