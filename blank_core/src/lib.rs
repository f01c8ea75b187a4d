//! # blank_core - Box Blank Engine
//!
//! `blank_core` computes the flat blank size of a corrugated box from its
//! internal dimensions, its board thickness and a catalog of per-model
//! formulas. All inputs and outputs are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: every computation starts from the raw catalog and the inputs
//! - **Closed language**: formulas run in a whitelisted arithmetic DSL, never a general evaluator
//! - **Degrade, don't fail**: bad rows are skipped, missing values fall back, estimates are flagged
//! - **Rich Errors**: structured error types, not just strings
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use blank_core::{BlankEngine, FormulaCatalog};
//!
//! let engine = BlankEngine::new(Arc::new(FormulaCatalog::reference()));
//!
//! let blank = engine.compute_blank("0201", 300.0, 200.0, 150.0, 3.0).unwrap();
//! println!("{} x {} mm ({})", blank.width, blank.height, blank.profile_label);
//!
//! let json = serde_json::to_string_pretty(&blank).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`catalog`] - Formula table loading and lookup
//! - [`calibration`] - Model families and thickness corrections
//! - [`expression`] - Formula parser and evaluator
//! - [`context`] - Names available to formulas
//! - [`resolver`] - Bounded fixed-point resolution of a model's formulas
//! - [`topology`] - Blank assembly rules
//! - [`engine`] - The facade tying it all together
//! - [`input`] - Caller inputs and their validation
//! - [`settings`] - Engine settings
//! - [`errors`] - Structured error types

pub mod calibration;
pub mod catalog;
pub mod context;
pub mod engine;
pub mod errors;
pub mod expression;
pub mod input;
pub mod resolver;
pub mod settings;
pub mod topology;

// Re-export commonly used types at crate root for convenience
pub use calibration::{classify, CalibrationConstants, Flute, ModelFamily};
pub use catalog::{FormulaCatalog, FormulaRow};
pub use engine::{BlankEngine, BlankReport};
pub use errors::{EngineError, EngineResult};
pub use input::BlankInput;
pub use resolver::{FormulaResolver, Resolution, ResolvedVariableSet};
pub use settings::EngineSettings;
pub use topology::{AssemblyRule, BlankDimensions, TopologyAssembler};
