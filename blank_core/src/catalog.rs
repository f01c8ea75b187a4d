//! # Formula Catalog
//!
//! The normalized table of `(model, parameter, formula)` rows the engine
//! resolves against. The catalog is built once and read-only afterwards, so a
//! single instance can be shared across threads without locking.
//!
//! ## Table Format
//!
//! Semicolon-separated, one row per line:
//!
//! ```text
//! model;parameter;formula
//! 0201;Lss;L + C90x()*2
//! 0201;Wss;W + C90y()*2
//! ```
//!
//! - Model codes are normalized by stripping leading zeros (`0201` -> `201`)
//! - Blank lines and `#` comments are ignored
//! - An optional header line is recognized and skipped
//! - Fields past the third are ignored (free-form notes)
//! - Malformed rows are skipped and counted, never fatal
//!
//! Loading never fails: an unreadable file yields an empty catalog whose
//! [`FormulaCatalog::load_error`] carries the reason.
//!
//! ## Example
//!
//! ```rust
//! use blank_core::catalog::FormulaCatalog;
//!
//! let catalog = FormulaCatalog::parse("0201;Lss;L + 1\n0201;Wss;W + 1\n");
//! assert_eq!(catalog.available_models(), vec!["201".to_string()]);
//! assert_eq!(catalog.rows_for("0201").len(), 2);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::EngineError;

/// Field separator of the formula table
pub const FIELD_SEPARATOR: char = ';';

/// First-field values that mark a header line
const HEADER_NAMES: [&str; 4] = ["model", "modelo", "fefco", "code"];

/// Reference table bundled with the crate
const REFERENCE_TABLE: &str = include_str!("../data/reference_formulas.csv");

static SHARED: OnceCell<Arc<FormulaCatalog>> = OnceCell::new();

/// One named formula of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaRow {
    /// Normalized model code (leading zeros stripped)
    pub model: String,
    /// Parameter bound by this row (e.g., "Lss")
    pub parameter: String,
    /// Formula text in the expression language
    pub formula: String,
}

/// Counters collected while parsing a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Rows kept after de-duplication
    pub rows: usize,
    /// Distinct models
    pub models: usize,
    /// Malformed lines that were skipped
    pub skipped: usize,
}

/// Immutable catalog of formula rows grouped by model.
#[derive(Debug, Clone, Default)]
pub struct FormulaCatalog {
    models: BTreeMap<String, Vec<FormulaRow>>,
    report: LoadReport,
    load_error: Option<EngineError>,
}

/// Strip leading zeros from a model code. An all-zero code normalizes to "0".
///
/// ```rust
/// use blank_core::catalog::normalize_model_code;
///
/// assert_eq!(normalize_model_code(" 0201 "), "201");
/// assert_eq!(normalize_model_code("0427"), "427");
/// assert_eq!(normalize_model_code("000"), "0");
/// ```
pub fn normalize_model_code(code: &str) -> String {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let stripped = trimmed.trim_start_matches('0');
    if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

fn clean_field(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}

impl FormulaCatalog {
    /// Load a catalog from a file. Never fails; see [`FormulaCatalog::load_error`].
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read(path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                Self::parse(&text)
            }
            Err(e) => {
                warn!("Formula table '{}' could not be read: {}", path.display(), e);
                FormulaCatalog {
                    load_error: Some(EngineError::table_load(path.display().to_string(), e.to_string())),
                    ..FormulaCatalog::default()
                }
            }
        }
    }

    /// Parse a catalog from table text.
    pub fn parse(text: &str) -> Self {
        let mut models: BTreeMap<String, Vec<FormulaRow>> = BTreeMap::new();
        let mut skipped = 0;
        let mut seen_data = false;

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim_start_matches('\u{feff}').trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(clean_field).collect();

            if !seen_data {
                seen_data = true;
                let first = fields[0].to_ascii_lowercase();
                if HEADER_NAMES.contains(&first.as_str()) {
                    continue;
                }
            }

            if fields.len() < 3 {
                debug!("Skipping line {}: expected 3 fields, found {}", line_no + 1, fields.len());
                skipped += 1;
                continue;
            }

            let model = normalize_model_code(fields[0]);
            let (parameter, formula) = (fields[1], fields[2]);
            if model.is_empty() || parameter.is_empty() || formula.is_empty() {
                debug!("Skipping line {}: empty model, parameter or formula", line_no + 1);
                skipped += 1;
                continue;
            }

            let rows = models.entry(model.clone()).or_default();
            match rows.iter_mut().find(|row| row.parameter == parameter) {
                Some(existing) => existing.formula = formula.to_string(),
                None => rows.push(FormulaRow {
                    model,
                    parameter: parameter.to_string(),
                    formula: formula.to_string(),
                }),
            }
        }

        let report = LoadReport {
            rows: models.values().map(Vec::len).sum(),
            models: models.len(),
            skipped,
        };
        info!(
            "Formula catalog loaded: {} rows, {} models, {} skipped",
            report.rows, report.models, report.skipped
        );

        FormulaCatalog {
            models,
            report,
            load_error: None,
        }
    }

    /// The reference table bundled with the crate.
    pub fn reference() -> Self {
        Self::parse(REFERENCE_TABLE)
    }

    /// Process-wide catalog, loaded from `path` on first use only.
    ///
    /// Later calls return the same instance regardless of `path`.
    pub fn shared(path: impl AsRef<Path>) -> Arc<FormulaCatalog> {
        SHARED
            .get_or_init(|| Arc::new(FormulaCatalog::load(path)))
            .clone()
    }

    /// Sorted normalized model codes.
    pub fn available_models(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    /// Rows of a model in declaration order; empty if the model is unknown.
    ///
    /// The code is normalized first, so "0201" and "201" are equivalent.
    pub fn rows_for(&self, model: &str) -> &[FormulaRow] {
        self.models
            .get(&normalize_model_code(model))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether any formula of the model calls or references `name`.
    pub fn mentions_function(&self, model: &str, name: &str) -> bool {
        self.rows_for(model).iter().any(|row| mentions_identifier(&row.formula, name))
    }

    /// Whether the catalog has no rows.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Parse counters.
    pub fn report(&self) -> LoadReport {
        self.report
    }

    /// Why the table could not be read, if it could not.
    pub fn load_error(&self) -> Option<&EngineError> {
        self.load_error.as_ref()
    }
}

/// Whole-word search for an identifier inside formula text.
fn mentions_identifier(formula: &str, name: &str) -> bool {
    formula
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|word| word == name)
}
