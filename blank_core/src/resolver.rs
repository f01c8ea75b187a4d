//! # Formula Resolver
//!
//! Resolves a model's formula rows to numbers without sorting their
//! dependencies. Rows are evaluated in declaration order, repeatedly, for a
//! bounded number of passes; each success is bound into the context so that
//! rows depending on it succeed on a later pass.
//!
//! A row whose dependency is declared after it needs two passes. A chain of
//! `n` such backward references needs `n` passes, so the pass budget (5 by
//! default) bounds the dependency depth the engine supports. Rows that never
//! resolve are reported in [`Resolution::unresolved`] and left to the
//! assembler's fallbacks; they never fail the model.
//!
//! ## Example
//!
//! ```rust
//! use blank_core::calibration::{CalibrationConstants, ModelFamily};
//! use blank_core::catalog::FormulaCatalog;
//! use blank_core::context::VariableContext;
//! use blank_core::resolver::FormulaResolver;
//!
//! let catalog = FormulaCatalog::parse("901;A;B + 1\n901;B;5\n");
//! let constants = CalibrationConstants::for_family(ModelFamily::Generic, 3.0);
//! let ctx = VariableContext::build(300.0, 200.0, 150.0, 3.0, &constants);
//!
//! let resolution = FormulaResolver::default().resolve(catalog.rows_for("901"), ctx);
//! assert_eq!(resolution.variables["A"], 6.0);
//! assert_eq!(resolution.variables["B"], 5.0);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::catalog::FormulaRow;
use crate::context::{Binding, VariableContext};
use crate::expression::{parse, parse_numeric_literal, EvalError, Expr};
use crate::settings::{EngineSettings, DEFAULT_MAX_PASSES};

/// Caller-supplied inputs that catalog rows may never overwrite
pub const PROTECTED_INPUTS: [&str; 4] = ["L", "W", "H", "d"];

/// Parameter name -> resolved value
pub type ResolvedVariableSet = BTreeMap<String, f64>;

/// A row that never produced a value, with its last error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedRow {
    pub parameter: String,
    pub formula: String,
    pub error: EvalError,
}

/// Outcome of resolving one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Every parameter bound at least once
    pub variables: ResolvedVariableSet,
    /// Rows that never resolved, in declaration order
    pub unresolved: Vec<UnresolvedRow>,
    /// Passes actually run
    pub passes_run: usize,
}

impl Resolution {
    /// Number of rows that never resolved.
    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }

    /// Resolved value of a parameter.
    pub fn get(&self, parameter: &str) -> Option<f64> {
        self.variables.get(parameter).copied()
    }
}

/// A row prepared once per resolution.
enum CompiledRow {
    Protected,
    Literal(f64),
    Formula(Expr),
    Invalid(EvalError),
}

impl CompiledRow {
    fn compile(row: &FormulaRow, context: &VariableContext) -> Self {
        if PROTECTED_INPUTS.contains(&row.parameter.as_str()) {
            debug!("Ignoring catalog row for input '{}' in model {}", row.parameter, row.model);
            return CompiledRow::Protected;
        }
        if context.is_math_function(&row.parameter) {
            debug!("Model {} row '{}' names a math function", row.model, row.parameter);
            return CompiledRow::Invalid(EvalError::type_mismatch(
                &row.parameter,
                "built-in function cannot be redefined",
            ));
        }
        if let Some(value) = parse_numeric_literal(&row.formula) {
            return CompiledRow::Literal(value);
        }
        match parse(&row.formula) {
            Ok(expr) => CompiledRow::Formula(expr),
            Err(e) => {
                debug!("Model {} row '{}' does not parse: {}", row.model, row.parameter, e);
                CompiledRow::Invalid(e)
            }
        }
    }
}

/// Bounded fixed-point resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormulaResolver {
    max_passes: usize,
    stop_when_stable: bool,
}

impl Default for FormulaResolver {
    fn default() -> Self {
        FormulaResolver {
            max_passes: DEFAULT_MAX_PASSES,
            stop_when_stable: true,
        }
    }
}

impl FormulaResolver {
    /// Resolver with a custom pass budget (at least one pass is always run).
    pub fn new(max_passes: usize) -> Self {
        FormulaResolver {
            max_passes: max_passes.max(1),
            ..FormulaResolver::default()
        }
    }

    /// Resolver configured from engine settings.
    pub fn from_settings(settings: &EngineSettings) -> Self {
        FormulaResolver::new(settings.max_passes).stop_when_stable(settings.stop_when_stable)
    }

    /// Whether to stop once a full pass changes no binding.
    ///
    /// Stopping early never changes the result: a pass that binds nothing new
    /// leaves the context exactly as the next pass would see it.
    pub fn stop_when_stable(mut self, stop: bool) -> Self {
        self.stop_when_stable = stop;
        self
    }

    /// Pass budget.
    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// Resolve `rows` against `context`.
    pub fn resolve(&self, rows: &[FormulaRow], mut context: VariableContext) -> Resolution {
        let compiled: Vec<CompiledRow> = rows.iter().map(|row| CompiledRow::compile(row, &context)).collect();
        let mut variables = ResolvedVariableSet::new();
        let mut last_errors: BTreeMap<usize, EvalError> = BTreeMap::new();
        let mut passes_run = 0;

        for pass in 1..=self.max_passes {
            passes_run = pass;
            let mut changed = false;

            for (index, (row, compiled)) in rows.iter().zip(&compiled).enumerate() {
                let outcome = match compiled {
                    CompiledRow::Protected => continue,
                    CompiledRow::Literal(value) => Ok(*value),
                    CompiledRow::Formula(expr) => expr.evaluate(&context),
                    CompiledRow::Invalid(e) => Err(e.clone()),
                };

                match outcome {
                    Ok(value) => {
                        let previous = context.bind(row.parameter.as_str(), value);
                        if previous.as_ref().and_then(Binding::number) != Some(value) {
                            changed = true;
                        }
                        variables.insert(row.parameter.clone(), value);
                        last_errors.remove(&index);
                    }
                    Err(e) => {
                        trace!("Pass {pass}: '{}' unresolved: {e}", row.parameter);
                        last_errors.insert(index, e);
                    }
                }
            }

            if self.stop_when_stable && !changed {
                break;
            }
        }

        let unresolved: Vec<UnresolvedRow> = last_errors
            .into_iter()
            .filter(|(index, _)| !variables.contains_key(&rows[*index].parameter))
            .map(|(index, error)| UnresolvedRow {
                parameter: rows[index].parameter.clone(),
                formula: rows[index].formula.clone(),
                error,
            })
            .collect();

        debug!(
            "Resolved {} of {} rows in {} pass(es), {} unresolved",
            variables.len(),
            rows.len(),
            passes_run,
            unresolved.len()
        );

        Resolution {
            variables,
            unresolved,
            passes_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CalibrationConstants, ModelFamily};
    use crate::catalog::FormulaCatalog;

    fn context() -> VariableContext {
        let constants = CalibrationConstants::for_family(ModelFamily::Generic, 3.0);
        VariableContext::build(300.0, 200.0, 150.0, 3.0, &constants)
    }

    fn resolve_with(resolver: FormulaResolver, table: &str) -> Resolution {
        let catalog = FormulaCatalog::parse(table);
        let model = catalog.available_models()[0].clone();
        resolver.resolve(catalog.rows_for(&model), context())
    }

    fn resolve(table: &str) -> Resolution {
        resolve_with(FormulaResolver::default(), table)
    }

    #[test]
    fn test_forward_reference() {
        let resolution = resolve("901;A;B + 1\n901;B;5\n");
        assert_eq!(resolution.get("A"), Some(6.0));
        assert_eq!(resolution.get("B"), Some(5.0));
        assert_eq!(resolution.unresolved_count(), 0);
        // bind B, bind A, then one quiet pass
        assert_eq!(resolution.passes_run, 3);
    }

    #[test]
    fn test_single_pass_leaves_forward_reference_unresolved() {
        let resolution = resolve_with(FormulaResolver::new(1), "901;A;B + 1\n901;B;5\n");
        assert_eq!(resolution.get("A"), None);
        assert_eq!(resolution.get("B"), Some(5.0));
        assert_eq!(resolution.unresolved[0].parameter, "A");
        assert!(matches!(resolution.unresolved[0].error, EvalError::UnknownIdentifier { .. }));
    }

    #[test]
    fn test_chain_deeper_than_budget_is_partial() {
        let table = "901;A1;A2 + 1\n901;A2;A3 + 1\n901;A3;A4 + 1\n901;A4;A5 + 1\n\
                     901;A5;A6 + 1\n901;A6;A7 + 1\n901;A7;1\n";
        let resolution = resolve(table);
        assert_eq!(resolution.passes_run, 5);
        assert_eq!(resolution.get("A7"), Some(1.0));
        assert_eq!(resolution.get("A3"), Some(5.0));
        assert_eq!(resolution.get("A2"), None);
        assert_eq!(resolution.get("A1"), None);
        assert_eq!(resolution.unresolved_count(), 2);

        let deeper = resolve_with(FormulaResolver::new(7), table);
        assert_eq!(deeper.get("A1"), Some(7.0));
    }

    #[test]
    fn test_extra_passes_do_not_change_result() {
        let table = "201;FH;Wss/2\n201;Wss;W + C90y()*2\n201;Lss;L + C90x()*2\n201;Bad;1 +\n";
        let five = resolve_with(FormulaResolver::new(5).stop_when_stable(false), table);
        let twenty = resolve_with(FormulaResolver::new(20).stop_when_stable(false), table);
        let early = resolve(table);
        assert_eq!(five.variables, twenty.variables);
        assert_eq!(five.variables, early.variables);
        assert_eq!(five.unresolved, early.unresolved);
    }

    #[test]
    fn test_failures_are_recovered_per_row() {
        let table = "901;Div;L / (W - W)\n901;Syntax;(L + \n901;Missing;Nope + 1\n901;Ok;L * 2\n";
        let resolution = resolve(table);
        assert_eq!(resolution.get("Ok"), Some(600.0));
        assert_eq!(resolution.unresolved_count(), 3);
        assert_eq!(resolution.unresolved[0].error, EvalError::DivisionByZero);
        assert!(matches!(resolution.unresolved[1].error, EvalError::Syntax { .. }));
        assert_eq!(resolution.unresolved[2].formula, "Nope + 1");
    }

    #[test]
    fn test_inputs_are_never_overwritten() {
        let resolution = resolve("901;L;999\n901;d;10\n901;X;L + d()\n");
        assert_eq!(resolution.get("L"), None);
        assert_eq!(resolution.get("d"), None);
        assert_eq!(resolution.get("X"), Some(303.0));
    }

    #[test]
    fn test_rows_redefining_corrections_stay_callable() {
        let table = "201;GLWidth;40\n201;GL;GLWidth()\n201;C90x;1\n201;Lss;L + C90x()*2\n";
        let resolution = resolve(table);
        assert_eq!(resolution.get("GLWidth"), Some(40.0));
        assert_eq!(resolution.get("GL"), Some(40.0));
        assert_eq!(resolution.get("Lss"), Some(302.0));
        assert_eq!(resolution.unresolved_count(), 0);
        assert_eq!(resolution.passes_run, 2);
    }

    #[test]
    fn test_math_functions_cannot_be_redefined() {
        let resolution = resolve("901;sqrt;4\n901;X;sqrt(16)\n");
        assert_eq!(resolution.get("X"), Some(4.0));
        assert_eq!(resolution.get("sqrt"), None);
        assert_eq!(resolution.unresolved_count(), 1);
        assert_eq!(resolution.unresolved[0].parameter, "sqrt");
        assert!(matches!(resolution.unresolved[0].error, EvalError::TypeMismatch { .. }));
    }

    #[test]
    fn test_decimal_comma_literal() {
        let resolution = resolve("901;Ext;12,5\n");
        assert_eq!(resolution.get("Ext"), Some(12.5));
    }

    #[test]
    fn test_cycle_never_resolves() {
        let resolution = resolve("901;A;B + 1\n901;B;A + 1\n");
        assert!(resolution.variables.is_empty());
        assert_eq!(resolution.unresolved_count(), 2);
    }

    #[test]
    fn test_deterministic() {
        let table = "201;FH;Wss/2\n201;Wss;W + C90y()*2\n";
        assert_eq!(resolve(table), resolve(table));
    }

    #[test]
    fn test_empty_rows() {
        let resolution = FormulaResolver::default().resolve(&[], context());
        assert!(resolution.variables.is_empty());
        assert_eq!(resolution.passes_run, 1);
    }
}
