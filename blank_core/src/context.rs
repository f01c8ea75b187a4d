//! # Variable Context
//!
//! The evaluation environment for catalog formulas. A context is seeded with
//! the physical inputs, flag constants, math functions and the calibration
//! correction functions, then grows as the resolver binds parameters.
//!
//! ## Seeded Names
//!
//! | Name                              | Kind                 | Value                        |
//! |-----------------------------------|----------------------|------------------------------|
//! | `L`, `W`, `H`                     | value                | internal dimensions (mm)     |
//! | `d`                               | zero-arg function    | board thickness (mm)         |
//! | `dtID`, `dtOD`                    | value                | 1, 0                         |
//! | `No`, `Yes`, `Flat`, `Round`      | value                | 0, 1, 0, 1                   |
//! | `C90x`, `C90y`                    | zero-arg function    | crease setback per 90° fold  |
//! | `HC90x`                           | zero-arg function    | height gain per 90° fold     |
//! | `GlueCorr`                        | zero-arg function    | glue-flap correction         |
//! | `SlotWidth`                       | zero-arg function    | slot width                   |
//! | `GLWidth`                         | zero-arg function    | glue-flap width (35 mm)      |
//! | `C180x`, `C180y`, `HC180x`, ...   | no-op correction     | first argument, or 0         |
//! | `sqrt`, `min`, `max`, ...         | math function        |                              |

use std::collections::HashMap;

use crate::calibration::CalibrationConstants;
use crate::expression::{Bindings, EvalError};
use crate::settings::DEFAULT_GLUE_FLAP_WIDTH_MM;

/// Flag constants some catalog formulas select on
const FLAGS: [(&str, f64); 6] = [
    ("dtID", 1.0),
    ("dtOD", 0.0),
    ("No", 0.0),
    ("Yes", 1.0),
    ("Flat", 0.0),
    ("Round", 1.0),
];

/// Rarely used correction names that resolve to a no-op instead of failing
const NO_OP_CORRECTIONS: [&str; 8] = [
    "C180x", "C180y", "HC180x", "HC90y", "CutCorr", "LinerCorr", "InsideCorr", "OutsideCorr",
];

/// Whitelisted math functions. Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFn {
    Sqrt,
    Abs,
    Min,
    Max,
    Round,
    Floor,
    Ceil,
    Sin,
    Cos,
    Tan,
    Atan,
    Pow,
}

impl MathFn {
    const ALL: [(&'static str, MathFn); 12] = [
        ("sqrt", MathFn::Sqrt),
        ("abs", MathFn::Abs),
        ("min", MathFn::Min),
        ("max", MathFn::Max),
        ("round", MathFn::Round),
        ("floor", MathFn::Floor),
        ("ceil", MathFn::Ceil),
        ("sin", MathFn::Sin),
        ("cos", MathFn::Cos),
        ("tan", MathFn::Tan),
        ("atan", MathFn::Atan),
        ("pow", MathFn::Pow),
    ];

    fn apply(self, name: &str, args: &[f64]) -> Result<f64, EvalError> {
        let unary = |f: fn(f64) -> f64| match args {
            [x] => Ok(f(*x)),
            _ => Err(EvalError::arity(name, "1", args.len())),
        };
        match self {
            MathFn::Sqrt => unary(f64::sqrt),
            MathFn::Abs => unary(f64::abs),
            MathFn::Round => unary(f64::round),
            MathFn::Floor => unary(f64::floor),
            MathFn::Ceil => unary(f64::ceil),
            MathFn::Sin => unary(|deg| deg.to_radians().sin()),
            MathFn::Cos => unary(|deg| deg.to_radians().cos()),
            MathFn::Tan => unary(|deg| deg.to_radians().tan()),
            MathFn::Atan => unary(|x| x.atan().to_degrees()),
            MathFn::Min | MathFn::Max if args.is_empty() => {
                Err(EvalError::arity(name, "at least 1", 0))
            }
            MathFn::Min => Ok(args.iter().copied().fold(f64::INFINITY, f64::min)),
            MathFn::Max => Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            MathFn::Pow => match args {
                [base, exponent] => Ok(base.powf(*exponent)),
                _ => Err(EvalError::arity(name, "2", args.len())),
            },
        }
    }
}

/// What a name is bound to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Binding {
    /// Plain number (inputs, flags, resolved parameters)
    Value(f64),
    /// Function of any arity returning a fixed number
    Constant(f64),
    /// Correction that returns its first argument, or 0 without arguments
    NoOp,
    /// Whitelisted math function
    Math(MathFn),
}

impl Binding {
    /// Number behind a value or constant binding.
    pub fn number(&self) -> Option<f64> {
        match self {
            Binding::Value(value) | Binding::Constant(value) => Some(*value),
            Binding::NoOp | Binding::Math(_) => None,
        }
    }
}

/// Evaluation environment for one resolution run.
#[derive(Debug, Clone, Default)]
pub struct VariableContext {
    bindings: HashMap<String, Binding>,
}

impl VariableContext {
    /// Seed a context with inputs and calibration functions.
    pub fn build(l: f64, w: f64, h: f64, d: f64, constants: &CalibrationConstants) -> Self {
        Self::build_with_glue_width(l, w, h, d, constants, DEFAULT_GLUE_FLAP_WIDTH_MM)
    }

    /// Same as [`VariableContext::build`] with a custom `GLWidth` value.
    pub fn build_with_glue_width(
        l: f64,
        w: f64,
        h: f64,
        d: f64,
        constants: &CalibrationConstants,
        glue_flap_width: f64,
    ) -> Self {
        let mut bindings = HashMap::new();

        for (name, value) in [("L", l), ("W", w), ("H", h)] {
            bindings.insert(name.to_string(), Binding::Value(value));
        }
        for (name, value) in FLAGS {
            bindings.insert(name.to_string(), Binding::Value(value));
        }
        for (name, math) in MathFn::ALL {
            bindings.insert(name.to_string(), Binding::Math(math));
        }
        for name in NO_OP_CORRECTIONS {
            bindings.insert(name.to_string(), Binding::NoOp);
        }

        let functions = [
            ("d", d),
            ("C90x", constants.crease_setback_90),
            ("C90y", constants.crease_setback_90),
            ("HC90x", constants.height_gain_90),
            ("GlueCorr", constants.glue_correction),
            ("SlotWidth", constants.slot_width),
            ("GLWidth", glue_flap_width),
        ];
        for (name, value) in functions {
            bindings.insert(name.to_string(), Binding::Constant(value));
        }

        VariableContext { bindings }
    }

    /// Bind a resolved value, returning the previous binding of the name.
    ///
    /// A name seeded as a zero-argument function (`GLWidth`, `C90x`, a no-op
    /// correction) stays callable, so `GLWidth()` reads the new value.
    pub fn bind(&mut self, name: impl Into<String>, value: f64) -> Option<Binding> {
        let name = name.into();
        let binding = match self.bindings.get(&name) {
            Some(Binding::Constant(_)) | Some(Binding::NoOp) => Binding::Constant(value),
            _ => Binding::Value(value),
        };
        self.bindings.insert(name, binding)
    }

    /// Whether a name is a whitelisted math function.
    pub fn is_math_function(&self, name: &str) -> bool {
        matches!(self.bindings.get(name), Some(Binding::Math(_)))
    }

    /// Current binding of a name.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Whether a name is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Bindings for VariableContext {
    fn value_of(&self, name: &str) -> Result<f64, EvalError> {
        match self.bindings.get(name) {
            Some(Binding::Value(value)) | Some(Binding::Constant(value)) => Ok(*value),
            Some(Binding::NoOp) => Ok(0.0),
            Some(Binding::Math(_)) => Err(EvalError::type_mismatch(name, "function used without arguments")),
            None => Err(EvalError::UnknownIdentifier { name: name.to_string() }),
        }
    }

    fn call(&self, name: &str, args: &[f64]) -> Result<f64, EvalError> {
        match self.bindings.get(name) {
            Some(Binding::Constant(value)) => Ok(*value),
            Some(Binding::NoOp) => Ok(args.first().copied().unwrap_or(0.0)),
            Some(Binding::Math(math)) => math.apply(name, args),
            Some(Binding::Value(_)) => Err(EvalError::type_mismatch(name, "value is not callable")),
            None => Err(EvalError::UnknownFunction { name: name.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::ModelFamily;
    use crate::expression::parse;

    fn tubular_context() -> VariableContext {
        let constants = CalibrationConstants::for_family(ModelFamily::Tubular, 3.0);
        VariableContext::build(300.0, 200.0, 150.0, 3.0, &constants)
    }

    fn eval(ctx: &VariableContext, text: &str) -> Result<f64, EvalError> {
        parse(text)?.evaluate(ctx)
    }

    #[test]
    fn test_seeded_inputs_and_flags() {
        let ctx = tubular_context();
        assert_eq!(eval(&ctx, "L + W + H").unwrap(), 650.0);
        assert_eq!(eval(&ctx, "dtID + dtOD + Yes + No + Round + Flat").unwrap(), 3.0);
        assert_eq!(eval(&ctx, "d()").unwrap(), 3.0);
        assert_eq!(eval(&ctx, "d").unwrap(), 3.0);
    }

    #[test]
    fn test_correction_functions() {
        let ctx = tubular_context();
        assert_eq!(eval(&ctx, "C90x()").unwrap(), 0.5);
        assert_eq!(eval(&ctx, "C90y()").unwrap(), 0.5);
        assert!((eval(&ctx, "HC90x()").unwrap() - 5.1).abs() < 1e-9);
        assert_eq!(eval(&ctx, "GlueCorr()").unwrap(), 0.5);
        assert_eq!(eval(&ctx, "SlotWidth()").unwrap(), 4.0);
        assert_eq!(eval(&ctx, "GLWidth()").unwrap(), 35.0);
    }

    #[test]
    fn test_tray_corrections_follow_thickness() {
        let constants = CalibrationConstants::for_family(ModelFamily::Tray, 4.0);
        let ctx = VariableContext::build(300.0, 200.0, 150.0, 4.0, &constants);
        assert_eq!(eval(&ctx, "L + C90x()*2").unwrap(), 308.0);
        assert_eq!(eval(&ctx, "SlotWidth()").unwrap(), 6.0);
    }

    #[test]
    fn test_no_op_corrections() {
        let ctx = tubular_context();
        assert_eq!(eval(&ctx, "L + C180x()").unwrap(), 300.0);
        assert_eq!(eval(&ctx, "LinerCorr(12)").unwrap(), 12.0);
    }

    #[test]
    fn test_math_functions() {
        let ctx = tubular_context();
        assert_eq!(eval(&ctx, "sqrt(16)").unwrap(), 4.0);
        assert_eq!(eval(&ctx, "max(L, W, H)").unwrap(), 300.0);
        assert_eq!(eval(&ctx, "min(L, W, H)").unwrap(), 150.0);
        assert_eq!(eval(&ctx, "round(2.6) + floor(2.6) + ceil(2.1)").unwrap(), 8.0);
        assert!((eval(&ctx, "sin(90)").unwrap() - 1.0).abs() < 1e-12);
        assert!((eval(&ctx, "atan(1)").unwrap() - 45.0).abs() < 1e-9);
        assert_eq!(eval(&ctx, "pow(2, 10)").unwrap(), 1024.0);
    }

    #[test]
    fn test_type_and_arity_errors() {
        let ctx = tubular_context();
        assert!(matches!(eval(&ctx, "L(1)"), Err(EvalError::TypeMismatch { .. })));
        assert!(matches!(eval(&ctx, "sqrt + 1"), Err(EvalError::TypeMismatch { .. })));
        assert!(matches!(eval(&ctx, "sqrt(1, 2)"), Err(EvalError::Arity { .. })));
        assert!(matches!(eval(&ctx, "max()"), Err(EvalError::Arity { .. })));
        assert!(matches!(eval(&ctx, "Unknown()"), Err(EvalError::UnknownFunction { .. })));
        assert_eq!(eval(&ctx, "sqrt(-1)"), Err(EvalError::NonFinite));
    }

    #[test]
    fn test_bind_grows_context() {
        let mut ctx = tubular_context();
        let before = ctx.len();
        assert!(ctx.bind("Lss", 301.0).is_none());
        assert_eq!(ctx.bind("Lss", 302.0), Some(Binding::Value(301.0)));
        assert_eq!(ctx.len(), before + 1);
        assert_eq!(eval(&ctx, "Lss").unwrap(), 302.0);
        assert!(ctx.contains("L"));
    }

    #[test]
    fn test_rebound_function_stays_callable() {
        let mut ctx = tubular_context();
        assert_eq!(ctx.bind("GLWidth", 40.0), Some(Binding::Constant(35.0)));
        assert_eq!(eval(&ctx, "GLWidth()").unwrap(), 40.0);
        assert_eq!(eval(&ctx, "GLWidth").unwrap(), 40.0);

        assert_eq!(ctx.bind("C180x", 2.0), Some(Binding::NoOp));
        assert_eq!(eval(&ctx, "L + C180x()").unwrap(), 302.0);
        assert_eq!(ctx.get("C180x").and_then(Binding::number), Some(2.0));
    }

    #[test]
    fn test_math_function_lookup() {
        let ctx = tubular_context();
        assert!(ctx.is_math_function("sqrt"));
        assert!(!ctx.is_math_function("GLWidth"));
        assert!(!ctx.is_math_function("Lss"));
    }
}
