//! Named elementwise functions wrapped as stateless stages.

use fhub_core::FunctionTransformer;
use serde::{Deserialize, Serialize};

/// Elementwise functions available to declarative stage specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedFunction {
    /// `ln(1 + x)`
    Log1p,
    /// `exp(x) - 1`
    Expm1,
    Sqrt,
    Square,
    Abs,
}

impl NamedFunction {
    pub fn name(self) -> &'static str {
        match self {
            Self::Log1p => "log1p",
            Self::Expm1 => "expm1",
            Self::Sqrt => "sqrt",
            Self::Square => "square",
            Self::Abs => "abs",
        }
    }

    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Log1p => x.ln_1p(),
            Self::Expm1 => x.exp_m1(),
            Self::Sqrt => x.sqrt(),
            Self::Square => x * x,
            Self::Abs => x.abs(),
        }
    }
}

/// Wrap a named function into the fit/transform contract.
pub fn simple_function(function: NamedFunction) -> FunctionTransformer {
    FunctionTransformer::new(function.name(), move |x| function.apply(x))
}

/// `ln(1 + x)` stage, used for skewed precipitation amounts.
pub fn log1p() -> FunctionTransformer {
    simple_function(NamedFunction::Log1p)
}
