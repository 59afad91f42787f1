//! Error types. Configuration problems are reported before any function evaluation, numerical
//! failures end a run and are turned into the `warning` of the returned result.
use derive_builder::UninitializedFieldError;
use thiserror::Error;

use crate::config::{DirectionFamily, HessianMod};

/// Invalid or inconsistent minimiser settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown line search algorithm '{0}'")]
    UnknownLineSearch(String),
    #[error("unknown Hessian modification '{0}'")]
    UnknownHessianMod(String),
    #[error("unknown minimisation family '{0}'")]
    UnknownFamily(String),
    #[error("unknown conjugate gradient formula '{0}'")]
    UnknownCgFormula(String),
    #[error("unknown trust region subproblem solver '{0}'")]
    UnknownTrustRegionSolver(String),
    #[error("the BFGS method cannot be combined with the Hessian modification '{0}'")]
    BfgsWithModifier(HessianMod),
    #[error("the {option} option is not applicable to the {family} family")]
    IncompatibleOption {
        family: DirectionFamily,
        option: &'static str,
    },
    #[error("neither func_tol nor grad_tol is set")]
    NoTolerance,
    #[error("the {0} family requires a Hessian function")]
    MissingHessian(DirectionFamily),
    #[error("invalid value for {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("the '{0}' field must be set")]
    MissingField(String),
}

impl From<UninitializedFieldError> for ConfigError {
    fn from(err: UninitializedFieldError) -> Self {
        ConfigError::MissingField(err.field_name().to_string())
    }
}

/// Fatal problems hit while advancing an iterate.
///
/// The `Display` text is what ends up in `RunResult::warning`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericalFailure {
    /// Singular or otherwise unfactorisable matrix.
    #[error("LinAlgError: {0} (fatal minimisation error).")]
    LinAlg(String),
    /// Non-finite gradient, Hessian or update matrix.
    #[error("OverflowError: {0} (fatal minimisation error).")]
    Overflow(String),
    /// The objective returned an infinite or NaN value.
    #[error("Infinite function value encountered, can no longer perform optimisation.")]
    NonFinite,
    /// No acceptable step length was found.
    #[error("LineSearchError: {0} (fatal minimisation error).")]
    LineSearch(String),
    /// The trust region collapsed without an acceptable step.
    #[error("TrustRegionError: {0} (fatal minimisation error).")]
    TrustRegion(String),
    /// A user function returned an array of the wrong shape.
    #[error("DimensionError: {0} (fatal minimisation error).")]
    Dimension(String),
}
