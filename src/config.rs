//! Minimiser settings. Every algorithm choice is a closed enum, parsed from its name once and
//! validated together with the numeric parameters when the `Configuration` is built.
use std::fmt;
use std::str::FromStr;

use derive_builder::Builder;
use log::debug;

use crate::convergence::ConvergenceTest;
use crate::error::ConfigError;

/// The family of search directions driving the iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectionFamily {
    SteepestDescent,
    Newton,
    Bfgs,
    ConjugateGradient,
    TrustRegion,
}

/// Conditioning applied to the Hessian before it is used to compute a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HessianMod {
    /// Use the Hessian as is. Fails on singular matrices.
    Unmodified,
    /// Clamp the eigenvalues to a small positive floor.
    Eigenvalue,
    /// Add a multiple of the identity until a Cholesky factorisation succeeds.
    Cholesky,
    /// Gill, Murray and Wright modified Cholesky factorisation.
    Gmw,
    /// The GMW factorisation with the perturbation added back to the Hessian.
    GmwLegacy,
    /// Schnabel and Eskow revised modified Cholesky factorisation.
    Se99,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineSearchAlgorithm {
    /// Always take the initial step length.
    NoSearch,
    Backtrack,
    NocedalWrightInterpol,
    NocedalWrightWolfe,
    MoreThuente,
}

/// The beta formula of the nonlinear conjugate gradient method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CgFormula {
    FletcherReeves,
    PolakRibiere,
    PolakRibierePlus,
    HestenesStiefel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustRegionSolver {
    Exact,
    Dogleg,
    CauchyPoint,
}

fn normalise(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace(|c: char| c == ' ' || c == '_', "-")
}

impl FromStr for DirectionFamily {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise(s).as_str() {
            "sd" | "steepest-descent" => Ok(DirectionFamily::SteepestDescent),
            "newton" | "ncg" => Ok(DirectionFamily::Newton),
            "bfgs" => Ok(DirectionFamily::Bfgs),
            "cg" | "conjugate-gradient" => Ok(DirectionFamily::ConjugateGradient),
            "tr" | "trust-region" => Ok(DirectionFamily::TrustRegion),
            _ => Err(ConfigError::UnknownFamily(s.to_string())),
        }
    }
}

impl FromStr for HessianMod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise(s).as_str() {
            "none" | "no-hessian-mod" | "unmodified" => Ok(HessianMod::Unmodified),
            "eigen" | "eigenvalue" => Ok(HessianMod::Eigenvalue),
            "chol" | "cholesky" => Ok(HessianMod::Cholesky),
            "gmw" | "gmw81" => Ok(HessianMod::Gmw),
            "gmw-old" | "gmw-legacy" => Ok(HessianMod::GmwLegacy),
            "se99" | "se" => Ok(HessianMod::Se99),
            _ => Err(ConfigError::UnknownHessianMod(s.to_string())),
        }
    }
}

impl FromStr for LineSearchAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise(s).as_str() {
            "none" | "no-line-search" => Ok(LineSearchAlgorithm::NoSearch),
            "back" | "backtrack" | "backtracking" => Ok(LineSearchAlgorithm::Backtrack),
            "nwi" | "nocedal-wright-interpol" | "nocedal-wright-interpolation" => {
                Ok(LineSearchAlgorithm::NocedalWrightInterpol)
            }
            "nww" | "nocedal-wright-wolfe" => Ok(LineSearchAlgorithm::NocedalWrightWolfe),
            "mt" | "more-thuente" => Ok(LineSearchAlgorithm::MoreThuente),
            _ => Err(ConfigError::UnknownLineSearch(s.to_string())),
        }
    }
}

impl FromStr for CgFormula {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise(s).as_str() {
            "fr" | "fletcher-reeves" => Ok(CgFormula::FletcherReeves),
            "pr" | "polak-ribiere" => Ok(CgFormula::PolakRibiere),
            "pr+" | "polak-ribiere+" => Ok(CgFormula::PolakRibierePlus),
            "hs" | "hestenes-stiefel" => Ok(CgFormula::HestenesStiefel),
            _ => Err(ConfigError::UnknownCgFormula(s.to_string())),
        }
    }
}

impl FromStr for TrustRegionSolver {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise(s).as_str() {
            "exact" => Ok(TrustRegionSolver::Exact),
            "dogleg" => Ok(TrustRegionSolver::Dogleg),
            "cauchy" | "cauchy-point" => Ok(TrustRegionSolver::CauchyPoint),
            _ => Err(ConfigError::UnknownTrustRegionSolver(s.to_string())),
        }
    }
}

impl fmt::Display for DirectionFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DirectionFamily::SteepestDescent => "steepest descent",
            DirectionFamily::Newton => "Newton",
            DirectionFamily::Bfgs => "BFGS",
            DirectionFamily::ConjugateGradient => "conjugate gradient",
            DirectionFamily::TrustRegion => "trust region",
        };
        f.write_str(name)
    }
}

impl fmt::Display for HessianMod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            HessianMod::Unmodified => "No Hessian mod",
            HessianMod::Eigenvalue => "Eigenvalue",
            HessianMod::Cholesky => "Cholesky",
            HessianMod::Gmw => "GMW",
            HessianMod::GmwLegacy => "GMW-old",
            HessianMod::Se99 => "SE99",
        };
        f.write_str(name)
    }
}

impl fmt::Display for LineSearchAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            LineSearchAlgorithm::NoSearch => "No line search",
            LineSearchAlgorithm::Backtrack => "Backtracking",
            LineSearchAlgorithm::NocedalWrightInterpol => "Nocedal-Wright interpolation",
            LineSearchAlgorithm::NocedalWrightWolfe => "Nocedal-Wright Wolfe",
            LineSearchAlgorithm::MoreThuente => "More-Thuente",
        };
        f.write_str(name)
    }
}

impl fmt::Display for CgFormula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            CgFormula::FletcherReeves => "FR",
            CgFormula::PolakRibiere => "PR",
            CgFormula::PolakRibierePlus => "PR+",
            CgFormula::HestenesStiefel => "HS",
        };
        f.write_str(name)
    }
}

impl fmt::Display for TrustRegionSolver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TrustRegionSolver::Exact => "exact",
            TrustRegionSolver::Dogleg => "dogleg",
            TrustRegionSolver::CauchyPoint => "Cauchy point",
        };
        f.write_str(name)
    }
}

/// Settings for a single minimisation run.
///
/// ```
/// use minfx::{ConfigurationBuilder, DirectionFamily, LineSearchAlgorithm};
///
/// let config = ConfigurationBuilder::default()
///     .family(DirectionFamily::Bfgs)
///     .line_search(LineSearchAlgorithm::MoreThuente)
///     .grad_tol(1e-8)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_iterations, 1_000_000);
/// ```
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(build_fn(private, name = "build_unchecked", error = "ConfigError"))]
pub struct Configuration {
    /// The direction family. Required.
    pub family: DirectionFamily,

    /// Hessian modification for the Newton and trust region families.
    /// Unset selects GMW.
    #[builder(default, setter(strip_option))]
    pub hessian_mod: Option<HessianMod>,

    /// Line search for every family but trust region.
    /// Unset selects More-Thuente for Newton and backtracking otherwise.
    #[builder(default, setter(strip_option))]
    pub line_search: Option<LineSearchAlgorithm>,

    #[builder(default = "CgFormula::PolakRibierePlus")]
    pub cg_formula: CgFormula,

    #[builder(default = "TrustRegionSolver::Exact")]
    pub trust_region_solver: TrustRegionSolver,

    /// Stop once successive function values differ by no more than this.
    #[builder(default, setter(strip_option))]
    pub func_tol: Option<f64>,

    /// Stop once the gradient norm drops to this value.
    #[builder(default, setter(strip_option))]
    pub grad_tol: Option<f64>,

    #[builder(default = "1_000_000")]
    pub max_iterations: usize,

    /// Initial step length of the line search.
    #[builder(default = "1.0")]
    pub a0: f64,

    /// Sufficient decrease constant.
    #[builder(default = "1e-4")]
    pub mu: f64,

    /// Curvature constant. Unset selects 0.1 for conjugate gradient and 0.9 otherwise.
    #[builder(default, setter(strip_option))]
    pub eta: Option<f64>,

    /// Initial trust region radius.
    #[builder(default = "1.0")]
    pub delta0: f64,

    #[builder(default = "1e5")]
    pub delta_max: f64,

    /// Minimum ratio of actual to predicted reduction for a trust region step to be taken.
    #[builder(default = "0.2")]
    pub trust_eta: f64,

    /// Starting Levenberg parameter of the exact trust region solver.
    #[builder(default = "0.0")]
    pub lambda0: f64,

    /// Machine accuracy used by the modified Cholesky factorisations.
    #[builder(default = "f64::EPSILON")]
    pub mach_acc: f64,
}

impl ConfigurationBuilder {
    /// Builds the configuration, rejecting inconsistent algorithm combinations and parameter
    /// values.
    pub fn build(&self) -> Result<Configuration, ConfigError> {
        let config = self.build_unchecked()?;
        config.validate()?;
        debug!(
            "{} minimiser: line search {:?}, Hessian modification {:?}",
            config.family,
            config.effective_line_search(),
            config.effective_hessian_mod()
        );
        Ok(config)
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.to_string(),
    }
}

impl Configuration {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        self.convergence_test()?;

        let family = self.family;
        match (family, self.hessian_mod) {
            (DirectionFamily::Bfgs, Some(m)) if m != HessianMod::Unmodified => {
                return Err(ConfigError::BfgsWithModifier(m))
            }
            (DirectionFamily::ConjugateGradient, Some(m))
            | (DirectionFamily::SteepestDescent, Some(m))
                if m != HessianMod::Unmodified =>
            {
                return Err(ConfigError::IncompatibleOption {
                    family,
                    option: "hessian_mod",
                })
            }
            _ => {}
        }
        if family == DirectionFamily::TrustRegion && self.line_search.is_some() {
            return Err(ConfigError::IncompatibleOption {
                family,
                option: "line_search",
            });
        }

        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", "must be at least 1"));
        }
        for &(name, tol) in &[("func_tol", self.func_tol), ("grad_tol", self.grad_tol)] {
            if let Some(t) = tol {
                if !(t >= 0.0) {
                    return Err(invalid(name, "must be non-negative"));
                }
            }
        }
        if !(self.a0 > 0.0) || !self.a0.is_finite() {
            return Err(invalid("a0", "must be positive and finite"));
        }
        let eta = self.effective_eta();
        if !(self.mu > 0.0 && self.mu < eta && eta < 1.0) {
            return Err(invalid("mu, eta", "require 0 < mu < eta < 1"));
        }
        if !(self.delta0 > 0.0 && self.delta0 <= self.delta_max) || !self.delta_max.is_finite() {
            return Err(invalid("delta0, delta_max", "require 0 < delta0 <= delta_max"));
        }
        if !(self.trust_eta >= 0.0 && self.trust_eta < 0.25) {
            return Err(invalid("trust_eta", "must lie in [0, 0.25)"));
        }
        if !(self.lambda0 >= 0.0) {
            return Err(invalid("lambda0", "must be non-negative"));
        }
        if !(self.mach_acc > 0.0 && self.mach_acc < 1.0) {
            return Err(invalid("mach_acc", "must lie in (0, 1)"));
        }
        Ok(())
    }

    /// The stopping rule implied by the tolerances.
    pub fn convergence_test(&self) -> Result<ConvergenceTest, ConfigError> {
        ConvergenceTest::from_tolerances(self.func_tol, self.grad_tol)
    }

    /// Whether the family evaluates the Hessian.
    pub fn needs_hessian(&self) -> bool {
        match self.family {
            DirectionFamily::Newton | DirectionFamily::TrustRegion => true,
            _ => false,
        }
    }

    pub fn effective_hessian_mod(&self) -> HessianMod {
        match self.family {
            DirectionFamily::Newton | DirectionFamily::TrustRegion => {
                self.hessian_mod.unwrap_or(HessianMod::Gmw)
            }
            _ => HessianMod::Unmodified,
        }
    }

    /// The line search in use, `None` for the trust region family.
    pub fn effective_line_search(&self) -> Option<LineSearchAlgorithm> {
        match self.family {
            DirectionFamily::TrustRegion => None,
            DirectionFamily::Newton => {
                Some(self.line_search.unwrap_or(LineSearchAlgorithm::MoreThuente))
            }
            _ => Some(self.line_search.unwrap_or(LineSearchAlgorithm::Backtrack)),
        }
    }

    pub fn effective_eta(&self) -> f64 {
        match (self.eta, self.family) {
            (Some(eta), _) => eta,
            (None, DirectionFamily::ConjugateGradient) => 0.1,
            (None, _) => 0.9,
        }
    }
}
