use std::fmt;

use crate::error::SignalError;
use crate::model::MispricingIndices;

pub mod clayton;
pub mod frank;
pub mod gumbel;
pub mod selector;

pub use selector::select_best_family;

/// Pseudo-observations are clamped this far away from {0, 1} before any
/// copula formula sees them; the closed forms blow up at the boundary.
const UNIFORM_EPS: f64 = 1e-9;

fn clamp_uniform(x: f64) -> f64 {
    x.clamp(UNIFORM_EPS, 1.0 - UNIFORM_EPS)
}

/// The three single-parameter Archimedean families this engine fits.
/// Enumeration order is also the AIC tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopulaFamily {
    Clayton,
    Frank,
    Gumbel,
}

impl CopulaFamily {
    pub const ALL: [CopulaFamily; 3] =
        [CopulaFamily::Clayton, CopulaFamily::Frank, CopulaFamily::Gumbel];

    /// Estimate the family's dependence parameter theta from Kendall's tau.
    pub fn parameter_from_tau(self, tau: f64) -> Result<f64, SignalError> {
        match self {
            CopulaFamily::Clayton => clayton::parameter_from_tau(tau),
            CopulaFamily::Frank => frank::parameter_from_tau(tau),
            CopulaFamily::Gumbel => gumbel::parameter_from_tau(tau),
        }
    }

    /// Log of the copula density at (u, v). Non-finite values (underflow or
    /// overflow at extreme marginals) are sanitized to a zero log-likelihood
    /// contribution instead of poisoning the aggregate sum.
    pub fn log_density(self, theta: f64, u: f64, v: f64) -> f64 {
        let (u, v) = (clamp_uniform(u), clamp_uniform(v));
        let pdf = match self {
            CopulaFamily::Clayton => clayton::density(theta, u, v),
            CopulaFamily::Frank => frank::density(theta, u, v),
            CopulaFamily::Gumbel => gumbel::density(theta, u, v),
        };
        let log_pdf = pdf.ln();
        if log_pdf.is_finite() {
            log_pdf
        } else {
            0.0
        }
    }

    /// P(U <= u | V = v). Always in [0, 1]; a non-finite intermediate maps
    /// to the neutral 0.5, which can trigger neither entry threshold.
    pub fn conditional_u(self, theta: f64, u: f64, v: f64) -> f64 {
        let (u, v) = (clamp_uniform(u), clamp_uniform(v));
        let raw = match self {
            CopulaFamily::Clayton => clayton::conditional_u(theta, u, v),
            CopulaFamily::Frank => frank::conditional_u(theta, u, v),
            CopulaFamily::Gumbel => gumbel::conditional_u(theta, u, v),
        };
        sanitize_probability(raw)
    }

    /// P(V <= v | U = u). Same guarantees as `conditional_u`.
    pub fn conditional_v(self, theta: f64, u: f64, v: f64) -> f64 {
        let (u, v) = (clamp_uniform(u), clamp_uniform(v));
        let raw = match self {
            CopulaFamily::Clayton => clayton::conditional_v(theta, u, v),
            CopulaFamily::Frank => frank::conditional_v(theta, u, v),
            CopulaFamily::Gumbel => gumbel::conditional_v(theta, u, v),
        };
        sanitize_probability(raw)
    }
}

fn sanitize_probability(p: f64) -> f64 {
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

impl fmt::Display for CopulaFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopulaFamily::Clayton => write!(f, "clayton"),
            CopulaFamily::Frank => write!(f, "frank"),
            CopulaFamily::Gumbel => write!(f, "gumbel"),
        }
    }
}

/// A fitted copula: family tag plus its dependence parameter. Owned by the
/// signal engine for the active pair and replaced, never mutated, on refit.
#[derive(Debug, Clone, PartialEq)]
pub struct CopulaModel {
    pub family: CopulaFamily,
    pub theta: f64,
}

impl CopulaModel {
    pub fn mispricing_indices(&self, u: f64, v: f64) -> MispricingIndices {
        MispricingIndices {
            mi_u_given_v: self.family.conditional_u(self.theta, u, v),
            mi_v_given_u: self.family.conditional_v(self.theta, u, v),
        }
    }
}
