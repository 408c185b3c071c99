use crate::copula::{CopulaFamily, CopulaModel};
use crate::error::SignalError;
use crate::stats::{kendall_tau, EmpiricalDistribution};

/// Fit all three Archimedean families to the formation sample and keep the
/// one with the lowest AIC.
///
/// The paired samples are first turned into pseudo-observations through
/// their own marginal ECDFs; each family's theta comes from Kendall's tau
/// of the raw samples. With one parameter per family, AIC = -2L + 2. A
/// family whose parameter estimation fails drops out of the race; only all
/// three failing is an error.
pub fn select_best_family(
    sample_x: &[f64],
    sample_y: &[f64],
) -> Result<CopulaModel, SignalError> {
    let tau = kendall_tau(sample_x, sample_y)?;
    let ecdf_x = EmpiricalDistribution::fit(sample_x)?;
    let ecdf_y = EmpiricalDistribution::fit(sample_y)?;

    let pseudo: Vec<(f64, f64)> = sample_x
        .iter()
        .zip(sample_y.iter())
        .map(|(x, y)| (ecdf_x.evaluate(*x), ecdf_y.evaluate(*y)))
        .collect();

    let mut best: Option<(CopulaModel, f64)> = None;
    for family in CopulaFamily::ALL {
        let theta = match family.parameter_from_tau(tau) {
            Ok(theta) => theta,
            Err(e) => {
                tracing::debug!(family = %family, error = %e, "Family excluded from copula selection");
                continue;
            }
        };
        let log_likelihood: f64 = pseudo
            .iter()
            .map(|(u, v)| family.log_density(theta, *u, *v))
            .sum();
        let aic = -2.0 * log_likelihood + 2.0;
        tracing::debug!(family = %family, theta, aic, "Scored copula family");

        // Strict comparison keeps the earlier family on AIC ties.
        if best.as_ref().map_or(true, |(_, best_aic)| aic < *best_aic) {
            best = Some((CopulaModel { family, theta }, aic));
        }
    }

    best.map(|(model, _)| model).ok_or(SignalError::NoCopulaFitted)
}
