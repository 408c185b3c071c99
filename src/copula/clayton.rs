use crate::error::SignalError;

/// theta = 2*tau / (1 - tau); valid only for positive dependence.
pub(super) fn parameter_from_tau(tau: f64) -> Result<f64, SignalError> {
    if (1.0 - tau).abs() < f64::EPSILON {
        return Err(SignalError::DegenerateParameter(
            "clayton theta undefined at tau = 1".to_string(),
        ));
    }
    if tau <= 0.0 {
        return Err(SignalError::DegenerateParameter(format!(
            "clayton requires tau > 0, got {tau}"
        )));
    }
    Ok(2.0 * tau / (1.0 - tau))
}

pub(super) fn density(theta: f64, u: f64, v: f64) -> f64 {
    let s = u.powf(-theta) + v.powf(-theta) - 1.0;
    (theta + 1.0)
        * s.powf(-2.0 - 1.0 / theta)
        * u.powf(-theta - 1.0)
        * v.powf(-theta - 1.0)
}

/// P(U <= u | V = v) = v^(-theta-1) * (u^-theta + v^-theta - 1)^(-1/theta - 1)
pub(super) fn conditional_u(theta: f64, u: f64, v: f64) -> f64 {
    let s = u.powf(-theta) + v.powf(-theta) - 1.0;
    v.powf(-theta - 1.0) * s.powf(-1.0 / theta - 1.0)
}

pub(super) fn conditional_v(theta: f64, u: f64, v: f64) -> f64 {
    let s = u.powf(-theta) + v.powf(-theta) - 1.0;
    u.powf(-theta - 1.0) * s.powf(-1.0 / theta - 1.0)
}
