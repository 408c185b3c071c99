use crate::error::SignalError;

/// theta = 1 / (1 - tau); theta >= 1, so tau must lie in [0, 1).
pub(super) fn parameter_from_tau(tau: f64) -> Result<f64, SignalError> {
    if (1.0 - tau).abs() < f64::EPSILON {
        return Err(SignalError::DegenerateParameter(
            "gumbel theta undefined at tau = 1".to_string(),
        ));
    }
    if tau < 0.0 {
        return Err(SignalError::DegenerateParameter(format!(
            "gumbel requires tau >= 0, got {tau}"
        )));
    }
    Ok(1.0 / (1.0 - tau))
}

pub(super) fn density(theta: f64, u: f64, v: f64) -> f64 {
    let a = (-u.ln()).powf(theta) + (-v.ln()).powf(theta);
    let c = (-a.powf(1.0 / theta)).exp();
    c * (u * v).recip()
        * a.powf(-2.0 + 2.0 / theta)
        * (u.ln() * v.ln()).powf(theta - 1.0)
        * (1.0 + (theta - 1.0) * a.powf(-1.0 / theta))
}

/// P(U <= u | V = v) = C(u,v) * A^((1-theta)/theta) * (-ln v)^(theta-1) / v
pub(super) fn conditional_u(theta: f64, u: f64, v: f64) -> f64 {
    let a = (-u.ln()).powf(theta) + (-v.ln()).powf(theta);
    let c = (-a.powf(1.0 / theta)).exp();
    c * a.powf((1.0 - theta) / theta) * (-v.ln()).powf(theta - 1.0) / v
}

pub(super) fn conditional_v(theta: f64, u: f64, v: f64) -> f64 {
    let a = (-u.ln()).powf(theta) + (-v.ln()).powf(theta);
    let c = (-a.powf(1.0 / theta)).exp();
    c * a.powf((1.0 - theta) / theta) * (-u.ln()).powf(theta - 1.0) / u
}
