use crate::error::SignalError;

const FIT_START: f64 = 4.0;
const FIT_STEP_TOL: f64 = 1e-5;
const FIT_MAX_EVALS: usize = 500;
const DEBYE_INTERVALS: usize = 200;

/// Frank's theta has no closed form in tau. The relation is
///
///   (tau - 1) / 4 = (D1(theta) - 1) / theta
///
/// with D1 the first-order Debye function, so theta is recovered by
/// minimizing the squared residual with a derivative-free pattern search
/// from theta = 4: double the step on improvement, halve it otherwise,
/// stop once the step drops below 1e-5.
pub(super) fn parameter_from_tau(tau: f64) -> Result<f64, SignalError> {
    let objective = |theta: f64| {
        let residual = (tau - 1.0) / 4.0 - (debye_first(theta) - 1.0) / theta;
        residual * residual
    };

    let mut theta = FIT_START;
    let mut best = objective(theta);
    let mut step = 1.0;
    let mut evals = 1usize;

    while step > FIT_STEP_TOL {
        if evals >= FIT_MAX_EVALS {
            return Err(SignalError::OptimizationDiverged(format!(
                "frank parameter fit exhausted {FIT_MAX_EVALS} evaluations at tau = {tau}"
            )));
        }
        let mut moved = false;
        for candidate in [theta + step, theta - step] {
            evals += 1;
            let value = objective(candidate);
            if value < best {
                theta = candidate;
                best = value;
                moved = true;
                break;
            }
        }
        if moved {
            step *= 2.0;
        } else {
            step *= 0.5;
        }
    }
    Ok(theta)
}

pub(super) fn density(theta: f64, u: f64, v: f64) -> f64 {
    let num = -theta * (-theta).exp_m1() * (-theta * (u + v)).exp();
    let denom = (-theta * u).exp_m1() * (-theta * v).exp_m1() + (-theta).exp_m1();
    num / (denom * denom)
}

/// P(U <= u | V = v). With g(t) = e^(-theta*t) - 1, the conditional is
/// g(u)*(g(v) + 1) / (g(u)*g(v) + g(1)).
pub(super) fn conditional_u(theta: f64, u: f64, v: f64) -> f64 {
    let gu = (-theta * u).exp_m1();
    let gv = (-theta * v).exp_m1();
    let g1 = (-theta).exp_m1();
    (gu * gv + gu) / (gu * gv + g1)
}

pub(super) fn conditional_v(theta: f64, u: f64, v: f64) -> f64 {
    let gu = (-theta * u).exp_m1();
    let gv = (-theta * v).exp_m1();
    let g1 = (-theta).exp_m1();
    (gu * gv + gv) / (gu * gv + g1)
}

/// First-order Debye function D1(x) = (1/x) * integral of t/(e^t - 1)
/// from 0 to x, by composite Simpson quadrature. The integrand's
/// singularity at t = 0 is removable (limit 1).
fn debye_first(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        return 1.0;
    }
    simpson(debye_integrand, 0.0, x, DEBYE_INTERVALS) / x
}

fn debye_integrand(t: f64) -> f64 {
    if t.abs() < 1e-12 {
        return 1.0;
    }
    let denom = t.exp_m1();
    if denom.is_infinite() {
        return 0.0;
    }
    t / denom
}

fn simpson(f: impl Fn(f64) -> f64, a: f64, b: f64, intervals: usize) -> f64 {
    let h = (b - a) / intervals as f64;
    let mut sum = f(a) + f(b);
    for k in 1..intervals {
        let weight = if k % 2 == 0 { 2.0 } else { 4.0 };
        sum += weight * f(a + h * k as f64);
    }
    sum * h / 3.0
}
