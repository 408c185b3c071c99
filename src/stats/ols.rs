use crate::error::SignalError;

/// Slope of the ordinary least-squares regression of y on x. Used for the
/// pair hedge ratio (leg-B returns regressed on leg-A returns).
pub fn regression_slope(x: &[f64], y: &[f64]) -> Result<f64, SignalError> {
    if x.len() != y.len() {
        return Err(SignalError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(SignalError::InsufficientData {
            required: 2,
            got: x.len(),
        });
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        cov += dx * (yi - mean_y);
        var_x += dx * dx;
    }

    if var_x <= f64::EPSILON {
        return Err(SignalError::DegenerateParameter(
            "zero variance in regressor series".to_string(),
        ));
    }
    Ok(cov / var_x)
}
