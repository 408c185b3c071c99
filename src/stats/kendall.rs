use crate::error::SignalError;

/// Kendall's rank correlation (tau-b, tie-corrected) between two paired
/// samples. Counts concordant and discordant pairs directly; O(n^2), which
/// is fine for the window lengths this engine works with.
pub fn kendall_tau(x: &[f64], y: &[f64]) -> Result<f64, SignalError> {
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

    let n = x.len();
    let mut concordant = 0u64;
    let mut discordant = 0u64;
    let mut ties_x = 0u64;
    let mut ties_y = 0u64;

    for i in 0..n {
        for j in (i + 1)..n {
            let dx = x[i] - x[j];
            let dy = y[i] - y[j];
            if dx == 0.0 && dy == 0.0 {
                ties_x += 1;
                ties_y += 1;
            } else if dx == 0.0 {
                ties_x += 1;
            } else if dy == 0.0 {
                ties_y += 1;
            } else if (dx > 0.0) == (dy > 0.0) {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }
    }

    let total_pairs = (n * (n - 1) / 2) as f64;
    let denom_x = total_pairs - ties_x as f64;
    let denom_y = total_pairs - ties_y as f64;
    if denom_x <= 0.0 || denom_y <= 0.0 {
        return Err(SignalError::DegenerateParameter(
            "zero rank variance in at least one series".to_string(),
        ));
    }

    let tau = (concordant as f64 - discordant as f64) / (denom_x * denom_y).sqrt();
    Ok(tau.clamp(-1.0, 1.0))
}
