use house_price_core::{MlError, MlResult};

fn check_pair(y_true: &[f64], y_pred: &[f64]) -> MlResult<()> {
    if y_true.len() != y_pred.len() {
        return Err(MlError::DimensionMismatch(format!(
            "y_true has {} values, y_pred has {}",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(MlError::EmptyData("cannot score an empty prediction set".into()));
    }
    Ok(())
}

/// Mean Squared Error.
pub fn mse(y_true: &[f64], y_pred: &[f64]) -> MlResult<f64> {
    check_pair(y_true, y_pred)?;
    let sum: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| {
            let d = t - p;
            d * d
        })
        .sum();
    Ok(sum / y_true.len() as f64)
}

/// Root Mean Squared Error.
pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> MlResult<f64> {
    Ok(mse(y_true, y_pred)?.sqrt())
}

/// Mean Absolute Error.
pub fn mae(y_true: &[f64], y_pred: &[f64]) -> MlResult<f64> {
    check_pair(y_true, y_pred)?;
    let sum: f64 = y_true.iter().zip(y_pred).map(|(&t, &p)| (t - p).abs()).sum();
    Ok(sum / y_true.len() as f64)
}

/// R² (coefficient of determination).
///
/// Returns 0.0 when the targets are constant.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> MlResult<f64> {
    check_pair(y_true, y_pred)?;
    let n = y_true.len() as f64;
    let mean_true: f64 = y_true.iter().sum::<f64>() / n;

    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| {
            let d = t - p;
            d * d
        })
        .sum();

    let ss_tot: f64 = y_true
        .iter()
        .map(|&t| {
            let d = t - mean_true;
            d * d
        })
        .sum();

    if ss_tot < 1e-15 {
        return Ok(0.0);
    }
    Ok(1.0 - ss_res / ss_tot)
}
