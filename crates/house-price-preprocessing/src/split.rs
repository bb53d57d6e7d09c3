use house_price_core::{MlError, MlResult, Table};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Shuffle `0..n` with a seeded RNG and cut it into train/validation indices.
///
/// The validation subset takes the first `ceil(n * valid_ratio)` shuffled
/// rows, the training subset the rest. The same `n`, ratio and seed always
/// produce the same partition.
pub fn train_valid_indices(
    n: usize,
    valid_ratio: f64,
    seed: Option<u64>,
) -> MlResult<(Vec<usize>, Vec<usize>)> {
    if !(valid_ratio > 0.0 && valid_ratio < 1.0) {
        return Err(MlError::InvalidParameter(format!(
            "validation ratio must be in (0, 1), got {}",
            valid_ratio
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    indices.shuffle(&mut rng);

    let valid_size = (n as f64 * valid_ratio).ceil() as usize;
    let train = indices[valid_size.min(n)..].to_vec();
    indices.truncate(valid_size.min(n));
    Ok((train, indices))
}

/// Split a feature table and its target into training and validation sets.
///
/// Returns `(X_train, X_valid, y_train, y_valid)`.
pub fn train_test_split(
    x: &Table,
    y: &[f64],
    valid_ratio: f64,
    seed: Option<u64>,
) -> MlResult<(Table, Table, Vec<f64>, Vec<f64>)> {
    let n = x.n_rows();
    if n != y.len() {
        return Err(MlError::DimensionMismatch(format!(
            "X has {} rows but y has {} values",
            n,
            y.len()
        )));
    }

    let (train_idx, valid_idx) = train_valid_indices(n, valid_ratio, seed)?;
    if train_idx.is_empty() || valid_idx.is_empty() {
        return Err(MlError::EmptyData(format!(
            "splitting {} rows at ratio {} leaves an empty subset",
            n, valid_ratio
        )));
    }

    let y_train = train_idx.iter().map(|&i| y[i]).collect();
    let y_valid = valid_idx.iter().map(|&i| y[i]).collect();

    Ok((
        x.take_rows(&train_idx)?,
        x.take_rows(&valid_idx)?,
        y_train,
        y_valid,
    ))
}
