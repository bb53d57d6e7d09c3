use house_price_core::{Matrix, MlError, MlResult};

/// Result of a least-squares solve.
#[derive(Debug, Clone)]
pub struct LstsqSolution {
    /// Coefficients, one per column of `A`. Columns outside the numerical
    /// rank get a zero coefficient.
    pub x: Vec<f64>,
    /// Numerical rank detected during factorization.
    pub rank: usize,
}

/// Least-squares solution: minimize ||Ax - b||² using Householder QR with
/// column pivoting.
///
/// Rank-deficient systems (duplicated or collinear columns, as produced by
/// one-hot blocks) get the minimum-norm solution: the rank×n block
/// `[R₁₁ R₁₂]` is reduced once more with a QR of its transpose, a complete
/// orthogonal decomposition.
pub fn lstsq(a: &Matrix, b: &[f64]) -> MlResult<LstsqSolution> {
    let (m, n) = a.shape();
    if b.len() != m {
        return Err(MlError::DimensionMismatch(format!(
            "lstsq: b has {} elements but A has {} rows",
            b.len(),
            m
        )));
    }
    if m == 0 {
        return Err(MlError::EmptyData("lstsq: A has no rows".into()));
    }
    if !a.all_finite() || b.iter().any(|v| !v.is_finite()) {
        return Err(MlError::NonFinite("lstsq: input contains NaN or infinity".into()));
    }

    // Column-major working copy; after factorization column j holds R[..=j, j].
    let mut cols = a.to_columns();
    let mut qtb = b.to_vec();
    let mut perm: Vec<usize> = (0..n).collect();
    let steps = m.min(n);

    let mut rank = 0;
    let mut tol = 0.0;

    for k in 0..steps {
        // Pivot: remaining column with the largest trailing norm.
        let mut best = k;
        let mut best_norm = -1.0;
        for (j, col) in cols.iter().enumerate().skip(k) {
            let norm: f64 = col[k..].iter().map(|v| v * v).sum();
            if norm > best_norm {
                best_norm = norm;
                best = j;
            }
        }
        cols.swap(k, best);
        perm.swap(k, best);

        let norm = best_norm.sqrt();
        if k == 0 {
            tol = (m.max(n) as f64) * f64::EPSILON * norm;
        }
        if norm <= tol || norm == 0.0 {
            break;
        }

        // Householder reflector for cols[k][k..].
        let alpha = if cols[k][k] >= 0.0 { -norm } else { norm };
        let mut v: Vec<f64> = cols[k][k..].to_vec();
        v[0] -= alpha;
        let beta: f64 = v.iter().map(|x| x * x).sum();

        if beta > 0.0 {
            for col in cols.iter_mut().skip(k + 1) {
                reflect(&v, beta, &mut col[k..]);
            }
            reflect(&v, beta, &mut qtb[k..]);
        }

        cols[k][k] = alpha;
        for x in cols[k][k + 1..].iter_mut() {
            *x = 0.0;
        }
        rank = k + 1;
    }

    let z = if rank == n {
        back_substitute(&cols, &qtb, rank)
    } else {
        min_norm_solve(&cols, &qtb, rank, n)
    };

    let mut x = vec![0.0; n];
    for (j, &zj) in z.iter().enumerate() {
        x[perm[j]] = zj;
    }

    Ok(LstsqSolution { x, rank })
}

/// Solve the leading rank×rank upper-triangular block of R.
fn back_substitute(cols: &[Vec<f64>], qtb: &[f64], rank: usize) -> Vec<f64> {
    let mut z = vec![0.0; rank];
    for i in (0..rank).rev() {
        let mut sum = qtb[i];
        for j in (i + 1)..rank {
            sum -= cols[j][i] * z[j];
        }
        z[i] = sum / cols[i][i];
    }
    z
}

/// Minimum-norm `z` with `R z = Qᵀb` where `R` is the full-row-rank
/// rank×n block left by the pivoted QR.
///
/// Factor `Rᵀ = W S` (Householder, n×rank), so `R z = c` becomes
/// `Sᵀ (Wᵀ z) = c`. Forward-solve `Sᵀ u = c`, then `z = W [u; 0]`.
fn min_norm_solve(cols: &[Vec<f64>], qtb: &[f64], rank: usize, n: usize) -> Vec<f64> {
    // Column i of Rᵀ is row i of R; entries below the diagonal of R are zero.
    let mut rt: Vec<Vec<f64>> = (0..rank).map(|i| (0..n).map(|j| cols[j][i]).collect()).collect();
    let mut reflectors: Vec<(Vec<f64>, f64)> = Vec::with_capacity(rank);

    for k in 0..rank {
        let norm = rt[k][k..].iter().map(|v| v * v).sum::<f64>().sqrt();
        let alpha = if rt[k][k] >= 0.0 { -norm } else { norm };
        let mut v: Vec<f64> = rt[k][k..].to_vec();
        v[0] -= alpha;
        let beta: f64 = v.iter().map(|x| x * x).sum();
        if beta > 0.0 {
            for col in rt.iter_mut().skip(k + 1) {
                reflect(&v, beta, &mut col[k..]);
            }
        }
        rt[k][k] = alpha;
        reflectors.push((v, beta));
    }

    // Sᵀ is lower triangular with Sᵀ[k][i] = S[i][k] = rt[k][i].
    let mut z = vec![0.0; n];
    for k in 0..rank {
        let mut sum = qtb[k];
        for i in 0..k {
            sum -= rt[k][i] * z[i];
        }
        z[k] = sum / rt[k][k];
    }

    for (k, (v, beta)) in reflectors.iter().enumerate().rev() {
        if *beta > 0.0 {
            reflect(v, *beta, &mut z[k..]);
        }
    }
    z
}

/// Apply `H = I - 2 v vᵀ / (vᵀv)` to `target` in place.
fn reflect(v: &[f64], beta: f64, target: &mut [f64]) {
    let dot: f64 = v.iter().zip(target.iter()).map(|(a, b)| a * b).sum();
    let scale = 2.0 * dot / beta;
    for (t, &vi) in target.iter_mut().zip(v) {
        *t -= scale * vi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_lstsq_overdetermined() {
        // Fit y = 2x + 1 with an explicit column of ones.
        let a = Matrix::from_vec2d(&[vec![1.0, 1.0], vec![1.0, 2.0], vec![1.0, 3.0]]).unwrap();
        let sol = lstsq(&a, &[3.0, 5.0, 7.0]).unwrap();
        assert_eq!(sol.rank, 2);
        assert_abs_diff_eq!(sol.x[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(sol.x[1], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_lstsq_rank_deficient() {
        // Second column duplicates the first: rank 2 of 3, fitted values still exact.
        let a = Matrix::from_vec2d(&[
            vec![1.0, 1.0, 0.5],
            vec![2.0, 2.0, -1.0],
            vec![3.0, 3.0, 2.0],
            vec![4.0, 4.0, 0.0],
        ])
        .unwrap();
        let b: Vec<f64> = a.iter_rows().map(|r| 3.0 * r[0] - 2.0 * r[2]).collect();
        let sol = lstsq(&a, &b).unwrap();
        assert_eq!(sol.rank, 2);
        let fitted = a.matvec(&sol.x).unwrap();
        for (f, t) in fitted.iter().zip(&b) {
            assert_abs_diff_eq!(*f, *t, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_lstsq_duplicate_columns_share_weight() {
        // x1 + x2 = 2 has many solutions; the smallest is [1, 1].
        let a = Matrix::from_vec2d(&[vec![1.0, 1.0], vec![2.0, 2.0]]).unwrap();
        let sol = lstsq(&a, &[2.0, 4.0]).unwrap();
        assert_eq!(sol.rank, 1);
        assert_abs_diff_eq!(sol.x[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sol.x[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_lstsq_rank_deficient_is_minimum_norm() {
        // Column 2 = column 0 + column 1. Any null-space component
        // (1, 1, -1) added to the solution must only make it longer.
        let a = Matrix::from_vec2d(&[
            vec![1.0, 0.0, 1.0],
            vec![0.0, 1.0, 1.0],
            vec![1.0, 1.0, 2.0],
            vec![2.0, -1.0, 1.0],
        ])
        .unwrap();
        let b = [1.0, 2.0, 3.5, -0.5];
        let sol = lstsq(&a, &b).unwrap();
        assert_eq!(sol.rank, 2);
        let dot: f64 = sol.x[0] + sol.x[1] - sol.x[2];
        assert_abs_diff_eq!(dot, 0.0, epsilon = 1e-10);

        // Still a least-squares solution: the residual is orthogonal to A.
        let fitted = a.matvec(&sol.x).unwrap();
        let residual: Vec<f64> = b.iter().zip(&fitted).map(|(t, f)| t - f).collect();
        for col in a.to_columns() {
            let g: f64 = col.iter().zip(&residual).map(|(c, r)| c * r).sum();
            assert_abs_diff_eq!(g, 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_lstsq_zero_matrix() {
        let a = Matrix::zeros(3, 2);
        let sol = lstsq(&a, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(sol.rank, 0);
        assert_eq!(sol.x, vec![0.0, 0.0]);
    }

    #[test]
    fn test_lstsq_rejects_bad_input() {
        let a = Matrix::zeros(3, 2);
        assert!(lstsq(&a, &[1.0]).is_err());
        let nan = Matrix::new(vec![f64::NAN, 1.0], 1, 2).unwrap();
        assert!(matches!(lstsq(&nan, &[1.0]), Err(MlError::NonFinite(_))));
    }
}
