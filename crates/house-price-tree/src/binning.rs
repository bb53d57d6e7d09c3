use house_price_core::{Matrix, MlError, MlResult};

/// Largest number of bins a feature may use; bin ids are stored as `u8`.
pub const MAX_BINS: usize = 256;

/// Feature values quantized into at most `max_bins` ordered bins.
///
/// Bin `b` of feature `f` holds the values `x` with
/// `edges[f][b - 1] < x <= edges[f][b]`. The last edge is `+inf`, so a
/// split "bin <= b" is exactly the raw test `x <= edges[f][b]`.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    edges: Vec<Vec<f64>>,
    /// Column-major bin ids, `bins[f][row]`.
    bins: Vec<Vec<u8>>,
}

impl BinnedMatrix {
    pub fn fit(x: &Matrix, max_bins: usize) -> MlResult<Self> {
        if !(2..=MAX_BINS).contains(&max_bins) {
            return Err(MlError::InvalidParameter(format!(
                "max_bins must be in 2..={}, got {}",
                MAX_BINS, max_bins
            )));
        }
        let columns = x.to_columns();
        let mut edges = Vec::with_capacity(columns.len());
        let mut bins = Vec::with_capacity(columns.len());
        for col in columns {
            let feature_edges = bin_edges(&col, max_bins);
            bins.push(col.iter().map(|&v| bin_of(&feature_edges, v)).collect());
            edges.push(feature_edges);
        }
        Ok(BinnedMatrix { edges, bins })
    }

    pub fn n_features(&self) -> usize {
        self.edges.len()
    }

    pub fn n_bins(&self, feature: usize) -> usize {
        self.edges[feature].len()
    }

    pub fn edge(&self, feature: usize, bin: usize) -> f64 {
        self.edges[feature][bin]
    }

    pub fn bin(&self, feature: usize, row: usize) -> u8 {
        self.bins[feature][row]
    }

    pub fn column(&self, feature: usize) -> &[u8] {
        &self.bins[feature]
    }
}

/// Upper bin edges for one feature.
///
/// Few distinct values: one bin per value, edges at the midpoints.
/// Otherwise cut at evenly spaced quantiles of the sorted column.
fn bin_edges(values: &[f64], max_bins: usize) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut distinct = sorted.clone();
    distinct.dedup();

    let mut edges: Vec<f64> = if distinct.len() <= max_bins {
        distinct.windows(2).map(|w| midpoint(w[0], w[1])).collect()
    } else {
        let n = sorted.len();
        (1..max_bins)
            .map(|q| {
                let idx = q * n / max_bins;
                let (lo, hi) = (sorted[idx - 1], sorted[idx]);
                if lo < hi { midpoint(lo, hi) } else { lo }
            })
            .collect()
    };
    edges.dedup();
    edges.push(f64::INFINITY);
    edges
}

fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid < hi { mid } else { lo }
}

fn bin_of(edges: &[f64], v: f64) -> u8 {
    edges.partition_point(|&e| e < v) as u8
}
