use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Column means and standard deviations of `data`. Columns with (near) zero
/// spread get a deviation of 1.0 so scaling leaves them centred but unchanged.
pub(crate) fn column_stats(data: &Array2<f32>) -> (Array1<f32>, Array1<f32>) {
    let n_features = data.ncols();
    let mean = data
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(n_features));
    let std = data
        .std_axis(Axis(0), 0.0)
        .mapv(|s| if s > 1e-6 { s } else { 1.0 });
    (mean, std)
}

/// Row-wise softmax, shifted by each row's maximum for stability.
pub(crate) fn softmax_rows(logits: &Array2<f32>) -> Array2<f32> {
    let mut probs = logits.clone();
    for mut row in probs.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
    probs
}

/// Index of the largest value; the first one wins on ties.
pub(crate) fn argmax(values: ArrayView1<f32>) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, best_val), (i, &v)| {
            if v > best_val {
                (i, v)
            } else {
                (best, best_val)
            }
        })
        .0
}
