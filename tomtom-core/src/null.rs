//! Per-query null-distribution engine: convolves query column histograms
//! over every overlap length, rebinning the running distribution down to
//! `n_median_bins` super-bins (the median-bin approximation) to keep the
//! convolution support bounded.

use crate::pwm::Pwm;
use crate::quantize::Quantizer;
use crate::score::column_score;

/// The convolved, averaged null for a single overlap length `L`: a
/// cumulative upper-tail array `tail[k] = P(score >= bin_k's lower edge)`
/// over a grid of at most `n_median_bins` bins spanning `[0, max_value]`.
#[derive(Clone, Debug)]
struct LengthGrid {
    max_value: i64,
    tail: Vec<f64>,
}

impl LengthGrid {
    #[inline]
    fn grid_size(&self) -> usize {
        self.tail.len()
    }
}

/// Per-query null model: one [`LengthGrid`] per overlap length `1..=L_q`.
#[derive(Clone, Debug)]
pub struct NullModel {
    l_max: usize,
    grids: Vec<LengthGrid>,
}

impl NullModel {
    /// `P(score >= score)` under the overlap-length-`overlap` null.
    /// `overlap` must be in `1..=l_max`.
    pub fn tail_probability(&self, overlap: usize, score: i64) -> f64 {
        debug_assert!(overlap >= 1 && overlap <= self.l_max);
        let grid = &self.grids[overlap - 1];
        let idx = grid_bin(score, grid.max_value, grid.grid_size());
        grid.tail[idx]
    }

    pub fn l_max(&self) -> usize {
        self.l_max
    }

    /// `quantizer` must already span the observed score range for this
    /// query. When `quantizer.is_degenerate()`, every column pair quantizes
    /// to bin 0 and the resulting null is the point mass at 0 for every
    /// overlap length.
    pub fn build(query: &Pwm, targets: &[Pwm], quantizer: &Quantizer, n_median_bins: u32) -> Self {
        let l_q = query.cols();
        let b_s = quantizer.n_bins() as usize;
        let n_median_bins = n_median_bins.max(1) as usize;

        let col_probs = build_column_histograms(query, targets, quantizer);

        let mut accum: Vec<Vec<f64>> = (1..=l_q)
            .map(|l| vec![0.0; canonical_grid_size(l, b_s, n_median_bins)])
            .collect();
        let mut window_counts = vec![0u64; l_q];

        for start in 0..l_q {
            let mut values: Vec<i64> = (0..b_s as i64).collect();
            let mut probs: Vec<f64> = col_probs[start].clone();

            record_into_grid(&mut accum[0], &values, &probs, (b_s - 1) as i64);
            window_counts[0] += 1;

            for len in 2..=(l_q - start) {
                let next_col = start + len - 1;
                let (mut nv, mut np) = convolve_step(&values, &probs, &col_probs[next_col]);
                if nv.len() > n_median_bins {
                    (nv, np) = compress(&nv, &np, n_median_bins);
                }
                values = nv;
                probs = np;

                let max_v = (len * (b_s - 1)) as i64;
                record_into_grid(&mut accum[len - 1], &values, &probs, max_v);
                window_counts[len - 1] += 1;
            }
        }

        let grids = (1..=l_q)
            .map(|l| {
                let max_v = (l * (b_s - 1)) as i64;
                let count = window_counts[l - 1].max(1) as f64;
                let density: Vec<f64> = accum[l - 1].iter().map(|x| x / count).collect();
                LengthGrid {
                    max_value: max_v,
                    tail: cumulative_upper_tail(&density),
                }
            })
            .collect();

        Self { l_max: l_q, grids }
    }
}

/// `H_q[j, b]`: for each query column `j`, the (normalized) distribution of
/// quantized scores against every target column in the database.
fn build_column_histograms(query: &Pwm, targets: &[Pwm], quantizer: &Quantizer) -> Vec<Vec<f64>> {
    let l_q = query.cols();
    let b_s = quantizer.n_bins() as usize;
    let mut counts = vec![vec![0.0f64; b_s]; l_q];
    let mut total = vec![0u64; l_q];

    for target in targets {
        for k in 0..target.cols() {
            let t_col = target.column(k);
            for j in 0..l_q {
                let s = column_score(query.column(j), t_col);
                let b = quantizer.quantize(s) as usize;
                counts[j][b] += 1.0;
                total[j] += 1;
            }
        }
    }

    for (row, &n) in counts.iter_mut().zip(total.iter()) {
        let n = n.max(1) as f64;
        for v in row.iter_mut() {
            *v /= n;
        }
    }
    counts
}

fn canonical_grid_size(l: usize, b_s: usize, n_median_bins: usize) -> usize {
    let max_v = l * (b_s - 1);
    (max_v + 1).min(n_median_bins).max(1)
}

/// Bins `accum` with `density` scaled by probability-weighted (value, prob)
/// pairs, using the same equal-width rule as [`grid_bin`].
fn record_into_grid(accum: &mut [f64], values: &[i64], probs: &[f64], max_value: i64) {
    let grid_size = accum.len();
    for (&v, &p) in values.iter().zip(probs) {
        accum[grid_bin(v, max_value, grid_size)] += p;
    }
}

/// Equal-width bin index for an integer value in `[0, max_value]` mapped
/// onto `grid_size` bins. Used identically when building the null and when
/// looking up an observed score.
#[inline]
fn grid_bin(value: i64, max_value: i64, grid_size: usize) -> usize {
    if grid_size <= 1 || max_value <= 0 {
        return 0;
    }
    let denom = (max_value + 1) as f64;
    let idx = (value as f64 * grid_size as f64 / denom).floor() as i64;
    idx.clamp(0, grid_size as i64 - 1) as usize
}

/// Convolves a (possibly already-compressed) running distribution with one
/// more column's exact quantized-score distribution.
fn convolve_step(values: &[i64], probs: &[f64], col_probs: &[f64]) -> (Vec<i64>, Vec<f64>) {
    let mut pairs: Vec<(i64, f64)> = Vec::with_capacity(values.len() * col_probs.len());
    for (&v, &p) in values.iter().zip(probs) {
        if p == 0.0 {
            continue;
        }
        for (k, &q) in col_probs.iter().enumerate() {
            if q > 0.0 {
                pairs.push((v + k as i64, p * q));
            }
        }
    }
    pairs.sort_unstable_by_key(|&(v, _)| v);

    let mut values = Vec::with_capacity(pairs.len());
    let mut probs = Vec::with_capacity(pairs.len());
    for (v, p) in pairs {
        if values.last() == Some(&v) {
            *probs.last_mut().unwrap() += p;
        } else {
            values.push(v);
            probs.push(p);
        }
    }
    (values, probs)
}

/// Rebins a distribution down to at most `n_bins` equal-width super-bins,
/// each represented by its probability-weighted mean value.
fn compress(values: &[i64], probs: &[f64], n_bins: usize) -> (Vec<i64>, Vec<f64>) {
    let min = *values.first().unwrap();
    let max = *values.last().unwrap();
    let range = (max - min) as f64;

    let mut value_sum = vec![0.0f64; n_bins];
    let mut prob_sum = vec![0.0f64; n_bins];
    for (&v, &p) in values.iter().zip(probs) {
        let frac = if range > 0.0 {
            (v - min) as f64 / range
        } else {
            0.0
        };
        let bin = ((frac * n_bins as f64) as usize).min(n_bins - 1);
        value_sum[bin] += v as f64 * p;
        prob_sum[bin] += p;
    }

    let mut out_values = Vec::with_capacity(n_bins);
    let mut out_probs = Vec::with_capacity(n_bins);
    for i in 0..n_bins {
        if prob_sum[i] > 0.0 {
            out_values.push((value_sum[i] / prob_sum[i]).round() as i64);
            out_probs.push(prob_sum[i]);
        }
    }
    (out_values, out_probs)
}

fn cumulative_upper_tail(density: &[f64]) -> Vec<f64> {
    let mut tail = vec![0.0; density.len()];
    let mut running = 0.0;
    for i in (0..density.len()).rev() {
        running += density[i];
        tail[i] = running;
    }
    tail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize::{score_bounds, Quantizer};

    fn make_quantizer(query: &Pwm, targets: &[Pwm], n_bins: u32) -> Quantizer {
        let mut scores = Vec::new();
        for t in targets {
            for k in 0..t.cols() {
                for j in 0..query.cols() {
                    scores.push(column_score(query.column(j), t.column(k)));
                }
            }
        }
        let (lo, hi) = score_bounds(scores.into_iter());
        Quantizer::new(lo, hi, n_bins)
    }

    #[test]
    fn every_overlap_length_sums_to_one() {
        let query = Pwm::one_hot("ACGTAC").unwrap();
        let targets = vec![
            Pwm::one_hot("ACGTAC").unwrap(),
            Pwm::one_hot("TTTTTT").unwrap(),
            Pwm::one_hot("GGCCAA").unwrap(),
        ];
        let quantizer = make_quantizer(&query, &targets, 10);
        let model = NullModel::build(&query, &targets, &quantizer, 1000);

        for l in 1..=query.cols() {
            let tail_at_zero = model.tail_probability(l, 0);
            assert!(
                (tail_at_zero - 1.0).abs() < 1e-9,
                "overlap {l}: total mass should be 1, got {tail_at_zero}"
            );
        }
    }

    #[test]
    fn tail_probability_is_nonincreasing_in_score() {
        let query = Pwm::one_hot("ACGT").unwrap();
        let targets = vec![Pwm::one_hot("ACGT").unwrap(), Pwm::one_hot("TGCA").unwrap()];
        let quantizer = make_quantizer(&query, &targets, 20);
        let model = NullModel::build(&query, &targets, &quantizer, 1000);

        let max_v = 4 * (quantizer.n_bins() as i64 - 1);
        let mut previous = model.tail_probability(4, 0);
        for s in 1..=max_v {
            let current = model.tail_probability(4, s);
            assert!(current <= previous + 1e-12);
            previous = current;
        }
    }

    #[test]
    fn degenerate_quantizer_collapses_to_point_mass() {
        let query = Pwm::one_hot("AAAA").unwrap();
        let targets = vec![Pwm::one_hot("AAAA").unwrap()];
        let quantizer = Quantizer::new(1.0, 1.0, 10);
        assert!(quantizer.is_degenerate());
        let model = NullModel::build(&query, &targets, &quantizer, 1000);
        assert_eq!(model.tail_probability(4, 0), 1.0);
    }

    #[test]
    fn median_bin_compression_keeps_grid_bounded() {
        let query = Pwm::one_hot(&"ACGT".repeat(10)).unwrap(); // 40 columns
        let targets = vec![Pwm::one_hot(&"ACGT".repeat(10)).unwrap()];
        let quantizer = make_quantizer(&query, &targets, 100);
        let model = NullModel::build(&query, &targets, &quantizer, 64);
        for grid in &model.grids {
            assert!(grid.grid_size() <= 64);
        }
    }
}
