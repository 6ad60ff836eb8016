//! Top-K selector with approximate target bucketing: targets are grouped
//! by a signature against a fixed reference column, and whole buckets are
//! pruned once their score ceiling can't beat the running K-th-best p-value.

use crate::align::{align_pair, AlignmentOutcome};
use crate::null::NullModel;
use crate::pvalue::sidak_correct;
use crate::pwm::{Pwm, ALPHABET_SIZE};
use crate::quantize::{equal_width_bin, Quantizer};
use crate::score::column_score;

/// One candidate result for the top-K output: the target index plus its
/// alignment outcome and assembled p-value.
#[derive(Clone, Copy, Debug)]
pub struct RankedHit {
    pub target_index: usize,
    pub p_value: f64,
    pub outcome: AlignmentOutcome,
}

/// Precomputed target buckets, reused across every query in a call.
pub struct TargetBuckets {
    /// `bucket_of[t]` = bucket index of target `t`.
    bucket_of: Vec<usize>,
    /// Targets grouped by bucket, each bucket's members in original order.
    members: Vec<Vec<usize>>,
    /// Per-bucket ceiling on the quantized reference-column score,
    /// normalized to `[0, 1]`, used to rank buckets and bound pruning.
    ceiling: Vec<f64>,
    /// Longest target PWM within each bucket (bounds the achievable overlap).
    max_len: Vec<usize>,
}

impl TargetBuckets {
    pub fn build(targets: &[Pwm], n_target_bins: u32) -> Self {
        let n_target_bins = n_target_bins.max(1) as usize;
        let reference = mean_column(targets);

        let signatures: Vec<f64> = targets
            .iter()
            .map(|t| mean_signature(&reference, t))
            .collect();
        let lo = signatures.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = signatures
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);

        let mut members = vec![Vec::new(); n_target_bins];
        let mut bucket_of = vec![0usize; targets.len()];
        for (i, &sig) in signatures.iter().enumerate() {
            let bucket = equal_width_bin(sig, lo, hi, n_target_bins as u32) as usize;
            bucket_of[i] = bucket;
            members[bucket].push(i);
        }

        let mut ceiling = vec![0.0f64; n_target_bins];
        let mut max_len = vec![0usize; n_target_bins];
        for (bucket, target_idxs) in members.iter().enumerate() {
            let mut best_sig = f64::NEG_INFINITY;
            let mut longest = 0usize;
            for &t in target_idxs {
                best_sig = best_sig.max(signatures[t]);
                longest = longest.max(targets[t].cols());
            }
            let normalized = if hi > lo {
                ((best_sig - lo) / (hi - lo)).clamp(0.0, 1.0)
            } else {
                1.0
            };
            ceiling[bucket] = normalized;
            max_len[bucket] = longest;
        }

        Self {
            bucket_of,
            members,
            ceiling,
            max_len,
        }
    }

    #[inline]
    pub fn bucket_of(&self, target_index: usize) -> usize {
        self.bucket_of[target_index]
    }

    /// Bucket indices ordered from most to least promising.
    fn ranked_bucket_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.members.len())
            .filter(|&b| !self.members[b].is_empty())
            .collect();
        order.sort_by(|&a, &b| self.ceiling[b].partial_cmp(&self.ceiling[a]).unwrap());
        order
    }
}

/// Selects the `k` targets with the smallest p-values for `query`, pruning
/// buckets whose optimistic bound cannot beat the running K-th-best
/// p-value. Always returns exactly `k` entries (clamped by caller to `Nt`),
/// sorted ascending by p-value.
pub fn select_top_k(
    query: &Pwm,
    rc_query: Option<&Pwm>,
    targets: &[Pwm],
    quantizer: &Quantizer,
    null: &NullModel,
    buckets: &TargetBuckets,
    k: usize,
) -> Vec<RankedHit> {
    let l_q = query.cols();
    let max_raw_score = (quantizer.n_bins() as i64 - 1).max(0);
    let n_offset_alignments = |overlap: usize| {
        // `overlap` stands in for the bucket's longest target length here;
        // this is only used to estimate an optimistic alignment count.
        let count = (l_q + overlap).saturating_sub(1) as u64;
        if rc_query.is_some() {
            count * 2
        } else {
            count
        }
    };

    let mut hits: Vec<RankedHit> = Vec::with_capacity(k);
    let mut kth_best: f64 = 1.0;

    for bucket in buckets.ranked_bucket_order() {
        if hits.len() >= k {
            let overlap = l_q.min(buckets.max_len[bucket]).max(1);
            let optimistic_score = (overlap as f64
                * max_raw_score as f64
                * buckets.ceiling[bucket].clamp(0.0, 1.0))
            .round() as i64;
            let optimistic_raw = null.tail_probability(overlap, optimistic_score);
            let optimistic_p = sidak_correct(optimistic_raw, n_offset_alignments(overlap));
            if optimistic_p > kth_best {
                continue; // whole bucket pruned: can't beat the current cutoff
            }
        }

        for &t in &buckets.members[bucket] {
            let outcome = align_pair(query, rc_query, &targets[t], quantizer);
            let p_value = crate::pvalue::assemble(&outcome, null);
            hits.push(RankedHit {
                target_index: t,
                p_value,
                outcome,
            });
        }

        hits.sort_by(|a, b| a.p_value.partial_cmp(&b.p_value).unwrap());
        if hits.len() > k {
            hits.truncate(k);
        }
        if hits.len() >= k {
            kth_best = hits[k - 1].p_value;
        }
    }

    hits
}

/// Elementwise mean column across every column of every target: the fixed
/// reference query the bucket signatures are computed against.
fn mean_column(targets: &[Pwm]) -> [f32; ALPHABET_SIZE] {
    let mut sum = [0.0f64; ALPHABET_SIZE];
    let mut n = 0u64;
    for t in targets {
        for k in 0..t.cols() {
            let col = t.column(k);
            for a in 0..ALPHABET_SIZE {
                sum[a] += col[a] as f64;
            }
            n += 1;
        }
    }
    let n = n.max(1) as f64;
    let mut out = [0.0f32; ALPHABET_SIZE];
    for a in 0..ALPHABET_SIZE {
        out[a] = (sum[a] / n) as f32;
    }
    out
}

/// A target's average column score against the fixed reference column.
fn mean_signature(reference: &[f32; ALPHABET_SIZE], target: &Pwm) -> f64 {
    if target.cols() == 0 {
        return 0.0;
    }
    let mut acc = 0.0;
    for k in 0..target.cols() {
        acc += column_score(*reference, target.column(k));
    }
    acc / target.cols() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::null::NullModel;
    use crate::quantize::score_bounds;

    fn build_query_and_targets() -> (Pwm, Vec<Pwm>) {
        let query = Pwm::one_hot("ACGTAC").unwrap();
        let targets = vec![
            Pwm::one_hot("ACGTAC").unwrap(),
            Pwm::one_hot("TTTTTT").unwrap(),
            Pwm::one_hot("GGCCAA").unwrap(),
            Pwm::one_hot("CATGCA").unwrap(),
            Pwm::one_hot("ACGTAG").unwrap(),
        ];
        (query, targets)
    }

    fn quantizer_for(query: &Pwm, targets: &[Pwm], n_bins: u32) -> Quantizer {
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
    fn every_target_lands_in_some_bucket() {
        let (_, targets) = build_query_and_targets();
        let buckets = TargetBuckets::build(&targets, 3);
        let total: usize = buckets.members.iter().map(|m| m.len()).sum();
        assert_eq!(total, targets.len());
    }

    #[test]
    fn top_k_matches_full_scan_for_k_equal_to_target_count() {
        let (query, targets) = build_query_and_targets();
        let quantizer = quantizer_for(&query, &targets, 20);
        let null = NullModel::build(&query, &targets, &quantizer, 1000);
        let buckets = TargetBuckets::build(&targets, 2);

        let top = select_top_k(&query, None, &targets, &quantizer, &null, &buckets, targets.len());

        let mut full: Vec<RankedHit> = (0..targets.len())
            .map(|t| {
                let outcome = align_pair(&query, None, &targets[t], &quantizer);
                let p_value = crate::pvalue::assemble(&outcome, &null);
                RankedHit {
                    target_index: t,
                    p_value,
                    outcome,
                }
            })
            .collect();
        full.sort_by(|a, b| a.p_value.partial_cmp(&b.p_value).unwrap());

        assert_eq!(top.len(), full.len());
        for (a, b) in top.iter().zip(full.iter()) {
            assert!((a.p_value - b.p_value).abs() < 1e-9);
        }
    }

    #[test]
    fn self_identity_ranks_first() {
        let (query, targets) = build_query_and_targets();
        let quantizer = quantizer_for(&query, &targets, 20);
        let null = NullModel::build(&query, &targets, &quantizer, 1000);
        let buckets = TargetBuckets::build(&targets, 3);
        let top = select_top_k(&query, None, &targets, &quantizer, &null, &buckets, 1);
        assert_eq!(top[0].target_index, 0); // targets[0] == query
    }
}
