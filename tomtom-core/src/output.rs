//! Flat result buffers returned by [`crate::api::tomtom`].

use crate::align::Strand;

/// Result of one `tomtom()` call.
///
/// In dense mode (`config.n_nearest == None`) every query is paired with
/// every target: `stride == n_targets` and `p_values[q * stride + t]` is the
/// query-`q`-vs-target-`t` result, with `target_indices` empty.
///
/// In top-K mode (`config.n_nearest == Some(k)`) each query keeps only its
/// `k` best targets: `stride == k` and `target_indices[q * stride + i]`
/// gives the target index of the `i`-th best hit for query `q`.
#[derive(Clone, Debug)]
pub struct TomtomOutput {
    n_queries: usize,
    n_targets: usize,
    stride: usize,
    p_values: Vec<f64>,
    scores: Vec<i64>,
    offsets: Vec<i64>,
    overlaps: Vec<usize>,
    strands: Vec<Strand>,
    target_indices: Vec<usize>,
}

impl TomtomOutput {
    pub(crate) fn dense(n_queries: usize, n_targets: usize) -> Self {
        let len = n_queries * n_targets;
        Self {
            n_queries,
            n_targets,
            stride: n_targets,
            p_values: vec![1.0; len],
            scores: vec![0; len],
            offsets: vec![0; len],
            overlaps: vec![0; len],
            strands: vec![Strand::Forward; len],
            target_indices: Vec::new(),
        }
    }

    pub(crate) fn top_k(n_queries: usize, n_targets: usize, k: usize) -> Self {
        let len = n_queries * k;
        Self {
            n_queries,
            n_targets,
            stride: k,
            p_values: vec![1.0; len],
            scores: vec![0; len],
            offsets: vec![0; len],
            overlaps: vec![0; len],
            strands: vec![Strand::Forward; len],
            target_indices: vec![usize::MAX; len],
        }
    }

    #[inline]
    pub(crate) fn set_dense(&mut self, query: usize, target: usize, hit: &crate::bucket::RankedHit) {
        let idx = query * self.stride + target;
        self.p_values[idx] = hit.p_value;
        self.scores[idx] = hit.outcome.score;
        self.offsets[idx] = hit.outcome.offset;
        self.overlaps[idx] = hit.outcome.overlap;
        self.strands[idx] = hit.outcome.strand;
    }

    #[inline]
    pub(crate) fn set_ranked(&mut self, query: usize, rank: usize, hit: &crate::bucket::RankedHit) {
        let idx = query * self.stride + rank;
        self.p_values[idx] = hit.p_value;
        self.scores[idx] = hit.outcome.score;
        self.offsets[idx] = hit.outcome.offset;
        self.overlaps[idx] = hit.outcome.overlap;
        self.strands[idx] = hit.outcome.strand;
        self.target_indices[idx] = hit.target_index;
    }

    pub fn n_queries(&self) -> usize {
        self.n_queries
    }

    pub fn n_targets(&self) -> usize {
        self.n_targets
    }

    /// Row stride: `n_targets` in dense mode, `k` in top-K mode.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn p_values(&self) -> &[f64] {
        &self.p_values
    }

    pub fn scores(&self) -> &[i64] {
        &self.scores
    }

    pub fn offsets(&self) -> &[i64] {
        &self.offsets
    }

    pub fn overlaps(&self) -> &[usize] {
        &self.overlaps
    }

    pub fn strands(&self) -> &[Strand] {
        &self.strands
    }

    /// Target index per result entry; empty in dense mode, where the
    /// target index is implicit (`idx % stride`).
    pub fn target_indices(&self) -> &[usize] {
        &self.target_indices
    }

    /// Reads back the `p`-value for `(query, target)` in dense mode.
    pub fn p_value_at(&self, query: usize, target: usize) -> f64 {
        debug_assert!(self.target_indices.is_empty(), "p_value_at is a dense-mode accessor");
        self.p_values[query * self.stride + target]
    }
}
