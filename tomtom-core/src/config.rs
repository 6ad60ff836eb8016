//! Call-level configuration and non-fatal diagnostics.

use crate::error::{TomtomError, TomtomResult};

/// Parameters controlling one `tomtom()` call. Built with
/// [`TomtomConfig::new`], which validates every field up front.
#[derive(Clone, Copy, Debug)]
pub struct TomtomConfig {
    /// Keep only the `n_nearest` best targets per query. `None` scores and
    /// reports every target.
    pub n_nearest: Option<usize>,
    /// Number of quantization bins for column scores.
    pub n_score_bins: u32,
    /// Cap on the null-distribution convolution support.
    pub n_median_bins: u32,
    /// Number of approximate buckets targets are grouped into for top-K
    /// pruning. Ignored when `n_nearest` is `None`.
    pub n_target_bins: u32,
    /// Number of per-query null models kept in the bounded cache. `0`
    /// disables caching.
    pub n_cache: usize,
    /// Also score each query's reverse complement and keep the better
    /// strand.
    pub reverse_complement: bool,
    /// Worker count for the query scheduler. `<= 0` means "use all
    /// available cores".
    pub n_jobs: i64,
}

impl TomtomConfig {
    pub fn new(
        n_nearest: Option<usize>,
        n_score_bins: u32,
        n_median_bins: u32,
        n_target_bins: u32,
        n_cache: usize,
        reverse_complement: bool,
        n_jobs: i64,
    ) -> TomtomResult<Self> {
        if n_score_bins == 0 {
            return Err(TomtomError::InvalidParameter {
                reason: "n_score_bins must be positive".into(),
            });
        }
        if n_median_bins == 0 {
            return Err(TomtomError::InvalidParameter {
                reason: "n_median_bins must be positive".into(),
            });
        }
        if n_nearest == Some(0) {
            return Err(TomtomError::InvalidParameter {
                reason: "n_nearest must be positive when provided".into(),
            });
        }
        Ok(Self {
            n_nearest,
            n_score_bins,
            n_median_bins,
            n_target_bins: n_target_bins.max(1),
            n_cache,
            reverse_complement,
            n_jobs,
        })
    }
}

impl Default for TomtomConfig {
    /// Mirrors `tomtom-py`'s keyword defaults.
    fn default() -> Self {
        Self {
            n_nearest: None,
            n_score_bins: 100,
            n_median_bins: 1000,
            n_target_bins: 100,
            n_cache: 100,
            reverse_complement: true,
            n_jobs: -1,
        }
    }
}

/// Non-fatal warnings accumulated over the course of one `tomtom()` call.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_score_bins() {
        let err = TomtomConfig::new(None, 0, 1000, 100, 100, true, -1).unwrap_err();
        assert!(matches!(err, TomtomError::InvalidParameter { .. }));
    }

    #[test]
    fn rejects_zero_n_nearest() {
        let err = TomtomConfig::new(Some(0), 100, 1000, 100, 100, true, -1).unwrap_err();
        assert!(matches!(err, TomtomError::InvalidParameter { .. }));
    }

    #[test]
    fn default_matches_documented_python_defaults() {
        let cfg = TomtomConfig::default();
        assert_eq!(cfg.n_nearest, None);
        assert_eq!(cfg.n_score_bins, 100);
        assert_eq!(cfg.n_median_bins, 1000);
        assert_eq!(cfg.n_target_bins, 100);
        assert_eq!(cfg.n_cache, 100);
        assert!(cfg.reverse_complement);
        assert_eq!(cfg.n_jobs, -1);
    }

    #[test]
    fn diagnostics_records_pushed_warnings() {
        let mut diag = Diagnostics::new();
        assert!(diag.is_empty());
        diag.push("n_nearest clamped to Nt");
        assert_eq!(diag.warnings(), ["n_nearest clamped to Nt"]);
    }
}
