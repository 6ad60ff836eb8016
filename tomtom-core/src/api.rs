//! Public entry point: wires validation, quantization, null construction
//! (with caching), alignment/top-K scoring and the scheduler into one
//! call.

use crate::align::align_pair;
use crate::bucket::{select_top_k, RankedHit, TargetBuckets};
use crate::cache::{NullCache, QueryKey};
use crate::config::{Diagnostics, TomtomConfig};
use crate::error::TomtomResult;
use crate::null::NullModel;
use crate::output::TomtomOutput;
use crate::pwm::{validate_batch, Pwm};
use crate::pvalue;
use crate::quantize::{score_bounds, Quantizer};
use crate::score::column_score;
use crate::scheduler;

struct QueryOutcome {
    hits: Vec<RankedHit>,
    warnings: Vec<String>,
}

/// Scores every `(query, target)` pair, or (when `config.n_nearest` is set)
/// the best `n_nearest` targets per query, returning both the flat result
/// buffers and any non-fatal diagnostics raised along the way.
pub fn tomtom(
    queries: &[Pwm],
    targets: &[Pwm],
    config: &TomtomConfig,
) -> TomtomResult<(TomtomOutput, Diagnostics)> {
    validate_batch(queries, "queries")?;
    validate_batch(targets, "targets")?;

    let mut diagnostics = Diagnostics::new();
    let n_targets = targets.len();
    let k = config.n_nearest.map(|requested| {
        if requested > n_targets {
            diagnostics.push(format!(
                "n_nearest ({requested}) exceeds target count ({n_targets}); clamped to {n_targets}"
            ));
            n_targets
        } else {
            requested
        }
    });

    let cache = NullCache::new(config.n_cache);
    let buckets = k.map(|_| TargetBuckets::build(targets, config.n_target_bins));

    let outcomes: Vec<QueryOutcome> = scheduler::run_indexed(queries, config.n_jobs, |_, query| {
        process_query(query, targets, config, &cache, buckets.as_ref(), k)
    });

    let mut output = match k {
        Some(k) => TomtomOutput::top_k(queries.len(), n_targets, k),
        None => TomtomOutput::dense(queries.len(), n_targets),
    };

    for (q_idx, outcome) in outcomes.into_iter().enumerate() {
        for warning in outcome.warnings {
            diagnostics.push(warning);
        }
        match k {
            Some(_) => {
                for (rank, hit) in outcome.hits.iter().enumerate() {
                    output.set_ranked(q_idx, rank, hit);
                }
            }
            None => {
                for hit in &outcome.hits {
                    output.set_dense(q_idx, hit.target_index, hit);
                }
            }
        }
    }

    Ok((output, diagnostics))
}

fn process_query(
    query: &Pwm,
    targets: &[Pwm],
    config: &TomtomConfig,
    cache: &NullCache,
    buckets: Option<&TargetBuckets>,
    k: Option<usize>,
) -> QueryOutcome {
    let mut warnings = Vec::new();

    let mut scores = Vec::new();
    for target in targets {
        for t in 0..target.cols() {
            let t_col = target.column(t);
            for q in 0..query.cols() {
                scores.push(column_score(query.column(q), t_col));
            }
        }
    }
    let (s_min, s_max) = score_bounds(scores.into_iter());
    if s_max <= s_min {
        warnings.push(
            "query's observed score range collapsed to a single value; every alignment against it reports p = 1".to_string(),
        );
    }
    let quantizer = Quantizer::new(s_min, s_max, config.n_score_bins);

    let key = QueryKey::new(query, &quantizer);
    let null = match cache.get(&key) {
        Some(null) => null,
        None => {
            let null = NullModel::build(query, targets, &quantizer, config.n_median_bins);
            cache.put(key, null.clone());
            null
        }
    };

    let rc_query = if config.reverse_complement {
        Some(query.reverse_complement())
    } else {
        None
    };

    let hits = match (k, buckets) {
        (Some(k), Some(buckets)) => {
            select_top_k(query, rc_query.as_ref(), targets, &quantizer, &null, buckets, k)
        }
        _ => targets
            .iter()
            .enumerate()
            .map(|(target_index, target)| {
                let outcome = align_pair(query, rc_query.as_ref(), target, &quantizer);
                let p_value = pvalue::assemble(&outcome, &null);
                RankedHit {
                    target_index,
                    p_value,
                    outcome,
                }
            })
            .collect(),
    };

    QueryOutcome { hits, warnings }
}
