//! Bounded cache of per-query null models.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::pwm::Pwm;
use crate::quantize::Quantizer;
use crate::null::NullModel;

/// Content fingerprint of a query PWM plus the quantizer bounds and bin
/// count used to build its null. Two identical PWMs scored with different
/// quantizers must not collide.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct QueryKey([u8; 32]);

impl QueryKey {
    pub fn new(query: &Pwm, quantizer: &Quantizer) -> Self {
        let mut hasher = blake3::Hasher::new();
        query.fingerprint_into(&mut hasher);
        hasher.update(&quantizer.s_min().to_bits().to_le_bytes());
        hasher.update(&quantizer.s_max().to_bits().to_le_bytes());
        hasher.update(&quantizer.n_bins().to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }
}

/// A bounded, thread-safe cache of [`NullModel`]s. `n_cache == 0` disables
/// caching entirely (every lookup misses).
pub struct NullCache {
    inner: Option<Mutex<LruCache<QueryKey, NullModel>>>,
}

impl NullCache {
    pub fn new(capacity: usize) -> Self {
        let inner = NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap)));
        Self { inner }
    }

    /// Returns the cached null for `key`, if present, recording a cache hit.
    pub fn get(&self, key: &QueryKey) -> Option<NullModel> {
        let cache = self.inner.as_ref()?;
        match cache.lock() {
            Ok(mut guard) => guard.get(key).cloned(),
            Err(poisoned) => {
                tracing::error!("null cache mutex poisoned; resetting cache");
                let mut guard = poisoned.into_inner();
                guard.clear();
                None
            }
        }
    }

    pub fn put(&self, key: QueryKey, null: NullModel) {
        let Some(cache) = self.inner.as_ref() else {
            return;
        };
        match cache.lock() {
            Ok(mut guard) => {
                guard.put(key, null);
            }
            Err(poisoned) => {
                tracing::error!("null cache mutex poisoned; resetting cache");
                let mut guard = poisoned.into_inner();
                guard.clear();
                guard.put(key, null);
            }
        }
    }
}
