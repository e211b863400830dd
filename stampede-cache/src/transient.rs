//! Cache entry manager.
//!
//! A [`Transient`] owns one cache key, its TTL policy, and the producer that
//! regenerates it. Lookups serve the stored value while it lives and
//! regenerate on a miss, with a [`StampedeGuard`] keeping concurrent callers
//! from regenerating the same key at once.
//!
//! # Fetch-and-regenerate
//!
//! 1. No producer: empty-result, the lock is not touched.
//! 2. Locked and not stale: empty-result. Callers never wait for each other.
//! 3. Take the lock, call the producer, store its value if caching is on.
//! 4. Release the lock whatever the producer did.
//!
//! Producer errors and panics degrade to an empty-result; they are logged,
//! never returned.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use stampede_core::error::{Result, StampedeError};
use stampede_core::traits::{Clock, Store};
use stampede_core::types::{EmptyReason, Fetch};

use crate::clock::SystemClock;
use crate::config::{clamp_ttl, TransientConfig};
use crate::guard::StampedeGuard;
use crate::key::CacheKey;
use crate::producer::{BoundProducer, ProducerRegistry};

/// A single cached value with stampede-protected regeneration.
///
/// Values are stored as JSON. A `T` that cannot be serialized (a map with
/// non-string keys, say) is still returned from [`get`](Self::get) but never
/// cached, so every lookup regenerates it.
///
/// Configuration calls chain on `&mut self`:
///
/// ```rust,ignore
/// let mut weather = Transient::<Weather>::new("weather:NYC", store)?;
/// weather
///     .expires_in(600)?
///     .updates_using(|args| fetch_weather(&args[0]), vec![json!("NYC")]);
///
/// match weather.get()? {
///     Fetch::Cached(w) | Fetch::Regenerated(w) => render(w),
///     Fetch::Empty(reason) => render_placeholder(reason),
/// }
/// ```
pub struct Transient<T> {
    key: CacheKey,
    store: Arc<dyn Store>,
    guard: StampedeGuard,
    producer: Option<BoundProducer<T>>,
    ttl_secs: u64,
    do_cache: bool,
    max_lock_duration_secs: u64,
}

impl<T> Transient<T> {
    /// Creates a cache entry for `seed` on the system clock.
    ///
    /// Settings come from [`TransientConfig::from_env`], so host overrides
    /// such as `STAMPEDE_MAX_LOCK_DURATION` apply to every entry built here.
    /// Fails with [`StampedeError::InvalidKey`] if `seed` is empty.
    pub fn new(seed: &str, store: Arc<dyn Store>) -> Result<Self> {
        Self::with_config(seed, store, Arc::new(SystemClock), TransientConfig::from_env())
    }

    /// Creates a cache entry with a custom clock and configuration.
    pub fn with_config(
        seed: &str,
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        config: TransientConfig,
    ) -> Result<Self> {
        let key = CacheKey::derive(seed)?;
        let guard = StampedeGuard::new(Arc::clone(&store), clock, config.lock_mode)?;

        Ok(Self {
            key,
            store,
            guard,
            producer: None,
            ttl_secs: config.default_ttl_secs,
            do_cache: config.default_ttl_secs > 0,
            max_lock_duration_secs: config.max_lock_duration_secs,
        })
    }

    /// Returns the derived cache key.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Returns the lifetime given to stored values, in seconds.
    pub fn ttl(&self) -> u64 {
        self.ttl_secs
    }

    /// Returns true if produced values are written to the store.
    pub fn is_caching(&self) -> bool {
        self.do_cache
    }

    /// Returns true if a producer is configured.
    pub fn has_producer(&self) -> bool {
        self.producer.is_some()
    }

    /// Returns the lock age, in seconds, after which a lock is reclaimed.
    pub fn max_lock_duration(&self) -> u64 {
        self.max_lock_duration_secs
    }

    /// Returns the guard protecting this entry.
    pub fn guard(&self) -> &StampedeGuard {
        &self.guard
    }

    /// Sets how long produced values live in the store.
    ///
    /// Negative values clamp to 0. A TTL of 0 turns caching off and deletes
    /// the stored value right away. If that delete fails the settings are
    /// left unchanged.
    pub fn expires_in(&mut self, seconds: i64) -> Result<&mut Self> {
        let ttl_secs = clamp_ttl(seconds);

        if ttl_secs == 0 {
            debug!(key = %self.key, "Caching disabled, dropping stored value");
            self.delete()?;
        }

        self.ttl_secs = ttl_secs;
        self.do_cache = ttl_secs > 0;
        Ok(self)
    }

    /// Sets the producer and the arguments it is invoked with on every regeneration.
    pub fn updates_using<F>(&mut self, func: F, args: Vec<Value>) -> &mut Self
    where
        F: Fn(&[Value]) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.producer = Some(BoundProducer {
            name: None,
            func: Arc::new(func),
            args,
        });
        self
    }

    /// Sets a producer looked up by name in `registry`.
    ///
    /// Fails with [`StampedeError::UncallableProducer`] if nothing usable is
    /// registered under `name`; the current producer is kept in that case.
    pub fn updates_using_named(
        &mut self,
        registry: &ProducerRegistry<T>,
        name: &str,
        args: Vec<Value>,
    ) -> Result<&mut Self> {
        let func = registry.resolve(name)?;
        self.producer = Some(BoundProducer {
            name: Some(name.trim().to_string()),
            func,
            args,
        });
        Ok(self)
    }

    /// Removes the stored value. Removing an absent value is a no-op.
    pub fn delete(&self) -> Result<&Self> {
        self.store.delete(self.key.as_str())?;
        Ok(self)
    }
}

impl<T> Transient<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Returns the cached value, regenerating it on a miss.
    ///
    /// `Err` is reserved for store failures while reading the entry or its
    /// lock. A producer failure, a fresh lock held by another caller, or a
    /// missing producer all come back as [`Fetch::Empty`].
    #[instrument(skip(self), fields(key = %self.key))]
    pub fn get(&self) -> Result<Fetch<T>> {
        if let Some(raw) = self.store.read(self.key.as_str())? {
            if !raw.is_empty() {
                match serde_json::from_slice::<T>(&raw) {
                    Ok(value) => {
                        debug!("Cache hit");
                        return Ok(Fetch::Cached(value));
                    }
                    Err(e) => warn!(error = %e, "Discarding undecodable cached value"),
                }
            }
        }

        debug!("Cache miss, regenerating");
        self.fetch_and_regenerate()
    }

    fn fetch_and_regenerate(&self) -> Result<Fetch<T>> {
        let Some(producer) = &self.producer else {
            debug!("No producer configured");
            return Ok(Fetch::Empty(EmptyReason::NoProducer));
        };

        if self.guard.is_locked(&self.key)?
            && !self
                .guard
                .reclaim_if_stale(&self.key, self.max_lock_duration_secs)?
        {
            debug!("Regeneration already in progress");
            return Ok(Fetch::Empty(EmptyReason::Locked));
        }

        if !self.guard.acquire(&self.key)?.is_acquired() {
            debug!("Lost the lock race");
            return Ok(Fetch::Empty(EmptyReason::Locked));
        }

        let produced = match panic::catch_unwind(AssertUnwindSafe(|| producer.call())) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                let err = StampedeError::ProducerFailure(format!("{e:#}"));
                warn!(error = %err, producer = ?producer, "Producer returned an error");
                None
            }
            Err(payload) => {
                let err = StampedeError::ProducerFailure(panic_message(payload.as_ref()));
                warn!(error = %err, producer = ?producer, "Producer panicked");
                None
            }
        };

        if let Some(value) = &produced {
            if self.do_cache {
                match self.write_value(value) {
                    Ok(()) => {}
                    Err(e @ StampedeError::Json(_)) => {
                        error!(error = %e, "Value cannot be encoded, it will never be cached")
                    }
                    Err(e) => warn!(error = %e, "Failed to store regenerated value"),
                }
            }
        }

        if let Err(e) = self.guard.release(&self.key) {
            warn!(error = %e, "Failed to release lock");
        }

        Ok(match produced {
            Some(value) => {
                info!(cached = self.do_cache, ttl = self.ttl_secs, "Regenerated value");
                Fetch::Regenerated(value)
            }
            None => Fetch::Empty(EmptyReason::ProducerFailed),
        })
    }

    fn write_value(&self, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.store.write(self.key.as_str(), &bytes, self.ttl_secs)
    }
}

impl<T> fmt::Debug for Transient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transient")
            .field("key", &self.key)
            .field("ttl_secs", &self.ttl_secs)
            .field("do_cache", &self.do_cache)
            .field("max_lock_duration_secs", &self.max_lock_duration_secs)
            .field("lock_mode", &self.guard.mode())
            .field("producer", &self.producer)
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::{Duration, Instant};

    use serde::Deserialize;
    use serde_json::json;

    use stampede_core::constants::KEY_PREFIX;
    use stampede_core::types::LockMode;

    use crate::clock::ManualClock;
    use crate::memory::MemoryStore;

    const START: i64 = 1_700_000_000;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Weather {
        temp: i32,
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        calls: Arc<AtomicUsize>,
    }

    impl Fixture {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new(START));
            Self {
                store: Arc::new(MemoryStore::with_clock(clock.clone())),
                clock,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn transient<T>(&self, seed: &str) -> Transient<T> {
            self.transient_with(seed, TransientConfig::default())
        }

        fn transient_with<T>(&self, seed: &str, config: TransientConfig) -> Transient<T> {
            Transient::with_config(seed, self.store.clone(), self.clock.clone(), config).unwrap()
        }

        fn weather(&self) -> Transient<Weather> {
            let mut t: Transient<Weather> = self.transient("weather:NYC");
            let calls = self.calls.clone();
            t.expires_in(600).unwrap().updates_using(
                move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Weather { temp: 72 })
                },
                vec![],
            );
            t
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn hold_lock(&self, key: &CacheKey, age: i64) {
            let stamp = (self.clock.now() - age).to_string();
            self.store.write(&key.lock_key(), stamp.as_bytes(), 0).unwrap();
        }
    }

    #[test]
    fn test_empty_seed_is_fatal() {
        let f = Fixture::new();
        let result = Transient::<u8>::with_config(
            "",
            f.store.clone(),
            f.clock.clone(),
            TransientConfig::default(),
        );
        assert!(matches!(result, Err(StampedeError::InvalidKey(_))));
    }

    #[test]
    fn test_same_seed_same_key() {
        let f = Fixture::new();
        let a = f.transient::<u8>("weather:NYC");
        let b = f.transient::<u8>("weather:NYC");
        let c = f.transient::<u8>("weather:LAX");
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        assert!(a.key().as_str().starts_with(KEY_PREFIX));
    }

    #[test]
    fn test_defaults() {
        let f = Fixture::new();
        let t = f.transient::<u8>("defaults");
        assert_eq!(t.ttl(), 600);
        assert!(t.is_caching());
        assert!(!t.has_producer());
        assert_eq!(t.max_lock_duration(), 100);
    }

    #[test]
    fn test_miss_regenerates_then_hits() {
        let f = Fixture::new();
        let t = f.weather();

        let first = t.get().unwrap();
        assert_eq!(first, Fetch::Regenerated(Weather { temp: 72 }));
        assert_eq!(f.calls(), 1);
        assert!(!t.guard().is_locked(t.key()).unwrap());

        let second = t.get().unwrap();
        assert_eq!(second, Fetch::Cached(Weather { temp: 72 }));
        assert_eq!(f.calls(), 1);
    }

    #[test]
    fn test_hit_skips_producer() {
        let f = Fixture::new();
        let t = f.weather();
        f.store
            .write(t.key().as_str(), br#"{"temp":55}"#, 600)
            .unwrap();

        assert_eq!(t.get().unwrap(), Fetch::Cached(Weather { temp: 55 }));
        assert_eq!(f.calls(), 0);
    }

    #[test]
    fn test_expiry_triggers_regeneration() {
        let f = Fixture::new();
        let t = f.weather();

        t.get().unwrap();
        f.clock.advance(599);
        assert!(t.get().unwrap().is_cached());
        f.clock.advance(1);
        assert!(t.get().unwrap().is_regenerated());
        assert_eq!(f.calls(), 2);
    }

    #[test]
    fn test_falsy_value_is_a_hit() {
        let f = Fixture::new();
        let calls = f.calls.clone();
        let mut t = f.transient::<bool>("feature:enabled");
        t.updates_using(
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            },
            vec![],
        );

        assert_eq!(t.get().unwrap(), Fetch::Regenerated(false));
        assert_eq!(t.get().unwrap(), Fetch::Cached(false));
        assert_eq!(f.calls(), 1);
    }

    #[test]
    fn test_args_passed_as_supplied() {
        let f = Fixture::new();
        let mut t = f.transient::<String>("greeting");
        t.updates_using(
            |args| {
                let name = args[0].as_str().unwrap_or("nobody");
                let times = args[1].as_u64().unwrap_or(0) as usize;
                Ok(format!("hello {name}").repeat(times))
            },
            vec![json!("ada"), json!(2)],
        );

        assert_eq!(t.get().unwrap().into_value().unwrap(), "hello adahello ada");
    }

    #[test]
    fn test_no_producer_is_empty_and_leaves_lock_alone() {
        let f = Fixture::new();
        let t = f.transient::<u8>("orphan");
        f.hold_lock(t.key(), 500);

        assert_eq!(t.get().unwrap(), Fetch::Empty(EmptyReason::NoProducer));
        // Stale but untouched: reclamation only happens on the regeneration path.
        assert!(t.guard().is_locked(t.key()).unwrap());
    }

    #[test]
    fn test_zero_ttl_deletes_immediately() {
        let f = Fixture::new();
        let mut t = f.weather();
        t.get().unwrap();
        assert!(f.store.contains(t.key().as_str()));

        t.expires_in(0).unwrap();
        assert!(!t.is_caching());
        assert!(!f.store.contains(t.key().as_str()));

        // Not cached any more: every lookup regenerates.
        assert!(t.get().unwrap().is_regenerated());
        assert!(t.get().unwrap().is_regenerated());
        assert_eq!(f.calls(), 3);
        assert!(!f.store.contains(t.key().as_str()));
    }

    #[test]
    fn test_zero_ttl_without_producer_is_empty() {
        let f = Fixture::new();
        let mut t = f.transient::<u8>("static");
        f.store.write(t.key().as_str(), b"7", 600).unwrap();
        assert_eq!(t.get().unwrap(), Fetch::Cached(7));

        t.expires_in(0).unwrap();
        assert_eq!(t.get().unwrap(), Fetch::Empty(EmptyReason::NoProducer));
    }

    #[test]
    fn test_negative_ttl_clamps_to_zero() {
        let f = Fixture::new();
        let mut t = f.transient::<u8>("negative");
        t.expires_in(-30).unwrap();
        assert_eq!(t.ttl(), 0);
        assert!(!t.is_caching());

        t.expires_in(30).unwrap();
        assert_eq!(t.ttl(), 30);
        assert!(t.is_caching());
    }

    #[test]
    fn test_failed_zero_ttl_keeps_settings() {
        struct StickyStore {
            inner: MemoryStore,
        }

        impl Store for StickyStore {
            fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
                self.inner.read(key)
            }
            fn write(&self, key: &str, value: &[u8], ttl: u64) -> Result<()> {
                self.inner.write(key, value, ttl)
            }
            fn delete(&self, _key: &str) -> Result<()> {
                Err(StampedeError::Store("delete refused".into()))
            }
        }

        let clock = Arc::new(ManualClock::new(START));
        let store = Arc::new(StickyStore {
            inner: MemoryStore::with_clock(clock.clone()),
        });
        let mut t = Transient::<u8>::with_config(
            "sticky",
            store.clone(),
            clock,
            TransientConfig::default(),
        )
        .unwrap();

        assert!(matches!(t.expires_in(0), Err(StampedeError::Store(_))));
        assert_eq!(t.ttl(), 600);
        assert!(t.is_caching());

        t.expires_in(60).unwrap();
        assert_eq!(t.ttl(), 60);
    }

    #[test]
    fn test_unencodable_value_is_returned_but_not_cached() {
        use std::collections::HashMap;

        let f = Fixture::new();
        let calls = f.calls.clone();
        let mut t = f.transient::<HashMap<(u8, u8), u8>>("grid");
        t.updates_using(
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(HashMap::from([((0, 0), 1)]))
            },
            vec![],
        );

        assert!(t.get().unwrap().is_regenerated());
        assert!(t.get().unwrap().is_regenerated());
        assert_eq!(f.calls(), 2);
        assert!(!f.store.contains(t.key().as_str()));
        assert!(!t.guard().is_locked(t.key()).unwrap());
    }

    #[test]
    fn test_new_applies_env_overrides() {
        std::env::set_var(stampede_core::constants::ENV_MAX_LOCK_DURATION, "42");
        let t = Transient::<u8>::new("env", Arc::new(MemoryStore::new()));
        std::env::remove_var(stampede_core::constants::ENV_MAX_LOCK_DURATION);

        assert_eq!(t.unwrap().max_lock_duration(), 42);
    }

    #[test]
    fn test_delete_forces_regeneration() {
        let f = Fixture::new();
        let t = f.weather();
        t.get().unwrap();

        t.delete().unwrap().delete().unwrap();
        assert!(t.get().unwrap().is_regenerated());
        assert_eq!(f.calls(), 2);
    }

    #[test]
    fn test_fresh_lock_blocks_regeneration() {
        let f = Fixture::new();
        let t = f.weather();
        f.hold_lock(t.key(), 50);

        assert_eq!(t.get().unwrap(), Fetch::Empty(EmptyReason::Locked));
        assert_eq!(f.calls(), 0);
        assert!(t.guard().is_locked(t.key()).unwrap());
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let f = Fixture::new();
        let t = f.weather();
        f.hold_lock(t.key(), 150);

        assert_eq!(t.get().unwrap(), Fetch::Regenerated(Weather { temp: 72 }));
        assert_eq!(f.calls(), 1);
        assert!(!t.guard().is_locked(t.key()).unwrap());
    }

    #[test]
    fn test_custom_max_lock_duration() {
        let f = Fixture::new();
        let config = TransientConfig::default().with_max_lock_duration(10);
        let mut t = f.transient_with::<u8>("short-lock", config);
        t.updates_using(|_| Ok(1), vec![]);

        f.hold_lock(t.key(), 9);
        assert!(t.get().unwrap().is_empty());
        f.clock.advance(1);
        assert!(t.get().unwrap().is_regenerated());
    }

    #[test]
    fn test_producer_error_releases_lock() {
        let f = Fixture::new();
        let mut t = f.transient::<u8>("flaky");
        t.updates_using(|_| Err(anyhow::anyhow!("upstream timed out")), vec![]);

        assert_eq!(t.get().unwrap(), Fetch::Empty(EmptyReason::ProducerFailed));
        assert!(!t.guard().is_locked(t.key()).unwrap());
        assert!(!f.store.contains(t.key().as_str()));
    }

    #[test]
    fn test_producer_panic_releases_lock() {
        let f = Fixture::new();
        let mut t = f.transient::<u8>("explosive");
        t.updates_using(|_| panic!("producer blew up"), vec![]);

        assert_eq!(t.get().unwrap(), Fetch::Empty(EmptyReason::ProducerFailed));
        assert!(!t.guard().is_locked(t.key()).unwrap());
    }

    #[test]
    fn test_named_producer() {
        let f = Fixture::new();
        let registry = ProducerRegistry::<i64>::new();
        registry.register("double", |args: &[Value]| {
            Ok(args.first().and_then(Value::as_i64).unwrap_or(0) * 2)
        });

        let mut t = f.transient::<i64>("named");
        t.updates_using_named(&registry, "double", vec![json!(21)])
            .unwrap()
            .expires_in(60)
            .unwrap();
        assert_eq!(t.get().unwrap(), Fetch::Regenerated(42));
    }

    #[test]
    fn test_uncallable_producer_keeps_previous() {
        let f = Fixture::new();
        let registry = ProducerRegistry::<i64>::new();

        let mut t = f.transient::<i64>("keep");
        t.expires_in(0).unwrap().updates_using(|_| Ok(1), vec![]);

        let err = t.updates_using_named(&registry, "missing", vec![]).unwrap_err();
        assert!(matches!(err, StampedeError::UncallableProducer(_)));
        assert_eq!(t.get().unwrap(), Fetch::Regenerated(1));
    }

    #[test]
    fn test_undecodable_value_is_a_miss() {
        let f = Fixture::new();
        let t = f.weather();
        f.store.write(t.key().as_str(), b"not json", 600).unwrap();

        assert_eq!(t.get().unwrap(), Fetch::Regenerated(Weather { temp: 72 }));
        assert_eq!(t.get().unwrap(), Fetch::Cached(Weather { temp: 72 }));
    }

    #[test]
    fn test_store_write_failure_still_returns_value() {
        struct ReadOnlyValues {
            inner: MemoryStore,
        }

        impl Store for ReadOnlyValues {
            fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
                self.inner.read(key)
            }
            fn write(&self, key: &str, value: &[u8], ttl: u64) -> Result<()> {
                if key.starts_with(KEY_PREFIX) {
                    return Err(StampedeError::Store("disk full".into()));
                }
                self.inner.write(key, value, ttl)
            }
            fn delete(&self, key: &str) -> Result<()> {
                self.inner.delete(key)
            }
        }

        let clock = Arc::new(ManualClock::new(START));
        let store = Arc::new(ReadOnlyValues {
            inner: MemoryStore::with_clock(clock.clone()),
        });
        let mut t = Transient::<u8>::with_config(
            "readonly",
            store.clone(),
            clock,
            TransientConfig::default(),
        )
        .unwrap();
        t.updates_using(|_| Ok(9), vec![]);

        assert_eq!(t.get().unwrap(), Fetch::Regenerated(9));
        assert!(!t.guard().is_locked(t.key()).unwrap());
        assert!(store.inner.is_empty());
    }

    #[test]
    fn test_weather_scenario() {
        let f = Fixture::new();
        let t = f.weather();

        // First lookup produces and caches.
        assert_eq!(t.get().unwrap(), Fetch::Regenerated(Weather { temp: 72 }));
        assert_eq!(f.calls(), 1);

        // Within the TTL the cache answers.
        f.clock.advance(300);
        assert_eq!(t.get().unwrap(), Fetch::Cached(Weather { temp: 72 }));
        assert_eq!(f.calls(), 1);

        // Entry expired while another caller took the lock 50s ago.
        f.clock.advance(301);
        f.hold_lock(t.key(), 50);
        assert_eq!(t.get().unwrap(), Fetch::Empty(EmptyReason::Locked));
        assert_eq!(f.calls(), 1);

        // That caller never finished: at 150s the lock is stale.
        f.clock.advance(100);
        assert_eq!(t.get().unwrap(), Fetch::Regenerated(Weather { temp: 72 }));
        assert_eq!(f.calls(), 2);
        assert!(!t.guard().is_locked(t.key()).unwrap());
    }

    #[test]
    fn test_exclusive_mode_single_flight() {
        const CALLERS: usize = 8;

        let store = Arc::new(MemoryStore::new());
        let config = TransientConfig::default().with_lock_mode(LockMode::Exclusive);
        let calls = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        let mut t = Transient::<u32>::with_config(
            "report:daily",
            store,
            Arc::new(SystemClock),
            config,
        )
        .unwrap();
        {
            let calls = calls.clone();
            let finished = finished.clone();
            t.updates_using(
                move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    // Hold the lock until every other caller has given up.
                    let deadline = Instant::now() + Duration::from_secs(5);
                    while finished.load(Ordering::SeqCst) < CALLERS - 1 {
                        if Instant::now() > deadline {
                            anyhow::bail!("other callers never returned");
                        }
                        thread::sleep(Duration::from_millis(1));
                    }
                    Ok(7)
                },
                vec![],
            );
        }

        let t = Arc::new(t);
        let barrier = Arc::new(Barrier::new(CALLERS));
        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let t = t.clone();
                let barrier = barrier.clone();
                let finished = finished.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let fetch = t.get().unwrap();
                    if fetch.is_empty() {
                        finished.fetch_add(1, Ordering::SeqCst);
                    }
                    fetch
                })
            })
            .collect();

        let results: Vec<Fetch<u32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(results.iter().filter(|r| r.is_regenerated()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| r.empty_reason() == Some(EmptyReason::Locked))
                .count(),
            CALLERS - 1
        );
        assert_eq!(t.get().unwrap(), Fetch::Cached(7));
    }
}
