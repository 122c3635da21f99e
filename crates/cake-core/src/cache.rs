//! Time-bounded caches for the AI service collaborator.
//!
//! The analysis service fetches its prompt text and the dynamic lists of
//! allowed element types from a backing store. Those lookups are cached
//! here, in objects owned by whoever constructs the service, instead of in
//! process-wide globals. The clock is injected so tests can advance time
//! without sleeping.

use std::cell::Cell;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use web_time::Instant;

// ─── Clocks ──────────────────────────────────────────────────────────────

/// A monotonic time source.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock (`performance.now()` on WASM).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    elapsed: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

// ─── TTL cache ───────────────────────────────────────────────────────────

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// A key/value cache whose entries expire `ttl` after insertion.
pub struct TtlCache<K, V, C = SystemClock> {
    entries: HashMap<K, Entry<V>>,
    ttl: Duration,
    clock: C,
}

impl<K: Eq + Hash, V: Clone, C: Clock> TtlCache<K, V, C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    /// A fresh (non-expired) value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key)?;
        let age = self.clock.now().saturating_duration_since(entry.stored_at);
        (age < self.ttl).then(|| entry.value.clone())
    }

    pub fn insert(&mut self, key: K, value: V) {
        let stored_at = self.clock.now();
        self.entries.insert(key, Entry { value, stored_at });
    }

    /// Return the cached value or load, store and return a new one.
    ///
    /// # Errors
    /// Propagates the loader's error; nothing is cached in that case.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: K,
        load: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = load()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Change the lifetime. Applies to entries already stored.
    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }

    pub fn invalidate(&mut self, key: &K) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V, SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

// ─── Prompt cache ────────────────────────────────────────────────────────

/// Default lifetime of cached prompts and type enums.
pub const DEFAULT_PROMPT_TTL: Duration = Duration::from_secs(10 * 60);

/// The analysis service's cached prompt text and dynamic type enums.
///
/// Prompts are keyed by name (e.g. `analysis`, `regeneration`); enums by the
/// category they constrain (e.g. `main_topper_types`).
pub struct PromptCache<C: Clock + Clone = SystemClock> {
    prompts: TtlCache<String, String, C>,
    type_enums: TtlCache<String, Vec<String>, C>,
}

impl PromptCache<SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<C: Clock + Clone> PromptCache<C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            prompts: TtlCache::with_clock(ttl, clock.clone()),
            type_enums: TtlCache::with_clock(ttl, clock),
        }
    }

    /// Cached prompt text, loaded on miss or expiry.
    ///
    /// # Errors
    /// Propagates the loader's error.
    pub fn prompt<E>(
        &mut self,
        name: &str,
        load: impl FnOnce() -> Result<String, E>,
    ) -> Result<String, E> {
        self.prompts.get_or_try_insert_with(name.to_string(), load)
    }

    /// Cached list of allowed type values, loaded on miss or expiry.
    ///
    /// # Errors
    /// Propagates the loader's error.
    pub fn type_enum<E>(
        &mut self,
        category: &str,
        load: impl FnOnce() -> Result<Vec<String>, E>,
    ) -> Result<Vec<String>, E> {
        self.type_enums
            .get_or_try_insert_with(category.to_string(), load)
    }

    pub fn set_ttl(&mut self, ttl: Duration) {
        self.prompts.set_ttl(ttl);
        self.type_enums.set_ttl(ttl);
    }

    /// Drop every cached prompt and enum.
    pub fn clear(&mut self) {
        log::debug!(
            "clearing prompt cache ({} prompts, {} enums)",
            self.prompts.len(),
            self.type_enums.len()
        );
        self.prompts.clear();
        self.type_enums.clear();
    }
}
