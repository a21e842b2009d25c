use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

/// Bounded LRU cache of decoded tables, safe to share between threads.
///
/// Lookups and inserts take a short global lock. Loading goes through
/// [`get_or_load`](Self::get_or_load), which holds a per-key lock while the
/// loader runs: concurrent first requests for one key decode once, requests
/// for different keys decode in parallel, and the global lock is never held
/// during a decode.
pub struct TableCache<K, V> {
    entries: Mutex<LruCache<K, Arc<V>>>,
    in_flight: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K, V> TableCache<K, V>
where
    K: Hash + Eq + Clone + Debug,
{
    pub fn new(capacity: NonZeroUsize) -> Self {
        TableCache {
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Cached value, refreshing its recency.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries.lock().get(key).cloned()
    }

    /// Whether `key` is cached. Does not touch recency.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().contains(key)
    }

    /// Insert a value as most recently used. Returns the key evicted to make
    /// room, if any.
    pub fn insert(&self, key: K, value: Arc<V>) -> Option<K> {
        let evicted = self.entries.lock().push(key.clone(), value);
        match evicted {
            Some((old, _)) if old != key => {
                log::info!("Evicted {old:?} from the table cache");
                Some(old)
            }
            _ => None,
        }
    }

    /// Cached value for `key`, or the result of `load` (cached on success).
    ///
    /// Errors are returned to the caller and not cached; a waiting caller
    /// retries the load itself.
    pub fn get_or_load<E, F>(&self, key: &K, load: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            log::debug!("Table cache hit for {key:?}");
            return Ok(value);
        }

        let slot = self
            .in_flight
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = slot.lock();
            match self.get(key) {
                // Another caller finished the decode while we waited.
                Some(value) => Ok(value),
                None => {
                    log::debug!("Table cache miss for {key:?}, loading");
                    load().map(|value| {
                        let value = Arc::new(value);
                        self.insert(key.clone(), Arc::clone(&value));
                        value
                    })
                }
            }
        };

        let mut in_flight = self.in_flight.lock();
        if let Some(current) = in_flight.get(key) {
            // Only the map and this call hold the slot: nobody is waiting.
            if Arc::ptr_eq(current, &slot) && Arc::strong_count(&slot) == 2 {
                in_flight.remove(key);
            }
        }
        result
    }

    /// Cached keys, most recently used first.
    pub fn keys(&self) -> Vec<K> {
        self.entries.lock().iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Barrier};
    use std::thread;
    use std::time::Duration;

    fn cache(capacity: usize) -> TableCache<String, usize> {
        TableCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn evicts_least_recently_used() {
        let c = cache(2);
        c.insert("a".into(), Arc::new(1));
        c.insert("b".into(), Arc::new(2));
        assert_eq!(c.insert("c".into(), Arc::new(3)), Some("a".to_string()));
        assert!(!c.contains(&"a".to_string()));
        assert_eq!(c.keys(), vec!["c".to_string(), "b".to_string()]);
    }

    #[test]
    fn access_refreshes_recency() {
        let c = cache(2);
        c.insert("a".into(), Arc::new(1));
        c.insert("b".into(), Arc::new(2));
        assert_eq!(*c.get(&"a".to_string()).unwrap(), 1);
        assert_eq!(c.insert("c".into(), Arc::new(3)), Some("b".to_string()));
        assert!(c.contains(&"a".to_string()));
    }

    #[test]
    fn replacing_a_key_evicts_nothing() {
        let c = cache(1);
        c.insert("a".into(), Arc::new(1));
        assert_eq!(c.insert("a".into(), Arc::new(2)), None);
        assert_eq!(*c.get(&"a".to_string()).unwrap(), 2);
    }

    #[test]
    fn failed_loads_are_not_cached() {
        let c = cache(2);
        let key = "a".to_string();
        let err: Result<_, String> = c.get_or_load(&key, || Err("boom".to_string()));
        assert!(err.is_err());
        assert!(c.is_empty());
        let ok: Result<_, String> = c.get_or_load(&key, || Ok(7));
        assert_eq!(*ok.unwrap(), 7);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn concurrent_first_access_loads_once() {
        let c = Arc::new(cache(4));
        let loads = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = Arc::clone(&c);
                let loads = Arc::clone(&loads);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let v: Result<_, ()> = c.get_or_load(&"p1".to_string(), || {
                        loads.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        Ok(42)
                    });
                    *v.unwrap()
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), 42);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(c.in_flight.lock().is_empty());
    }

    #[test]
    fn distinct_keys_load_independently() {
        let c = Arc::new(cache(4));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let c = Arc::clone(&c);
                thread::spawn(move || {
                    let v: Result<_, ()> = c.get_or_load(&format!("p{i}"), || Ok(i));
                    *v.unwrap()
                })
            })
            .collect();
        let mut got: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        got.sort();
        assert_eq!(got, vec![0, 1, 2, 3]);
        assert_eq!(c.len(), 4);
    }

    #[test]
    fn a_slow_load_does_not_block_other_keys() {
        let c = Arc::new(cache(4));
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        // "a" only finishes once the load of "b" has run.
        let slow = {
            let c = Arc::clone(&c);
            thread::spawn(move || {
                let v: Result<_, String> = c.get_or_load(&"a".to_string(), || {
                    started_tx.send(()).unwrap();
                    release_rx
                        .recv_timeout(Duration::from_secs(5))
                        .map(|_| 1)
                        .map_err(|_| "load of b never ran".to_string())
                });
                v.map(|v| *v)
            })
        };
        started_rx.recv().unwrap();

        let fast: Result<_, String> = c.get_or_load(&"b".to_string(), || {
            release_tx.send(()).unwrap();
            Ok(2)
        });
        assert_eq!(*fast.unwrap(), 2);
        assert_eq!(slow.join().unwrap(), Ok(1));
        assert_eq!(c.len(), 2);
    }

    proptest! {
        #[test]
        fn n_plus_one_inserts_evict_exactly_the_oldest(n in 1usize..16, touched in 0usize..16) {
            let c = cache(n);
            for i in 0..n {
                c.insert(format!("k{i}"), Arc::new(i));
            }
            // Touching one key makes it the most recent; the next-oldest goes.
            let touched = touched % n;
            c.get(&format!("k{touched}"));
            let expected = if n == 1 { 0 } else if touched == 0 { 1 } else { 0 };
            let evicted = c.insert("new".to_string(), Arc::new(n));
            prop_assert_eq!(evicted, Some(format!("k{expected}")));
            prop_assert_eq!(c.len(), n);
        }
    }
}
