use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use std::sync::Arc;
use stayforge_core::PropertyId;

/// Property-isolated key/value store abstraction for disposable read models.
pub trait PropertyStore<K, V>: Send + Sync {
    fn get(&self, property_id: PropertyId, key: &K) -> Option<V>;
    fn upsert(&self, property_id: PropertyId, key: K, value: V);
    fn list(&self, property_id: PropertyId) -> Vec<V>;
    /// Clear all read-model records for a property (rebuild support).
    fn clear_property(&self, property_id: PropertyId);
}

impl<K, V, S> PropertyStore<K, V> for Arc<S>
where
    S: PropertyStore<K, V> + ?Sized,
{
    fn get(&self, property_id: PropertyId, key: &K) -> Option<V> {
        (**self).get(property_id, key)
    }

    fn upsert(&self, property_id: PropertyId, key: K, value: V) {
        (**self).upsert(property_id, key, value)
    }

    fn list(&self, property_id: PropertyId) -> Vec<V> {
        (**self).list(property_id)
    }

    fn clear_property(&self, property_id: PropertyId) {
        (**self).clear_property(property_id)
    }
}

/// In-memory property-isolated store for tests/dev.
#[derive(Debug)]
pub struct InMemoryPropertyStore<K, V> {
    inner: RwLock<HashMap<(PropertyId, K), V>>,
}

impl<K, V> InMemoryPropertyStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryPropertyStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> PropertyStore<K, V> for InMemoryPropertyStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, property_id: PropertyId, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(&(property_id, key.clone())).cloned()
    }

    fn upsert(&self, property_id: PropertyId, key: K, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((property_id, key), value);
        }
    }

    fn list(&self, property_id: PropertyId) -> Vec<V> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        map.iter()
            .filter_map(|((p, _k), v)| if *p == property_id { Some(v.clone()) } else { None })
            .collect()
    }

    fn clear_property(&self, property_id: PropertyId) {
        if let Ok(mut map) = self.inner.write() {
            map.retain(|(p, _k), _v| *p != property_id);
        }
    }
}
