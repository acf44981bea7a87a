use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};

use crate::interpreter::{release_nested, Object, ObjectKind};

/// Map key derived from a hashable value. The kind tag keeps e.g. `1` and `true` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub kind: ObjectKind,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Object,
    pub value: Object,
}

/// Hash map value; iterates in key insertion order.
#[derive(Debug, Clone, Default)]
pub struct HashObject {
    pairs: FxHashMap<HashKey, HashPair>,
    order: Vec<HashKey>,
}

impl HashObject {
    /// Inserts a pair, replacing the value of an existing key in place.
    pub fn insert(&mut self, key: HashKey, pair: HashPair) {
        if self.pairs.insert(key, pair).is_none() {
            self.order.push(key);
        }
    }

    pub fn get(&self, key: &HashKey) -> Option<&HashPair> {
        self.pairs.get(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HashPair> {
        self.order.iter().filter_map(|key| self.pairs.get(key))
    }

    /// Empties the map, handing back the stored values. Keys are always scalars.
    pub(super) fn take_values(&mut self) -> Vec<Object> {
        self.order.clear();
        self.pairs.drain().map(|(_, pair)| pair.value).collect()
    }
}

impl Drop for HashObject {
    fn drop(&mut self) {
        release_nested(self.take_values());
    }
}

impl PartialEq for HashObject {
    fn eq(&self, other: &Self) -> bool {
        self.pairs == other.pairs
    }
}

impl Object {
    /// Returns `None` for kinds that cannot be used as hash keys.
    pub fn hash_key(&self) -> Option<HashKey> {
        let value = match self {
            Object::Integer(value) => *value as u64,
            Object::Boolean(value) => u64::from(*value),
            Object::String(value) => {
                let mut hasher = FxHasher::default();
                value.hash(&mut hasher);
                hasher.finish()
            }
            _ => return None,
        };
        Some(HashKey {
            kind: self.kind(),
            value,
        })
    }
}
