//! Typed hash sets (QH) over the raw core.
//!
//! A set is a map with a zero-sized value stride; everything delegates.

use crate::key::QhKey;
use crate::map::{Keys, QhMap};
use crate::pool::MemPool;
use crate::raw::{COLLISION, OVERWRITE};

/// A hash set with incremental resize.
///
/// See [`QhMap`] for the position, enumeration and sealing contracts; they
/// are identical here.
pub struct QhSet<K: Copy> {
    qm: QhMap<K, ()>,
}

impl<K: QhKey> QhSet<K> {
    #[inline]
    pub fn new() -> Self {
        QhSet { qm: QhMap::new() }
    }

    /// With a 32-bit hash cached per slot; see [`QhMap::cached`].
    #[inline]
    pub fn cached() -> Self {
        QhSet { qm: QhMap::cached() }
    }

    #[inline]
    pub fn new_in(cached: bool, mp: Option<&'static dyn MemPool>) -> Self {
        QhSet {
            qm: QhMap::new_in(cached, mp),
        }
    }
}

impl<K: QhKey> Default for QhSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy> QhSet<K> {
    /// Build a set around explicit hash and equality callbacks.
    #[inline]
    pub fn with_fns(hf: fn(&K) -> u32, ef: fn(&K, &K) -> bool) -> Self {
        QhSet {
            qm: QhMap::with_fns(hf, ef),
        }
    }

    #[inline]
    pub fn with_fns_in(
        hf: fn(&K) -> u32,
        ef: fn(&K, &K) -> bool,
        cached: bool,
        mp: Option<&'static dyn MemPool>,
    ) -> Self {
        QhSet {
            qm: QhMap::with_fns_in(hf, ef, cached, mp),
        }
    }

    #[inline]
    pub fn hash(&self, key: &K) -> u32 {
        self.qm.hash(key)
    }

    /// Find-or-reserve; returns the position word (see [`QhMap::reserve`]).
    #[inline]
    pub fn put(&mut self, key: K, fl: u32) -> u32 {
        self.qm.reserve(key, fl)
    }

    #[inline]
    pub fn put_h(&mut self, h: u32, key: K, fl: u32) -> u32 {
        self.qm.reserve_h(h, key, fl)
    }

    /// Insert; fails (returns `false`) if the key exists.
    #[inline]
    pub fn add(&mut self, key: K) -> bool {
        self.put(key, 0) & COLLISION == 0
    }

    /// Insert or overwrite the stored key; `true` when it already existed.
    #[inline]
    pub fn replace(&mut self, key: K) -> bool {
        self.put(key, OVERWRITE) & COLLISION != 0
    }

    /// Read-only membership test.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.qm.find_safe(key).is_some()
    }

    #[inline]
    pub fn find(&mut self, key: &K) -> Option<u32> {
        self.qm.find(key)
    }

    #[inline]
    pub fn find_h(&mut self, h: u32, key: &K) -> Option<u32> {
        self.qm.find_h(h, key)
    }

    #[inline]
    pub fn find_safe(&self, key: &K) -> Option<u32> {
        self.qm.find_safe(key)
    }

    #[inline]
    pub fn find_safe_h(&self, h: u32, key: &K) -> Option<u32> {
        self.qm.find_safe_h(h, key)
    }

    #[inline]
    pub fn del_at(&mut self, pos: u32) {
        self.qm.del_at(pos);
    }

    #[inline]
    pub fn del_key(&mut self, key: &K) -> Option<u32> {
        self.qm.del_key(key)
    }

    #[inline]
    pub fn del_key_safe(&mut self, key: &K) -> Option<u32> {
        self.qm.del_key_safe(key)
    }

    /// The key stored at `pos`. Panics if the position holds no entry.
    #[inline]
    pub fn key_at(&self, pos: u32) -> K {
        self.qm.key_at(pos)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.qm.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.qm.is_empty()
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.qm.size()
    }

    #[inline]
    pub fn ghosts(&self) -> u32 {
        self.qm.ghosts()
    }

    #[inline]
    pub fn in_resize(&self) -> bool {
        self.qm.in_resize()
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.qm.is_sealed()
    }

    pub fn memory_footprint(&self) -> usize {
        self.qm.memory_footprint()
    }

    pub fn set_minsize(&mut self, minsize: u32) {
        self.qm.set_minsize(minsize);
    }

    pub fn seal(&mut self) {
        self.qm.seal();
    }

    pub fn unseal(&mut self) {
        self.qm.unseal();
    }

    pub fn clear(&mut self) {
        self.qm.clear();
    }

    #[inline]
    pub fn scan(&self, from: u32) -> Option<u32> {
        self.qm.scan(from)
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: self.qm.keys(),
        }
    }

    /// Keep only the keys `f` approves of; the supported way of deleting
    /// while enumerating.
    pub fn retain(&mut self, mut f: impl FnMut(K) -> bool) {
        self.qm.retain(|k, _| f(k));
    }
}

/// Iterator over the keys, in slot order.
pub struct Iter<'a, K: Copy> {
    inner: Keys<'a, K, ()>,
}

impl<'a, K: Copy> Iterator for Iter<'a, K> {
    type Item = K;

    #[inline]
    fn next(&mut self) -> Option<K> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K: Copy> IntoIterator for &'a QhSet<K> {
    type Item = K;
    type IntoIter = Iter<'a, K>;

    #[inline]
    fn into_iter(self) -> Iter<'a, K> {
        self.iter()
    }
}
