//! Typed hash maps (QM) over the raw core.

use core::alloc::Layout;
use core::marker::PhantomData;
use core::mem;

use crate::key::QhKey;
use crate::pool::MemPool;
use crate::raw::{RawQhash, COLLISION, OVERWRITE};

/// A hash map with incremental resize.
///
/// Keys and values are plain inline data (`Copy`); the table owns their
/// bytes and never runs destructors for them. The hash and equality
/// callbacks are fixed at construction: through [`QhKey`] for the built-in
/// key kinds, or explicitly with [`with_fns`](QhMap::with_fns) for keys
/// hashed through a pointer or with a custom scheme.
///
/// Positions returned by the find/put families address the entry until the
/// next mutating call. [`find_safe`](QhMap::find_safe) is the only lookup
/// allowed while enumerating; [`find`](QhMap::find) migrates entries
/// between the resize views as a side effect.
pub struct QhMap<K: Copy, V: Copy> {
    raw: RawQhash,
    hf: fn(&K) -> u32,
    ef: fn(&K, &K) -> bool,
    marker: PhantomData<(K, V)>,
}

impl<K: QhKey, V: Copy> QhMap<K, V> {
    #[inline]
    pub fn new() -> Self {
        Self::with_fns(K::qh_hash, K::qh_eq)
    }

    /// Like [`new`](QhMap::new), with a 32-bit hash cached per slot.
    ///
    /// Caching costs 4 bytes per slot and pays off when hashing or equality
    /// is expensive, or when the table resizes often. Pointless for the
    /// integer key kinds, whose hash is cheaper than the cache lookup.
    #[inline]
    pub fn cached() -> Self {
        Self::with_fns_in(K::qh_hash, K::qh_eq, true, None)
    }

    /// Full-control constructor: hash caching and an explicit pool.
    #[inline]
    pub fn new_in(cached: bool, mp: Option<&'static dyn MemPool>) -> Self {
        Self::with_fns_in(K::qh_hash, K::qh_eq, cached, mp)
    }
}

impl<K: QhKey, V: Copy> Default for QhMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy, V: Copy> QhMap<K, V> {
    /// Build a map around explicit hash and equality callbacks.
    ///
    /// This is the vector/pointer-keyed flavour: the callbacks may look
    /// through the stored key (for example dereference a pointer key), as
    /// long as they stay pure and mutually consistent.
    #[inline]
    pub fn with_fns(hf: fn(&K) -> u32, ef: fn(&K, &K) -> bool) -> Self {
        Self::with_fns_in(hf, ef, false, None)
    }

    pub fn with_fns_in(
        hf: fn(&K) -> u32,
        ef: fn(&K, &K) -> bool,
        cached: bool,
        mp: Option<&'static dyn MemPool>,
    ) -> Self {
        QhMap {
            raw: RawQhash::new(Layout::new::<K>(), Layout::new::<V>(), cached, mp),
            hf,
            ef,
            marker: PhantomData,
        }
    }

    /// The 32-bit seed this map derives from `key`.
    #[inline]
    pub fn hash(&self, key: &K) -> u32 {
        (self.hf)(key)
    }

    /// Read-only lookup; safe during enumeration.
    #[inline]
    pub fn find_safe(&self, key: &K) -> Option<u32> {
        self.find_safe_h(self.hash(key), key)
    }

    pub fn find_safe_h(&self, h: u32, key: &K) -> Option<u32> {
        let ef = self.ef;
        self.raw.get_safe(h, &mut |p| ef(key, unsafe { &*(p as *const K) }))
    }

    /// Migrating lookup. Must not be called while enumerating.
    #[inline]
    pub fn find(&mut self, key: &K) -> Option<u32> {
        self.find_h(self.hash(key), key)
    }

    pub fn find_h(&mut self, h: u32, key: &K) -> Option<u32> {
        let (hf, ef) = (self.hf, self.ef);
        self.raw.get(
            h,
            &mut |p| hf(unsafe { &*(p as *const K) }),
            &mut |p| ef(key, unsafe { &*(p as *const K) }),
        )
    }

    /// Find-or-reserve a slot for `key`, leaving the value slot untouched.
    ///
    /// The low 31 bits of the result are the position; [`COLLISION`] is set
    /// when the key already existed. On a fresh reservation the key is
    /// stored and the caller is expected to fill the value, typically
    /// through [`value_at_mut`](QhMap::value_at_mut). On a collision the
    /// stored key is rewritten only under [`OVERWRITE`].
    #[inline]
    pub fn reserve(&mut self, key: K, fl: u32) -> u32 {
        self.reserve_h(self.hash(&key), key, fl)
    }

    pub fn reserve_h(&mut self, h: u32, key: K, fl: u32) -> u32 {
        let (hf, ef) = (self.hf, self.ef);
        let mut hash_cb = |p: *const u8| hf(unsafe { &*(p as *const K) });
        let mut eq_cb = |p: *const u8| ef(&key, unsafe { &*(p as *const K) });
        unsafe {
            self.raw
                .put(h, &key as *const K as *const u8, fl, &mut hash_cb, &mut eq_cb)
        }
    }

    /// [`reserve`](QhMap::reserve) plus the value write, honouring `fl`.
    pub fn put(&mut self, key: K, value: V, fl: u32) -> u32 {
        let pos = self.reserve(key, fl);
        if fl & OVERWRITE != 0 || pos & COLLISION == 0 {
            self.write_value(pos & !COLLISION, value);
        }
        pos
    }

    /// Insert a fresh pair; fails (returns `false`) if the key exists.
    #[inline]
    pub fn add(&mut self, key: K, value: V) -> bool {
        self.put(key, value, 0) & COLLISION == 0
    }

    /// Insert or overwrite; returns `true` when an entry was replaced.
    #[inline]
    pub fn replace(&mut self, key: K, value: V) -> bool {
        self.put(key, value, OVERWRITE) & COLLISION != 0
    }

    /// Migrating value lookup.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let pos = self.find(key)?;
        Some(unsafe { &*(self.raw.value(pos) as *const V) })
    }

    /// Read-only value lookup; safe during enumeration.
    pub fn get_safe(&self, key: &K) -> Option<&V> {
        let pos = self.find_safe(key)?;
        Some(unsafe { &*(self.raw.value(pos) as *const V) })
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let pos = self.find(key)?;
        Some(unsafe { &mut *(self.raw.value_mut(pos) as *mut V) })
    }

    /// Delete the entry at a position returned by the find/put families or
    /// by [`scan`](QhMap::scan). Stale or collision-tagged positions are
    /// tolerated; deleting the entry under the cursor is the one mutation
    /// allowed during enumeration.
    #[inline]
    pub fn del_at(&mut self, pos: u32) {
        self.raw.del_at(pos & !COLLISION);
    }

    /// Find (migrating) and delete; returns the freed position.
    pub fn del_key(&mut self, key: &K) -> Option<u32> {
        let pos = self.find(key)?;
        self.raw.del_at(pos);
        Some(pos)
    }

    /// Like [`del_key`](QhMap::del_key) without migration; safe during
    /// enumeration.
    pub fn del_key_safe(&mut self, key: &K) -> Option<u32> {
        let pos = self.find_safe(key)?;
        self.raw.del_at(pos);
        Some(pos)
    }

    /// The key stored at `pos`. Panics if the position holds no entry.
    pub fn key_at(&self, pos: u32) -> K {
        assert!(self.raw.is_live(pos), "no entry at position {}", pos);
        unsafe { *(self.raw.key(pos) as *const K) }
    }

    /// The value stored at `pos`. Panics if the position holds no entry.
    pub fn value_at(&self, pos: u32) -> &V {
        assert!(self.raw.is_live(pos), "no entry at position {}", pos);
        unsafe { &*(self.raw.value(pos) as *const V) }
    }

    pub fn value_at_mut(&mut self, pos: u32) -> &mut V {
        assert!(self.raw.is_live(pos), "no entry at position {}", pos);
        unsafe { &mut *(self.raw.value_mut(pos) as *mut V) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Current slot count (0 until the first insertion).
    #[inline]
    pub fn size(&self) -> u32 {
        self.raw.size()
    }

    /// Tombstones awaiting reuse or the next rebuild.
    #[inline]
    pub fn ghosts(&self) -> u32 {
        self.raw.ghosts()
    }

    /// Whether an incremental resize is in flight.
    #[inline]
    pub fn in_resize(&self) -> bool {
        self.raw.in_resize()
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.raw.is_sealed()
    }

    pub fn memory_footprint(&self) -> usize {
        self.raw.memory_footprint()
    }

    /// Lower bound on the slot count of future allocations.
    pub fn set_minsize(&mut self, minsize: u32) {
        self.raw.set_minsize(minsize);
    }

    /// Finish any pending resize, compact, and freeze the map.
    pub fn seal(&mut self) {
        let hf = self.hf;
        self.raw.seal(&mut |p| hf(unsafe { &*(p as *const K) }));
    }

    pub fn unseal(&mut self) {
        self.raw.unseal();
    }

    /// Drop every entry and all storage; strides, minsize and pool remain.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Next live position at or after `from`; the basis of enumeration.
    #[inline]
    pub fn scan(&self, from: u32) -> Option<u32> {
        self.raw.scan(from)
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { map: self, pos: 0 }
    }

    #[inline]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Keep only the entries `f` approves of. This is the supported way of
    /// deleting while enumerating.
    pub fn retain(&mut self, mut f: impl FnMut(K, &V) -> bool) {
        let mut from = 0;
        while let Some(pos) = self.raw.scan(from) {
            let key = unsafe { *(self.raw.key(pos) as *const K) };
            let keep = f(key, unsafe { &*(self.raw.value(pos) as *const V) });
            if !keep {
                self.raw.del_at(pos);
            }
            from = pos + 1;
        }
    }

    #[inline]
    fn write_value(&mut self, pos: u32, value: V) {
        if mem::size_of::<V>() > 0 {
            unsafe { *(self.raw.value_mut(pos) as *mut V) = value };
        }
    }
}

unsafe impl<K: Copy + Send, V: Copy + Send> Send for QhMap<K, V> {}
unsafe impl<K: Copy + Sync, V: Copy + Sync> Sync for QhMap<K, V> {}

/// Iterator over `(key, &value)` pairs, in slot order.
pub struct Iter<'a, K: Copy, V: Copy> {
    map: &'a QhMap<K, V>,
    pos: u32,
}

impl<'a, K: Copy, V: Copy> Iterator for Iter<'a, K, V> {
    type Item = (K, &'a V);

    fn next(&mut self) -> Option<(K, &'a V)> {
        let pos = self.map.raw.scan(self.pos)?;
        self.pos = pos + 1;
        let key = unsafe { *(self.map.raw.key(pos) as *const K) };
        let value = unsafe { &*(self.map.raw.value(pos) as *const V) };
        Some((key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.map.len()))
    }
}

/// Iterator over the keys, in slot order.
pub struct Keys<'a, K: Copy, V: Copy> {
    inner: Iter<'a, K, V>,
}

impl<'a, K: Copy, V: Copy> Iterator for Keys<'a, K, V> {
    type Item = K;

    #[inline]
    fn next(&mut self) -> Option<K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K: Copy, V: Copy> IntoIterator for &'a QhMap<K, V> {
    type Item = (K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    #[inline]
    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}
