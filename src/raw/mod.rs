// Copyright (c) 2016 Amanieu d'Antras
// SPDX-License-Identifier: MIT

//! Type-erased core of the real-time hash tables.
//!
//! The trick is in the resize. When the table grows, the previous flag
//! array and slot count stay around as an *old view* while the key/value
//! storage is reallocated in place and shared between both views. Lookups
//! come in two flavours:
//!
//! * [`RawQhash::get_safe`] never mutates, so it has to consult both views
//!   to be sure a key does not exist. This is the one to use while
//!   enumerating.
//! * [`RawQhash::get`] preemptively moves the whole collision chain of the
//!   searched key into the new view, and makes the pending move progress by
//!   a bounded amount. It must not be called during an enumeration.
//!
//! Insertions always land in the new view. The chosen slot may still hold
//! the bytes of a live old-view entry; that entry is reinserted at its own
//! new position first (it may well not move at all). Such a move can
//! cascade, but collision chains stay short under double hashing.
//!
//! [`RawQhash::put`] returns the slot position in the 31 least significant
//! bits of the result; the most significant bit ([`COLLISION`]) reports
//! that the key was already present.

pub(crate) mod flags;
pub(crate) mod probe;

use core::alloc::Layout;
use core::mem;
use core::ptr::{self, NonNull};

use crate::error::{QhashError, Result};
use crate::hint::{likely, unlikely};
use crate::pool::{MemPool, HEAP};

use self::probe::ProbeSeq;

/// Top bit of a position word: the key already existed.
pub const COLLISION: u32 = 1 << 31;
/// `put` flag: on collision, overwrite the stored key bytes.
pub const OVERWRITE: u32 = 1 << 0;

/// Smallest nonzero slot count.
const MIN_SIZE: u32 = 64;
/// Positions are 31-bit; the slot count may not exceed this.
const MAX_SIZE: u32 = 1 << 31;
/// Old-view entries drained per mutating operation, on top of the touched
/// collision chain.
const RESIZE_BATCH: u32 = 2;

#[cold]
fn capacity_overflow() -> ! {
    panic!("qhash: {}", QhashError::CapacityOverflow)
}

/// One view of the table: a flag array and its slot count.
///
/// `len` counts live entries across *both* views when this is the current
/// header. On the old view it is reused as the drain horizon: every old
/// position at or above it is known not to hold an entry.
struct Hdr {
    bits: NonNull<usize>,
    len: u32,
    size: u32,
}

impl Hdr {
    #[inline]
    fn empty() -> Self {
        Hdr {
            bits: NonNull::dangling(),
            len: 0,
            size: 0,
        }
    }

    /// Whether the slot holds an entry. Out-of-range positions read as
    /// unset, which is what makes `del_at` on a stale position a no-op.
    #[inline]
    fn is_set(&self, pos: u32) -> bool {
        if unlikely(pos >= self.size) {
            return false;
        }
        unsafe { flags::is_set(self.bits.as_ptr(), pos) }
    }
}

fn bits_layout(size: u32) -> Layout {
    Layout::array::<usize>(flags::words_for(size)).unwrap_or_else(|_| capacity_overflow())
}

fn array_layout(elem: Layout, n: u32) -> Result<Layout> {
    let size = elem
        .size()
        .checked_mul(n as usize)
        .ok_or(QhashError::CapacityOverflow)?;
    Layout::from_size_align(size, elem.align()).map_err(|_| QhashError::CapacityOverflow)
}

fn realloc_region(
    mp: &'static dyn MemPool,
    ptr: Option<NonNull<u8>>,
    elem: Layout,
    old_n: u32,
    new_n: u32,
) -> NonNull<u8> {
    let new_layout = array_layout(elem, new_n).unwrap_or_else(|_| capacity_overflow());
    match ptr {
        Some(p) => {
            let old_layout = array_layout(elem, old_n).unwrap_or_else(|_| capacity_overflow());
            unsafe { mp.realloc(p, old_layout, new_layout.size()) }
        }
        None => mp.alloc_raw(new_layout),
    }
}

/// Outcome of probing one view for a key.
enum SlotSearch {
    Hit(u32),
    /// Not found; `slot` is where an insertion would go (the first ghost of
    /// the chain if one was passed, else the terminating empty slot).
    Free { slot: u32, ghost: bool },
}

/// Temporary slot-sized buffer used while a displaced entry is in flight
/// between the old and new views.
struct Scratch {
    ptr: NonNull<u8>,
    layout: Layout,
    off_v: usize,
    off_h: usize,
    mp: &'static dyn MemPool,
}

impl Scratch {
    fn new(qh: &RawQhash) -> Self {
        let (kv, off_v) = qh
            .k_layout
            .extend(qh.v_layout)
            .unwrap_or_else(|_| capacity_overflow());
        let (layout, off_h) = kv
            .extend(Layout::new::<u32>())
            .unwrap_or_else(|_| capacity_overflow());
        let mp = qh.pool();
        Scratch {
            ptr: mp.alloc_raw(layout),
            layout,
            off_v,
            off_h,
            mp,
        }
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        unsafe { self.mp.dealloc(self.ptr, self.layout) };
    }
}

/// The type-erased table: two flag views, shared slot storage, and the
/// strides needed to address it.
pub struct RawQhash {
    hdr: Hdr,
    old: Option<Box<Hdr>>,
    keys: Option<NonNull<u8>>,
    values: Option<NonNull<u8>>,
    hashes: Option<NonNull<u32>>,
    ghosts: u32,
    k_layout: Layout,
    v_layout: Layout,
    cached: bool,
    minsize: u32,
    sealed: bool,
    mp: Option<&'static dyn MemPool>,
}

impl RawQhash {
    /// Create an empty table. Nothing is allocated until the first `put`.
    ///
    /// `cached` reserves a 32-bit hash per slot: lookups compare it before
    /// running `eq`, and resizes reuse it instead of rehashing every key.
    pub fn new(
        k_layout: Layout,
        v_layout: Layout,
        cached: bool,
        mp: Option<&'static dyn MemPool>,
    ) -> Self {
        assert!(
            k_layout.size() > 0 && k_layout.size() < 256,
            "key stride must be within 1..256"
        );
        assert!(
            v_layout.size() <= u16::MAX as usize,
            "value stride must fit in 16 bits"
        );
        RawQhash {
            hdr: Hdr::empty(),
            old: None,
            keys: None,
            values: None,
            hashes: None,
            ghosts: 0,
            k_layout,
            v_layout,
            cached,
            minsize: 0,
            sealed: false,
            mp,
        }
    }

    /// Number of live entries, across both views.
    #[inline]
    pub fn len(&self) -> usize {
        self.hdr.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hdr.len == 0
    }

    /// Current slot count (0 before the first insertion).
    #[inline]
    pub fn size(&self) -> u32 {
        self.hdr.size
    }

    /// Tombstones in the current view.
    #[inline]
    pub fn ghosts(&self) -> u32 {
        self.ghosts
    }

    /// Whether an incremental resize is in flight.
    #[inline]
    pub fn in_resize(&self) -> bool {
        self.old.is_some()
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    #[inline]
    pub fn minsize(&self) -> u32 {
        self.minsize
    }

    /// Lower bound on the slot count of every future allocation.
    pub fn set_minsize(&mut self, minsize: u32) {
        assert!(minsize <= MAX_SIZE, "minsize exceeds the maximum slot count");
        self.minsize = minsize;
    }

    /// Whether `pos` currently holds a live entry (in either view).
    #[inline]
    pub fn is_live(&self, pos: u32) -> bool {
        self.hdr.is_set(pos)
            || match &self.old {
                Some(o) => o.is_set(pos),
                None => false,
            }
    }

    /// Total bytes currently allocated for the table.
    pub fn memory_footprint(&self) -> usize {
        let word = mem::size_of::<usize>();
        let mut total = 0;
        if self.hdr.size > 0 {
            total += flags::words_for(self.hdr.size) * word;
        }
        if let Some(o) = &self.old {
            total += flags::words_for(o.size) * word;
        }
        let cap = self.arrays_cap() as usize;
        if self.keys.is_some() {
            total += cap * self.k_layout.size();
        }
        if self.values.is_some() {
            total += cap * self.v_layout.size();
        }
        if self.hashes.is_some() {
            total += cap * mem::size_of::<u32>();
        }
        total
    }

    /// Next live position at or after `from`, or `None` past the end.
    ///
    /// This is the basis of enumeration. The only mutation allowed while
    /// walking positions is `del_at` on the position just returned.
    pub fn scan(&self, from: u32) -> Option<u32> {
        let cap = self.arrays_cap();
        let mut pos = from;
        while pos < cap {
            if self.is_live(pos) {
                return Some(pos);
            }
            pos += 1;
        }
        None
    }

    /// Read-only lookup. Checks the new view first, then the old one.
    pub fn get_safe(&self, h: u32, eq: &mut impl FnMut(*const u8) -> bool) -> Option<u32> {
        if self.hdr.size == 0 {
            return None;
        }
        if let SlotSearch::Hit(pos) = self.search_view(&self.hdr, h, eq) {
            return Some(pos);
        }
        if let Some(o) = &self.old {
            if let SlotSearch::Hit(pos) = self.search_view(o, h, eq) {
                return Some(pos);
            }
        }
        None
    }

    /// Migrating lookup: moves the key's old-view collision chain over,
    /// advances the drain, then probes the new view, which is by then
    /// authoritative for this key. Must not be used while enumerating.
    pub fn get(
        &mut self,
        h: u32,
        hf: &mut impl FnMut(*const u8) -> u32,
        eq: &mut impl FnMut(*const u8) -> bool,
    ) -> Option<u32> {
        if self.hdr.size == 0 {
            return None;
        }
        if self.old.is_some() {
            self.migrate_chain(h, hf);
            self.resize_drain(RESIZE_BATCH, hf);
        }
        match self.search_view(&self.hdr, h, eq) {
            SlotSearch::Hit(pos) => Some(pos),
            SlotSearch::Free { .. } => None,
        }
    }

    /// Find-or-reserve a slot for `key`.
    ///
    /// On a fresh reservation the key bytes and cached hash are written and
    /// the position is returned. If the key already exists the position is
    /// returned with [`COLLISION`] set, and the key bytes are rewritten
    /// only when `fl` carries [`OVERWRITE`]. The value slot is never
    /// touched; that part is the caller's.
    ///
    /// # Safety
    ///
    /// `key` must point to at least the key stride's worth of readable
    /// bytes.
    pub unsafe fn put(
        &mut self,
        h: u32,
        key: *const u8,
        fl: u32,
        hf: &mut impl FnMut(*const u8) -> u32,
        eq: &mut impl FnMut(*const u8) -> bool,
    ) -> u32 {
        debug_assert!(!self.sealed, "reserve on a sealed hash table");
        self.ensure_room(hf);
        if self.old.is_some() {
            self.migrate_chain(h, hf);
            self.resize_drain(RESIZE_BATCH, hf);
        }
        loop {
            match self.search_view(&self.hdr, h, eq) {
                SlotSearch::Hit(pos) => {
                    if fl & OVERWRITE != 0 {
                        self.write_key(pos, key, h);
                    }
                    return pos | COLLISION;
                }
                SlotSearch::Free { slot, ghost } => {
                    // The slot bytes may still belong to a live old-view
                    // entry; move it to its own new position and pick again.
                    let clash = match &self.old {
                        Some(o) => o.is_set(slot),
                        None => false,
                    };
                    if unlikely(clash) {
                        debug_assert!(!ghost);
                        self.migrate_one(slot, hf);
                        continue;
                    }
                    if ghost {
                        flags::xor2(self.hdr.bits.as_ptr(), slot);
                        self.ghosts -= 1;
                    } else {
                        flags::set2(self.hdr.bits.as_ptr(), slot, flags::LIVE);
                    }
                    self.write_key(slot, key, h);
                    self.hdr.len += 1;
                    return slot;
                }
            }
        }
    }

    /// Delete the entry at `pos`, in whichever view holds it. A position
    /// that holds no entry is left alone.
    pub fn del_at(&mut self, pos: u32) {
        debug_assert!(!self.sealed, "delete on a sealed hash table");
        if likely(self.hdr.is_set(pos)) {
            unsafe { flags::xor2(self.hdr.bits.as_ptr(), pos) };
            self.hdr.len -= 1;
            self.ghosts += 1;
            return;
        }
        // Old-view ghosts are dropped wholesale when the view is freed, so
        // they are not counted.
        let bits = match &self.old {
            Some(o) if o.is_set(pos) => o.bits,
            _ => return,
        };
        unsafe { flags::xor2(bits.as_ptr(), pos) };
        self.hdr.len -= 1;
    }

    /// Release all storage and return to the pristine zero-sized state.
    /// Strides, minsize and the pool are kept.
    pub fn clear(&mut self) {
        debug_assert!(!self.sealed, "clear on a sealed hash table");
        self.release();
    }

    /// Finish any pending resize, compact, and freeze the table. Mutating
    /// operations are rejected (debug assertions) until [`unseal`].
    ///
    /// Sealing twice is a no-op.
    ///
    /// [`unseal`]: RawQhash::unseal
    pub fn seal(&mut self, hf: &mut impl FnMut(*const u8) -> u32) {
        if self.sealed {
            return;
        }
        if self.old.is_some() {
            self.resize_drain(u32::MAX, hf);
        }
        if self.hdr.size > 0 {
            let compact = self.size_for(self.hdr.len);
            if self.ghosts > 0 || compact < self.hdr.size {
                self.resize_start(compact);
                self.resize_drain(u32::MAX, hf);
            }
        }
        self.sealed = true;
    }

    pub fn unseal(&mut self) {
        self.sealed = false;
    }

    /// Raw pointer to the key bytes of `pos`.
    ///
    /// # Safety
    ///
    /// `pos` must be a position previously returned for a live entry; the
    /// pointer is invalidated by any mutating operation.
    #[inline]
    pub unsafe fn key(&self, pos: u32) -> *const u8 {
        self.key_ptr(pos)
    }

    /// Raw pointer to the value bytes of `pos`. See [`key`](RawQhash::key)
    /// for the safety contract.
    ///
    /// # Safety
    ///
    /// As for [`key`](RawQhash::key).
    #[inline]
    pub unsafe fn value(&self, pos: u32) -> *const u8 {
        self.value_ptr(pos)
    }

    /// Mutable variant of [`value`](RawQhash::value).
    ///
    /// # Safety
    ///
    /// As for [`key`](RawQhash::key).
    #[inline]
    pub unsafe fn value_mut(&mut self, pos: u32) -> *mut u8 {
        self.value_ptr(pos)
    }

    #[inline]
    fn pool(&self) -> &'static dyn MemPool {
        match self.mp {
            Some(mp) => mp,
            None => &HEAP,
        }
    }

    /// Slot count the shared arrays are sized for: the larger view.
    #[inline]
    fn arrays_cap(&self) -> u32 {
        match &self.old {
            Some(o) => o.size.max(self.hdr.size),
            None => self.hdr.size,
        }
    }

    #[inline]
    unsafe fn key_ptr(&self, pos: u32) -> *mut u8 {
        debug_assert!(pos < self.arrays_cap());
        match self.keys {
            Some(k) => k.as_ptr().add(pos as usize * self.k_layout.size()),
            None => NonNull::dangling().as_ptr(),
        }
    }

    #[inline]
    unsafe fn value_ptr(&self, pos: u32) -> *mut u8 {
        match self.values {
            Some(v) => v.as_ptr().add(pos as usize * self.v_layout.size()),
            None => NonNull::dangling().as_ptr(),
        }
    }

    #[inline]
    fn hash_matches(&self, pos: u32, h: u32) -> bool {
        match self.hashes {
            Some(hp) => unsafe { *hp.as_ptr().add(pos as usize) == h },
            None => true,
        }
    }

    unsafe fn write_key(&mut self, pos: u32, key: *const u8, h: u32) {
        // `key` may point into our own storage (reinserting a stored key),
        // so this must tolerate overlap.
        ptr::copy(key, self.key_ptr(pos), self.k_layout.size());
        if let Some(hp) = self.hashes {
            *hp.as_ptr().add(pos as usize) = h;
        }
    }

    /// Probe one view for the key recognized by `eq`.
    fn search_view(
        &self,
        hd: &Hdr,
        h: u32,
        eq: &mut impl FnMut(*const u8) -> bool,
    ) -> SlotSearch {
        debug_assert!(hd.size > 0);
        let bits = hd.bits.as_ptr();
        let mut ghost = None;
        for pos in ProbeSeq::new(h, hd.size) {
            match unsafe { flags::get2(bits, pos) } {
                flags::EMPTY => {
                    return SlotSearch::Free {
                        slot: ghost.unwrap_or(pos),
                        ghost: ghost.is_some(),
                    }
                }
                flags::LIVE => {
                    if self.hash_matches(pos, h) && eq(unsafe { self.key_ptr(pos) as *const u8 }) {
                        return SlotSearch::Hit(pos);
                    }
                }
                flags::GHOST => {
                    if ghost.is_none() {
                        ghost = Some(pos);
                    }
                }
                _ => debug_assert!(false, "reserved flag state in a stored slot"),
            }
        }
        // The load cap guarantees an empty slot in every view.
        debug_assert!(false, "probe sequence exhausted");
        SlotSearch::Free {
            slot: ghost.unwrap_or(0),
            ghost: ghost.is_some(),
        }
    }

    /// Move the live old-view entry at `p` into the new view.
    ///
    /// The entry goes to the first free slot of its new-view chain. If the
    /// bytes there belong to another live old entry, the two are swapped
    /// through scratch and the displaced one continues the loop; every
    /// iteration retires one old-view slot, so this terminates.
    fn migrate_one(&mut self, p: u32, hf: &mut impl FnMut(*const u8) -> u32) {
        let old_bits = match &self.old {
            Some(o) => o.bits,
            None => return,
        };
        debug_assert!(unsafe { flags::is_set(old_bits.as_ptr(), p) });

        let s = Scratch::new(self);
        unsafe {
            self.read_slot(p, &s);
            flags::xor2(old_bits.as_ptr(), p);
        }
        let mut h = self.scratch_hash(&s, hf);
        loop {
            let (q, was_ghost) = match self.search_view(&self.hdr, h, &mut |_| false) {
                SlotSearch::Free { slot, ghost } => (slot, ghost),
                SlotSearch::Hit(_) => unreachable!(),
            };
            let clash = match &self.old {
                Some(o) => o.is_set(q),
                None => false,
            };
            if clash {
                // A ghost in the new view implies the old entry at the same
                // position was already evicted, so the clash slot was empty.
                debug_assert!(!was_ghost);
                unsafe {
                    self.swap_slot(q, &s);
                    flags::set2(self.hdr.bits.as_ptr(), q, flags::LIVE);
                    flags::xor2(old_bits.as_ptr(), q);
                }
                h = self.scratch_hash(&s, hf);
            } else {
                unsafe {
                    self.write_slot(q, &s);
                    if was_ghost {
                        flags::xor2(self.hdr.bits.as_ptr(), q);
                        self.ghosts -= 1;
                    } else {
                        flags::set2(self.hdr.bits.as_ptr(), q, flags::LIVE);
                    }
                }
                return;
            }
        }
    }

    /// Move every live entry of the old-view collision chain of `h`.
    fn migrate_chain(&mut self, h: u32, hf: &mut impl FnMut(*const u8) -> u32) {
        let (bits, size) = match &self.old {
            Some(o) => (o.bits, o.size),
            None => return,
        };
        for pos in ProbeSeq::new(h, size) {
            match unsafe { flags::get2(bits.as_ptr(), pos) } {
                flags::EMPTY => break,
                flags::LIVE => self.migrate_one(pos, hf),
                _ => {}
            }
        }
    }

    /// Migrate up to `budget` entries downward from the horizon; free the
    /// old view once it runs dry.
    fn resize_drain(&mut self, mut budget: u32, hf: &mut impl FnMut(*const u8) -> u32) {
        loop {
            let (bits, horizon) = match &self.old {
                Some(o) => (o.bits, o.len),
                None => return,
            };
            match unsafe { flags::last_live_below(bits.as_ptr(), horizon) } {
                None => {
                    self.resize_finish();
                    return;
                }
                Some(p) => {
                    if budget == 0 {
                        if let Some(o) = self.old.as_deref_mut() {
                            o.len = p + 1;
                        }
                        return;
                    }
                    self.migrate_one(p, hf);
                    if let Some(o) = self.old.as_deref_mut() {
                        o.len = p;
                    }
                    budget -= 1;
                }
            }
        }
    }

    fn resize_start(&mut self, newsize: u32) {
        debug_assert!(self.old.is_none());
        debug_assert!(newsize.is_power_of_two());
        if newsize > self.hdr.size {
            self.resize_arrays(self.hdr.size, newsize);
        }
        let bits = self.alloc_bits(newsize);
        let prev = Hdr {
            bits: self.hdr.bits,
            len: self.hdr.size,
            size: self.hdr.size,
        };
        self.hdr.bits = bits;
        self.hdr.size = newsize;
        self.old = Some(Box::new(prev));
        self.ghosts = 0;
    }

    fn resize_finish(&mut self) {
        let old = match self.old.take() {
            Some(o) => o,
            None => return,
        };
        unsafe { self.free_bits(old.bits, old.size) };
        if old.size > self.hdr.size {
            self.resize_arrays(old.size, self.hdr.size);
        }
    }

    /// Make room for one more entry: allocate the first table, or trigger a
    /// grow / ghost-flush rebuild when the load cap would be crossed.
    fn ensure_room(&mut self, hf: &mut impl FnMut(*const u8) -> u32) {
        if unlikely(self.hdr.size == 0) {
            let size = self.min_slots();
            self.resize_arrays(0, size);
            self.hdr.bits = self.alloc_bits(size);
            self.hdr.size = size;
            return;
        }
        if likely(!self.room_needed()) {
            return;
        }
        if self.old.is_some() {
            // One resize at a time: the pending drain completes first.
            self.resize_drain(u32::MAX, hf);
        }
        if self.room_needed() {
            let target = if self.hdr.len >= self.hdr.size / 4 {
                if self.hdr.size >= MAX_SIZE {
                    capacity_overflow();
                }
                self.hdr.size << 1
            } else {
                // Mostly tombstones: rebuild at the same size to flush them.
                self.hdr.size
            };
            self.resize_start(target.max(self.min_slots()));
        }
    }

    #[inline]
    fn room_needed(&self) -> bool {
        2 * (self.hdr.len as u64 + self.ghosts as u64 + 1) >= self.hdr.size as u64
    }

    #[inline]
    fn min_slots(&self) -> u32 {
        self.minsize.next_power_of_two().max(MIN_SIZE)
    }

    /// Smallest admissible slot count keeping `len` entries under the cap.
    fn size_for(&self, len: u32) -> u32 {
        let mut size = self.min_slots();
        while 2 * (len as u64 + 1) >= size as u64 {
            if size >= MAX_SIZE {
                capacity_overflow();
            }
            size <<= 1;
        }
        size
    }

    fn alloc_bits(&self, size: u32) -> NonNull<usize> {
        self.pool().alloc(bits_layout(size)).cast()
    }

    unsafe fn free_bits(&self, bits: NonNull<usize>, size: u32) {
        self.pool().dealloc(bits.cast(), bits_layout(size));
    }

    fn resize_arrays(&mut self, old_cap: u32, new_cap: u32) {
        let mp = self.pool();
        self.keys = Some(realloc_region(
            mp,
            self.keys.take(),
            self.k_layout,
            old_cap,
            new_cap,
        ));
        if self.v_layout.size() > 0 {
            self.values = Some(realloc_region(
                mp,
                self.values.take(),
                self.v_layout,
                old_cap,
                new_cap,
            ));
        }
        if self.cached {
            let hashes = self.hashes.take().map(NonNull::cast::<u8>);
            self.hashes =
                Some(realloc_region(mp, hashes, Layout::new::<u32>(), old_cap, new_cap).cast());
        }
    }

    fn free_arrays(&mut self, cap: u32) {
        if cap == 0 {
            self.keys = None;
            self.values = None;
            self.hashes = None;
            return;
        }
        let mp = self.pool();
        if let Some(p) = self.keys.take() {
            let layout = array_layout(self.k_layout, cap).unwrap_or_else(|_| capacity_overflow());
            unsafe { mp.dealloc(p, layout) };
        }
        if let Some(p) = self.values.take() {
            let layout = array_layout(self.v_layout, cap).unwrap_or_else(|_| capacity_overflow());
            unsafe { mp.dealloc(p, layout) };
        }
        if let Some(p) = self.hashes.take() {
            let layout =
                array_layout(Layout::new::<u32>(), cap).unwrap_or_else(|_| capacity_overflow());
            unsafe { mp.dealloc(p.cast(), layout) };
        }
    }

    fn release(&mut self) {
        let cap = self.arrays_cap();
        if let Some(o) = self.old.take() {
            unsafe { self.free_bits(o.bits, o.size) };
        }
        if self.hdr.size > 0 {
            let (bits, size) = (self.hdr.bits, self.hdr.size);
            unsafe { self.free_bits(bits, size) };
        }
        self.hdr = Hdr::empty();
        self.free_arrays(cap);
        self.ghosts = 0;
    }

    fn scratch_hash(&self, s: &Scratch, hf: &mut impl FnMut(*const u8) -> u32) -> u32 {
        if self.hashes.is_some() {
            unsafe { *(s.ptr.as_ptr().add(s.off_h) as *const u32) }
        } else {
            hf(s.ptr.as_ptr() as *const u8)
        }
    }

    unsafe fn read_slot(&self, pos: u32, s: &Scratch) {
        ptr::copy_nonoverlapping(self.key_ptr(pos), s.ptr.as_ptr(), self.k_layout.size());
        if self.v_layout.size() > 0 {
            ptr::copy_nonoverlapping(
                self.value_ptr(pos),
                s.ptr.as_ptr().add(s.off_v),
                self.v_layout.size(),
            );
        }
        if let Some(hp) = self.hashes {
            *(s.ptr.as_ptr().add(s.off_h) as *mut u32) = *hp.as_ptr().add(pos as usize);
        }
    }

    unsafe fn write_slot(&mut self, pos: u32, s: &Scratch) {
        ptr::copy_nonoverlapping(s.ptr.as_ptr(), self.key_ptr(pos), self.k_layout.size());
        if self.v_layout.size() > 0 {
            ptr::copy_nonoverlapping(
                s.ptr.as_ptr().add(s.off_v),
                self.value_ptr(pos),
                self.v_layout.size(),
            );
        }
        if let Some(hp) = self.hashes {
            *hp.as_ptr().add(pos as usize) = *(s.ptr.as_ptr().add(s.off_h) as *const u32);
        }
    }

    unsafe fn swap_slot(&mut self, pos: u32, s: &Scratch) {
        ptr::swap_nonoverlapping(s.ptr.as_ptr(), self.key_ptr(pos), self.k_layout.size());
        if self.v_layout.size() > 0 {
            ptr::swap_nonoverlapping(
                s.ptr.as_ptr().add(s.off_v),
                self.value_ptr(pos),
                self.v_layout.size(),
            );
        }
        if let Some(hp) = self.hashes {
            ptr::swap_nonoverlapping(
                s.ptr.as_ptr().add(s.off_h) as *mut u32,
                hp.as_ptr().add(pos as usize),
                1,
            );
        }
    }
}

impl Drop for RawQhash {
    fn drop(&mut self) {
        self.release();
    }
}
