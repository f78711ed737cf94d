//! Built-in key kinds.
//!
//! The core only ever sees a 32-bit seed and an equality callback; this
//! module supplies both for the common key shapes. Anything `Copy` with a
//! sensible bit-level identity can implement [`QhKey`] directly.

use cfg_if::cfg_if;

/// A key stored inline in the table.
///
/// `qh_eq` must be an equivalence relation consistent with `qh_hash`
/// (equal keys hash equal), and both must be pure functions of the key
/// bytes.
pub trait QhKey: Copy {
    fn qh_hash(&self) -> u32;
    fn qh_eq(&self, other: &Self) -> bool;
}

/// Fold a 64-bit value to the 32-bit seed the core consumes.
#[inline]
pub fn hash_u64(v: u64) -> u32 {
    fxhash::hash32(&v)
}

/// Hash a byte string to a 32-bit seed.
#[inline]
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    fxhash::hash32(bytes)
}

cfg_if! {
    if #[cfg(target_pointer_width = "32")] {
        /// Hash a pointer by its address (pointer-identity keys).
        ///
        /// A 32-bit address is its own seed.
        #[inline]
        pub fn hash_ptr<T>(ptr: *const T) -> u32 {
            ptr as usize as u32
        }

        #[inline]
        fn hash_word(v: usize) -> u32 {
            v as u32
        }
    } else {
        /// Hash a pointer by its address (pointer-identity keys).
        #[inline]
        pub fn hash_ptr<T>(ptr: *const T) -> u32 {
            hash_u64(ptr as usize as u64)
        }

        #[inline]
        fn hash_word(v: usize) -> u32 {
            hash_u64(v as u64)
        }
    }
}

impl QhKey for u32 {
    /// 32-bit keys are their own hash.
    #[inline]
    fn qh_hash(&self) -> u32 {
        *self
    }

    #[inline]
    fn qh_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl QhKey for u64 {
    #[inline]
    fn qh_hash(&self) -> u32 {
        hash_u64(*self)
    }

    #[inline]
    fn qh_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl QhKey for usize {
    #[inline]
    fn qh_hash(&self) -> u32 {
        hash_word(*self)
    }

    #[inline]
    fn qh_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T> QhKey for *const T {
    #[inline]
    fn qh_hash(&self) -> u32 {
        hash_ptr(*self)
    }

    /// Pointer identity: compares the addresses, never the pointees.
    #[inline]
    fn qh_eq(&self, other: &Self) -> bool {
        *self == *other
    }
}

impl<T> QhKey for *mut T {
    #[inline]
    fn qh_hash(&self) -> u32 {
        hash_ptr(*self as *const T)
    }

    #[inline]
    fn qh_eq(&self, other: &Self) -> bool {
        *self == *other
    }
}

impl<'a> QhKey for &'a [u8] {
    #[inline]
    fn qh_hash(&self) -> u32 {
        hash_bytes(self)
    }

    /// Byte-wise comparison; two slices with different addresses but equal
    /// contents are the same key.
    #[inline]
    fn qh_eq(&self, other: &Self) -> bool {
        self == other
    }
}
