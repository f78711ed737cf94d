//! QHashes: real-time hash tables.
//!
//! Hash sets ([`QhSet`]) and maps ([`QhMap`]) that never stop the world to
//! rehash. When a table grows, the previous view stays visible and every
//! subsequent operation moves at most the collision chain it touches plus a
//! small fixed batch, so insertion cost stays flat.
//!
//! Two lookups exist for this reason: `find_safe` reads both views and
//! never mutates — the one to use while enumerating — while `find` drags
//! the touched chain into the new view and advances the pending move.
//!
//! Deletion leaves a *ghost* tombstone that later insertions on the same
//! chain reuse; tables saturated with ghosts rebuild in place instead of
//! growing. Long-lived read-only tables can be [`seal`](QhMap::seal)ed,
//! which finishes the pending move, compacts, and rejects further mutation
//! until unsealed.

/// Typed hash maps
pub mod map;
/// Allocator interface
pub mod pool;
/// Type-erased table core
pub mod raw;
/// Typed hash sets
pub mod set;

mod error;
/// Set of compiler hints
mod hint;
/// Built-in key kinds
mod key;

pub use crate::error::QhashError;
pub use crate::key::{hash_bytes, hash_ptr, hash_u64, QhKey};
pub use crate::map::QhMap;
pub use crate::pool::{HeapPool, MemPool, HEAP};
pub use crate::raw::{RawQhash, COLLISION, OVERWRITE};
pub use crate::set::QhSet;
