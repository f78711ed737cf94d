use thiserror::Error;

/// Errors raised by the sizing paths of the table core.
///
/// Allocation failure itself is not reported here: running out of memory
/// aborts through `std::alloc::handle_alloc_error`, and callers that need a
/// soft failure are expected to install a [`MemPool`](crate::pool::MemPool)
/// that handles it before returning.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QhashError {
    /// The requested slot count exceeds what a 31-bit position can address,
    /// or the byte size of a slot region overflows.
    #[error("hash table capacity overflow")]
    CapacityOverflow,
}

pub(crate) type Result<T> = std::result::Result<T, QhashError>;
