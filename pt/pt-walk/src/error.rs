use crate::address_space::AddressSpaceSelector;
use pt_addresses::VirtualAddress;
use pt_registers::UnsupportedMode;
use pt_store::StoreError;

/// Why a walk or lookup was aborted.
///
/// Absent and swapped pages are results, not errors; see
/// [`WalkResult`](crate::WalkResult).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The address is not canonical for the active address width.
    #[error("invalid address {address}: not canonical for {width}-bit virtual addresses")]
    InvalidAddress { address: VirtualAddress, width: u32 },
    /// Neither an owned nor a borrowed address space exists for the selector.
    #[error("no such address space: {0}")]
    NoSuchAddressSpace(AddressSpaceSelector),
    #[error("permission denied reading the backing store")]
    PermissionDenied,
    #[error(transparent)]
    UnsupportedMode(#[from] UnsupportedMode),
    /// A record store returned fewer than eight bytes.
    #[error("short read at offset {offset:#x}: got {read} of 8 bytes")]
    Truncated { offset: u64, read: usize },
    /// A reserved or undefined bit pattern where a specific one was required.
    #[error("undefined bit pattern in {what}: {value:#018x}")]
    SentinelDecodeFailure { what: &'static str, value: u64 },
    #[error("backing store failed: {0}")]
    Io(#[source] StoreError),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Truncated { offset, read } => Self::Truncated { offset, read },
            StoreError::PermissionDenied => Self::PermissionDenied,
            other => Self::Io(other),
        }
    }
}
