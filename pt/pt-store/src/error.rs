/// Failure reading from a [`RecordStore`](crate::RecordStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Fewer than eight bytes were available at `offset`.
    ///
    /// For per-frame stores this means the frame does not exist.
    #[error("short read at offset {offset:#x}: got {read} of 8 bytes")]
    Truncated { offset: u64, read: usize },
    #[error("permission denied")]
    PermissionDenied,
    #[error("store does not exist")]
    NotFound,
    /// The requested record lies beyond the 64-bit offset space.
    #[error("record at {offset:#x} is out of range")]
    OutOfRange { offset: u64 },
    #[cfg(feature = "std")]
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
}

#[cfg(feature = "std")]
impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            std::io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::Io(err),
        }
    }
}
