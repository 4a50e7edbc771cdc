use crate::{RECORD_SIZE, RecordStore, StoreError};
use alloc::vec::Vec;

/// A record store over any in-memory byte buffer.
///
/// Used for captured memory images, synthetic page tables in tests, and
/// small snapshots of procfs files.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore<B = Vec<u8>> {
    bytes: B,
}

impl<B: AsRef<[u8]>> MemoryStore<B> {
    #[must_use]
    pub const fn new(bytes: B) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.bytes.as_ref().len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.as_ref().is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> B {
        self.bytes
    }
}

impl MemoryStore<Vec<u8>> {
    /// A zero-filled store of `len` bytes.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self::new(alloc::vec![0; len])
    }

    /// Build a store from consecutive native-endian records.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = u64>) -> Self {
        let bytes = records.into_iter().flat_map(u64::to_ne_bytes).collect();
        Self::new(bytes)
    }

    /// Store `value` at byte `offset`, growing the buffer as needed.
    pub fn write_u64_at(&mut self, offset: usize, value: u64) {
        let end = offset + RECORD_SIZE;
        if self.bytes.len() < end {
            self.bytes.resize(end, 0);
        }
        self.bytes[offset..end].copy_from_slice(&value.to_ne_bytes());
    }

    /// Store `value` as record number `index`.
    pub fn write_record(&mut self, index: usize, value: u64) {
        self.write_u64_at(index * RECORD_SIZE, value);
    }
}

impl<B: AsRef<[u8]>> RecordStore for MemoryStore<B> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StoreError> {
        let bytes = self.bytes.as_ref();
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= bytes.len() {
            return Ok(0);
        }

        let n = buf.len().min(bytes.len() - start);
        buf[..n].copy_from_slice(&bytes[start..start + n]);
        Ok(n)
    }
}
