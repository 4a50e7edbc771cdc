use crate::{RecordStore, StoreError};
use log::trace;
use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

/// A record store backed by a file read with `pread(2)`.
///
/// Positional reads keep the store shareable (`&self`) and match how procfs
/// expects `kpageflags`, `kpagecount` and `pagemap` to be read: seek to
/// `index * 8`, read eight bytes.
#[derive(Debug)]
pub struct FileStore {
    file: File,
    path: PathBuf,
}

impl FileStore {
    /// Open `path` read-only.
    ///
    /// # Errors
    /// [`StoreError::NotFound`], [`StoreError::PermissionDenied`] or
    /// [`StoreError::Io`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self { file, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for FileStore {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StoreError> {
        loop {
            match self.file.read_at(buf, offset) {
                Ok(n) => {
                    trace!("{}: read {n} bytes at {offset:#x}", self.path.display());
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
}
