use crate::PageFlags;
use core::fmt;
use log::trace;
use pt_addresses::FrameNumber;
use pt_store::RecordStore;
use pt_walk::Error;

#[cfg(all(feature = "std", unix))]
pub const KPAGEFLAGS: &str = "/proc/kpageflags";
#[cfg(all(feature = "std", unix))]
pub const KPAGECOUNT: &str = "/proc/kpagecount";

/// Status of one physical frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameStatusRecord {
    pub frame: FrameNumber,
    /// The visible flags: stable ones, plus extended ones when requested.
    pub flags: PageFlags,
    /// The record exactly as read.
    pub raw_flags: u64,
    pub map_count: u64,
}

impl fmt::Display for FrameStatusRecord {
    /// Two lines, `/proc/kpageflags: ...` and `/proc/kpagecount: ...`.
    /// The alternate form pads the labels to line up with a pagemap line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pad = if f.alternate() { "   " } else { "" };
        writeln!(
            f,
            "/proc/kpageflags{pad}: 0x{:016x} ={}",
            self.raw_flags, self.flags
        )?;
        write!(f, "/proc/kpagecount{pad}: {}", self.map_count)
    }
}

/// Decodes frame status from a flags store and a parallel count store.
#[derive(Debug)]
pub struct FrameStatusDecoder<F, C> {
    flags: F,
    counts: C,
    extended: bool,
}

impl<F: RecordStore, C: RecordStore> FrameStatusDecoder<F, C> {
    /// `extended` opts into the kernel-internal flag bits.
    #[must_use]
    pub const fn new(flags: F, counts: C, extended: bool) -> Self {
        Self {
            flags,
            counts,
            extended,
        }
    }

    #[must_use]
    pub const fn extended(&self) -> bool {
        self.extended
    }

    /// Look up the status of `frame`.
    ///
    /// # Errors
    /// [`Error::Truncated`] if either store has no record for the frame
    /// (the frame does not exist), otherwise whatever the stores report.
    pub fn lookup(&self, frame: FrameNumber) -> Result<FrameStatusRecord, Error> {
        let raw_flags = self.flags.read_record(frame.as_u64())?;
        let map_count = self.counts.read_record(frame.as_u64())?;
        trace!("frame {frame}: flags {raw_flags:#018x}, count {map_count}");

        Ok(FrameStatusRecord {
            frame,
            flags: PageFlags::visible(raw_flags, self.extended),
            raw_flags,
            map_count,
        })
    }
}

#[cfg(all(feature = "std", unix))]
impl FrameStatusDecoder<pt_store::FileStore, pt_store::FileStore> {
    /// Open `/proc/kpageflags` and `/proc/kpagecount`.
    ///
    /// # Errors
    /// [`Error::PermissionDenied`] without `CAP_SYS_ADMIN`, or
    /// [`Error::Io`] if the files are missing.
    pub fn open_procfs(extended: bool) -> Result<Self, Error> {
        let flags = pt_store::FileStore::open(KPAGEFLAGS)?;
        let counts = pt_store::FileStore::open(KPAGECOUNT)?;
        Ok(Self::new(flags, counts, extended))
    }
}
