use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use pt_frames::{KPAGECOUNT, KPAGEFLAGS};
use pt_walk::{AddressSpaceSelector, Pid};
use std::num::ParseIntError;
use std::path::PathBuf;

/// `CR0.PE | CR0.WP | CR0.PG`
pub const DEFAULT_CR0: u64 = 0x8001_0001;
/// `CR4.PAE`
pub const DEFAULT_CR4: u64 = 0x20;
/// `EFER.LME | EFER.LMA | EFER.NXE`
pub const DEFAULT_EFER: u64 = 0xD00;

#[derive(Parser)]
#[command(name = "ptwalk")]
#[command(about = "Walk x86-64 page tables and decode page status")]
pub struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace). `RUST_LOG` wins.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Walk the page tables of a physical memory image.
    Walk(WalkArgs),

    /// Print the layout constants of a paging mode.
    Dump {
        /// Five-level paging.
        #[arg(long)]
        la57: bool,
        /// Protection keys enabled.
        #[arg(long)]
        pke: bool,
    },

    /// Decode a process's `/proc/<pid>/pagemap` record for a virtual address.
    Pagemap {
        /// `self` or a PID.
        space: AddressSpaceSelector,
        #[arg(value_parser = parse_address)]
        vaddr: u64,
        #[command(flatten)]
        frames: FrameStores,
    },

    /// Decode the status of the frame holding a physical address.
    Frame {
        #[arg(value_parser = parse_address)]
        paddr: u64,
        #[command(flatten)]
        frames: FrameStores,
    },
}

#[derive(Args)]
pub struct WalkArgs {
    /// Physical memory image; byte offset = physical address.
    #[arg(long)]
    pub image: PathBuf,

    /// Root table of the current address space (raw CR3).
    #[arg(long, value_parser = parse_address)]
    pub cr3: u64,

    #[arg(long, value_parser = parse_address, default_value_t = DEFAULT_CR0)]
    pub cr0: u64,

    #[arg(long, value_parser = parse_address, default_value_t = DEFAULT_CR4)]
    pub cr4: u64,

    #[arg(long, value_parser = parse_address, default_value_t = DEFAULT_EFER)]
    pub efer: u64,

    /// Root table of the kernel's reference address space.
    #[arg(long, value_parser = parse_address)]
    pub kernel_cr3: Option<u64>,

    /// Register a process: `PID=ROOT`, or `PID=ROOT:borrowed` for the
    /// address space it borrows.
    #[arg(long = "process", value_parser = parse_process)]
    pub processes: Vec<ProcessRoot>,

    /// Address space to walk: `self`, `kernel` or a PID.
    #[arg(long, default_value = "self")]
    pub space: AddressSpaceSelector,

    #[arg(value_parser = parse_address)]
    pub vaddr: u64,

    /// Also decode the status of the resolved frame.
    #[arg(long)]
    pub frames: bool,

    #[command(flatten)]
    pub stores: FrameStores,
}

#[derive(Args)]
pub struct FrameStores {
    /// Include the kernel-internal page flags.
    #[arg(long)]
    pub hack: bool,

    #[arg(long, default_value = KPAGEFLAGS)]
    pub kpageflags: PathBuf,

    #[arg(long, default_value = KPAGECOUNT)]
    pub kpagecount: PathBuf,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ProcessRoot {
    pub pid: Pid,
    pub root: u64,
    pub borrowed: bool,
}

/// Parse an unsigned address the way `strtoul(s, NULL, 0)` does: `0x` for
/// hex, a leading `0` for octal, decimal otherwise.
pub fn parse_address(s: &str) -> Result<u64, ParseIntError> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if s.len() > 1
        && let Some(oct) = s.strip_prefix('0')
    {
        u64::from_str_radix(oct, 8)
    } else {
        s.parse()
    }
}

fn parse_process(s: &str) -> anyhow::Result<ProcessRoot> {
    let (pid, rest) = s.split_once('=').context("expected PID=ROOT[:borrowed]")?;
    let pid = pid
        .parse::<u32>()
        .ok()
        .and_then(Pid::new)
        .with_context(|| format!("invalid PID {pid:?}"))?;

    let (root, borrowed) = match rest.split_once(':') {
        None => (rest, false),
        Some((root, "borrowed")) => (root, true),
        Some((_, other)) => bail!("unknown process root kind {other:?}"),
    };
    let root = parse_address(root).with_context(|| format!("invalid root {root:?}"))?;

    Ok(ProcessRoot {
        pid,
        root,
        borrowed,
    })
}
