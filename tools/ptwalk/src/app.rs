use crate::cli::{Cli, Cmd, FrameStores, WalkArgs};
use anyhow::{Context, Result, bail};
use log::info;
use pt_addresses::{FrameNumber, PAGE_SHIFT, PAGE_SIZE, PhysicalAddress, VirtualAddress, align_down};
use pt_frames::{FrameStatusDecoder, PagemapReader};
use pt_registers::ControlRegisters;
use pt_store::FileStore;
use pt_walk::{
    AddressSpaceProvider, ArchProfile, Error, LayoutConstants, Pid, Resolver, SnapshotSource,
};
use std::collections::BTreeMap;

pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.cmd {
        Cmd::Walk(args) => walk(&args),
        Cmd::Dump { la57, pke } => dump(la57, pke),
        Cmd::Pagemap {
            space,
            vaddr,
            frames,
        } => pagemap(space, vaddr, &frames),
        Cmd::Frame { paddr, frames } => frame(paddr, &frames),
    }
}

fn walk(args: &WalkArgs) -> Result<()> {
    let regs = ControlRegisters::from_raw(args.cr0, args.cr3, args.cr4, args.efer);
    let image = FileStore::open(&args.image)
        .with_context(|| format!("failed to open memory image {}", args.image.display()))?;

    let mut source = SnapshotSource::new(image).with_current(regs.cr3.root());
    if let Some(root) = args.kernel_cr3 {
        source = source.with_kernel(PhysicalAddress::new(root));
    }
    let mut processes: BTreeMap<Pid, (Option<PhysicalAddress>, Option<PhysicalAddress>)> =
        BTreeMap::new();
    for p in &args.processes {
        let roots = processes.entry(p.pid).or_default();
        let slot = if p.borrowed { &mut roots.1 } else { &mut roots.0 };
        *slot = Some(PhysicalAddress::new(p.root));
    }
    for (pid, (owned, borrowed)) in processes {
        source = source.with_process(pid, owned, borrowed);
    }

    let provider = AddressSpaceProvider::from_registers(source, &regs)?;
    let space = provider.open(args.space)?;
    let walk = space.walk(VirtualAddress::new(args.vaddr))?;
    println!("{walk}");

    if args.frames {
        match Resolver::resolve(&walk.result).frame() {
            Some(frame) => print_frame_status(frame, &args.stores, false)?,
            None => info!("no frame to decode"),
        }
    }
    Ok(())
}

fn dump(la57: bool, pke: bool) -> Result<()> {
    let profile = if la57 {
        ArchProfile::X86_64_5LEVEL
    } else {
        ArchProfile::X86_64_4LEVEL
    }
    .with_protection_keys(pke);

    let constants = LayoutConstants::for_profile(&profile);
    constants.validate()?;
    println!("{constants}");
    Ok(())
}

fn pagemap(space: pt_walk::AddressSpaceSelector, vaddr: u64, stores: &FrameStores) -> Result<()> {
    println!("Vaddr: {vaddr:#x}, page: {:#x}", align_down(vaddr, PAGE_SIZE));

    let reader = PagemapReader::open_procfs(space)
        .with_context(|| format!("failed to open the pagemap of {space}"))?;
    let lookup = reader
        .lookup(VirtualAddress::new(vaddr))
        .map_err(page_missing)?;
    println!("{lookup}");
    if !lookup.exists() {
        bail!("no pagemap entry for {vaddr:#x}");
    }

    if let Some(frame) = lookup.frame() {
        print_frame_status(frame, stores, true)?;
    }
    Ok(())
}

fn frame(paddr: u64, stores: &FrameStores) -> Result<()> {
    println!("Paddr: {paddr:#x}, page: {:#x}", align_down(paddr, PAGE_SIZE));
    print_frame_status(FrameNumber::new(paddr >> PAGE_SHIFT), stores, false)
}

fn print_frame_status(frame: FrameNumber, stores: &FrameStores, aligned: bool) -> Result<()> {
    let decoder = FrameStatusDecoder::new(
        FileStore::open(&stores.kpageflags)
            .with_context(|| format!("failed to open {}", stores.kpageflags.display()))?,
        FileStore::open(&stores.kpagecount)
            .with_context(|| format!("failed to open {}", stores.kpagecount.display()))?,
        stores.hack,
    );
    let record = decoder.lookup(frame).map_err(page_missing)?;
    if aligned {
        println!("{record:#}");
    } else {
        println!("{record}");
    }
    Ok(())
}

fn page_missing(err: Error) -> anyhow::Error {
    match err {
        Error::Truncated { .. } => anyhow::Error::new(err).context("EOF: page does not exist?"),
        other => other.into(),
    }
}
