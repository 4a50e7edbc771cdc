mod common;

use common::*;
use proptest::prelude::*;
use pt_addresses::{FrameNumber, PageSize, PhysicalAddress, VirtualAddress};
use pt_registers::{ControlRegisters, UnsupportedMode};
use pt_store::MemoryStore;
use pt_walk::*;

fn engine(levels: LevelCount) -> WalkEngine {
    WalkEngine::new(match levels {
        LevelCount::Four => ArchProfile::X86_64_4LEVEL,
        LevelCount::Five => ArchProfile::X86_64_5LEVEL,
    })
}

fn walk(builder: &TableBuilder, levels: LevelCount, va: VirtualAddress) -> Walk {
    engine(levels)
        .walk(builder.image(), builder.root(), va)
        .unwrap()
}

#[test]
fn leaf_page_resolves_with_page_offset() {
    let va = VirtualAddress::new(0x0000_5555_1234_5123);
    let mut tables = TableBuilder::new(LevelCount::Four);
    tables.set(va, TranslationLevel::L4, 0xABCD_E000 | TABLE | NX);

    let walk = walk(&tables, LevelCount::Four, va);
    assert_eq!(walk.trace.len(), 4);
    let WalkResult::Resolved {
        physical_address,
        frame,
        flags,
    } = walk.result
    else {
        panic!("expected a resolved page, got {:?}", walk.result);
    };
    assert_eq!(physical_address, PhysicalAddress::new(0xABCD_E123));
    assert_eq!(frame, FrameNumber::new(0xABCDE));
    assert!(flags.contains(EntryFlags::PRESENT | EntryFlags::DIRTY | EntryFlags::NO_EXECUTE));
    assert_eq!(
        Resolver::resolve(&walk.result),
        Resolution::Physical {
            address: PhysicalAddress::new(0xABCD_E123),
            frame: FrameNumber::new(0xABCDE),
            size: PageSize::Size4K,
        }
    );
}

#[test]
fn one_gib_page_keeps_the_full_offset() {
    let va = VirtualAddress::new(0x4012_3456);
    let mut tables = TableBuilder::new(LevelCount::Four);
    tables.set(va, TranslationLevel::L2, 0x4000_0000 | PS | TABLE);

    let walk = walk(&tables, LevelCount::Four, va);
    assert_eq!(walk.trace.len(), 2, "walk must stop at the huge pud");
    assert!(matches!(
        walk.result,
        WalkResult::Huge {
            level: TranslationLevel::L2,
            size: PageSize::Size1G,
            ..
        }
    ));
    assert_eq!(
        walk.result.physical_address(),
        Some(PhysicalAddress::new(0x4012_3456))
    );
}

#[test]
fn two_mib_page_in_five_level_layout() {
    let va = VirtualAddress::new(0x00FF_0000_0065_4321);
    let mut tables = TableBuilder::new(LevelCount::Five);
    tables.set(va, TranslationLevel::L3, 0x0120_0000 | PS | TABLE);

    let walk = walk(&tables, LevelCount::Five, va);
    assert_eq!(walk.trace.len(), 4);
    assert_eq!(walk.trace.get(TranslationLevel::L0).map(|s| s.name), Some("pgd"));
    assert_eq!(walk.trace.get(TranslationLevel::L1).map(|s| s.name), Some("p4d"));
    assert_eq!(
        walk.result.physical_address(),
        Some(PhysicalAddress::new(0x0120_0000 | 0x05_4321))
    );
}

#[test]
fn swapped_leaf_decodes_type_and_offset() {
    let va = VirtualAddress::new(0x7FFF_F000_0000);
    let codec = EntryCodec::new(ArchProfile::X86_64_4LEVEL);
    let mut tables = TableBuilder::new(LevelCount::Four);
    tables.set(
        va,
        TranslationLevel::L4,
        codec.encode_swap(0x3, 0x1F4, EntryFlags::empty()).as_u64(),
    );

    let walk = walk(&tables, LevelCount::Four, va);
    assert_eq!(
        walk.result,
        WalkResult::Swapped {
            level: TranslationLevel::L4,
            swap_type: 3,
            swap_offset: 500,
            flags: EntryFlags::SWAP,
        }
    );
    let Resolution::Swap(locator) = Resolver::resolve(&walk.result) else {
        panic!("expected a swap locator");
    };
    assert_eq!((locator.swap_type, locator.offset), (3, 500));
}

#[test]
fn swapped_leaf_from_stored_bits() {
    let va = VirtualAddress::new(0x7FFF_F000_0000);
    let offset_field = ((1u64 << 50) - 1) << 9;
    let stored = (0x3 << 59) | (!(0x1F4 << 9) & offset_field);
    let mut tables = TableBuilder::new(LevelCount::Four);
    tables.set(va, TranslationLevel::L4, stored);

    let walk = walk(&tables, LevelCount::Four, va);
    assert!(matches!(
        walk.result,
        WalkResult::Swapped {
            swap_type: 3,
            swap_offset: 500,
            ..
        }
    ));
}

#[test]
fn migration_entry_at_the_pmd() {
    let va = VirtualAddress::new(0x6000_0000);
    let codec = EntryCodec::new(ArchProfile::X86_64_4LEVEL);
    let mut tables = TableBuilder::new(LevelCount::Four);
    tables.set(
        va,
        TranslationLevel::L3,
        codec.encode_swap(0x1E, 0x1234, EntryFlags::EXCLUSIVE).as_u64(),
    );

    let walk = walk(&tables, LevelCount::Four, va);
    assert!(matches!(
        walk.result,
        WalkResult::Swapped {
            level: TranslationLevel::L3,
            swap_type: 0x1E,
            swap_offset: 0x1234,
            ..
        }
    ));
}

#[test]
fn swap_pattern_above_the_pmd_is_just_absent() {
    let va = VirtualAddress::new(0x8000_0000);
    let codec = EntryCodec::new(ArchProfile::X86_64_4LEVEL);
    let mut tables = TableBuilder::new(LevelCount::Four);
    tables.set(
        va,
        TranslationLevel::L2,
        codec.encode_swap(1, 7, EntryFlags::empty()).as_u64(),
    );

    let walk = walk(&tables, LevelCount::Four, va);
    assert_eq!(
        walk.result,
        WalkResult::NotPresent {
            level: TranslationLevel::L2
        }
    );
}

#[test]
fn none_at_the_top_reads_nothing_deeper() {
    let tables = TableBuilder::new(LevelCount::Five);
    let (image, root) = tables.finish();
    let mapper = CountingMapper::new(image);

    let walk = engine(LevelCount::Five)
        .walk(&mapper, root, VirtualAddress::new(0x0012_3456_7000))
        .unwrap();
    assert_eq!(
        walk.result,
        WalkResult::NotPresent {
            level: TranslationLevel::L0
        }
    );
    assert_eq!(mapper.reads.get(), 1);
    assert_eq!(walk.to_string(), "pgd: idx 000 val 0000000000000000 none\npgd is none");
}

#[test]
fn accessed_dirty_leftovers_still_count_as_none() {
    let va = VirtualAddress::new(0x1000);
    let mut tables = TableBuilder::new(LevelCount::Four);
    tables.set(va, TranslationLevel::L4, A | D);

    let walk = walk(&tables, LevelCount::Four, va);
    assert_eq!(
        walk.result,
        WalkResult::NotPresent {
            level: TranslationLevel::L4
        }
    );
    assert!(walk.trace.last().unwrap().entry.is_none());
}

#[test]
fn non_canonical_address_is_rejected_before_reading() {
    let tables = TableBuilder::new(LevelCount::Four);
    let (image, root) = tables.finish();
    let mapper = CountingMapper::new(image);

    let err = engine(LevelCount::Four)
        .walk(&mapper, root, VirtualAddress::new(0x0000_8000_0000_0000))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidAddress { width: 48, .. }));
    assert_eq!(mapper.reads.get(), 0);

    // The same address is fine with 57-bit addressing.
    let mapper = CountingMapper::new(TableBuilder::new(LevelCount::Five).finish().0);
    assert!(engine(LevelCount::Five)
        .walk(&mapper, PhysicalAddress::new(0x1000), VirtualAddress::new(0x0000_8000_0000_0000))
        .is_ok());
}

#[test]
fn prot_none_leaf_is_uninverted_before_decoding() {
    let va = VirtualAddress::new(0x7F00_0000_0123);
    let stored = (!0xABCD_E000_u64 & PFN_MASK) | PROT_NONE | RW | US | A | D;
    let mut tables = TableBuilder::new(LevelCount::Four);
    tables.set(va, TranslationLevel::L4, stored);

    let walk = walk(&tables, LevelCount::Four, va);
    let leaf = walk.trace.last().unwrap();
    assert!(leaf.inverted);
    assert_eq!(leaf.raw.as_u64(), stored);
    assert!(leaf.entry.present());
    assert!(!leaf.entry.hw_present());
    assert!(leaf.entry.prot_none());
    assert_eq!(
        walk.result.physical_address(),
        Some(PhysicalAddress::new(0xABCD_E123))
    );
    assert!(leaf.to_string().contains(" PROT_NONE"));
    assert!(!leaf.to_string().contains(" GLOBAL"));
}

#[test]
fn prot_none_huge_pmd_is_uninverted_with_the_huge_mask() {
    let va = VirtualAddress::new(0x4060_1234);
    let stored = (!0x4060_0000_u64 & 0x000F_FFFF_FFE0_0000) | PROT_NONE | PS | RW | US | A;
    let mut tables = TableBuilder::new(LevelCount::Four);
    tables.set(va, TranslationLevel::L3, stored);

    let walk = walk(&tables, LevelCount::Four, va);
    assert!(walk.trace.last().unwrap().inverted);
    assert_eq!(
        walk.result.physical_address(),
        Some(PhysicalAddress::new(0x4060_1234))
    );
}

/// `PROT_NONE` is only honoured at the pmd and the leaf. A pud carrying it
/// without the hardware present bit is treated as absent rather than
/// un-inverted into a 1 GiB mapping.
#[test]
fn prot_none_on_a_pud_is_not_honoured() {
    let va = VirtualAddress::new(0x4012_3456);
    let stored = (!0x4000_0000_u64 & 0x000F_FFFF_C000_0000) | PROT_NONE | PS | RW | US | A;
    let mut tables = TableBuilder::new(LevelCount::Four);
    tables.set(va, TranslationLevel::L2, stored);

    let walk = walk(&tables, LevelCount::Four, va);
    assert_eq!(
        walk.result,
        WalkResult::NotPresent {
            level: TranslationLevel::L2
        }
    );
    assert!(!walk.trace.last().unwrap().inverted);
}

#[test]
fn reserved_bits_in_a_huge_entry_stop_the_walk() {
    let va = VirtualAddress::new(0x4000_0000);
    let mut tables = TableBuilder::new(LevelCount::Four);
    tables.set(va, TranslationLevel::L2, 0x4000_2000 | PS | TABLE);

    let walk = walk(&tables, LevelCount::Four, va);
    assert_eq!(walk.result.level(), TranslationLevel::L2);
    assert!(walk.to_string().ends_with("pud is bad"));
}

#[test]
fn report_lines_per_level() {
    let va = VirtualAddress::new(0x0000_7FFF_8010_2345);
    let mut tables = TableBuilder::new(LevelCount::Four);
    tables.set(va, TranslationLevel::L4, 0xABCD_E000 | TABLE | NX);

    let text = walk(&tables, LevelCount::Four, va).to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("pgd: idx 0ff val "));
    assert!(lines[1].starts_with("pud: idx 1fe val "));
    assert!(lines[2].starts_with("pmd: idx 000 val "));
    assert_eq!(
        lines[3],
        "pte: idx 102 val 80000000abcde067 PRESENT RW USER ACCESSED DIRTY NX"
    );
    assert_eq!(lines[4], "paddr: 0xabcde345, page: 0xabcde000, PFN: 0xabcde");
}

#[test]
fn truncated_image_aborts_the_walk() {
    let va = VirtualAddress::new(0x1000);
    let mut tables = TableBuilder::new(LevelCount::Four);
    // Point the pud at a table far outside the image.
    tables.set(va, TranslationLevel::L2, 0x7_0000_0000 | TABLE);

    let err = engine(LevelCount::Four)
        .walk(tables.image(), tables.root(), va)
        .unwrap_err();
    assert!(matches!(err, Error::Truncated { read: 0, .. }));
}

#[test]
fn pagemap_and_walk_agree_on_the_leaf() {
    let va = VirtualAddress::new(0x5555_0000_0abc);
    let mut tables = TableBuilder::new(LevelCount::Four);
    tables.set(va, TranslationLevel::L4, 0x0002_2000 | TABLE);
    let walked = walk(&tables, LevelCount::Four, va).result;

    let codec = EntryCodec::new(ArchProfile::X86_64_4LEVEL);
    let from_pagemap = codec
        .decode_pagemap(PagemapEntry::from_bits((1 << 63) | 0x22), va)
        .unwrap();
    assert_eq!(walked.physical_address(), from_pagemap.physical_address());
    assert_eq!(Resolver::resolve(&walked), Resolver::resolve(&from_pagemap));
}

#[test]
fn provider_balances_pins_on_every_path() {
    let va = VirtualAddress::new(0x4012_3456);
    let mut tables = TableBuilder::new(LevelCount::Four);
    tables.set(va, TranslationLevel::L2, 0x4000_0000 | PS | TABLE);
    let (image, root) = tables.finish();

    let pid = Pid::new(42).unwrap();
    let source = SnapshotSource::new(image)
        .with_current(root)
        .with_process(pid, Some(root), None);
    let provider = AddressSpaceProvider::new(source, ArchProfile::X86_64_4LEVEL);

    // Success with a short-circuit at the pud.
    {
        let space = provider.open(AddressSpaceSelector::Process(pid)).unwrap();
        assert_eq!(provider.source().outstanding_pins(), 1);
        assert!(matches!(space.walk(va).unwrap().result, WalkResult::Huge { .. }));
    }
    assert_eq!(provider.source().outstanding_pins(), 0);

    // Error inside the walk.
    {
        let space = provider.open(AddressSpaceSelector::Current).unwrap();
        assert!(space.walk(VirtualAddress::new(u64::MAX >> 1)).is_err());
    }
    assert_eq!(provider.source().outstanding_pins(), 0);
    assert_eq!(provider.source().pin_count(), 2);
    assert_eq!(provider.source().unpin_count(), 2);
}

#[test]
fn borrowed_address_space_is_the_fallback() {
    let image = MemoryStore::zeroed(0x2000);
    let root = PhysicalAddress::new(0x1000);
    let kthread = Pid::new(2).unwrap();
    let gone = Pid::new(3).unwrap();
    let source = SnapshotSource::new(image)
        .with_process(kthread, None, Some(root))
        .with_process(gone, None, None);
    let provider = AddressSpaceProvider::new(source, ArchProfile::X86_64_4LEVEL);

    {
        let space = provider.open(AddressSpaceSelector::Process(kthread)).unwrap();
        assert_eq!(
            space.origin(),
            Origin::Process {
                pid: kthread,
                ownership: Ownership::Borrowed
            }
        );
        assert_eq!(space.root(), root);
    }

    let err = provider.open(AddressSpaceSelector::Process(gone)).unwrap_err();
    assert!(matches!(
        err,
        Error::NoSuchAddressSpace(AddressSpaceSelector::Process(p)) if p == gone
    ));
    let unknown = Pid::new(99).unwrap();
    assert!(provider.open(AddressSpaceSelector::Process(unknown)).is_err());

    assert_eq!(provider.source().pin_count(), 1);
    assert_eq!(provider.source().outstanding_pins(), 0);
}

#[test]
fn kernel_space_needs_no_pin() {
    let source = SnapshotSource::new(MemoryStore::zeroed(0x2000)).with_kernel(PhysicalAddress::new(0x1000));
    let provider = AddressSpaceProvider::new(source, ArchProfile::X86_64_4LEVEL);
    {
        let space = provider.open(AddressSpaceSelector::Kernel).unwrap();
        assert_eq!(space.origin(), Origin::Kernel);
        let walk = space.walk(VirtualAddress::new(0xFFFF_8880_0000_0000)).unwrap();
        assert_eq!(walk.result.level(), TranslationLevel::L1);
    }
    assert_eq!(provider.source().pin_count(), 0);
    assert!(matches!(
        provider.open(AddressSpaceSelector::Current),
        Err(Error::NoSuchAddressSpace(AddressSpaceSelector::Current))
    ));
}

#[test]
fn layout_follows_control_registers() {
    const PG: u64 = 1 << 31;
    const PAE: u64 = 1 << 5;
    const LA57: u64 = 1 << 12;
    const LONG: u64 = (1 << 8) | (1 << 10) | (1 << 11);

    let source = SnapshotSource::new(MemoryStore::zeroed(0x1000));
    let regs = ControlRegisters::from_raw(PG, 0x1000, PAE | LA57, LONG);
    let provider = AddressSpaceProvider::from_registers(source, &regs).unwrap();
    assert_eq!(provider.profile().levels, LevelCount::Five);

    let source = SnapshotSource::new(MemoryStore::zeroed(0x1000));
    let real_mode = ControlRegisters::from_raw(0, 0, 0, 0);
    assert!(matches!(
        AddressSpaceProvider::from_registers(source, &real_mode),
        Err(Error::UnsupportedMode(UnsupportedMode::NotLongMode))
    ));
}

proptest! {
    #[test]
    fn terminal_results_respect_level_rules(raw in any::<u64>(), depth in 1usize..5) {
        let level = TranslationLevel::ALL[depth];
        let va = VirtualAddress::new(0x0000_1234_5678_9ABC);
        let mut tables = TableBuilder::new(LevelCount::Four);
        tables.set(va, TranslationLevel::L4, 0x5000 | TABLE);
        tables.set(va, level, raw);

        let Ok(walk) = engine(LevelCount::Four).walk(tables.image(), tables.root(), va) else {
            return Ok(());
        };
        let last = walk.trace.last().unwrap();
        prop_assert_eq!(last.level, walk.result.level());
        match walk.result {
            WalkResult::Huge { level, .. } => {
                prop_assert!(level == TranslationLevel::L2 || level == TranslationLevel::L3);
            }
            WalkResult::Swapped { .. } => {
                prop_assert!(!last.entry.present());
                prop_assert!(!last.entry.is_none());
            }
            WalkResult::Resolved { .. } => prop_assert!(last.level.is_leaf()),
            WalkResult::NotPresent { .. } => {}
        }
    }
}
