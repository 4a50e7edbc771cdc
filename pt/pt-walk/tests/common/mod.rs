#![allow(dead_code)]

use core::cell::Cell;
use pt_addresses::{PhysicalAddress, VirtualAddress};
use pt_store::{MemoryStore, RecordStore, StoreError};
use pt_walk::{LevelCount, TranslationLevel};

pub const P: u64 = 1 << 0;
pub const RW: u64 = 1 << 1;
pub const US: u64 = 1 << 2;
pub const A: u64 = 1 << 5;
pub const D: u64 = 1 << 6;
pub const PS: u64 = 1 << 7;
pub const PROT_NONE: u64 = 1 << 8;
pub const NX: u64 = 1 << 63;
pub const PFN_MASK: u64 = 0x000F_FFFF_FFFF_F000;

/// Intermediate table entry: present, writable, user, accessed, dirty.
pub const TABLE: u64 = P | RW | US | A | D;

/// Builds a synthetic translation hierarchy in a memory image.
pub struct TableBuilder {
    image: MemoryStore,
    levels: LevelCount,
    root: u64,
    next: u64,
}

impl TableBuilder {
    pub fn new(levels: LevelCount) -> Self {
        let mut builder = Self {
            image: MemoryStore::default(),
            levels,
            root: 0,
            next: 0x1000,
        };
        builder.root = builder.alloc();
        builder
    }

    fn alloc(&mut self) -> u64 {
        let page = self.next;
        self.next += 0x1000;
        self.image.write_u64_at(usize::try_from(page + 0xFF8).unwrap(), 0);
        page
    }

    pub fn root(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.root)
    }

    /// Physical address of the table that holds `va`'s entry at `level`,
    /// allocating intermediate tables on the way.
    pub fn table_for(&mut self, va: VirtualAddress, level: TranslationLevel) -> u64 {
        let mut table = self.root;
        for l in self.levels.levels() {
            if l == level {
                return table;
            }
            let slot = table + u64::from(l.index_of(va)) * 8;
            let entry = self.image.read_u64_at(slot).unwrap();
            table = if entry & P == 0 {
                let next = self.alloc();
                self.write(slot, next | TABLE);
                next
            } else {
                entry & PFN_MASK
            };
        }
        panic!("{level:?} is not part of the layout");
    }

    /// Install `raw` as `va`'s entry at `level`.
    pub fn set(&mut self, va: VirtualAddress, level: TranslationLevel, raw: u64) -> &mut Self {
        let table = self.table_for(va, level);
        self.write(table + u64::from(level.index_of(va)) * 8, raw);
        self
    }

    fn write(&mut self, offset: u64, value: u64) {
        self.image.write_u64_at(usize::try_from(offset).unwrap(), value);
    }

    pub fn image(&self) -> &MemoryStore {
        &self.image
    }

    pub fn finish(self) -> (MemoryStore, PhysicalAddress) {
        let root = self.root();
        (self.image, root)
    }
}

/// A store that counts record reads, i.e. entry reads during a walk.
pub struct CountingMapper<M> {
    pub inner: M,
    pub reads: Cell<usize>,
}

impl<M> CountingMapper<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            reads: Cell::new(0),
        }
    }
}

impl<M: RecordStore> RecordStore for CountingMapper<M> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StoreError> {
        self.inner.read_at(offset, buf)
    }

    fn read_u64_at(&self, offset: u64) -> Result<u64, StoreError> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read_u64_at(offset)
    }
}
