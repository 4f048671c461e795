use std::cell::RefCell;
use std::rc::Rc;
use std::vec;
use std::vec::Vec;

use crate::hal::FrameMemory;

/// Byte addressed memory window, little endian.
///
/// Accesses outside the window read as zero and writes to it are dropped.
#[derive(Debug, Clone)]
pub struct SimMemory {
    base: u32,
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl SimMemory {
    /// Zeroed window of `size` bytes at `base`.
    #[must_use]
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            bytes: Rc::new(RefCell::new(vec![0; size])),
        }
    }

    /// First address of the window.
    #[must_use]
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Size of the window in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.borrow().len()
    }

    fn offset(&self, address: u32, len: usize) -> Option<usize> {
        let offset = address.checked_sub(self.base)? as usize;
        (offset.checked_add(len)? <= self.size()).then_some(offset)
    }

    /// Copies `len` bytes starting at `address`.
    #[must_use]
    pub fn load(&self, address: u32, len: usize) -> Vec<u8> {
        match self.offset(address, len) {
            Some(offset) => self.bytes.borrow()[offset..offset + len].to_vec(),
            None => vec![0; len],
        }
    }

    /// Writes `data` starting at `address`.
    pub fn store(&self, address: u32, data: &[u8]) {
        if let Some(offset) = self.offset(address, data.len()) {
            self.bytes.borrow_mut()[offset..offset + data.len()].copy_from_slice(data);
        }
    }
}

impl FrameMemory for SimMemory {
    fn read_u16(&self, address: u32) -> u16 {
        let b = self.load(address, 2);
        u16::from_le_bytes([b[0], b[1]])
    }

    fn read_u32(&self, address: u32) -> u32 {
        let b = self.load(address, 4);
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    fn write_u16(&mut self, address: u32, value: u16) {
        self.store(address, &value.to_le_bytes());
    }

    fn write_u32(&mut self, address: u32, value: u32) {
        self.store(address, &value.to_le_bytes());
    }

    fn region_fits(&self, address: u32, len: usize) -> bool {
        self.offset(address, len).is_some()
    }
}
