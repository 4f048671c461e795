//! Framebuffer storage and CPU access.
//!
//! [`FrameBuffer`] is a statically sized, cache-line aligned byte buffer that
//! can be placed in external memory with a linker section and handed to DMA
//! engines through the `embedded-dma` buffer traits. [`Mmio`] is the
//! [`FrameMemory`] implementation the pipeline uses on target: volatile
//! accesses inside one address window.
//!
//! ```rust,no_run
//! use dsi_pipeline::framebuffer::{FrameBuffer, Mmio};
//! use dsi_pipeline::{compute_buffer_size, PixelFormat};
//!
//! const SIZE: usize = compute_buffer_size(800, 480, PixelFormat::Argb8888);
//!
//! #[link_section = ".sdram"]
//! static mut FB: FrameBuffer<SIZE> = FrameBuffer::new();
//!
//! let fb = unsafe { &mut *core::ptr::addr_of_mut!(FB) };
//! let memory = Mmio::from_buffer(fb).unwrap();
//! ```

use embedded_dma::{ReadBuffer, WriteBuffer};

use crate::error::{Error, Result};
use crate::hal::FrameMemory;

/// Statically sized framebuffer storage.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(C, align(32))]
pub struct FrameBuffer<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> FrameBuffer<N> {
    /// Zeroed framebuffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { data: [0; N] }
    }

    /// Size in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        N
    }

    /// Returns `true` for a zero sized buffer.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Contents.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable contents.
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl<const N: usize> Default for FrameBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl<const N: usize> ReadBuffer for FrameBuffer<N> {
    type Word = u8;

    unsafe fn read_buffer(&self) -> (*const u8, usize) {
        (self.data.as_ptr(), N)
    }
}

unsafe impl<const N: usize> WriteBuffer for FrameBuffer<N> {
    type Word = u8;

    unsafe fn write_buffer(&mut self) -> (*mut u8, usize) {
        (self.data.as_mut_ptr(), N)
    }
}

#[cfg(feature = "defmt")]
impl<const N: usize> defmt::Format for FrameBuffer<N> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "FrameBuffer<{}>", N);
    }
}

/// Volatile access to one window of the physical address space.
///
/// Accesses that do not lie entirely inside the window are dropped (writes)
/// or read as zero (reads).
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mmio {
    base: u32,
    size: usize,
}

impl Mmio {
    /// Window of `size` bytes at `base`.
    ///
    /// # Safety
    ///
    /// The window must be ordinary readable and writable memory, must not be
    /// accessed through any other reference while the `Mmio` lives, and the
    /// target must address memory with 32-bit pointers.
    #[must_use]
    pub const unsafe fn new(base: u32, size: usize) -> Self {
        Self { base, size }
    }

    /// Window covering a framebuffer with `'static` exclusive ownership.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] if the buffer does not lie in the 32-bit
    /// address space.
    pub fn from_buffer<B>(buffer: &'static mut B) -> Result<Self>
    where
        B: WriteBuffer<Word = u8>,
    {
        // SAFETY: the buffer is borrowed exclusively for 'static, so the
        // returned pointer stays valid and unaliased.
        let (ptr, len) = unsafe { buffer.write_buffer() };
        let base = u32::try_from(ptr as usize).map_err(|_| Error::WrongParam)?;
        if base.checked_add(u32::try_from(len).map_err(|_| Error::WrongParam)?).is_none() {
            return Err(Error::WrongParam);
        }
        Ok(Self { base, size: len })
    }

    /// First address of the window.
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Size of the window in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    fn offset(&self, address: u32, len: usize) -> Option<usize> {
        let offset = address.checked_sub(self.base)? as usize;
        (offset.checked_add(len)? <= self.size).then_some(offset)
    }

    fn ptr(&self, address: u32, len: usize) -> Option<*mut u8> {
        self.offset(address, len)
            .map(|offset| (self.base as usize + offset) as *mut u8)
    }
}

impl FrameMemory for Mmio {
    fn read_u16(&self, address: u32) -> u16 {
        match self.ptr(address, 2) {
            // SAFETY: inside the window, which `new` requires to be valid
            Some(p) if p as usize % 2 == 0 => unsafe { core::ptr::read_volatile(p.cast::<u16>()) },
            Some(p) => unsafe { core::ptr::read_unaligned(p.cast::<u16>()) },
            None => 0,
        }
    }

    fn read_u32(&self, address: u32) -> u32 {
        match self.ptr(address, 4) {
            // SAFETY: as above
            Some(p) if p as usize % 4 == 0 => unsafe { core::ptr::read_volatile(p.cast::<u32>()) },
            Some(p) => unsafe { core::ptr::read_unaligned(p.cast::<u32>()) },
            None => 0,
        }
    }

    fn write_u16(&mut self, address: u32, value: u16) {
        match self.ptr(address, 2) {
            // SAFETY: as above
            Some(p) if p as usize % 2 == 0 => unsafe {
                core::ptr::write_volatile(p.cast::<u16>(), value);
            }
            Some(p) => unsafe { core::ptr::write_unaligned(p.cast::<u16>(), value) },
            None => {}
        }
    }

    fn write_u32(&mut self, address: u32, value: u32) {
        match self.ptr(address, 4) {
            // SAFETY: as above
            Some(p) if p as usize % 4 == 0 => unsafe {
                core::ptr::write_volatile(p.cast::<u32>(), value);
            }
            Some(p) => unsafe { core::ptr::write_unaligned(p.cast::<u32>(), value) },
            None => {}
        }
    }

    fn region_fits(&self, address: u32, len: usize) -> bool {
        self.offset(address, len).is_some()
    }
}
