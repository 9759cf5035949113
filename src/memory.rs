use core::alloc::Layout;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;

use zeroize::Zeroize;

use crate::error::Error;

#[repr(align(64))]
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy)]
/// Align to 64 bytes (one cache line).
pub struct Align64<T>(pub T);

impl<T> AsRef<T> for Align64<T> {
    fn as_ref(&self) -> &T {
        &self.0
    }
}

impl<T> AsMut<T> for Align64<T> {
    fn as_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> Deref for Align64<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Align64<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// A 64-byte Salsa20 block: sixteen 32-bit little-endian words,
/// viewable as a 4x4 matrix in row-major order.
pub type SalsaBlock = Align64<[u32; 16]>;

/// Size of one [`SalsaBlock`] in bytes.
pub const SALSA_BLOCK_SIZE: usize = size_of::<SalsaBlock>();

/// An owned, cache-line-aligned run of Salsa blocks that is zeroed
/// before its memory is returned to the allocator.
#[derive(Debug)]
struct AlignedBlocks {
    data: NonNull<SalsaBlock>,
    len: usize,
}

impl AlignedBlocks {
    fn allocate(len: usize) -> Result<Self, Error> {
        let size = len
            .checked_mul(SALSA_BLOCK_SIZE)
            .ok_or(Error::InvalidArgument(
                "buffer size exceeds addressable memory",
            ))?;
        let layout = Layout::from_size_align(size, align_of::<SalsaBlock>())
            .map_err(|_| Error::InvalidArgument("buffer size exceeds addressable memory"))?;
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        let data =
            NonNull::new(ptr.cast::<SalsaBlock>()).ok_or(Error::AllocationFailure { size })?;
        Ok(Self { data, len })
    }

    fn as_slice(&self) -> &[SalsaBlock] {
        unsafe { core::slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }

    fn as_mut_slice(&mut self) -> &mut [SalsaBlock] {
        unsafe { core::slice::from_raw_parts_mut(self.data.as_ptr(), self.len) }
    }

    fn wipe(&mut self) {
        let words = unsafe {
            core::slice::from_raw_parts_mut(self.data.as_ptr().cast::<u32>(), self.len * 16)
        };
        words.zeroize();
    }
}

impl Drop for AlignedBlocks {
    fn drop(&mut self) {
        self.wipe();
        // the layout round-tripped through allocate(), so it is valid
        let layout =
            Layout::from_size_align(self.len * SALSA_BLOCK_SIZE, align_of::<SalsaBlock>()).unwrap();
        unsafe { std::alloc::dealloc(self.data.as_ptr().cast::<u8>(), layout) };
    }
}

/// The SMix working buffer: `block_count` (= 2r) Salsa blocks held in
/// the rotated, diagonalized working layout.
///
/// Block 0 holds the nominally-last block (index 2r-1); blocks
/// 1..2r-1 hold nominal blocks 0..2r-2. Within each block the
/// diagonals of the natural 4x4 matrix are stored as rows. Memory is
/// zeroed before release.
#[derive(Debug)]
pub struct ScryptElement {
    blocks: AlignedBlocks,
    integerify_divisor: u32,
}

impl ScryptElement {
    /// Allocates a working buffer of `block_count` blocks carrying the
    /// given Integerify divisor.
    pub fn new(block_count: usize, integerify_divisor: u32) -> Result<Self, Error> {
        if block_count == 0 {
            return Err(Error::InvalidArgument("block_count must be greater than 0"));
        }
        if integerify_divisor == 0 {
            return Err(Error::InvalidArgument(
                "integerify_divisor must be greater than 0",
            ));
        }
        Ok(Self {
            blocks: AlignedBlocks::allocate(block_count)?,
            integerify_divisor,
        })
    }

    /// The number of 64-byte blocks in the element.
    pub fn block_count(&self) -> usize {
        self.blocks.len
    }

    /// The divisor applied by [`Self::integerify`].
    pub fn integerify_divisor(&self) -> u32 {
        self.integerify_divisor
    }

    /// Interprets the designated word of the nominally-last block as a
    /// little-endian integer mod the divisor.
    ///
    /// Relies on the working layout: the nominally-last block sits at
    /// position 0, rearranged so that its natural word 0 (the word
    /// scrypt's Integerify reads) is stored at word index 4, the first
    /// lane of the diagonal row.
    pub fn integerify(&self) -> u32 {
        u32::from_le(self.blocks.as_slice()[0].0[4]) % self.integerify_divisor
    }

    /// The blocks in working layout.
    pub fn as_slice(&self) -> &[SalsaBlock] {
        self.blocks.as_slice()
    }

    /// The blocks in working layout, mutable.
    pub fn as_mut_slice(&mut self) -> &mut [SalsaBlock] {
        self.blocks.as_mut_slice()
    }

    pub(crate) fn as_ptr(&self) -> *const SalsaBlock {
        self.blocks.data.as_ptr()
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut SalsaBlock {
        self.blocks.data.as_ptr()
    }

    /// Zeroes the buffer contents. Also runs on drop.
    pub fn wipe(&mut self) {
        self.blocks.wipe();
    }
}

/// The SMix lookup table V: `element_count` (= N) entries of
/// `blocks_per_element` (= 2r) Salsa blocks each.
///
/// Written once during the table-fill phase, read-only afterwards.
/// Memory is zeroed before release.
pub struct ScryptBlock {
    blocks: AlignedBlocks,
    blocks_per_element: usize,
    element_count: u32,
}

impl ScryptBlock {
    /// Allocates a table of `element_count` entries of
    /// `blocks_per_element` blocks each.
    pub fn new(blocks_per_element: usize, element_count: u32) -> Result<Self, Error> {
        if blocks_per_element == 0 {
            return Err(Error::InvalidArgument(
                "blocks_per_element must be greater than 0",
            ));
        }
        if element_count == 0 {
            return Err(Error::InvalidArgument(
                "element_count must be greater than 0",
            ));
        }
        let len = blocks_per_element
            .checked_mul(element_count as usize)
            .ok_or(Error::InvalidArgument(
                "buffer size exceeds addressable memory",
            ))?;
        Ok(Self {
            blocks: AlignedBlocks::allocate(len)?,
            blocks_per_element,
            element_count,
        })
    }

    /// The number of table entries.
    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    pub(crate) fn element_ptr(&self, i: u32) -> *const SalsaBlock {
        assert!(i < self.element_count, "table index out of range");
        unsafe {
            self.blocks
                .data
                .as_ptr()
                .add(i as usize * self.blocks_per_element)
        }
    }

    pub(crate) fn element_mut_ptr(&mut self, i: u32) -> *mut SalsaBlock {
        assert!(i < self.element_count, "table index out of range");
        unsafe {
            self.blocks
                .data
                .as_ptr()
                .add(i as usize * self.blocks_per_element)
        }
    }

    /// Zeroes the table contents. Also runs on drop.
    pub fn wipe(&mut self) {
        self.blocks.wipe();
    }
}
