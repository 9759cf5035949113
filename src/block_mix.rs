//! The scrypt BlockMix transformation and the layout transforms that
//! bracket it.
//!
//! All three are written once, generically over a block view, and
//! monomorphized per instruction set by the dispatch entry points.
//!
//! The working layout pays for itself here: because Prepare rotates
//! the nominally-last block to position 0, every BlockMix starts from
//! block 0 and Integerify reads block 0, and because the loop emits
//! even-numbered outputs into the left half and odd-numbered outputs
//! into the right half, scrypt's output shuffle costs nothing extra.

use crate::memory::{SalsaBlock, ScryptElement};
use crate::salsa20::{BlockScalar, BlockType, Salsa20};

/// How [`mix_blocks`] treats its `other` buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MixMode {
    /// Plain BlockMix; `other` is unused.
    None,
    /// Streams the pre-mix working content into `other` (table fill).
    Copy,
    /// XORs `other` into the working content block-by-block before
    /// mixing, prefetching ahead and flushing consumed lines (table
    /// lookup).
    Xor,
}

/// Rearranges `source` (128r caller bytes) into the working layout:
/// each 64-byte block is diagonalized, blocks 0..2r-2 land at
/// positions 1..2r-1, and the nominally-last block lands at position 0.
#[inline(always)]
pub(crate) unsafe fn prepare_data<B: BlockType>(working: &mut ScryptElement, source: *const u8) {
    let block_count = working.block_count();
    debug_assert!(block_count > 0);
    debug_assert!(!source.is_null());

    let destination = working.as_mut_ptr();
    unsafe {
        for i in 0..block_count - 1 {
            B::load_unaligned(source.add(i * 64))
                .diagonalize()
                .store_aligned(destination.add(i + 1));
        }
        B::load_unaligned(source.add((block_count - 1) * 64))
            .diagonalize()
            .store_aligned(destination);
    }
}

/// The inverse of [`prepare_data`]: returns the working buffer to the
/// caller's natural byte order in `destination`.
#[inline(always)]
pub(crate) unsafe fn restore_data<B: BlockType>(destination: *mut u8, working: &ScryptElement) {
    let block_count = working.block_count();
    debug_assert!(block_count > 0);
    debug_assert!(!destination.is_null());

    let source = working.as_ptr();
    unsafe {
        // hold the rotated front block until its slot at the end is free
        let last = B::load_aligned(source);
        for i in 1..block_count {
            B::load_aligned(source.add(i))
                .undiagonalize()
                .store_unaligned(destination.add((i - 1) * 64));
        }
        last.undiagonalize()
            .store_unaligned(destination.add((block_count - 1) * 64));
    }
}

/// One scrypt BlockMix round over the 2r working blocks.
///
/// Results are accumulated in `shuffle` and the two buffer identities
/// are swapped at the end, so `working` always ends up holding the
/// fresh output and `shuffle` the stale input; nothing is copied back.
#[inline(always)]
pub(crate) unsafe fn mix_blocks<B: Salsa20>(
    working: &mut ScryptElement,
    other: *mut SalsaBlock,
    shuffle: &mut ScryptElement,
    mode: MixMode,
) {
    let block_count = working.block_count();
    debug_assert!(block_count > 0 && block_count % 2 == 0);
    debug_assert_eq!(block_count, shuffle.block_count());
    debug_assert!(mode == MixMode::None || !other.is_null());

    let half_block_count = block_count / 2;
    let current_position = working.as_ptr();
    let output = shuffle.as_mut_ptr();

    unsafe {
        // warm the front half of the table entry before touching it
        if mode == MixMode::Xor {
            for i in 0..half_block_count {
                B::prefetch_non_temporal(other.add(i));
            }
        }

        let mut last = B::load_aligned(current_position);
        match mode {
            MixMode::None => {}
            MixMode::Copy => last.stream_aligned(other),
            MixMode::Xor => {
                let entry = B::load_aligned(other);
                last.xor_with(entry);
                B::flush(other);
            }
        }

        let mut previous = last;
        for i in 0..block_count - 1 {
            let mut current = B::load_aligned(current_position.add(i + 1));

            match mode {
                MixMode::None => {}
                MixMode::Copy => current.stream_aligned(other.add(i + 1)),
                MixMode::Xor => {
                    if i < half_block_count {
                        B::prefetch_non_temporal(other.add(half_block_count + i));
                    }
                    let entry = B::load_aligned(other.add(i + 1));
                    current.xor_with(entry);
                    B::flush(other.add(i + 1));
                }
            }

            // evens of the nominal order go to the left half, odds to
            // the right half
            let destination = output.add(i / 2 + 1 + if i % 2 == 0 { 0 } else { half_block_count });

            current.xor_with(previous);
            current.hash(8);
            current.store_aligned(destination);
            previous = current;
        }

        last.xor_with(previous);
        last.hash(8);
        last.store_aligned(output);
    }

    core::mem::swap(working, shuffle);
}

/// Orders streaming stores before subsequent ordinary reads; emitted
/// between the table-fill and table-lookup phases.
#[inline(always)]
pub(crate) fn store_fence() {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        core::arch::x86_64::_mm_sfence()
    };
}

pub(crate) unsafe fn prepare_data_portable(working: &mut ScryptElement, source: *const u8) {
    unsafe { prepare_data::<BlockScalar>(working, source) }
}

pub(crate) unsafe fn copy_and_mix_blocks_portable(
    destination: *mut SalsaBlock,
    working: &mut ScryptElement,
    shuffle: &mut ScryptElement,
) {
    unsafe { mix_blocks::<BlockScalar>(working, destination, shuffle, MixMode::Copy) }
}

pub(crate) unsafe fn xor_and_mix_blocks_portable(
    working: &mut ScryptElement,
    source: *const SalsaBlock,
    shuffle: &mut ScryptElement,
) {
    unsafe { mix_blocks::<BlockScalar>(working, source.cast_mut(), shuffle, MixMode::Xor) }
}

pub(crate) unsafe fn restore_data_portable(destination: *mut u8, working: &mut ScryptElement) {
    unsafe { restore_data::<BlockScalar>(destination, working) }
}
