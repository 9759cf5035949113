//! aarch64 NEON kernel.
//!
//! NEON is baseline on the supported targets, so there is a single
//! variant. There is no non-temporal store or stable cache-flush
//! primitive here: streaming stores degrade to plain stores and
//! `flush` keeps its no-op default, a known weakening of the
//! side-channel posture relative to x86-64.

use core::arch::aarch64::*;

use super::{BlockType, Salsa20};
use crate::block_mix::{self, MixMode};
use crate::memory::{SalsaBlock, ScryptElement};

macro_rules! v_rotl_u32 {
    ($w:expr, $amt:literal) => {{
        let w = $w;
        vorrq_u32(vshlq_n_u32::<$amt>(w), vshrq_n_u32::<{ 32 - $amt }>(w))
    }};
}

macro_rules! salsa_operation_neon {
    ($add1:expr, $add2:expr, $x:expr, $rot:literal) => {
        veorq_u32($x, v_rotl_u32!(vaddq_u32($add1, $add2), $rot))
    };
}

/// A 64-byte block in four 128-bit NEON registers.
#[derive(Clone, Copy)]
pub struct BlockNeon {
    rows: [uint32x4_t; 4],
}

#[inline(always)]
unsafe fn salsa_iterations_neon(rows: &mut [uint32x4_t; 4], iterations: u32) {
    unsafe {
        for _ in 0..iterations {
            rows[2] = salsa_operation_neon!(rows[0], rows[1], rows[2], 7);
            rows[3] = salsa_operation_neon!(rows[1], rows[2], rows[3], 9);
            rows[0] = salsa_operation_neon!(rows[2], rows[3], rows[0], 13);
            rows[1] = salsa_operation_neon!(rows[3], rows[0], rows[1], 18);

            // exchange rows and columns; row 1 keeps the diagonal
            let to_row2 = vextq_u32::<1>(rows[0], rows[0]);
            rows[0] = vextq_u32::<3>(rows[2], rows[2]);
            rows[2] = to_row2;
            rows[3] = vextq_u32::<2>(rows[3], rows[3]);
        }
    }
}

impl BlockType for BlockNeon {
    #[inline(always)]
    unsafe fn load_aligned(src: *const SalsaBlock) -> Self {
        debug_assert_eq!(src as usize % 64, 0, "unaligned block load");
        unsafe { Self::load_unaligned(src.cast::<u8>()) }
    }

    #[inline(always)]
    unsafe fn load_unaligned(src: *const u8) -> Self {
        let src = src.cast::<u32>();
        unsafe {
            Self {
                rows: [
                    vld1q_u32(src),
                    vld1q_u32(src.add(4)),
                    vld1q_u32(src.add(8)),
                    vld1q_u32(src.add(12)),
                ],
            }
        }
    }

    #[inline(always)]
    unsafe fn store_aligned(self, dst: *mut SalsaBlock) {
        debug_assert_eq!(dst as usize % 64, 0, "unaligned block store");
        unsafe { self.store_unaligned(dst.cast::<u8>()) }
    }

    #[inline(always)]
    unsafe fn store_unaligned(self, dst: *mut u8) {
        let dst = dst.cast::<u32>();
        unsafe {
            vst1q_u32(dst, self.rows[0]);
            vst1q_u32(dst.add(4), self.rows[1]);
            vst1q_u32(dst.add(8), self.rows[2]);
            vst1q_u32(dst.add(12), self.rows[3]);
        }
    }

    #[inline(always)]
    unsafe fn stream_aligned(self, dst: *mut SalsaBlock) {
        // no cache-bypassing store on NEON
        unsafe { self.store_aligned(dst) }
    }

    #[inline(always)]
    fn xor_with(&mut self, other: Self) {
        unsafe {
            self.rows[0] = veorq_u32(self.rows[0], other.rows[0]);
            self.rows[1] = veorq_u32(self.rows[1], other.rows[1]);
            self.rows[2] = veorq_u32(self.rows[2], other.rows[2]);
            self.rows[3] = veorq_u32(self.rows[3], other.rows[3]);
        }
    }

    #[inline(always)]
    fn diagonalize(self) -> Self {
        unsafe {
            let n = self.rows;
            let mut row0 = vdupq_n_u32(0);
            let mut row1 = vdupq_n_u32(0);
            let mut row2 = vdupq_n_u32(0);
            let mut row3 = vdupq_n_u32(0);

            row0 = vsetq_lane_u32::<0>(vgetq_lane_u32::<0>(n[3]), row0);
            row0 = vsetq_lane_u32::<1>(vgetq_lane_u32::<1>(n[0]), row0);
            row0 = vsetq_lane_u32::<2>(vgetq_lane_u32::<2>(n[1]), row0);
            row0 = vsetq_lane_u32::<3>(vgetq_lane_u32::<3>(n[2]), row0);
            row1 = vsetq_lane_u32::<0>(vgetq_lane_u32::<0>(n[0]), row1);
            row1 = vsetq_lane_u32::<1>(vgetq_lane_u32::<1>(n[1]), row1);
            row1 = vsetq_lane_u32::<2>(vgetq_lane_u32::<2>(n[2]), row1);
            row1 = vsetq_lane_u32::<3>(vgetq_lane_u32::<3>(n[3]), row1);
            row2 = vsetq_lane_u32::<0>(vgetq_lane_u32::<0>(n[1]), row2);
            row2 = vsetq_lane_u32::<1>(vgetq_lane_u32::<1>(n[2]), row2);
            row2 = vsetq_lane_u32::<2>(vgetq_lane_u32::<2>(n[3]), row2);
            row2 = vsetq_lane_u32::<3>(vgetq_lane_u32::<3>(n[0]), row2);
            row3 = vsetq_lane_u32::<0>(vgetq_lane_u32::<0>(n[2]), row3);
            row3 = vsetq_lane_u32::<1>(vgetq_lane_u32::<1>(n[3]), row3);
            row3 = vsetq_lane_u32::<2>(vgetq_lane_u32::<2>(n[0]), row3);
            row3 = vsetq_lane_u32::<3>(vgetq_lane_u32::<3>(n[1]), row3);

            Self {
                rows: [row0, row1, row2, row3],
            }
        }
    }

    #[inline(always)]
    fn undiagonalize(self) -> Self {
        unsafe {
            let a = self.rows;
            let mut row0 = vdupq_n_u32(0);
            let mut row1 = vdupq_n_u32(0);
            let mut row2 = vdupq_n_u32(0);
            let mut row3 = vdupq_n_u32(0);

            row0 = vsetq_lane_u32::<0>(vgetq_lane_u32::<0>(a[1]), row0);
            row0 = vsetq_lane_u32::<1>(vgetq_lane_u32::<1>(a[0]), row0);
            row0 = vsetq_lane_u32::<2>(vgetq_lane_u32::<2>(a[3]), row0);
            row0 = vsetq_lane_u32::<3>(vgetq_lane_u32::<3>(a[2]), row0);
            row1 = vsetq_lane_u32::<0>(vgetq_lane_u32::<0>(a[2]), row1);
            row1 = vsetq_lane_u32::<1>(vgetq_lane_u32::<1>(a[1]), row1);
            row1 = vsetq_lane_u32::<2>(vgetq_lane_u32::<2>(a[0]), row1);
            row1 = vsetq_lane_u32::<3>(vgetq_lane_u32::<3>(a[3]), row1);
            row2 = vsetq_lane_u32::<0>(vgetq_lane_u32::<0>(a[3]), row2);
            row2 = vsetq_lane_u32::<1>(vgetq_lane_u32::<1>(a[2]), row2);
            row2 = vsetq_lane_u32::<2>(vgetq_lane_u32::<2>(a[1]), row2);
            row2 = vsetq_lane_u32::<3>(vgetq_lane_u32::<3>(a[0]), row2);
            row3 = vsetq_lane_u32::<0>(vgetq_lane_u32::<0>(a[0]), row3);
            row3 = vsetq_lane_u32::<1>(vgetq_lane_u32::<1>(a[3]), row3);
            row3 = vsetq_lane_u32::<2>(vgetq_lane_u32::<2>(a[2]), row3);
            row3 = vsetq_lane_u32::<3>(vgetq_lane_u32::<3>(a[1]), row3);

            Self {
                rows: [row0, row1, row2, row3],
            }
        }
    }
}

impl Salsa20 for BlockNeon {
    #[inline(always)]
    fn hash(&mut self, iterations: u32) {
        unsafe {
            let input = self.rows;
            salsa_iterations_neon(&mut self.rows, iterations);
            self.rows[0] = vaddq_u32(self.rows[0], input[0]);
            self.rows[1] = vaddq_u32(self.rows[1], input[1]);
            self.rows[2] = vaddq_u32(self.rows[2], input[2]);
            self.rows[3] = vaddq_u32(self.rows[3], input[3]);
        }
    }
}

pub(crate) unsafe fn prepare_data_neon(working: &mut ScryptElement, source: *const u8) {
    unsafe { block_mix::prepare_data::<BlockNeon>(working, source) }
}

pub(crate) unsafe fn copy_and_mix_blocks_neon(
    destination: *mut SalsaBlock,
    working: &mut ScryptElement,
    shuffle: &mut ScryptElement,
) {
    unsafe { block_mix::mix_blocks::<BlockNeon>(working, destination, shuffle, MixMode::Copy) }
}

pub(crate) unsafe fn xor_and_mix_blocks_neon(
    working: &mut ScryptElement,
    source: *const SalsaBlock,
    shuffle: &mut ScryptElement,
) {
    unsafe { block_mix::mix_blocks::<BlockNeon>(working, source.cast_mut(), shuffle, MixMode::Xor) }
}

pub(crate) unsafe fn restore_data_neon(destination: *mut u8, working: &mut ScryptElement) {
    unsafe { block_mix::restore_data::<BlockNeon>(destination, working) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::salsa20::tests::{
        check_diagonalize_round_trip, check_hash_matches_scalar, check_memory_ops,
    };

    #[test]
    fn neon_diagonalize_round_trip() {
        check_diagonalize_round_trip::<BlockNeon>();
    }

    #[test]
    fn neon_memory_ops() {
        check_memory_ops::<BlockNeon>();
    }

    #[test]
    fn neon_hash_matches_scalar() {
        check_hash_matches_scalar::<BlockNeon>(8);
        check_hash_matches_scalar::<BlockNeon>(2);
        check_hash_matches_scalar::<BlockNeon>(0);
    }
}
