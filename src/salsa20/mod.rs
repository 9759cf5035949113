//! Salsa20/8 kernels over a 64-byte block held entirely in registers.
//!
//! All kernels operate on the diagonal layout: the block's 4x4 matrix
//! of 32-bit words is rearranged so that the diagonal additions of
//! Salsa20 become row-aligned vector operations:
//!
//! ```text
//! 0   1   2   3          12  1   6   11
//! 4   5   6   7   ---->  0   5   10  15
//! 8   9   10  11  ---->  4   9   14  3
//! 12  13  14  15         8   13  2   7
//! ```
//!
//! A round then consists of four whole-row operations plus a lane
//! rotation that exchanges the roles of rows and columns; two
//! consecutive rounds return the lanes to their starting positions, so
//! any even round count leaves the layout stable.

#[cfg(target_arch = "aarch64")]
pub mod aarch64;
#[cfg(target_arch = "x86_64")]
pub mod x86_64;

use crate::memory::SalsaBlock;

/// The diagonal-layout permutation: `arranged[i] = natural[DIAGONALIZE[i]]`.
pub(crate) const DIAGONALIZE: [usize; 16] = [12, 1, 6, 11, 0, 5, 10, 15, 4, 9, 14, 3, 8, 13, 2, 7];

/// The inverse permutation: `natural[i] = arranged[UNDIAGONALIZE[i]]`.
pub(crate) const UNDIAGONALIZE: [usize; 16] =
    [4, 1, 14, 11, 8, 5, 2, 15, 12, 9, 6, 3, 0, 13, 10, 7];

/// A 64-byte block held in registers, with the memory-movement
/// capability set the mixing loops are built from.
///
/// Aligned operations require 64-byte-aligned addresses and are
/// undefined otherwise. `prefetch_non_temporal` and `flush` default to
/// no-ops for architectures without the primitive, at a known cost in
/// side-channel posture there.
pub trait BlockType: Copy {
    /// Loads a block from a 64-byte-aligned address.
    unsafe fn load_aligned(src: *const SalsaBlock) -> Self;
    /// Loads a block from an arbitrarily aligned address.
    unsafe fn load_unaligned(src: *const u8) -> Self;
    /// Stores the block to a 64-byte-aligned address.
    unsafe fn store_aligned(self, dst: *mut SalsaBlock);
    /// Stores the block to an arbitrarily aligned address.
    unsafe fn store_unaligned(self, dst: *mut u8);
    /// Stores the block with a non-temporal hint, bypassing the cache
    /// where the architecture supports it.
    unsafe fn stream_aligned(self, dst: *mut SalsaBlock);
    /// XORs another block into this one.
    fn xor_with(&mut self, other: Self);
    /// Rearranges a natural-layout block into diagonal layout.
    fn diagonalize(self) -> Self;
    /// Rearranges a diagonal-layout block back into natural layout.
    fn undiagonalize(self) -> Self;
    /// Hints the cache to fetch the line into its least-recently-used
    /// slot.
    #[inline(always)]
    unsafe fn prefetch_non_temporal(_addr: *const SalsaBlock) {}
    /// Evicts the cache line holding `addr`.
    #[inline(always)]
    unsafe fn flush(_addr: *const SalsaBlock) {}
}

/// Block types that can run the Salsa20 inner hash in place.
pub trait Salsa20: BlockType {
    /// Runs `iterations` Salsa20 rounds on the diagonal-layout block
    /// and adds the input block element-wise to the result.
    ///
    /// scrypt uses 8 rounds. The count must be even for the lane
    /// rotation to return to its starting position.
    fn hash(&mut self, iterations: u32);
}

/// Portable scalar kernel.
///
/// The baseline for architectures without a vector unit and the
/// reference the SIMD kernels are tested against.
#[derive(Clone, Copy)]
pub struct BlockScalar {
    rows: [[u32; 4]; 4],
}

impl BlockScalar {
    #[inline(always)]
    fn from_words(words: [u32; 16]) -> Self {
        let mut rows = [[0u32; 4]; 4];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, lane) in row.iter_mut().enumerate() {
                *lane = u32::from_le(words[i * 4 + j]);
            }
        }
        Self { rows }
    }

    #[inline(always)]
    fn to_words(self) -> [u32; 16] {
        let mut words = [0u32; 16];
        for (i, row) in self.rows.iter().enumerate() {
            for (j, lane) in row.iter().enumerate() {
                words[i * 4 + j] = lane.to_le();
            }
        }
        words
    }

    #[inline(always)]
    fn permute(self, table: &[usize; 16]) -> Self {
        let mut flat = [0u32; 16];
        for (i, lane) in flat.iter_mut().enumerate() {
            *lane = self.rows[table[i] / 4][table[i] % 4];
        }
        let mut rows = [[0u32; 4]; 4];
        for (i, row) in rows.iter_mut().enumerate() {
            row.copy_from_slice(&flat[i * 4..][..4]);
        }
        Self { rows }
    }
}

#[inline(always)]
fn salsa_operation<const ROT: u32>(add1: [u32; 4], add2: [u32; 4], x: [u32; 4]) -> [u32; 4] {
    core::array::from_fn(|i| x[i] ^ add1[i].wrapping_add(add2[i]).rotate_left(ROT))
}

#[inline(always)]
fn rotate_lanes_left<const N: usize>(row: [u32; 4]) -> [u32; 4] {
    core::array::from_fn(|i| row[(i + N) % 4])
}

#[inline(always)]
pub(crate) fn salsa_iterations_scalar(rows: &mut [[u32; 4]; 4], iterations: u32) {
    for _ in 0..iterations {
        rows[2] = salsa_operation::<7>(rows[0], rows[1], rows[2]);
        rows[3] = salsa_operation::<9>(rows[1], rows[2], rows[3]);
        rows[0] = salsa_operation::<13>(rows[2], rows[3], rows[0]);
        rows[1] = salsa_operation::<18>(rows[3], rows[0], rows[1]);

        // exchange rows and columns: row 1 keeps the diagonal in place
        let to_row2 = rotate_lanes_left::<1>(rows[0]);
        rows[0] = rotate_lanes_left::<3>(rows[2]);
        rows[2] = to_row2;
        rows[3] = rotate_lanes_left::<2>(rows[3]);
    }
}

impl BlockType for BlockScalar {
    #[inline(always)]
    unsafe fn load_aligned(src: *const SalsaBlock) -> Self {
        debug_assert_eq!(src as usize % 64, 0, "unaligned block load");
        Self::from_words(unsafe { src.read() }.0)
    }

    #[inline(always)]
    unsafe fn load_unaligned(src: *const u8) -> Self {
        Self::from_words(unsafe { src.cast::<[u32; 16]>().read_unaligned() })
    }

    #[inline(always)]
    unsafe fn store_aligned(self, dst: *mut SalsaBlock) {
        debug_assert_eq!(dst as usize % 64, 0, "unaligned block store");
        unsafe { dst.write(crate::memory::Align64(self.to_words())) }
    }

    #[inline(always)]
    unsafe fn store_unaligned(self, dst: *mut u8) {
        unsafe { dst.cast::<[u32; 16]>().write_unaligned(self.to_words()) }
    }

    #[inline(always)]
    unsafe fn stream_aligned(self, dst: *mut SalsaBlock) {
        unsafe { self.store_aligned(dst) }
    }

    #[inline(always)]
    fn xor_with(&mut self, other: Self) {
        for (row, other_row) in self.rows.iter_mut().zip(other.rows) {
            for (lane, other_lane) in row.iter_mut().zip(other_row) {
                *lane ^= other_lane;
            }
        }
    }

    #[inline(always)]
    fn diagonalize(self) -> Self {
        self.permute(&DIAGONALIZE)
    }

    #[inline(always)]
    fn undiagonalize(self) -> Self {
        self.permute(&UNDIAGONALIZE)
    }
}

impl Salsa20 for BlockScalar {
    #[inline(always)]
    fn hash(&mut self, iterations: u32) {
        let input = self.rows;
        salsa_iterations_scalar(&mut self.rows, iterations);
        for (row, input_row) in self.rows.iter_mut().zip(input) {
            for (lane, input_lane) in row.iter_mut().zip(input_row) {
                *lane = lane.wrapping_add(input_lane);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::memory::SalsaBlock;

    fn xorshift(state: &mut u32) -> u32 {
        *state ^= *state << 13;
        *state ^= *state >> 17;
        *state ^= *state << 5;
        *state
    }

    pub(crate) fn fill_pseudo_random(bytes: &mut [u8], mut seed: u32) {
        for b in bytes.iter_mut() {
            *b = xorshift(&mut seed) as u8;
        }
    }

    /// Diagonalize must match the canonical permutation table and
    /// undiagonalize must invert it exactly.
    #[inline(always)]
    pub(crate) fn check_diagonalize_round_trip<B: BlockType>() {
        let mut input = [0u8; 64];
        fill_pseudo_random(&mut input, 0x5eed_0001);

        let mut arranged = [0u8; 64];
        let mut restored = [0u8; 64];
        unsafe {
            B::load_unaligned(input.as_ptr())
                .diagonalize()
                .store_unaligned(arranged.as_mut_ptr());
            B::load_unaligned(arranged.as_ptr())
                .undiagonalize()
                .store_unaligned(restored.as_mut_ptr());
        }

        let mut expected = [0u8; 64];
        for i in 0..16 {
            expected[i * 4..][..4].copy_from_slice(&input[DIAGONALIZE[i] * 4..][..4]);
        }
        assert_eq!(arranged, expected);
        assert_eq!(restored, input);
    }

    /// The full load/diagonalize/hash/undiagonalize/store pipeline must
    /// agree with the scalar kernel bit-for-bit.
    #[inline(always)]
    pub(crate) fn check_hash_matches_scalar<B: Salsa20>(iterations: u32) {
        let mut input = [0u8; 64];
        fill_pseudo_random(&mut input, 0x5eed_0002 + iterations);

        let mut expected = [0u8; 64];
        let mut actual = [0u8; 64];
        unsafe {
            let mut reference = BlockScalar::load_unaligned(input.as_ptr()).diagonalize();
            reference.hash(iterations);
            reference
                .undiagonalize()
                .store_unaligned(expected.as_mut_ptr());

            let mut block = B::load_unaligned(input.as_ptr()).diagonalize();
            block.hash(iterations);
            block.undiagonalize().store_unaligned(actual.as_mut_ptr());
        }
        assert_eq!(actual, expected);
    }

    /// XOR and the aligned/streaming store paths must agree with plain
    /// byte-wise operations.
    #[inline(always)]
    pub(crate) fn check_memory_ops<B: BlockType>() {
        let mut a = [0u8; 64];
        let mut b = [0u8; 64];
        fill_pseudo_random(&mut a, 0x5eed_0003);
        fill_pseudo_random(&mut b, 0x5eed_0004);

        let mut stored = SalsaBlock::default();
        let mut streamed = SalsaBlock::default();
        let mut roundtrip = [0u8; 64];
        unsafe {
            let mut x = B::load_unaligned(a.as_ptr());
            x.xor_with(B::load_unaligned(b.as_ptr()));
            x.store_aligned(&mut stored);
            x.stream_aligned(&mut streamed);
            B::load_aligned(&stored).store_unaligned(roundtrip.as_mut_ptr());
        }

        let expected: [u8; 64] = core::array::from_fn(|i| a[i] ^ b[i]);
        assert_eq!(roundtrip, expected);
        assert_eq!(stored, streamed);
    }

    #[test]
    fn permutation_tables_are_inverses() {
        for i in 0..16 {
            assert_eq!(DIAGONALIZE[UNDIAGONALIZE[i]], i);
            assert_eq!(UNDIAGONALIZE[DIAGONALIZE[i]], i);
        }
        // the diagonal itself lands on row 1, first lane of which is
        // natural word 0 (the Integerify word)
        assert_eq!(&DIAGONALIZE[4..8], &[0, 5, 10, 15]);
    }

    #[test]
    fn scalar_diagonalize_round_trip() {
        check_diagonalize_round_trip::<BlockScalar>();
    }

    #[test]
    fn scalar_memory_ops() {
        check_memory_ops::<BlockScalar>();
    }

    /// Salsa20/8 core example from RFC 7914 section 3.1.
    #[test]
    fn scalar_salsa20_8_reference_vector() {
        let input = hex!(
            "7e 87 9a 21 4f 3e c9 86 7c a9 40 e6 41 71 8f 26"
            "ba ee 55 5b 8c 61 c1 b5 0d f8 46 11 6d cd 3b 1d"
            "ee 24 f3 19 df 9b 3d 85 14 12 1e 4b 5a c5 aa 32"
            "76 02 1d 29 09 c7 48 29 ed eb c6 8d b8 b8 c2 5e"
        );
        let expected = hex!(
            "a4 1f 85 9c 66 08 cc 99 3b 81 ca cb 02 0c ef 05"
            "04 4b 21 81 a2 fd 33 7d fd 7b 1c 63 96 68 2f 29"
            "b4 39 31 68 e3 c9 e6 bc fe 6b c5 b7 a0 6d 96 ba"
            "e4 24 cc 10 2c 91 74 5c 24 ad 67 3d c7 61 8f 81"
        );

        let mut output = [0u8; 64];
        unsafe {
            let mut block = BlockScalar::load_unaligned(input.as_ptr()).diagonalize();
            block.hash(8);
            block.undiagonalize().store_unaligned(output.as_mut_ptr());
        }
        assert_eq!(output, expected);
    }

    /// An even iteration count is required for layout stability; zero
    /// must be the identity.
    #[test]
    fn scalar_zero_iterations_doubles_input() {
        let mut input = [0u8; 64];
        fill_pseudo_random(&mut input, 0x5eed_0005);
        let words = unsafe { input.as_ptr().cast::<[u32; 16]>().read_unaligned() };

        let mut output = [0u8; 64];
        unsafe {
            let mut block = BlockScalar::load_unaligned(input.as_ptr());
            block.hash(0);
            block.store_unaligned(output.as_mut_ptr());
        }
        let output_words = unsafe { output.as_ptr().cast::<[u32; 16]>().read_unaligned() };
        for (out, inp) in output_words.iter().zip(words) {
            assert_eq!(
                u32::from_le(*out),
                u32::from_le(inp).wrapping_add(u32::from_le(inp))
            );
        }
    }
}
