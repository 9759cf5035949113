//! x86-64 kernels: SSE2, SSE4.1, AVX and AVX2.
//!
//! The four dispatch variants differ in how blocks are moved and
//! permuted; the Salsa20 rounds themselves always run on four 128-bit
//! rows (the 256-bit views unpack, iterate, repack). SSSE3 offers
//! nothing over SSE2 for these loops and shares its kernel.

use core::arch::x86_64::*;

use super::{BlockType, Salsa20};
use crate::block_mix::{self, MixMode};
use crate::memory::{SalsaBlock, ScryptElement};

macro_rules! mm_rotl_epi32 {
    ($w:expr, $amt:literal) => {{
        let w = $w;
        _mm_or_si128(_mm_slli_epi32::<$amt>(w), _mm_srli_epi32::<{ 32 - $amt }>(w))
    }};
}

macro_rules! salsa_operation_xmm {
    ($add1:expr, $add2:expr, $x:expr, $rot:literal) => {
        _mm_xor_si128($x, mm_rotl_epi32!(_mm_add_epi32($add1, $add2), $rot))
    };
}

/// Runs `iterations` Salsa20 rounds on four 128-bit diagonal rows,
/// without the feed-forward addition.
#[inline(always)]
unsafe fn salsa_iterations_xmm(rows: &mut [__m128i; 4], iterations: u32) {
    unsafe {
        for _ in 0..iterations {
            rows[2] = salsa_operation_xmm!(rows[0], rows[1], rows[2], 7);
            rows[3] = salsa_operation_xmm!(rows[1], rows[2], rows[3], 9);
            rows[0] = salsa_operation_xmm!(rows[2], rows[3], rows[0], 13);
            rows[1] = salsa_operation_xmm!(rows[3], rows[0], rows[1], 18);

            // exchange rows and columns; row 1 keeps the diagonal
            let to_row2 = _mm_shuffle_epi32::<0b00_11_10_01>(rows[0]);
            rows[0] = _mm_shuffle_epi32::<0b10_01_00_11>(rows[2]);
            rows[2] = to_row2;
            rows[3] = _mm_shuffle_epi32::<0b01_00_11_10>(rows[3]);
        }
    }
}

/// A 64-byte block in four 128-bit registers, SSE2 permutations.
#[derive(Clone, Copy)]
pub struct BlockSse2 {
    rows: [__m128i; 4],
}

/// A 64-byte block in four 128-bit registers, SSE4.1 per-lane
/// insert/extract permutations.
///
/// Kept for parity with the SSE2 set-integer form; either is correct
/// and the difference is a benchmarking curiosity.
#[derive(Clone, Copy)]
pub struct BlockSse41 {
    rows: [__m128i; 4],
}

impl BlockSse2 {
    #[inline(always)]
    unsafe fn arrange(rows: [__m128i; 4]) -> [__m128i; 4] {
        unsafe {
            let n: [[u32; 4]; 4] = core::mem::transmute(rows);
            [
                _mm_setr_epi32(
                    n[3][0] as i32,
                    n[0][1] as i32,
                    n[1][2] as i32,
                    n[2][3] as i32,
                ),
                _mm_setr_epi32(
                    n[0][0] as i32,
                    n[1][1] as i32,
                    n[2][2] as i32,
                    n[3][3] as i32,
                ),
                _mm_setr_epi32(
                    n[1][0] as i32,
                    n[2][1] as i32,
                    n[3][2] as i32,
                    n[0][3] as i32,
                ),
                _mm_setr_epi32(
                    n[2][0] as i32,
                    n[3][1] as i32,
                    n[0][2] as i32,
                    n[1][3] as i32,
                ),
            ]
        }
    }

    #[inline(always)]
    unsafe fn restore(rows: [__m128i; 4]) -> [__m128i; 4] {
        unsafe {
            let a: [[u32; 4]; 4] = core::mem::transmute(rows);
            [
                _mm_setr_epi32(
                    a[1][0] as i32,
                    a[0][1] as i32,
                    a[3][2] as i32,
                    a[2][3] as i32,
                ),
                _mm_setr_epi32(
                    a[2][0] as i32,
                    a[1][1] as i32,
                    a[0][2] as i32,
                    a[3][3] as i32,
                ),
                _mm_setr_epi32(
                    a[3][0] as i32,
                    a[2][1] as i32,
                    a[1][2] as i32,
                    a[0][3] as i32,
                ),
                _mm_setr_epi32(
                    a[0][0] as i32,
                    a[3][1] as i32,
                    a[2][2] as i32,
                    a[1][3] as i32,
                ),
            ]
        }
    }
}

impl BlockSse41 {
    #[inline(always)]
    unsafe fn arrange(rows: [__m128i; 4]) -> [__m128i; 4] {
        unsafe {
            let mut row0 = _mm_setzero_si128();
            let mut row1 = _mm_setzero_si128();
            let mut row2 = _mm_setzero_si128();
            let mut row3 = _mm_setzero_si128();

            row0 = _mm_insert_epi32::<0>(row0, _mm_extract_epi32::<0>(rows[3]));
            row0 = _mm_insert_epi32::<1>(row0, _mm_extract_epi32::<1>(rows[0]));
            row0 = _mm_insert_epi32::<2>(row0, _mm_extract_epi32::<2>(rows[1]));
            row0 = _mm_insert_epi32::<3>(row0, _mm_extract_epi32::<3>(rows[2]));
            row1 = _mm_insert_epi32::<0>(row1, _mm_extract_epi32::<0>(rows[0]));
            row1 = _mm_insert_epi32::<1>(row1, _mm_extract_epi32::<1>(rows[1]));
            row1 = _mm_insert_epi32::<2>(row1, _mm_extract_epi32::<2>(rows[2]));
            row1 = _mm_insert_epi32::<3>(row1, _mm_extract_epi32::<3>(rows[3]));
            row2 = _mm_insert_epi32::<0>(row2, _mm_extract_epi32::<0>(rows[1]));
            row2 = _mm_insert_epi32::<1>(row2, _mm_extract_epi32::<1>(rows[2]));
            row2 = _mm_insert_epi32::<2>(row2, _mm_extract_epi32::<2>(rows[3]));
            row2 = _mm_insert_epi32::<3>(row2, _mm_extract_epi32::<3>(rows[0]));
            row3 = _mm_insert_epi32::<0>(row3, _mm_extract_epi32::<0>(rows[2]));
            row3 = _mm_insert_epi32::<1>(row3, _mm_extract_epi32::<1>(rows[3]));
            row3 = _mm_insert_epi32::<2>(row3, _mm_extract_epi32::<2>(rows[0]));
            row3 = _mm_insert_epi32::<3>(row3, _mm_extract_epi32::<3>(rows[1]));

            [row0, row1, row2, row3]
        }
    }

    #[inline(always)]
    unsafe fn restore(rows: [__m128i; 4]) -> [__m128i; 4] {
        unsafe {
            let mut row0 = _mm_setzero_si128();
            let mut row1 = _mm_setzero_si128();
            let mut row2 = _mm_setzero_si128();
            let mut row3 = _mm_setzero_si128();

            row0 = _mm_insert_epi32::<0>(row0, _mm_extract_epi32::<0>(rows[1]));
            row0 = _mm_insert_epi32::<1>(row0, _mm_extract_epi32::<1>(rows[0]));
            row0 = _mm_insert_epi32::<2>(row0, _mm_extract_epi32::<2>(rows[3]));
            row0 = _mm_insert_epi32::<3>(row0, _mm_extract_epi32::<3>(rows[2]));
            row1 = _mm_insert_epi32::<0>(row1, _mm_extract_epi32::<0>(rows[2]));
            row1 = _mm_insert_epi32::<1>(row1, _mm_extract_epi32::<1>(rows[1]));
            row1 = _mm_insert_epi32::<2>(row1, _mm_extract_epi32::<2>(rows[0]));
            row1 = _mm_insert_epi32::<3>(row1, _mm_extract_epi32::<3>(rows[3]));
            row2 = _mm_insert_epi32::<0>(row2, _mm_extract_epi32::<0>(rows[3]));
            row2 = _mm_insert_epi32::<1>(row2, _mm_extract_epi32::<1>(rows[2]));
            row2 = _mm_insert_epi32::<2>(row2, _mm_extract_epi32::<2>(rows[1]));
            row2 = _mm_insert_epi32::<3>(row2, _mm_extract_epi32::<3>(rows[0]));
            row3 = _mm_insert_epi32::<0>(row3, _mm_extract_epi32::<0>(rows[0]));
            row3 = _mm_insert_epi32::<1>(row3, _mm_extract_epi32::<1>(rows[3]));
            row3 = _mm_insert_epi32::<2>(row3, _mm_extract_epi32::<2>(rows[2]));
            row3 = _mm_insert_epi32::<3>(row3, _mm_extract_epi32::<3>(rows[1]));

            [row0, row1, row2, row3]
        }
    }
}

macro_rules! impl_block128 {
    ($block:ident) => {
        impl BlockType for $block {
            #[inline(always)]
            unsafe fn load_aligned(src: *const SalsaBlock) -> Self {
                debug_assert_eq!(src as usize % 64, 0, "unaligned block load");
                let src = src.cast::<__m128i>();
                unsafe {
                    Self {
                        rows: [
                            _mm_load_si128(src),
                            _mm_load_si128(src.add(1)),
                            _mm_load_si128(src.add(2)),
                            _mm_load_si128(src.add(3)),
                        ],
                    }
                }
            }

            #[inline(always)]
            unsafe fn load_unaligned(src: *const u8) -> Self {
                let src = src.cast::<__m128i>();
                unsafe {
                    Self {
                        rows: [
                            _mm_loadu_si128(src),
                            _mm_loadu_si128(src.add(1)),
                            _mm_loadu_si128(src.add(2)),
                            _mm_loadu_si128(src.add(3)),
                        ],
                    }
                }
            }

            #[inline(always)]
            unsafe fn store_aligned(self, dst: *mut SalsaBlock) {
                debug_assert_eq!(dst as usize % 64, 0, "unaligned block store");
                let dst = dst.cast::<__m128i>();
                unsafe {
                    _mm_store_si128(dst, self.rows[0]);
                    _mm_store_si128(dst.add(1), self.rows[1]);
                    _mm_store_si128(dst.add(2), self.rows[2]);
                    _mm_store_si128(dst.add(3), self.rows[3]);
                }
            }

            #[inline(always)]
            unsafe fn store_unaligned(self, dst: *mut u8) {
                let dst = dst.cast::<__m128i>();
                unsafe {
                    _mm_storeu_si128(dst, self.rows[0]);
                    _mm_storeu_si128(dst.add(1), self.rows[1]);
                    _mm_storeu_si128(dst.add(2), self.rows[2]);
                    _mm_storeu_si128(dst.add(3), self.rows[3]);
                }
            }

            #[inline(always)]
            unsafe fn stream_aligned(self, dst: *mut SalsaBlock) {
                debug_assert_eq!(dst as usize % 64, 0, "unaligned block store");
                let dst = dst.cast::<__m128i>();
                unsafe {
                    _mm_stream_si128(dst, self.rows[0]);
                    _mm_stream_si128(dst.add(1), self.rows[1]);
                    _mm_stream_si128(dst.add(2), self.rows[2]);
                    _mm_stream_si128(dst.add(3), self.rows[3]);
                }
            }

            #[inline(always)]
            fn xor_with(&mut self, other: Self) {
                unsafe {
                    self.rows[0] = _mm_xor_si128(self.rows[0], other.rows[0]);
                    self.rows[1] = _mm_xor_si128(self.rows[1], other.rows[1]);
                    self.rows[2] = _mm_xor_si128(self.rows[2], other.rows[2]);
                    self.rows[3] = _mm_xor_si128(self.rows[3], other.rows[3]);
                }
            }

            #[inline(always)]
            fn diagonalize(self) -> Self {
                Self {
                    rows: unsafe { Self::arrange(self.rows) },
                }
            }

            #[inline(always)]
            fn undiagonalize(self) -> Self {
                Self {
                    rows: unsafe { Self::restore(self.rows) },
                }
            }

            #[inline(always)]
            unsafe fn prefetch_non_temporal(addr: *const SalsaBlock) {
                unsafe { _mm_prefetch::<_MM_HINT_NTA>(addr.cast::<i8>()) }
            }

            #[inline(always)]
            unsafe fn flush(addr: *const SalsaBlock) {
                unsafe { _mm_clflush(addr.cast::<u8>()) }
            }
        }

        impl Salsa20 for $block {
            #[inline(always)]
            fn hash(&mut self, iterations: u32) {
                unsafe {
                    let input = self.rows;
                    salsa_iterations_xmm(&mut self.rows, iterations);
                    self.rows[0] = _mm_add_epi32(self.rows[0], input[0]);
                    self.rows[1] = _mm_add_epi32(self.rows[1], input[1]);
                    self.rows[2] = _mm_add_epi32(self.rows[2], input[2]);
                    self.rows[3] = _mm_add_epi32(self.rows[3], input[3]);
                }
            }
        }
    };
}

impl_block128!(BlockSse2);
impl_block128!(BlockSse41);

/// A 64-byte block in two 256-bit registers, AVX lane-constructor
/// permutations.
///
/// Used for the layout transform only; AVX lacks 256-bit integer
/// arithmetic, so mixing runs on the 128-bit block under VEX encoding.
#[derive(Clone, Copy)]
pub struct BlockAvx {
    rows01: __m256i,
    rows23: __m256i,
}

/// A 64-byte block in two 256-bit registers, AVX2 permute+blend
/// permutations.
#[derive(Clone, Copy)]
pub struct BlockAvx2 {
    rows01: __m256i,
    rows23: __m256i,
}

macro_rules! impl_block256_memory_ops {
    () => {
        #[inline(always)]
        unsafe fn load_aligned(src: *const SalsaBlock) -> Self {
            debug_assert_eq!(src as usize % 64, 0, "unaligned block load");
            let src = src.cast::<__m256i>();
            unsafe {
                Self {
                    rows01: _mm256_load_si256(src),
                    rows23: _mm256_load_si256(src.add(1)),
                }
            }
        }

        #[inline(always)]
        unsafe fn load_unaligned(src: *const u8) -> Self {
            let src = src.cast::<__m256i>();
            unsafe {
                Self {
                    rows01: _mm256_loadu_si256(src),
                    rows23: _mm256_loadu_si256(src.add(1)),
                }
            }
        }

        #[inline(always)]
        unsafe fn store_aligned(self, dst: *mut SalsaBlock) {
            debug_assert_eq!(dst as usize % 64, 0, "unaligned block store");
            let dst = dst.cast::<__m256i>();
            unsafe {
                _mm256_store_si256(dst, self.rows01);
                _mm256_store_si256(dst.add(1), self.rows23);
            }
        }

        #[inline(always)]
        unsafe fn store_unaligned(self, dst: *mut u8) {
            let dst = dst.cast::<__m256i>();
            unsafe {
                _mm256_storeu_si256(dst, self.rows01);
                _mm256_storeu_si256(dst.add(1), self.rows23);
            }
        }

        #[inline(always)]
        unsafe fn stream_aligned(self, dst: *mut SalsaBlock) {
            debug_assert_eq!(dst as usize % 64, 0, "unaligned block store");
            let dst = dst.cast::<__m256i>();
            unsafe {
                _mm256_stream_si256(dst, self.rows01);
                _mm256_stream_si256(dst.add(1), self.rows23);
            }
        }

        #[inline(always)]
        unsafe fn prefetch_non_temporal(addr: *const SalsaBlock) {
            unsafe { _mm_prefetch::<_MM_HINT_NTA>(addr.cast::<i8>()) }
        }

        #[inline(always)]
        unsafe fn flush(addr: *const SalsaBlock) {
            unsafe { _mm_clflush(addr.cast::<u8>()) }
        }
    };
}

impl BlockType for BlockAvx {
    impl_block256_memory_ops!();

    #[inline(always)]
    fn xor_with(&mut self, other: Self) {
        // AVX has no 256-bit integer XOR; the float domain one is
        // bitwise-equivalent
        unsafe {
            self.rows01 = _mm256_castps_si256(_mm256_xor_ps(
                _mm256_castsi256_ps(self.rows01),
                _mm256_castsi256_ps(other.rows01),
            ));
            self.rows23 = _mm256_castps_si256(_mm256_xor_ps(
                _mm256_castsi256_ps(self.rows23),
                _mm256_castsi256_ps(other.rows23),
            ));
        }
    }

    #[inline(always)]
    fn diagonalize(self) -> Self {
        unsafe {
            let n01: [u32; 8] = core::mem::transmute(self.rows01);
            let n23: [u32; 8] = core::mem::transmute(self.rows23);
            Self {
                rows01: _mm256_setr_epi32(
                    n23[4] as i32,
                    n01[1] as i32,
                    n01[6] as i32,
                    n23[3] as i32,
                    n01[0] as i32,
                    n01[5] as i32,
                    n23[2] as i32,
                    n23[7] as i32,
                ),
                rows23: _mm256_setr_epi32(
                    n01[4] as i32,
                    n23[1] as i32,
                    n23[6] as i32,
                    n01[3] as i32,
                    n23[0] as i32,
                    n23[5] as i32,
                    n01[2] as i32,
                    n01[7] as i32,
                ),
            }
        }
    }

    #[inline(always)]
    fn undiagonalize(self) -> Self {
        unsafe {
            let a01: [u32; 8] = core::mem::transmute(self.rows01);
            let a23: [u32; 8] = core::mem::transmute(self.rows23);
            Self {
                rows01: _mm256_setr_epi32(
                    a01[4] as i32,
                    a01[1] as i32,
                    a23[6] as i32,
                    a23[3] as i32,
                    a23[0] as i32,
                    a01[5] as i32,
                    a01[2] as i32,
                    a23[7] as i32,
                ),
                rows23: _mm256_setr_epi32(
                    a23[4] as i32,
                    a23[1] as i32,
                    a01[6] as i32,
                    a01[3] as i32,
                    a01[0] as i32,
                    a23[5] as i32,
                    a23[2] as i32,
                    a01[7] as i32,
                ),
            }
        }
    }
}

/// Lane pattern shared by the AVX2 permute step in both directions;
/// the blend mask `0b1100_1001` picks the cross-half lanes.
#[inline(always)]
unsafe fn avx2_element_permute(v: __m256i) -> __m256i {
    unsafe { _mm256_permutevar8x32_epi32(v, _mm256_setr_epi32(4, 1, 6, 3, 0, 5, 2, 7)) }
}

impl BlockType for BlockAvx2 {
    impl_block256_memory_ops!();

    #[inline(always)]
    fn xor_with(&mut self, other: Self) {
        unsafe {
            self.rows01 = _mm256_xor_si256(self.rows01, other.rows01);
            self.rows23 = _mm256_xor_si256(self.rows23, other.rows23);
        }
    }

    #[inline(always)]
    fn diagonalize(self) -> Self {
        unsafe {
            let p01 = avx2_element_permute(self.rows01);
            let p23 = avx2_element_permute(self.rows23);
            Self {
                rows01: _mm256_blend_epi32::<0b1100_1001>(p01, p23),
                rows23: _mm256_blend_epi32::<0b1100_1001>(p23, p01),
            }
        }
    }

    #[inline(always)]
    fn undiagonalize(self) -> Self {
        unsafe {
            let b01 = _mm256_blend_epi32::<0b1100_1001>(self.rows01, self.rows23);
            let b23 = _mm256_blend_epi32::<0b1100_1001>(self.rows23, self.rows01);
            Self {
                rows01: avx2_element_permute(b01),
                rows23: avx2_element_permute(b23),
            }
        }
    }
}

impl Salsa20 for BlockAvx2 {
    #[inline(always)]
    fn hash(&mut self, iterations: u32) {
        unsafe {
            let mut rows = [
                _mm256_castsi256_si128(self.rows01),
                _mm256_extracti128_si256::<1>(self.rows01),
                _mm256_castsi256_si128(self.rows23),
                _mm256_extracti128_si256::<1>(self.rows23),
            ];
            salsa_iterations_xmm(&mut rows, iterations);
            self.rows01 = _mm256_add_epi32(self.rows01, _mm256_setr_m128i(rows[0], rows[1]));
            self.rows23 = _mm256_add_epi32(self.rows23, _mm256_setr_m128i(rows[2], rows[3]));
        }
    }
}

pub(crate) unsafe fn prepare_data_sse2(working: &mut ScryptElement, source: *const u8) {
    unsafe { block_mix::prepare_data::<BlockSse2>(working, source) }
}

pub(crate) unsafe fn copy_and_mix_blocks_sse2(
    destination: *mut SalsaBlock,
    working: &mut ScryptElement,
    shuffle: &mut ScryptElement,
) {
    unsafe { block_mix::mix_blocks::<BlockSse2>(working, destination, shuffle, MixMode::Copy) }
}

pub(crate) unsafe fn xor_and_mix_blocks_sse2(
    working: &mut ScryptElement,
    source: *const SalsaBlock,
    shuffle: &mut ScryptElement,
) {
    unsafe { block_mix::mix_blocks::<BlockSse2>(working, source.cast_mut(), shuffle, MixMode::Xor) }
}

pub(crate) unsafe fn restore_data_sse2(destination: *mut u8, working: &mut ScryptElement) {
    unsafe { block_mix::restore_data::<BlockSse2>(destination, working) }
}

#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn prepare_data_sse41(working: &mut ScryptElement, source: *const u8) {
    unsafe { block_mix::prepare_data::<BlockSse41>(working, source) }
}

#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn copy_and_mix_blocks_sse41(
    destination: *mut SalsaBlock,
    working: &mut ScryptElement,
    shuffle: &mut ScryptElement,
) {
    unsafe { block_mix::mix_blocks::<BlockSse2>(working, destination, shuffle, MixMode::Copy) }
}

#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn xor_and_mix_blocks_sse41(
    working: &mut ScryptElement,
    source: *const SalsaBlock,
    shuffle: &mut ScryptElement,
) {
    unsafe { block_mix::mix_blocks::<BlockSse2>(working, source.cast_mut(), shuffle, MixMode::Xor) }
}

#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn restore_data_sse41(destination: *mut u8, working: &mut ScryptElement) {
    unsafe { block_mix::restore_data::<BlockSse41>(destination, working) }
}

#[target_feature(enable = "avx")]
pub(crate) unsafe fn prepare_data_avx(working: &mut ScryptElement, source: *const u8) {
    unsafe { block_mix::prepare_data::<BlockAvx>(working, source) }
}

#[target_feature(enable = "avx")]
pub(crate) unsafe fn copy_and_mix_blocks_avx(
    destination: *mut SalsaBlock,
    working: &mut ScryptElement,
    shuffle: &mut ScryptElement,
) {
    unsafe { block_mix::mix_blocks::<BlockSse2>(working, destination, shuffle, MixMode::Copy) }
}

#[target_feature(enable = "avx")]
pub(crate) unsafe fn xor_and_mix_blocks_avx(
    working: &mut ScryptElement,
    source: *const SalsaBlock,
    shuffle: &mut ScryptElement,
) {
    unsafe { block_mix::mix_blocks::<BlockSse2>(working, source.cast_mut(), shuffle, MixMode::Xor) }
}

#[target_feature(enable = "avx")]
pub(crate) unsafe fn restore_data_avx(destination: *mut u8, working: &mut ScryptElement) {
    unsafe { block_mix::restore_data::<BlockAvx>(destination, working) }
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn prepare_data_avx2(working: &mut ScryptElement, source: *const u8) {
    unsafe { block_mix::prepare_data::<BlockAvx2>(working, source) }
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn copy_and_mix_blocks_avx2(
    destination: *mut SalsaBlock,
    working: &mut ScryptElement,
    shuffle: &mut ScryptElement,
) {
    unsafe { block_mix::mix_blocks::<BlockAvx2>(working, destination, shuffle, MixMode::Copy) }
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn xor_and_mix_blocks_avx2(
    working: &mut ScryptElement,
    source: *const SalsaBlock,
    shuffle: &mut ScryptElement,
) {
    unsafe { block_mix::mix_blocks::<BlockAvx2>(working, source.cast_mut(), shuffle, MixMode::Xor) }
}

#[target_feature(enable = "avx2")]
pub(crate) unsafe fn restore_data_avx2(destination: *mut u8, working: &mut ScryptElement) {
    unsafe { block_mix::restore_data::<BlockAvx2>(destination, working) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::salsa20::tests::{
        check_diagonalize_round_trip, check_hash_matches_scalar, check_memory_ops,
    };

    #[test]
    fn sse2_diagonalize_round_trip() {
        check_diagonalize_round_trip::<BlockSse2>();
    }

    #[test]
    fn sse2_memory_ops() {
        check_memory_ops::<BlockSse2>();
    }

    #[test]
    fn sse2_hash_matches_scalar() {
        check_hash_matches_scalar::<BlockSse2>(8);
        check_hash_matches_scalar::<BlockSse2>(2);
        check_hash_matches_scalar::<BlockSse2>(0);
    }

    #[target_feature(enable = "sse4.1")]
    unsafe fn sse41_checks() {
        check_diagonalize_round_trip::<BlockSse41>();
        check_memory_ops::<BlockSse41>();
        check_hash_matches_scalar::<BlockSse41>(8);
    }

    #[test]
    fn sse41_kernels_match_scalar() {
        if !std::arch::is_x86_feature_detected!("sse4.1") {
            return;
        }
        unsafe { sse41_checks() }
    }

    #[target_feature(enable = "avx")]
    unsafe fn avx_checks() {
        check_diagonalize_round_trip::<BlockAvx>();
        check_memory_ops::<BlockAvx>();
    }

    #[test]
    fn avx_kernels_match_scalar() {
        if !std::arch::is_x86_feature_detected!("avx") {
            return;
        }
        unsafe { avx_checks() }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn avx2_checks() {
        check_diagonalize_round_trip::<BlockAvx2>();
        check_memory_ops::<BlockAvx2>();
        check_hash_matches_scalar::<BlockAvx2>(8);
        check_hash_matches_scalar::<BlockAvx2>(2);
    }

    #[test]
    fn avx2_kernels_match_scalar() {
        if !std::arch::is_x86_feature_detected!("avx2") {
            return;
        }
        unsafe { avx2_checks() }
    }
}
