//! Runtime selection of the SMix kernels.
//!
//! Each instruction-set level contributes one concrete
//! monomorphization of PrepareData, CopyAndMixBlocks, XorAndMixBlocks
//! and RestoreData; a [`ScryptRoutines`] value bundles the four
//! function pointers. The table is plain data: callers obtain one
//! (detected or forced) and hand it to the core, so nothing global is
//! mutated after detection publishes its one-time answer.

use crate::block_mix;
use crate::error::Error;
use crate::features::{self, InstructionSet};
use crate::memory::{SalsaBlock, ScryptElement};

type PrepareDataFn = unsafe fn(&mut ScryptElement, *const u8);
type CopyAndMixBlocksFn = unsafe fn(*mut SalsaBlock, &mut ScryptElement, &mut ScryptElement);
type XorAndMixBlocksFn = unsafe fn(&mut ScryptElement, *const SalsaBlock, &mut ScryptElement);
type RestoreDataFn = unsafe fn(*mut u8, &mut ScryptElement);

/// The four kernel entry points for one instruction-set level.
///
/// Forcing a level above what the CPU supports is undefined; the
/// portable table is always safe.
#[derive(Clone, Copy, Debug)]
pub struct ScryptRoutines {
    prepare_data: PrepareDataFn,
    copy_and_mix_blocks: CopyAndMixBlocksFn,
    xor_and_mix_blocks: XorAndMixBlocksFn,
    restore_data: RestoreDataFn,
}

impl ScryptRoutines {
    /// Selects the table for the process-wide detected (or overridden)
    /// instruction set.
    pub fn detect() -> Result<Self, Error> {
        Self::for_instruction_set(features::max_instruction_set())
    }

    /// Selects the table for an explicit instruction-set level.
    ///
    /// Levels belonging to another architecture, and `Unknown`, yield
    /// [`Error::UnsupportedInstructionSet`].
    pub fn for_instruction_set(level: InstructionSet) -> Result<Self, Error> {
        #[cfg(target_arch = "x86_64")]
        {
            use crate::salsa20::x86_64::*;

            match level {
                InstructionSet::Avx2 => {
                    return Ok(Self {
                        prepare_data: prepare_data_avx2,
                        copy_and_mix_blocks: copy_and_mix_blocks_avx2,
                        xor_and_mix_blocks: xor_and_mix_blocks_avx2,
                        restore_data: restore_data_avx2,
                    });
                }
                InstructionSet::Avx => {
                    return Ok(Self {
                        prepare_data: prepare_data_avx,
                        copy_and_mix_blocks: copy_and_mix_blocks_avx,
                        xor_and_mix_blocks: xor_and_mix_blocks_avx,
                        restore_data: restore_data_avx,
                    });
                }
                InstructionSet::Sse41 => {
                    return Ok(Self {
                        prepare_data: prepare_data_sse41,
                        copy_and_mix_blocks: copy_and_mix_blocks_sse41,
                        xor_and_mix_blocks: xor_and_mix_blocks_sse41,
                        restore_data: restore_data_sse41,
                    });
                }
                // SSSE3 brings nothing the kernels use; run SSE2
                InstructionSet::Ssse3 | InstructionSet::Sse2 => {
                    return Ok(Self {
                        prepare_data: prepare_data_sse2,
                        copy_and_mix_blocks: copy_and_mix_blocks_sse2,
                        xor_and_mix_blocks: xor_and_mix_blocks_sse2,
                        restore_data: restore_data_sse2,
                    });
                }
                _ => {}
            }
        }

        #[cfg(target_arch = "aarch64")]
        {
            use crate::salsa20::aarch64::*;

            if level == InstructionSet::Neon {
                return Ok(Self {
                    prepare_data: prepare_data_neon,
                    copy_and_mix_blocks: copy_and_mix_blocks_neon,
                    xor_and_mix_blocks: xor_and_mix_blocks_neon,
                    restore_data: restore_data_neon,
                });
            }
        }

        Err(Error::UnsupportedInstructionSet(level))
    }

    /// The scalar table: slower, but valid on every architecture and
    /// useful as a cross-check reference.
    pub fn portable() -> Self {
        Self {
            prepare_data: block_mix::prepare_data_portable,
            copy_and_mix_blocks: block_mix::copy_and_mix_blocks_portable,
            xor_and_mix_blocks: block_mix::xor_and_mix_blocks_portable,
            restore_data: block_mix::restore_data_portable,
        }
    }

    #[inline(always)]
    pub(crate) unsafe fn prepare_data(&self, working: &mut ScryptElement, source: *const u8) {
        unsafe { (self.prepare_data)(working, source) }
    }

    #[inline(always)]
    pub(crate) unsafe fn copy_and_mix_blocks(
        &self,
        destination: *mut SalsaBlock,
        working: &mut ScryptElement,
        shuffle: &mut ScryptElement,
    ) {
        unsafe { (self.copy_and_mix_blocks)(destination, working, shuffle) }
    }

    #[inline(always)]
    pub(crate) unsafe fn xor_and_mix_blocks(
        &self,
        working: &mut ScryptElement,
        source: *const SalsaBlock,
        shuffle: &mut ScryptElement,
    ) {
        unsafe { (self.xor_and_mix_blocks)(working, source, shuffle) }
    }

    #[inline(always)]
    pub(crate) unsafe fn restore_data(&self, destination: *mut u8, working: &mut ScryptElement) {
        unsafe { (self.restore_data)(destination, working) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_level_is_rejected() {
        assert_eq!(
            ScryptRoutines::for_instruction_set(InstructionSet::Unknown).unwrap_err(),
            Error::UnsupportedInstructionSet(InstructionSet::Unknown)
        );
    }

    #[test]
    fn foreign_levels_are_rejected() {
        #[cfg(target_arch = "x86_64")]
        assert!(ScryptRoutines::for_instruction_set(InstructionSet::Neon).is_err());

        #[cfg(target_arch = "aarch64")]
        assert!(ScryptRoutines::for_instruction_set(InstructionSet::Avx2).is_err());
    }

    #[test]
    fn native_levels_resolve() {
        #[cfg(target_arch = "x86_64")]
        {
            assert!(ScryptRoutines::for_instruction_set(InstructionSet::Sse2).is_ok());
            assert!(ScryptRoutines::for_instruction_set(InstructionSet::Ssse3).is_ok());
            assert!(ScryptRoutines::for_instruction_set(InstructionSet::Sse41).is_ok());
            assert!(ScryptRoutines::for_instruction_set(InstructionSet::Avx).is_ok());
            assert!(ScryptRoutines::for_instruction_set(InstructionSet::Avx2).is_ok());
        }

        #[cfg(target_arch = "aarch64")]
        assert!(ScryptRoutines::for_instruction_set(InstructionSet::Neon).is_ok());
    }
}
