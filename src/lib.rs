#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Error taxonomy.
pub mod error;

/// Aligned, zeroized buffers and the Salsa block layout.
pub mod memory;

/// Salsa20/8 kernels and the per-ISA block views.
pub mod salsa20;

/// BlockMix and the Prepare/Restore layout transforms.
pub(crate) mod block_mix;

/// Runtime instruction-set detection.
pub mod features;

/// Kernel dispatch tables.
pub mod dispatch;

use log::debug;

pub use crate::dispatch::ScryptRoutines;
pub use crate::error::Error;
pub use crate::features::{InstructionSet, max_instruction_set, set_max_instruction_set};
use crate::memory::{ScryptBlock, ScryptElement};

/// The scrypt SMix core over a caller-owned buffer of one or more
/// independent 128·r-byte elements.
///
/// The buffer layout at this boundary is the one scrypt prescribes: a
/// flat array of 32-bit little-endian words, sixteen per Salsa block,
/// 2r blocks per element, `elements_count` elements concatenated. Each
/// [`Self::smix`] call mutates exactly one element in place; elements
/// share no state, so a caller holding them in separate buffers may
/// process them on separate threads.
pub struct ScryptCore<'a> {
    data: &'a mut [u8],
    elements_count: u32,
    processing_cost: u32,
    blocks_per_element: usize,
    routines: ScryptRoutines,
}

impl<'a> ScryptCore<'a> {
    /// Binds the core to `data` with the kernels detected for this
    /// CPU.
    ///
    /// `data.len()` must be a non-zero multiple of
    /// `128 * elements_count`; r is derived from it. `processing_cost`
    /// is scrypt's N. Validation happens here, before any allocation,
    /// and `data` is never touched on failure.
    pub fn new(
        data: &'a mut [u8],
        elements_count: u32,
        processing_cost: u32,
    ) -> Result<Self, Error> {
        let routines = ScryptRoutines::detect()?;
        Self::with_routines(data, elements_count, processing_cost, routines)
    }

    /// Like [`Self::new`] with an explicit kernel table, for forcing a
    /// downgrade in tests and benchmarks.
    pub fn with_routines(
        data: &'a mut [u8],
        elements_count: u32,
        processing_cost: u32,
        routines: ScryptRoutines,
    ) -> Result<Self, Error> {
        if data.is_empty() {
            return Err(Error::InvalidArgument("data must be non-empty"));
        }
        if elements_count == 0 {
            return Err(Error::InvalidArgument(
                "elements_count must be greater than 0",
            ));
        }
        if processing_cost == 0 {
            return Err(Error::InvalidArgument(
                "processing_cost must be greater than 0",
            ));
        }
        let element_length = (elements_count as usize)
            .checked_mul(128)
            .filter(|&l| l <= data.len())
            .ok_or(Error::InvalidArgument(
                "data must contain 128 bytes per element",
            ))?;
        if data.len() % element_length != 0 {
            return Err(Error::InvalidArgument(
                "data length must be a multiple of 128 * elements_count",
            ));
        }

        let blocks_per_element = data.len() / (elements_count as usize * 64);
        debug!(
            "smix core bound: {elements_count} element(s) of {blocks_per_element} blocks, N = {processing_cost}"
        );

        Ok(Self {
            data,
            elements_count,
            processing_cost,
            blocks_per_element,
            routines,
        })
    }

    /// The number of independent elements in the buffer (scrypt's p).
    pub fn elements_count(&self) -> u32 {
        self.elements_count
    }

    /// The processing cost (scrypt's N).
    pub fn processing_cost(&self) -> u32 {
        self.processing_cost
    }

    /// The derived block-size parameter (scrypt's r).
    pub fn r(&self) -> usize {
        self.blocks_per_element / 2
    }

    /// Runs SMix over one element, in place.
    ///
    /// Allocates the working, shuffle and table buffers, rearranges
    /// the element into the working layout, fills the table with N
    /// BlockMix iterations, mixes against N pseudo-randomly selected
    /// entries, and restores the element. All three buffers are zeroed
    /// before release on every path out.
    pub fn smix(&mut self, element_index: u32) -> Result<(), Error> {
        if element_index >= self.elements_count {
            return Err(Error::InvalidArgument("element_index is out of range"));
        }

        let mut working = ScryptElement::new(self.blocks_per_element, self.processing_cost)?;
        let mut shuffle = ScryptElement::new(self.blocks_per_element, self.processing_cost)?;
        let mut table = ScryptBlock::new(self.blocks_per_element, self.processing_cost)?;

        let offset = element_index as usize * self.blocks_per_element * 64;
        let element = self.data[offset..][..self.blocks_per_element * 64].as_mut_ptr();

        unsafe {
            self.routines.prepare_data(&mut working, element);

            for i in 0..self.processing_cost {
                self.routines
                    .copy_and_mix_blocks(table.element_mut_ptr(i), &mut working, &mut shuffle);
            }

            // the table was filled with streaming stores; order them
            // before the lookups read it back
            block_mix::store_fence();

            for _ in 0..self.processing_cost {
                let j = working.integerify();
                self.routines
                    .xor_and_mix_blocks(&mut working, table.element_ptr(j), &mut shuffle);
            }

            self.routines.restore_data(element, &mut working);
        }

        Ok(())
    }

    /// Runs SMix over every element in index order.
    pub fn smix_all(&mut self) -> Result<(), Error> {
        for i in 0..self.elements_count {
            self.smix(i)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::salsa20::tests::fill_pseudo_random;

    #[test]
    fn rejects_bad_arguments() {
        let routines = ScryptRoutines::portable();
        assert!(matches!(
            ScryptCore::with_routines(&mut [], 1, 16, routines),
            Err(Error::InvalidArgument(_))
        ));
        let mut data = [0u8; 128];
        assert!(matches!(
            ScryptCore::with_routines(&mut data, 0, 16, routines),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ScryptCore::with_routines(&mut data, 1, 0, routines),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ScryptCore::with_routines(&mut data, 2, 16, routines),
            Err(Error::InvalidArgument(_))
        ));
        let mut uneven = [0u8; 192];
        assert!(matches!(
            ScryptCore::with_routines(&mut uneven, 1, 16, routines),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_element_index() {
        let mut data = [0u8; 256];
        let mut core =
            ScryptCore::with_routines(&mut data, 2, 4, ScryptRoutines::portable()).unwrap();
        assert_eq!(
            core.smix(2),
            Err(Error::InvalidArgument("element_index is out of range"))
        );
    }

    #[test]
    fn derives_r_from_length() {
        let mut data = vec![0u8; 128 * 8 * 3];
        let core = ScryptCore::with_routines(&mut data, 3, 4, ScryptRoutines::portable()).unwrap();
        assert_eq!(core.r(), 8);
        assert_eq!(core.elements_count(), 3);
        assert_eq!(core.processing_cost(), 4);
    }

    #[test]
    fn elements_are_independent() {
        let mut data = vec![0u8; 128 * 2 * 2];
        fill_pseudo_random(&mut data, 0x0007_0000);
        let untouched = data[256..].to_vec();

        let mut core = ScryptCore::with_routines(&mut data, 2, 8, ScryptRoutines::portable())
            .unwrap();
        core.smix(0).unwrap();
        assert_eq!(&core.data[256..], untouched.as_slice());
    }

    /// Every kernel table available at runtime must produce
    /// bit-identical output, including for a non-power-of-two N.
    #[test]
    fn kernel_tables_agree() {
        for n in [16u32, 10] {
            kernel_tables_agree_for(n);
        }
    }

    fn kernel_tables_agree_for(n: u32) {
        let mut reference = vec![0u8; 128 * 2 * 2];
        fill_pseudo_random(&mut reference, 0x0008_0000 + n);
        let pristine = reference.clone();

        ScryptCore::with_routines(&mut reference, 2, n, ScryptRoutines::portable())
            .unwrap()
            .smix_all()
            .unwrap();
        assert_ne!(reference, pristine, "smix left the buffer unchanged");

        let mut candidates: Vec<(&str, ScryptRoutines)> = Vec::new();

        #[cfg(target_arch = "x86_64")]
        {
            candidates.push((
                "sse2",
                ScryptRoutines::for_instruction_set(InstructionSet::Sse2).unwrap(),
            ));
            if std::arch::is_x86_feature_detected!("sse4.1") {
                candidates.push((
                    "sse4.1",
                    ScryptRoutines::for_instruction_set(InstructionSet::Sse41).unwrap(),
                ));
            }
            if std::arch::is_x86_feature_detected!("avx") {
                candidates.push((
                    "avx",
                    ScryptRoutines::for_instruction_set(InstructionSet::Avx).unwrap(),
                ));
            }
            if std::arch::is_x86_feature_detected!("avx2") {
                candidates.push((
                    "avx2",
                    ScryptRoutines::for_instruction_set(InstructionSet::Avx2).unwrap(),
                ));
            }
        }

        #[cfg(target_arch = "aarch64")]
        candidates.push((
            "neon",
            ScryptRoutines::for_instruction_set(InstructionSet::Neon).unwrap(),
        ));

        for (name, routines) in candidates {
            let mut data = pristine.clone();
            ScryptCore::with_routines(&mut data, 2, n, routines)
                .unwrap()
                .smix_all()
                .unwrap();
            assert_eq!(
                data, reference,
                "{name} kernel disagrees with portable at N = {n}"
            );
        }
    }
}
