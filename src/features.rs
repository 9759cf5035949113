use core::sync::atomic::{AtomicU8, Ordering};

use log::debug;

/// Instruction-set levels the dispatcher can select between.
///
/// The x86-64 levels form a ladder; `Neon` is the aarch64 baseline.
/// `Unknown` means detection found no level a kernel is registered
/// for, and SMix construction fails rather than running silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum InstructionSet {
    /// No recognized instruction set.
    Unknown = 0,
    /// x86-64 baseline.
    Sse2 = 1,
    /// SSSE3 (runs the SSE2 kernel; it offers nothing the hot loops use).
    Ssse3 = 2,
    /// SSE4.1 (per-lane insert/extract layout kernels).
    Sse41 = 3,
    /// AVX (256-bit layout transform, 128-bit mixing).
    Avx = 4,
    /// AVX2 (256-bit throughout).
    Avx2 = 5,
    /// aarch64 NEON.
    Neon = 6,
}

impl InstructionSet {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Sse2,
            2 => Self::Ssse3,
            3 => Self::Sse41,
            4 => Self::Avx,
            5 => Self::Avx2,
            6 => Self::Neon,
            _ => Self::Unknown,
        }
    }
}

const UNSET: u8 = u8::MAX;

static MAX_INSTRUCTION_SET: AtomicU8 = AtomicU8::new(UNSET);

/// Returns the process-wide instruction-set level.
///
/// The first call runs detection and publishes the result; later calls
/// (and concurrent first calls, detection being deterministic) read the
/// cached value.
pub fn max_instruction_set() -> InstructionSet {
    let cached = MAX_INSTRUCTION_SET.load(Ordering::Acquire);
    if cached != UNSET {
        return InstructionSet::from_u8(cached);
    }
    let detected = detect();
    debug!("detected instruction set {detected:?}");
    MAX_INSTRUCTION_SET.store(detected as u8, Ordering::Release);
    detected
}

/// Overrides the process-wide instruction-set level.
///
/// Intended for tests and benchmarks that force a downgrade. Forcing a
/// level above what the CPU actually supports is undefined.
pub fn set_max_instruction_set(level: InstructionSet) {
    debug!("instruction set forced to {level:?}");
    MAX_INSTRUCTION_SET.store(level as u8, Ordering::Release);
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        fn detect() -> InstructionSet {
            // top-down ladder; the macro folds in the OS XMM/YMM
            // save-state checks that AVX and AVX2 additionally require
            if std::arch::is_x86_feature_detected!("avx2") {
                InstructionSet::Avx2
            } else if std::arch::is_x86_feature_detected!("avx") {
                InstructionSet::Avx
            } else if std::arch::is_x86_feature_detected!("sse4.1") {
                InstructionSet::Sse41
            } else if std::arch::is_x86_feature_detected!("ssse3") {
                InstructionSet::Ssse3
            } else {
                InstructionSet::Sse2
            }
        }
    } else if #[cfg(target_arch = "aarch64")] {
        fn detect() -> InstructionSet {
            InstructionSet::Neon
        }
    } else {
        fn detect() -> InstructionSet {
            InstructionSet::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_matches_platform() {
        // query detect() directly: the cached global may be overridden
        // by the round-trip test running in parallel
        let level = detect();

        #[cfg(target_arch = "x86_64")]
        {
            assert!(level >= InstructionSet::Sse2);
            assert!(level <= InstructionSet::Avx2);
            assert_eq!(
                level == InstructionSet::Avx2,
                std::arch::is_x86_feature_detected!("avx2")
            );
        }

        #[cfg(target_arch = "aarch64")]
        assert_eq!(level, InstructionSet::Neon);

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        assert_eq!(level, InstructionSet::Unknown);
    }

    #[test]
    fn override_round_trips() {
        let detected = max_instruction_set();
        set_max_instruction_set(InstructionSet::Sse2);
        assert_eq!(max_instruction_set(), InstructionSet::Sse2);
        set_max_instruction_set(detected);
        assert_eq!(max_instruction_set(), detected);
    }
}
