use crate::Define;

/// Runtime condition a pass is specialized on; each axis doubles the number
/// of permutations a pass declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Hit distance reconstruction writes into the pre-pass' input instead
    /// of the temporal accumulation's.
    PrePass,

    /// Hit distance reconstruction uses the wider, 5x5 kernel.
    HitDist5x5,

    /// Pre-pass reads the reconstructed hit distance instead of the input.
    AfterHitDistReconstruction,

    /// Temporal accumulation reads the pre-pass' output instead of the
    /// input.
    AfterPrePass,

    /// Host provides history confidence.
    Confidence,

    /// Host provides per-pixel disocclusion threshold mix.
    DisocclusionMix,

    /// History is stabilized after the blur.
    TemporalStabilization,

    /// A-trous reads the anti-firefly's output.
    AfterAntiFirefly,

    /// A-trous iteration reads the pong buffer (and writes the ping one).
    FromPong,
}

impl Axis {
    pub fn define(self) -> &'static str {
        match self {
            Self::PrePass => "PRE_PASS",
            Self::HitDist5x5 => "HIT_DIST_5X5",
            Self::AfterHitDistReconstruction => {
                "AFTER_HIT_DIST_RECONSTRUCTION"
            }
            Self::AfterPrePass => "AFTER_PRE_PASS",
            Self::Confidence => "CONFIDENCE_INPUTS",
            Self::DisocclusionMix => "DISOCCLUSION_THRESHOLD_MIX",
            Self::TemporalStabilization => "TEMPORAL_STABILIZATION",
            Self::AfterAntiFirefly => "AFTER_ANTI_FIREFLY",
            Self::FromPong => "FROM_PONG",
        }
    }
}

/// Assignment of booleans to a pass' axes.
///
/// This is the only place that knows how axes map into permutation
/// indices: the builder enumerates permutations through
/// [`Permutation::all()`] and the selector picks one through
/// [`Permutation::select()`], and axis `i` always carries weight `1 << i`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Permutation {
    axes: &'static [Axis],
    bits: u16,
}

impl Permutation {
    pub const MAX_AXES: usize = 8;

    pub fn count(axes: &'static [Axis]) -> u16 {
        debug_assert!(axes.len() <= Self::MAX_AXES);

        1 << axes.len()
    }

    /// Enumerates all permutations of given axes, in index order.
    pub fn all(axes: &'static [Axis]) -> impl Iterator<Item = Self> {
        (0..Self::count(axes)).map(move |bits| Self { axes, bits })
    }

    pub fn select(
        axes: &'static [Axis],
        mut active: impl FnMut(Axis) -> bool,
    ) -> Self {
        let bits = axes
            .iter()
            .enumerate()
            .filter(|(_, &axis)| active(axis))
            .fold(0, |bits, (idx, _)| bits | (1 << idx));

        Self { axes, bits }
    }

    /// Returns offset of this permutation from its pass' first dispatch.
    pub fn index(self) -> u16 {
        self.bits
    }

    /// Returns whether given axis is set; axes the pass wasn't declared with
    /// are never set.
    pub fn has(self, axis: Axis) -> bool {
        self.axes
            .iter()
            .position(|&candidate| candidate == axis)
            .map_or(false, |idx| self.bits & (1 << idx) != 0)
    }

    pub fn defines(self) -> impl Iterator<Item = Define> {
        self.axes
            .iter()
            .map(move |&axis| Define::flag(axis.define(), self.has(axis)))
    }
}
