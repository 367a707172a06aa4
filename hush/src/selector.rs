use hush_gpu::MAX_ATROUS_PASSES;
use log::trace;

use crate::{Axis, CommonSettings, DeclaredPass, Permutation, Stage};

/// Runtime switches of a denoiser's optional stages and permutation axes,
/// evaluated once per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageFlags {
    pub clear: bool,
    pub hit_distance_reconstruction: bool,
    pub hit_distance_5x5: bool,
    pub pre_pass: bool,
    pub confidence: bool,
    pub disocclusion_mix: bool,
    pub temporal_stabilization: bool,
    pub anti_firefly: bool,
    pub atrous_iteration_num: u32,
    pub split_screen: f32,
    pub validation: bool,
}

impl StageFlags {
    pub fn new(common: &CommonSettings) -> Self {
        Self {
            confidence: common.is_history_confidence_available,
            disocclusion_mix: common.is_disocclusion_threshold_mix_available,
            split_screen: common.split_screen,
            validation: common.enable_validation,
            ..Default::default()
        }
    }

    /// Returns whether the denoiser just copies its inputs into outputs.
    pub fn is_passthrough(&self) -> bool {
        self.split_screen >= 1.0
    }

    pub fn is_enabled(&self, stage: Stage) -> bool {
        match stage {
            Stage::Clear => self.clear,
            Stage::HitDistReconstruction => self.hit_distance_reconstruction,
            Stage::PrePass => self.pre_pass,
            Stage::AntiFirefly => self.anti_firefly,
            Stage::TemporalStabilization => self.temporal_stabilization,
            Stage::SplitScreen => self.split_screen > 0.0,
            Stage::Validation => self.validation,
            _ => true,
        }
    }

    pub fn axis(&self, axis: Axis) -> bool {
        match axis {
            Axis::PrePass => self.pre_pass,
            Axis::HitDist5x5 => self.hit_distance_5x5,
            Axis::AfterHitDistReconstruction => {
                self.hit_distance_reconstruction
            }
            Axis::AfterPrePass => {
                self.pre_pass || self.hit_distance_reconstruction
            }
            Axis::Confidence => self.confidence,
            Axis::DisocclusionMix => self.disocclusion_mix,
            Axis::TemporalStabilization => self.temporal_stabilization,
            Axis::AfterAntiFirefly => self.anti_firefly,
            Axis::FromPong => false,
        }
    }

    /// Returns the number of A-trous iterations, clamped to
    /// `[2; MAX_ATROUS_PASSES]`.
    pub fn atrous_iteration_num(&self) -> u32 {
        self.atrous_iteration_num.clamp(2, MAX_ATROUS_PASSES)
    }
}

/// Dispatch picked for the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selected {
    /// Index into the instance's declared dispatches.
    pub dispatch: usize,

    pub atrous: Option<AtrousIteration>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtrousIteration {
    pub iteration: u32,
    pub is_last: bool,
}

/// Walks a denoiser's passes in declaration order and appends the
/// dispatches that should run this frame into `out`.
///
/// Every pass contributes at most one permutation, picked by the same
/// [`Permutation`] arithmetic the builder has used to enumerate them; the
/// A-trous stages are the exception, expanding into a loop whose first and
/// last iterations use their own passes.
pub fn select(
    passes: &[DeclaredPass],
    flags: &StageFlags,
    out: &mut Vec<Selected>,
) {
    if flags.is_passthrough() {
        let split_screen =
            passes.iter().find(|pass| pass.stage == Stage::SplitScreen);

        if let Some(pass) = split_screen {
            out.push(Selected {
                dispatch: pass.base,
                atrous: None,
            });
        }

        return;
    }

    for pass in passes {
        match pass.stage {
            Stage::Atrous | Stage::AtrousLast => {
                // Emitted together with `Stage::AtrousFirst`
            }

            Stage::AtrousFirst => {
                select_atrous(passes, pass, flags, out);
            }

            stage if flags.is_enabled(stage) => {
                let perm =
                    Permutation::select(pass.axes, |axis| flags.axis(axis));

                trace!("{:?}: permutation #{}", stage, perm.index());

                out.push(Selected {
                    dispatch: pass.dispatch(perm),
                    atrous: None,
                });
            }

            _ => (),
        }
    }
}

fn select_atrous(
    passes: &[DeclaredPass],
    first: &DeclaredPass,
    flags: &StageFlags,
    out: &mut Vec<Selected>,
) {
    let find = |stage: Stage| passes.iter().find(|pass| pass.stage == stage);
    let middle = find(Stage::Atrous);
    let last = find(Stage::AtrousLast);
    let iteration_num = flags.atrous_iteration_num();

    trace!("A-trous: {} iteration(s)", iteration_num);

    for iteration in 0..iteration_num {
        let is_last = iteration + 1 == iteration_num;

        let pass = if iteration == 0 {
            Some(first)
        } else if is_last {
            last
        } else {
            middle
        };

        let Some(pass) = pass else {
            debug_assert!(false, "missing A-trous pass #{}", iteration);
            continue;
        };

        // Iteration `n` reads what iteration `n - 1` wrote: the first one
        // writes into pong, and every next one flips the direction
        let from_pong = iteration % 2 == 1;

        let perm = Permutation::select(pass.axes, |axis| match axis {
            Axis::FromPong => from_pong,
            axis => flags.axis(axis),
        });

        out.push(Selected {
            dispatch: pass.dispatch(perm),
            atrous: Some(AtrousIteration { iteration, is_last }),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TA_AXES: &[Axis] =
        &[Axis::AfterPrePass, Axis::Confidence, Axis::DisocclusionMix];

    fn pass(
        stage: Stage,
        axes: &'static [Axis],
        base: usize,
    ) -> DeclaredPass {
        DeclaredPass { stage, axes, base }
    }

    fn relax_like() -> Vec<DeclaredPass> {
        vec![
            pass(Stage::Clear, &[], 0),
            pass(Stage::ClassifyTiles, &[], 1),
            pass(Stage::PrePass, &[Axis::AfterHitDistReconstruction], 2),
            pass(Stage::TemporalAccumulation, TA_AXES, 4),
            pass(Stage::AntiFirefly, &[], 12),
            pass(Stage::AtrousFirst, &[Axis::AfterAntiFirefly], 13),
            pass(Stage::Atrous, &[Axis::FromPong], 15),
            pass(Stage::AtrousLast, &[Axis::FromPong], 17),
            pass(Stage::SplitScreen, &[], 19),
            pass(Stage::Validation, &[], 20),
        ]
    }

    fn run(flags: StageFlags) -> Vec<Selected> {
        let mut out = Vec::new();

        select(&relax_like(), &flags, &mut out);

        out
    }

    fn dispatches(selected: &[Selected]) -> Vec<usize> {
        selected.iter().map(|selected| selected.dispatch).collect()
    }

    #[test]
    fn defaults() {
        let target = run(StageFlags::default());

        // classify, accumulation, 2x A-trous
        assert_eq!(vec![1, 4, 13, 18], dispatches(&target));

        assert_eq!(
            Some(AtrousIteration {
                iteration: 1,
                is_last: true
            }),
            target[3].atrous
        );
    }

    #[test]
    fn permutations() {
        let target = run(StageFlags {
            clear: true,
            pre_pass: true,
            confidence: true,
            anti_firefly: true,
            ..Default::default()
        });

        // clear, classify, pre-pass (#0), accumulation (#0b011),
        // anti-firefly, A-trous first (#1), A-trous last (#1)
        assert_eq!(vec![0, 1, 2, 7, 12, 14, 18], dispatches(&target));

        let target = run(StageFlags {
            hit_distance_reconstruction: true,
            disocclusion_mix: true,
            ..Default::default()
        });

        // hit distance reconstruction isn't declared here, so it's skipped,
        // but accumulation still picks the permutation reading its output
        // (#0b101)
        assert_eq!(vec![1, 9, 13, 18], dispatches(&target));
    }

    #[test]
    fn atrous_iterations() {
        let cases = [(0, 2), (1, 2), (2, 2), (5, 5), (8, 8), (100, 8)];

        for (requested, expected) in cases {
            let target = run(StageFlags {
                atrous_iteration_num: requested,
                ..Default::default()
            });

            let iterations: Vec<_> =
                target.iter().filter_map(|selected| selected.atrous).collect();

            assert_eq!(expected, iterations.len() as u32);

            for (idx, iteration) in iterations.iter().enumerate() {
                assert_eq!(idx as u32, iteration.iteration);
                assert_eq!(idx + 1 == iterations.len(), iteration.is_last);
            }

            let atrous: Vec<_> = target
                .iter()
                .filter(|selected| selected.atrous.is_some())
                .map(|selected| selected.dispatch)
                .collect();

            assert_eq!(13, atrous[0]);

            // Last iteration reads from pong when its index is odd
            let last = expected - 1;

            assert_eq!(17 + (last % 2) as usize, atrous[last as usize]);

            // Middle iterations alternate between reading ping and pong
            for (idx, &dispatch) in
                atrous.iter().enumerate().take(last as usize).skip(1)
            {
                assert_eq!(15 + idx % 2, dispatch);
            }
        }
    }

    #[test]
    fn split_screen() {
        let target = run(StageFlags {
            split_screen: 1.0,
            clear: true,
            validation: true,
            ..Default::default()
        });

        assert_eq!(vec![19], dispatches(&target));

        let target = run(StageFlags {
            split_screen: 0.0,
            ..Default::default()
        });

        assert!(!dispatches(&target).contains(&19));

        let target = run(StageFlags {
            split_screen: 0.5,
            ..Default::default()
        });

        assert_eq!(Some(&19), dispatches(&target).last());

        let target = run(StageFlags {
            split_screen: 0.5,
            validation: true,
            ..Default::default()
        });

        assert_eq!(vec![19, 20], dispatches(&target)[4..]);
    }
}
