mod common;
mod reblur;
mod reference;
mod relax;
mod sigma;

pub use self::common::*;
pub use self::reblur::*;
pub use self::reference::*;
pub use self::relax::*;
pub use self::sigma::*;

/// Which pixels of a checkerboard-rendered signal carry data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CheckerboardMode {
    #[default]
    Off,
    Black,
    White,
}

impl CheckerboardMode {
    /// Returns checkerboard channels for the (diffuse, specular) signals;
    /// `2` means the signal is not checkerboarded.
    pub fn channels(self) -> (u32, u32) {
        match self {
            Self::Off => (2, 2),
            Self::Black => (0, 1),
            Self::White => (1, 0),
        }
    }
}

/// Reconstruction of hit distance for probabilistically sampled signals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HitDistanceReconstructionMode {
    #[default]
    Off,
    Area3x3,
    Area5x5,
}

fn ensure(condition: bool, msg: &'static str) -> crate::Result<()> {
    if condition {
        Ok(())
    } else {
        Err(crate::Error::InvalidArgument(msg))
    }
}

fn is_fraction(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

fn is_non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}
