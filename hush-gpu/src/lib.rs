//! Constant-buffer layouts shared between Hush and its denoising shaders.
//!
//! Every struct here is `#[repr(C)]` and built exclusively out of `Mat4`s
//! and `Vec4`s, so that its CPU layout matches the shader's `cbuffer`
//! layout without any implicit padding. Integers travel as the bit-pattern
//! of an `f32` lane (see [`Word`]).

mod common;
mod passes;
mod reblur;
mod reference;
mod relax;
mod sigma;

pub use self::common::*;
pub use self::passes::*;
pub use self::reblur::*;
pub use self::reference::*;
pub use self::relax::*;
pub use self::sigma::*;

/// Golden angle, used to rotate blur kernels from frame to frame.
pub const GOLDEN_ANGLE: f32 = 2.39996;

/// Maximum number of accumulated frames REBLUR's history can hold.
pub const REBLUR_MAX_HISTORY_FRAME_NUM: u32 = 63;

/// Maximum number of accumulated frames RELAX's history can hold.
pub const RELAX_MAX_HISTORY_FRAME_NUM: u32 = 255;

/// Maximum number of frames SIGMA's temporal stabilization can hold.
pub const SIGMA_MAX_HISTORY_FRAME_NUM: u32 = 7;

/// Maximum number of frames the reference accumulator can hold.
pub const REFERENCE_MAX_HISTORY_FRAME_NUM: u32 = 4095;

/// Maximum number of A-trous iterations RELAX can run per frame.
pub const MAX_ATROUS_PASSES: u32 = 8;

/// Packs integers and booleans into `f32` lanes (and back) without
/// changing their bit-pattern.
pub trait Word {
    fn from_word(word: f32) -> Self;
    fn to_word(self) -> f32;
}

impl Word for u32 {
    fn from_word(word: f32) -> Self {
        word.to_bits()
    }

    fn to_word(self) -> f32 {
        f32::from_bits(self)
    }
}

impl Word for bool {
    fn from_word(word: f32) -> Self {
        word.to_bits() != 0
    }

    fn to_word(self) -> f32 {
        f32::from_bits(self as u32)
    }
}
