//! Declarative pass graph: every denoiser is described as an ordered list
//! of [`PassDesc`]s, which [`DenoiserBuilder`] lowers into pooled textures,
//! ping-pong entries, pipelines and one [`DeclaredDispatch`] per
//! permutation.

mod axis;
mod builder;
mod pass;
mod stage;

pub use self::axis::*;
pub use self::builder::*;
pub use self::pass::*;
pub use self::stage::*;
