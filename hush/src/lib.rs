//! Hush compiles a set of screen-space denoisers into a fixed collection of
//! compute pipelines and texture pools, and then, frame after frame, tells
//! the host which of those pipelines to dispatch, with which textures bound
//! and which constants uploaded.
//!
//! Hush never talks to the GPU itself: the host creates everything listed
//! in [`InstanceDesc`] once, and then records the [`DispatchDesc`]s returned
//! by [`Instance::get_compute_dispatches()`].
//!
//! ```no_run
//! use hush::*;
//!
//! # fn main() -> Result<()> {
//! let desc = InstanceCreationDesc::new([DenoiserDesc {
//!     identifier: Identifier(0),
//!     denoiser: Denoiser::RelaxDiffuse,
//! }]);
//!
//! let mut instance = Instance::new(&desc, &ShaderLibrary::default())?;
//!
//! instance.set_common_settings(&CommonSettings::default())?;
//!
//! let dispatches = instance.get_compute_dispatches(&[Identifier(0)])?;
//!
//! for dispatch in dispatches.iter() {
//!     println!("{}: {:?}", dispatch.name, dispatch.grid);
//! }
//! # Ok(())
//! # }
//! ```

mod constants;
mod denoiser;
mod error;
mod families;
mod graph;
mod instance;
mod ping_pong;
mod pools;
mod resources;
mod selector;
mod settings;
mod shaders;
mod utils;

pub use hush_gpu as gpu;

pub use self::constants::*;
pub use self::denoiser::*;
pub use self::error::*;
pub use self::graph::*;
pub use self::instance::*;
pub use self::ping_pong::*;
pub use self::pools::*;
pub use self::resources::*;
pub(crate) use self::selector::*;
pub use self::settings::*;
pub use self::shaders::*;
pub use self::utils::*;
