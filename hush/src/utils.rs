mod allocator;
mod metrics;

pub use self::allocator::*;
pub(crate) use self::metrics::*;
