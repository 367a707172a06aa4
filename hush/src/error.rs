use crate::{Family, Identifier};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("instance must contain at least one denoiser")]
    NoDenoisers,

    #[error("denoiser {0:?} is declared more than once")]
    DuplicateIdentifier(Identifier),

    #[error("unknown denoiser {0:?}")]
    UnknownIdentifier(Identifier),

    #[error(
        "denoiser {identifier:?} expects {expected:?} settings, got {given:?}"
    )]
    InvalidSettings {
        identifier: Identifier,
        expected: Family,
        given: Family,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error(
        "shader `{shader}` is declared with {given} bindings, but an earlier \
         declaration of the same permutation has {expected}"
    )]
    MismatchedBindings {
        shader: String,
        expected: String,
        given: String,
    },

    #[error("ping-pong pairs must consist of two distinct permanent textures")]
    InvalidPingPong,

    #[error("{0} pool exceeds the 16-bit index space")]
    PoolOverflow(&'static str),

    #[error("too many pipelines for a 16-bit pipeline index")]
    TooManyPipelines,

    #[error("failed to allocate {0} bytes of constant memory")]
    OutOfMemory(usize),
}
