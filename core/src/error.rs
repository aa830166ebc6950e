//! Error type shared by composition, reconciliation and the patch layer.

use alloc::rc::Rc;
use core::fmt::Display;

use crate::Str;

/// Result alias used across `waterdom-core`.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Everything that can go wrong while resolving, streaming or patching.
///
/// The type is `Clone` because a single failure may have to reach every
/// subscriber of a multicast [`Handler`](crate::handler::Handler).
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An asynchronous modifier or node effect failed.
    #[error("effect failed: {0}")]
    Effect(Str),
    /// An upstream stream terminated with an error.
    #[error("stream terminated with error: {0}")]
    Stream(Str),
    /// The host refused a native node operation.
    #[error("host operation `{op}` failed: {message}")]
    Host {
        /// Name of the host operation.
        op: &'static str,
        /// Message reported by the host.
        message: Str,
    },
    /// An [`Element`](crate::Element) handle was created by a different host.
    #[error("element handle does not belong to this host")]
    ForeignElement,
    /// A node was used as if it had been mounted but carries no element.
    #[error("node is not mounted")]
    NotMounted,
    /// Application-level failure carried through the render pipeline.
    #[error("{0}")]
    Custom(Rc<anyhow::Error>),
}

impl Error {
    /// Creates an [`Error::Effect`] from any displayable message.
    pub fn effect(message: impl Display) -> Self {
        Self::Effect(message.to_string().into())
    }

    /// Creates an [`Error::Stream`] from any displayable message.
    pub fn stream(message: impl Display) -> Self {
        Self::Stream(message.to_string().into())
    }

    /// Creates an [`Error::Host`] for the named operation.
    pub fn host(op: &'static str, message: impl Display) -> Self {
        Self::Host {
            op,
            message: message.to_string().into(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Self::Custom(Rc::new(value))
    }
}
