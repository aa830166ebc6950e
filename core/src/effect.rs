//! # Effects
//!
//! An [`Effect`] is a value that is either already available or still being
//! computed. Composition in `waterdom` never blocks: modifiers may come from an
//! asynchronous source (a database lookup, a handler that still has to be
//! created), and the tree that receives them is produced once every pending
//! piece has resolved, in declaration order.
//!
//! ```
//! use waterdom_core::{Effect, Modifier, dsl::*, modifiers};
//!
//! let tree = div().apply(modifiers![
//!     attr("id").set("root"),
//!     Effect::pending(async { Ok(Modifier::from("loaded")) }),
//! ]);
//! assert!(!tree.is_ready());
//! let tree = futures::executor::block_on(tree.into_future())?;
//! assert_eq!(tree.modifiers()[1], Modifier::from("loaded"));
//! # Ok::<(), waterdom_core::Error>(())
//! ```
//!
//! `Ready` values are resolved synchronously by [`Effect::now_or_never`]; nothing
//! is scheduled for them. `Pending` values are plain local futures and are only
//! driven when awaited, which gives effects their deferred-construction
//! semantics: work captured by [`Effect::lazy`] does not run until the effect is.

use alloc::{boxed::Box, vec::Vec};
use core::{fmt::Debug, future::IntoFuture};

use futures::{
    FutureExt,
    future::{Either, LocalBoxFuture, Ready, ready},
};

use crate::{Error, Result};

/// A value that may be ready now or resolve later.
#[must_use = "effects do nothing unless resolved"]
pub enum Effect<T> {
    /// The value (or its failure) is known.
    Ready(Result<T>),
    /// The value is produced by a local future.
    Pending(LocalBoxFuture<'static, Result<T>>),
}

impl<T> Debug for Effect<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Ready(Ok(_)) => f.write_str("Effect::Ready(Ok(..))"),
            Self::Ready(Err(error)) => write!(f, "Effect::Ready(Err({error:?}))"),
            Self::Pending(_) => f.write_str("Effect::Pending(..)"),
        }
    }
}

impl<T> From<T> for Effect<T> {
    fn from(value: T) -> Self {
        Self::Ready(Ok(value))
    }
}

impl<T: 'static> Effect<T> {
    /// Wraps an available value.
    pub const fn ready(value: T) -> Self {
        Self::Ready(Ok(value))
    }

    /// Wraps a failure.
    pub const fn fail(error: Error) -> Self {
        Self::Ready(Err(error))
    }

    /// Wraps an already computed result.
    pub const fn from_result(result: Result<T>) -> Self {
        Self::Ready(result)
    }

    /// Wraps a future resolving to the value.
    pub fn pending(future: impl Future<Output = Result<T>> + 'static) -> Self {
        Self::Pending(Box::pin(future))
    }

    /// Defers `f` until the effect is resolved.
    pub fn lazy(f: impl FnOnce() -> Result<T> + 'static) -> Self {
        Self::pending(async move { f() })
    }

    /// Returns `true` if no asynchronous work is left.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Transforms the eventual value.
    pub fn map<U: 'static>(self, f: impl FnOnce(T) -> U + 'static) -> Effect<U> {
        match self {
            Self::Ready(result) => Effect::Ready(result.map(f)),
            Self::Pending(future) => Effect::pending(async move { future.await.map(f) }),
        }
    }

    /// Chains a second effect that depends on the value of this one.
    pub fn and_then<U: 'static>(self, f: impl FnOnce(T) -> Effect<U> + 'static) -> Effect<U> {
        match self {
            Self::Ready(Ok(value)) => f(value),
            Self::Ready(Err(error)) => Effect::Ready(Err(error)),
            Self::Pending(future) => Effect::pending(async move { f(future.await?).await }),
        }
    }

    /// Resolves the effect if that is possible without waiting.
    ///
    /// Pending effects are polled once; `None` means they still need an executor.
    pub fn now_or_never(self) -> Option<Result<T>> {
        match self {
            Self::Ready(result) => Some(result),
            Self::Pending(future) => future.now_or_never(),
        }
    }

    /// Turns a sequence of effects into one effect of all values, keeping their order.
    ///
    /// Stays `Ready` when every input is ready. Resolution stops at the first
    /// failure in declaration order.
    pub fn sequence(effects: impl IntoIterator<Item = Self>) -> Effect<Vec<T>> {
        let effects: Vec<Self> = effects.into_iter().collect();
        if effects.iter().all(Self::is_ready) {
            return Effect::Ready(
                effects
                    .into_iter()
                    .map(|effect| match effect {
                        Self::Ready(result) => result,
                        Self::Pending(_) => unreachable!("all effects checked ready"),
                    })
                    .collect(),
            );
        }
        Effect::pending(async move {
            let mut values = Vec::with_capacity(effects.len());
            for effect in effects {
                values.push(effect.await?);
            }
            Ok(values)
        })
    }
}

impl<T: 'static> IntoFuture for Effect<T> {
    type Output = Result<T>;
    type IntoFuture = Either<Ready<Result<T>>, LocalBoxFuture<'static, Result<T>>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Self::Ready(result) => Either::Left(ready(result)),
            Self::Pending(future) => Either::Right(future),
        }
    }
}
