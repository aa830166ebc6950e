//! Observer and observable primitives on top of `futures` streams.
//!
//! An [`Observable`] is a re-subscribable source: every call to
//! [`Observable::subscribe`] produces a fresh local stream of `Result<T>`.
//! An [`Observer`] is a push target acknowledging every value with an [`Ack`],
//! which may itself be asynchronous.

use alloc::{rc::Rc, vec::Vec};
use core::{any::type_name, cell::RefCell, fmt::Debug, marker::PhantomData};

use futures::{
    StreamExt,
    stream::{self, LocalBoxStream},
};

use crate::{
    Effect, Error, Result,
    runtime::{Scheduler, Subscription},
};

/// Acknowledgment returned by an observer for each value it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ack {
    /// The observer wants more values.
    Continue,
    /// The observer will not accept further values.
    Stop,
}

/// A push-based consumer of values.
pub trait Observer<T> {
    /// Receives the next value.
    fn on_next(&self, value: T) -> Effect<Ack>;

    /// Receives the terminal error of the source.
    fn on_error(&self, error: Error) {
        tracing::error!(%error, observer = type_name::<Self>(), "unhandled stream error");
    }

    /// Receives the completion of the source.
    fn on_complete(&self) {}
}

impl<T, O: Observer<T> + ?Sized> Observer<T> for Rc<O> {
    fn on_next(&self, value: T) -> Effect<Ack> {
        (**self).on_next(value)
    }

    fn on_error(&self, error: Error) {
        (**self).on_error(error);
    }

    fn on_complete(&self) {
        (**self).on_complete();
    }
}

impl<T> Debug for dyn Observer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(type_name::<Self>())
    }
}

/// An observer backed by a plain closure.
pub struct FnObserver<T, F> {
    f: F,
    _marker: PhantomData<fn(T)>,
}

impl<T, F> Debug for FnObserver<T, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(type_name::<Self>())
    }
}

impl<T, F: Fn(T)> Observer<T> for FnObserver<T, F> {
    fn on_next(&self, value: T) -> Effect<Ack> {
        (self.f)(value);
        Effect::ready(Ack::Continue)
    }
}

/// Creates an observer that calls `f` for every value and always continues.
pub const fn from_fn<T, F: Fn(T)>(f: F) -> FnObserver<T, F> {
    FnObserver {
        f,
        _marker: PhantomData,
    }
}

/// An observer that maps values before forwarding them.
pub struct ContramapObserver<O, F, T> {
    inner: O,
    f: F,
    _marker: PhantomData<fn(T)>,
}

impl<O, F, T> Debug for ContramapObserver<O, F, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(type_name::<Self>())
    }
}

impl<O, F, T> ContramapObserver<O, F, T> {
    /// Wraps `inner` so that it receives `f(value)`.
    pub const fn new(inner: O, f: F) -> Self {
        Self {
            inner,
            f,
            _marker: PhantomData,
        }
    }
}

impl<T, U, O: Observer<U>, F: Fn(T) -> U> Observer<T> for ContramapObserver<O, F, T> {
    fn on_next(&self, value: T) -> Effect<Ack> {
        self.inner.on_next((self.f)(value))
    }

    fn on_error(&self, error: Error) {
        self.inner.on_error(error);
    }

    fn on_complete(&self) {
        self.inner.on_complete();
    }
}

type SubscribeFn<T> = dyn Fn() -> LocalBoxStream<'static, Result<T>>;

/// A source that can be subscribed any number of times.
pub struct Observable<T> {
    subscribe: Rc<SubscribeFn<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            subscribe: Rc::clone(&self.subscribe),
        }
    }
}

impl<T> Debug for Observable<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(type_name::<Self>())
    }
}

impl<T> PartialEq for Observable<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.subscribe, &other.subscribe)
    }
}

impl<T: 'static> Observable<T> {
    /// Creates an observable from a subscription function.
    pub fn new(subscribe: impl Fn() -> LocalBoxStream<'static, Result<T>> + 'static) -> Self {
        Self {
            subscribe: Rc::new(subscribe),
        }
    }

    /// Emits a clone of every item, then completes, for every subscriber.
    pub fn from_values(items: impl IntoIterator<Item = T>) -> Self
    where
        T: Clone,
    {
        let items: Rc<[T]> = items.into_iter().collect::<Vec<_>>().into();
        Self::new(move || {
            let items = Rc::clone(&items);
            stream::iter((0..items.len()).map(move |index| Ok(items[index].clone()))).boxed_local()
        })
    }

    /// Wraps a single-use stream.
    ///
    /// The first subscriber takes the stream; later subscribers complete immediately.
    pub fn from_stream(source: impl futures::Stream<Item = Result<T>> + 'static) -> Self {
        let slot: RefCell<Option<LocalBoxStream<'static, Result<T>>>> =
            RefCell::new(Some(source.boxed_local()));
        Self::new(move || {
            slot.borrow_mut().take().unwrap_or_else(|| {
                tracing::warn!(
                    observable = type_name::<T>(),
                    "single-use stream subscribed twice, completing"
                );
                stream::empty().boxed_local()
            })
        })
    }

    /// Completes immediately.
    pub fn empty() -> Self {
        Self::new(|| stream::empty().boxed_local())
    }

    /// Never emits and never completes.
    pub fn never() -> Self {
        Self::new(|| stream::pending().boxed_local())
    }

    /// Fails immediately with `error`.
    pub fn failed(error: Error) -> Self {
        Self::new(move || stream::once(futures::future::ready(Err(error.clone()))).boxed_local())
    }

    /// Starts a new subscription.
    #[must_use]
    pub fn subscribe(&self) -> LocalBoxStream<'static, Result<T>> {
        (self.subscribe)()
    }

    /// Transforms every emitted value.
    #[must_use]
    pub fn map<U: 'static>(self, f: impl Fn(T) -> U + 'static) -> Observable<U> {
        let f = Rc::new(f);
        Observable::new(move || {
            let f = Rc::clone(&f);
            self.subscribe().map(move |item| item.map(|value| f(value))).boxed_local()
        })
    }

    /// Drives a subscription into `observer` on `scheduler`.
    ///
    /// The returned handle stops delivery when cancelled. Delivery also stops when
    /// the observer acknowledges with [`Ack::Stop`].
    pub fn subscribe_with(
        &self,
        observer: impl Observer<T> + 'static,
        scheduler: &dyn Scheduler,
    ) -> Subscription {
        let mut source = self.subscribe();
        Subscription::spawn(scheduler, async move {
            while let Some(item) = source.next().await {
                match item {
                    Ok(value) => match observer.on_next(value).await {
                        Ok(Ack::Continue) => {}
                        Ok(Ack::Stop) => return,
                        Err(error) => {
                            observer.on_error(error);
                            return;
                        }
                    },
                    Err(error) => {
                        observer.on_error(error);
                        return;
                    }
                }
            }
            observer.on_complete();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;

    use futures::{executor::block_on, stream::TryStreamExt};

    fn collect<T: 'static>(observable: &Observable<T>) -> Result<Vec<T>> {
        block_on(observable.subscribe().try_collect())
    }

    #[test]
    fn from_values_replays_for_every_subscriber() {
        let observable = Observable::from_values([1, 2, 3]).map(|v| v * 10);
        assert_eq!(collect(&observable).unwrap(), vec![10, 20, 30]);
        assert_eq!(collect(&observable).unwrap(), vec![10, 20, 30]);
    }

    #[test]
    fn single_use_streams_complete_for_late_subscribers() {
        let observable = Observable::from_stream(stream::iter([Ok(1), Ok(2)]));
        assert_eq!(collect(&observable).unwrap(), vec![1, 2]);
        assert!(collect(&observable).unwrap().is_empty());
    }

    #[test]
    fn contramap_observer_transforms_values() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let inner = from_fn({
            let seen = Rc::clone(&seen);
            move |value: usize| seen.borrow_mut().push(value)
        });
        let observer = ContramapObserver::new(inner, |text: &str| text.len());
        let _ = observer.on_next("four");
        let _ = observer.on_next("xy");
        assert_eq!(&*seen.borrow(), &[4, 2]);
    }
}
