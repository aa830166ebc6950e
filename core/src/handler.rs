//! Handlers: multicast subjects connecting DOM events to application state.
//!
//! A [`Handler`] is both an [`Observer`] and a source of [`Observable`]s. Every
//! subscriber first receives the seeds the handler was created with, then
//! every value pushed after it subscribed, exactly once and in push order.
//! There is no backpressure: each subscriber owns an unbounded queue.
//!
//! Failure is terminal. After [`Handler::fail`] every current subscriber sees
//! the error, new subscribers get it immediately and pushes are dropped. A new
//! handler is the way to recover.
//!
//! ```
//! use futures::{StreamExt, executor::block_on};
//! use waterdom_core::{Ack, Error, Event, Handler, dsl::*, modifiers};
//!
//! block_on(async {
//!     let clicks = Handler::<Event>::create([]).await?;
//!     let labels = clicks.observable().map(|_| "clicked");
//!     let view = button()
//!         .apply(modifiers![on("click").to(clicks.clone()), child_stream(labels)])
//!         .await?;
//!     assert_eq!(view.modifiers().len(), 2);
//!
//!     let status = Handler::with_seeds(["idle"]);
//!     let mut seen = status.subscribe();
//!     assert_eq!(status.push("busy"), Ack::Continue);
//!     assert_eq!(seen.next().await.transpose()?, Some("idle"));
//!     assert_eq!(seen.next().await.transpose()?, Some("busy"));
//!     Ok::<_, Error>(())
//! })?;
//! # Ok::<(), waterdom_core::Error>(())
//! ```

use alloc::{rc::Rc, vec::Vec};
use core::{
    any::type_name,
    cell::RefCell,
    fmt::{self, Debug},
};

use futures::{
    StreamExt,
    channel::mpsc::{self, UnboundedSender},
    future,
    stream::{self, LocalBoxStream},
};

use crate::{
    Effect, Error, Result,
    observable::{Ack, ContramapObserver, Observable, Observer},
};

enum State<T> {
    Active(Vec<UnboundedSender<Result<T>>>),
    Failed(Error),
    Completed,
}

struct Subject<T> {
    seeds: Vec<T>,
    state: RefCell<State<T>>,
}

impl<T: Clone + 'static> Subject<T> {
    fn subscribe(&self) -> LocalBoxStream<'static, Result<T>> {
        let seeds = stream::iter(self.seeds.clone().into_iter().map(Ok));
        match &mut *self.state.borrow_mut() {
            State::Active(senders) => {
                let (sender, receiver) = mpsc::unbounded();
                senders.push(sender);
                seeds.chain(receiver).boxed_local()
            }
            State::Failed(error) => stream::once(future::ready(Err(error.clone()))).boxed_local(),
            State::Completed => stream::empty().boxed_local(),
        }
    }
}

/// An observer and multicast observable with a replayed seed prefix.
///
/// Clones share the same subject.
pub struct Handler<T> {
    subject: Rc<Subject<T>>,
}

impl<T> Clone for Handler<T> {
    fn clone(&self) -> Self {
        Self {
            subject: Rc::clone(&self.subject),
        }
    }
}

impl<T> Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.subject.state.borrow() {
            State::Active(senders) => senders.len().to_string(),
            State::Failed(error) => alloc::format!("failed: {error}"),
            State::Completed => "completed".into(),
        };
        f.debug_struct("Handler")
            .field("type", &type_name::<T>())
            .field("seeds", &self.subject.seeds.len())
            .field("state", &state)
            .finish()
    }
}

impl<T: Clone + 'static> Default for Handler<T> {
    fn default() -> Self {
        Self::with_seeds([])
    }
}

impl<T: Clone + 'static> Handler<T> {
    /// Creates a handler when the returned effect is resolved.
    ///
    /// No shared state exists before that, so the same effect value describes
    /// a fresh handler wherever it is run.
    pub fn create(seeds: impl IntoIterator<Item = T> + 'static) -> Effect<Self> {
        Effect::lazy(move || Ok(Self::with_seeds(seeds)))
    }

    /// Creates a handler right away.
    pub fn with_seeds(seeds: impl IntoIterator<Item = T>) -> Self {
        Self {
            subject: Rc::new(Subject {
                seeds: seeds.into_iter().collect(),
                state: RefCell::new(State::Active(Vec::new())),
            }),
        }
    }

    /// Delivers `value` to every current subscriber.
    ///
    /// Returns [`Ack::Stop`] once the handler has failed or completed.
    pub fn push(&self, value: T) -> Ack {
        match &mut *self.subject.state.borrow_mut() {
            State::Active(senders) => {
                senders.retain(|sender| sender.unbounded_send(Ok(value.clone())).is_ok());
                Ack::Continue
            }
            State::Failed(_) | State::Completed => {
                tracing::warn!(
                    handler = type_name::<T>(),
                    "value pushed into a terminated handler was dropped"
                );
                Ack::Stop
            }
        }
    }

    /// Terminates every subscriber with `error`.
    pub fn fail(&self, error: Error) {
        let previous = core::mem::replace(
            &mut *self.subject.state.borrow_mut(),
            State::Failed(error.clone()),
        );
        match previous {
            State::Active(senders) => {
                tracing::debug!(%error, subscribers = senders.len(), "handler failed");
                for sender in senders {
                    let _ = sender.unbounded_send(Err(error.clone()));
                }
            }
            terminated => *self.subject.state.borrow_mut() = terminated,
        }
    }

    /// Completes every subscriber.
    pub fn complete(&self) {
        let mut state = self.subject.state.borrow_mut();
        if matches!(*state, State::Active(_)) {
            *state = State::Completed;
        }
    }

    /// Returns `true` once the handler failed or completed.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        !matches!(*self.subject.state.borrow(), State::Active(_))
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        match &mut *self.subject.state.borrow_mut() {
            State::Active(senders) => {
                senders.retain(|sender| !sender.is_closed());
                senders.len()
            }
            State::Failed(_) | State::Completed => 0,
        }
    }

    /// Subscribes directly.
    #[must_use]
    pub fn subscribe(&self) -> LocalBoxStream<'static, Result<T>> {
        self.subject.subscribe()
    }

    /// An observable view of the handler.
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        let subject = Rc::clone(&self.subject);
        Observable::new(move || subject.subscribe())
    }

    /// Pairs the handler with its own observable.
    #[must_use]
    pub fn pipe(&self) -> Pipe<T, T> {
        Pipe::new(self.clone(), self.observable())
    }

    /// Pairs the handler with a source derived from its observable.
    #[must_use]
    pub fn transform_source<O: 'static>(
        &self,
        f: impl FnOnce(Observable<T>) -> Observable<O>,
    ) -> Pipe<T, O> {
        Pipe::new(self.clone(), f(self.observable()))
    }

    /// Pairs a sink of `I`, mapped into the handler, with its observable.
    #[must_use]
    pub fn contramap<I: 'static>(&self, f: impl Fn(I) -> T + 'static) -> Pipe<I, T> {
        Pipe::new(ContramapObserver::new(self.clone(), f), self.observable())
    }
}

impl<T: Clone + 'static> Observer<T> for Handler<T> {
    fn on_next(&self, value: T) -> Effect<Ack> {
        Effect::ready(self.push(value))
    }

    fn on_error(&self, error: Error) {
        self.fail(error);
    }

    fn on_complete(&self) {
        self.complete();
    }
}

/// A sink of `I` paired with a source of `O`.
pub struct Pipe<I, O> {
    sink: Rc<dyn Observer<I>>,
    source: Observable<O>,
}

impl<I, O> Clone for Pipe<I, O> {
    fn clone(&self) -> Self {
        Self {
            sink: Rc::clone(&self.sink),
            source: self.source.clone(),
        }
    }
}

impl<I, O> Debug for Pipe<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("input", &type_name::<I>())
            .field("output", &type_name::<O>())
            .finish()
    }
}

impl<I: 'static, O: 'static> Pipe<I, O> {
    /// Pairs `sink` with `source`.
    pub fn new(sink: impl Observer<I> + 'static, source: Observable<O>) -> Self {
        Self {
            sink: Rc::new(sink),
            source,
        }
    }

    /// The input side.
    #[must_use]
    pub fn sink(&self) -> Rc<dyn Observer<I>> {
        Rc::clone(&self.sink)
    }

    /// The output side.
    #[must_use]
    pub fn source(&self) -> Observable<O> {
        self.source.clone()
    }

    /// Transforms the output side.
    #[must_use]
    pub fn map<P: 'static>(self, f: impl Fn(O) -> P + 'static) -> Pipe<I, P> {
        Pipe {
            sink: self.sink,
            source: self.source.map(f),
        }
    }
}

impl<I, O> Observer<I> for Pipe<I, O> {
    fn on_next(&self, value: I) -> Effect<Ack> {
        self.sink.on_next(value)
    }

    fn on_error(&self, error: Error) {
        self.sink.on_error(error);
    }

    fn on_complete(&self) {
        self.sink.on_complete();
    }
}
