//! Event emitters: the bridge from DOM events into application streams.

use alloc::rc::Rc;
use core::{
    cell::Cell,
    fmt::{self, Debug},
};

use crate::{
    Effect, Event, Result, Str,
    observable::{Ack, Observer},
};

type Trigger = dyn Fn(Event) -> Effect<Ack>;

/// Binds an event type to a trigger.
///
/// Once the trigger acknowledges with [`Ack::Stop`] (or fails), the emitter stops
/// forwarding events.
#[derive(Clone)]
pub struct Emitter {
    event_type: Str,
    trigger: Rc<Trigger>,
    stopped: Rc<Cell<bool>>,
}

impl Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("event_type", &self.event_type)
            .field("stopped", &self.stopped.get())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Emitter {
    fn eq(&self, other: &Self) -> bool {
        self.event_type == other.event_type
            && core::ptr::addr_eq(Rc::as_ptr(&self.trigger), Rc::as_ptr(&other.trigger))
    }
}

impl Emitter {
    /// Creates an emitter from a raw trigger function.
    pub fn new(
        event_type: impl Into<Str>,
        trigger: impl Fn(Event) -> Effect<Ack> + 'static,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            trigger: Rc::new(trigger),
            stopped: Rc::new(Cell::new(false)),
        }
    }

    /// Forwards events of `event_type` into `observer`.
    pub fn to(event_type: impl Into<Str>, observer: impl Observer<Event> + 'static) -> Self {
        Self::new(event_type, move |event| observer.on_next(event))
    }

    /// The event type this emitter listens to.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Returns `true` once the downstream asked to stop.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }

    /// Dispatches `event` and returns the downstream acknowledgment.
    pub fn trigger(&self, event: Event) -> Effect<Ack> {
        if self.stopped.get() {
            return Effect::ready(Ack::Stop);
        }
        match (self.trigger)(event) {
            Effect::Ready(result) => {
                record(&self.stopped, &result);
                Effect::Ready(result)
            }
            Effect::Pending(ack) => {
                let stopped = Rc::clone(&self.stopped);
                Effect::pending(async move {
                    let result = ack.await;
                    record(&stopped, &result);
                    result
                })
            }
        }
    }
}

fn record(stopped: &Cell<bool>, result: &Result<Ack>) {
    if !matches!(result, Ok(Ack::Continue)) {
        stopped.set(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, observable::from_fn};
    use alloc::vec::Vec;
    use core::cell::RefCell;

    #[test]
    fn forwards_events_to_observer() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let emitter = Emitter::to(
            "click",
            from_fn({
                let seen = Rc::clone(&seen);
                move |event: Event| seen.borrow_mut().push(event.kind().to_string())
            }),
        );
        let ack = emitter.trigger(Event::new("click", ())).now_or_never();
        assert!(matches!(ack, Some(Ok(Ack::Continue))));
        assert_eq!(&*seen.borrow(), &["click".to_string()]);
    }

    #[test]
    fn stops_after_stop_acknowledgment() {
        let calls = Rc::new(Cell::new(0));
        let emitter = Emitter::new("input", {
            let calls = Rc::clone(&calls);
            move |_| {
                calls.set(calls.get() + 1);
                Effect::ready(Ack::Stop)
            }
        });
        let _ = emitter.trigger(Event::new("input", ()));
        let second = emitter.trigger(Event::new("input", ())).now_or_never();
        assert!(emitter.is_stopped());
        assert!(matches!(second, Some(Ok(Ack::Stop))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn pending_failures_stop_the_emitter() {
        let emitter = Emitter::new("submit", |_| {
            Effect::pending(async { Err(Error::effect("rejected")) })
        });
        let ack = emitter.trigger(Event::new("submit", ())).now_or_never();
        assert!(matches!(ack, Some(Err(_))));
        assert!(emitter.is_stopped());
    }
}
