//! Host-agnostic handles to native nodes and events.
//!
//! Hooks and emitters are declared without knowing which host will render them,
//! so the values they observe are type-erased. A host wraps its native node once
//! when it is created; every clone of the handle refers to that same node and
//! compares equal to it.

use alloc::rc::Rc;
use core::{any::Any, fmt::Debug};

/// A handle to a native node created by a [`Host`](crate::patch::Host).
#[derive(Clone)]
pub struct Element(Rc<dyn Any>);

impl Element {
    /// Wraps a native node.
    pub fn new<N: 'static>(node: N) -> Self {
        Self(Rc::new(node))
    }

    /// Returns the native node if it has type `N`.
    #[must_use]
    pub fn downcast_ref<N: 'static>(&self) -> Option<&N> {
        self.0.downcast_ref()
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Element {}

impl Debug for Element {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Element({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

/// A native event delivered to an [`Emitter`](crate::emitter::Emitter).
#[derive(Clone)]
pub struct Event {
    kind: crate::Str,
    payload: Rc<dyn Any>,
}

impl Event {
    /// Wraps a native event of the given type.
    pub fn new<P: 'static>(kind: impl Into<crate::Str>, payload: P) -> Self {
        Self {
            kind: kind.into(),
            payload: Rc::new(payload),
        }
    }

    /// The event type, such as `click`.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the native payload if it has type `P`.
    #[must_use]
    pub fn payload<P: 'static>(&self) -> Option<&P> {
        self.payload.downcast_ref()
    }
}

impl Debug for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Event").field("kind", &self.kind).finish_non_exhaustive()
    }
}
