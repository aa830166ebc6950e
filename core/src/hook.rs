//! Lifecycle hooks.
//!
//! A hook owns an observer and pushes the element (or a before/after element
//! pair) into it when the patch layer reaches the matching lifecycle step. Hooks
//! never create or remove DOM nodes themselves.

use alloc::{rc::Rc, vec::Vec};
use core::fmt::{self, Debug};

use crate::{
    Effect, Element,
    observable::{Ack, Observer},
};

/// A hook bound to one lifecycle step, observing values of type `T`.
pub struct LifecycleHook<T> {
    observer: Rc<dyn Observer<T>>,
}

impl<T> Clone for LifecycleHook<T> {
    fn clone(&self) -> Self {
        Self {
            observer: Rc::clone(&self.observer),
        }
    }
}

impl<T> PartialEq for LifecycleHook<T> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::addr_eq(Rc::as_ptr(&self.observer), Rc::as_ptr(&other.observer))
    }
}

impl<T> Debug for LifecycleHook<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LifecycleHook({:p})",
            Rc::as_ptr(&self.observer).cast::<()>()
        )
    }
}

impl<T> LifecycleHook<T> {
    /// Binds a hook to `observer`.
    pub fn new(observer: impl Observer<T> + 'static) -> Self {
        Self {
            observer: Rc::new(observer),
        }
    }

    /// Binds a hook to an observer shared with other code.
    pub fn from_rc(observer: Rc<dyn Observer<T>>) -> Self {
        Self { observer }
    }

    /// Pushes `value` into the observer.
    pub fn fire(&self, value: T) -> Effect<Ack> {
        self.observer.on_next(value)
    }
}

/// Observes the element once it has been inserted.
pub type InsertHook = LifecycleHook<Element>;
/// Observes `(old, new)` elements before a patch.
pub type PrePatchHook = LifecycleHook<(Element, Element)>;
/// Observes `(old, new)` elements while the data of a node is updated.
pub type UpdateHook = LifecycleHook<(Element, Element)>;
/// Observes `(old, new)` elements after a patch.
pub type PostPatchHook = LifecycleHook<(Element, Element)>;
/// Observes the element before it is removed.
pub type DestroyHook = LifecycleHook<Element>;

/// A hook together with the lifecycle step it is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Hook {
    /// Element inserted into the document.
    Insert(InsertHook),
    /// Element about to be patched.
    PrePatch(PrePatchHook),
    /// Element data being updated.
    Update(UpdateHook),
    /// Element patched.
    PostPatch(PostPatchHook),
    /// Element about to be removed.
    Destroy(DestroyHook),
}

/// Hooks of one node grouped by lifecycle step, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hooks {
    /// Insert hooks.
    pub insert: Vec<InsertHook>,
    /// Pre-patch hooks.
    pub prepatch: Vec<PrePatchHook>,
    /// Update hooks.
    pub update: Vec<UpdateHook>,
    /// Post-patch hooks.
    pub postpatch: Vec<PostPatchHook>,
    /// Destroy hooks.
    pub destroy: Vec<DestroyHook>,
}

impl Hooks {
    /// Appends `hook` to the group of its lifecycle step.
    pub fn push(&mut self, hook: &Hook) {
        match hook {
            Hook::Insert(hook) => self.insert.push(hook.clone()),
            Hook::PrePatch(hook) => self.prepatch.push(hook.clone()),
            Hook::Update(hook) => self.update.push(hook.clone()),
            Hook::PostPatch(hook) => self.postpatch.push(hook.clone()),
            Hook::Destroy(hook) => self.destroy.push(hook.clone()),
        }
    }

    /// Returns `true` if no hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insert.is_empty()
            && self.prepatch.is_empty()
            && self.update.is_empty()
            && self.postpatch.is_empty()
            && self.destroy.is_empty()
    }
}
