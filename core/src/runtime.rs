//! Scheduling context, subscription handles and mounting.
//!
//! Everything runs on one logical thread. Reactive work is spawned through a
//! [`Scheduler`]; every spawned task is wrapped in a [`Subscription`] whose
//! cancellation is explicit. A [`Scope`] groups the subscriptions owned by one
//! rendered node so that removing the node cancels all of them at once.

use alloc::{boxed::Box, rc::Rc, vec::Vec};
use core::{
    any::type_name,
    cell::{Cell, RefCell},
    fmt::Debug,
};

use futures::{
    FutureExt,
    future::{AbortHandle, Abortable, LocalBoxFuture},
    task::LocalSpawnExt,
};

use crate::{
    Effect, Element, Error, Result,
    patch::Patch,
    vnode::VNode,
    vtree::VTree,
};

/// Spawns local tasks on the single UI thread.
pub trait Scheduler {
    /// Starts driving `task` to completion.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        (**self).spawn(task);
    }
}

impl Scheduler for futures::executor::LocalSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(error) = self.spawn_local(task) {
            tracing::error!(%error, "failed to spawn local task");
        }
    }
}

impl Debug for dyn Scheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(type_name::<Self>())
    }
}

/// Handle to a spawned task that can be cancelled.
#[derive(Debug, Clone)]
pub struct Subscription {
    handle: AbortHandle,
    cancelled: Rc<Cell<bool>>,
}

impl Subscription {
    /// Spawns `task` on `scheduler` and returns its cancellation handle.
    pub fn spawn(scheduler: &dyn Scheduler, task: impl Future<Output = ()> + 'static) -> Self {
        let (handle, registration) = AbortHandle::new_pair();
        scheduler.spawn(Box::pin(Abortable::new(task, registration).map(|_| ())));
        Self {
            handle,
            cancelled: Rc::new(Cell::new(false)),
        }
    }

    /// Stops the task. It will not be polled again.
    pub fn cancel(&self) {
        self.cancelled.set(true);
        self.handle.abort();
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// A set of subscriptions torn down together.
///
/// Nothing is cancelled on drop; the owner must call [`Scope::cancel`].
#[derive(Debug, Default)]
pub struct Scope {
    subscriptions: RefCell<Vec<Subscription>>,
    cancelled: Cell<bool>,
}

impl Scope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscription. Adding to a cancelled scope cancels it immediately.
    pub fn add(&self, subscription: Subscription) {
        if self.cancelled.get() {
            subscription.cancel();
            return;
        }
        self.subscriptions.borrow_mut().push(subscription);
    }

    /// Cancels every subscription of the scope.
    pub fn cancel(&self) {
        self.cancelled.set(true);
        let subscriptions = core::mem::take(&mut *self.subscriptions.borrow_mut());
        for subscription in &subscriptions {
            subscription.cancel();
        }
    }

    /// Returns `true` once the scope was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    /// Returns `true` if the scope holds no live subscription.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type ErrorSink = dyn Fn(&Error);

/// Everything conversion needs to drive reactive subtrees.
#[derive(Clone)]
pub struct RenderContext {
    scheduler: Rc<dyn Scheduler>,
    patcher: Rc<dyn Patch>,
    on_error: Rc<ErrorSink>,
}

impl Debug for RenderContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderContext").finish_non_exhaustive()
    }
}

impl RenderContext {
    /// Creates a context; stream errors are logged with `tracing`.
    pub fn new(scheduler: impl Scheduler + 'static, patcher: impl Patch + 'static) -> Self {
        Self {
            scheduler: Rc::new(scheduler),
            patcher: Rc::new(patcher),
            on_error: Rc::new(|error| {
                tracing::error!(%error, "reactive subtree stopped updating");
            }),
        }
    }

    /// Routes errors that stop a reactive subtree to `sink` instead of the log.
    #[must_use]
    pub fn with_error_sink(mut self, sink: impl Fn(&Error) + 'static) -> Self {
        self.on_error = Rc::new(sink);
        self
    }

    /// The scheduler that drives subscriptions.
    #[must_use]
    pub fn scheduler(&self) -> &dyn Scheduler {
        &*self.scheduler
    }

    /// The patch layer.
    #[must_use]
    pub fn patcher(&self) -> &dyn Patch {
        &*self.patcher
    }

    /// Reports an error that terminated a reactive subtree.
    pub fn report_error(&self, error: &Error) {
        (self.on_error)(error);
    }
}

/// A tree mounted into a container.
///
/// Dropping it leaves the DOM untouched and subscriptions alive; call
/// [`Mounted::unmount`] to tear everything down.
#[derive(Debug)]
#[must_use = "a mounted tree keeps its subscriptions until unmounted"]
pub struct Mounted {
    context: RenderContext,
    vnode: RefCell<Option<VNode>>,
}

impl Mounted {
    /// The current root node, with its element.
    #[must_use]
    pub fn vnode(&self) -> Option<VNode> {
        self.vnode.borrow().clone()
    }

    /// The element of the root node.
    #[must_use]
    pub fn element(&self) -> Option<Element> {
        self.vnode.borrow().as_ref().and_then(|vnode| vnode.elm().cloned())
    }

    /// Patches the mounted root with a new tree.
    ///
    /// # Errors
    ///
    /// Fails if the tree was already unmounted or the host rejects an operation.
    pub fn update(&self, tree: &VTree) -> Result<()> {
        let next = tree.to_vnode(&self.context)?;
        let previous = self.vnode.borrow_mut().take().ok_or(Error::NotMounted)?;
        let patched = self.context.patcher().patch(previous, next)?;
        *self.vnode.borrow_mut() = Some(patched);
        Ok(())
    }

    /// Removes the tree, firing destroy hooks and cancelling every subscription.
    ///
    /// # Errors
    ///
    /// Fails if the host cannot remove the root node.
    pub fn unmount(self) -> Result<()> {
        let vnode = self.vnode.borrow_mut().take().ok_or(Error::NotMounted)?;
        tracing::debug!("unmounting tree");
        self.context.patcher().unmount(vnode)
    }
}

/// Resolves `tree`, converts it and appends it to `container`.
///
/// Fails without touching the container if any modifier effect fails.
pub fn render(
    context: &RenderContext,
    container: &Element,
    tree: impl Into<Effect<VTree>>,
) -> Effect<Mounted> {
    let context = context.clone();
    let container = container.clone();
    tree.into().and_then(move |tree| {
        Effect::from_result((|| {
            let vnode = tree.to_vnode(&context)?;
            let vnode = context.patcher().mount(&container, vnode)?;
            tracing::debug!(tag = %tree.tag(), "mounted tree");
            Ok(Mounted {
                context,
                vnode: RefCell::new(Some(vnode)),
            })
        })())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::LocalPool;

    #[test]
    fn cancelled_subscription_stops_polling() {
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        let (tx, mut rx) = futures::channel::mpsc::unbounded::<u32>();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let subscription = Subscription::spawn(&spawner, {
            let seen = Rc::clone(&seen);
            async move {
                use futures::StreamExt;
                while let Some(value) = rx.next().await {
                    seen.borrow_mut().push(value);
                }
            }
        });

        tx.unbounded_send(1).unwrap();
        pool.run_until_stalled();
        subscription.cancel();
        tx.unbounded_send(2).unwrap();
        pool.run_until_stalled();

        assert!(subscription.is_cancelled());
        assert_eq!(&*seen.borrow(), &[1]);
    }

    #[test]
    fn scope_cancels_late_additions() {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        let scope = Scope::new();
        scope.add(Subscription::spawn(&spawner, async {}));
        assert_eq!(scope.len(), 1);

        scope.cancel();
        assert!(scope.is_empty());

        let late = Subscription::spawn(&spawner, async {});
        scope.add(late.clone());
        assert!(late.is_cancelled());
        assert!(scope.is_empty());
    }
}
