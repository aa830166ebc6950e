//! # waterdom-core
//!
//! A typed modifier algebra for virtual DOM trees, kept in sync with a real
//! document through streams.
//!
//! Application code builds immutable [`VTree`]s and decorates them with
//! [`Modifier`]s: attributes, properties, styles, keys, event emitters,
//! lifecycle hooks and children. Some children and attributes are
//! [stream receivers](receiver): their content is supplied by an
//! [`Observable`] after the tree is mounted.
//!
//! Rendering has three steps:
//!
//! 1. composition resolves every (possibly asynchronous) modifier into a
//!    [`VTree`], see [`Effect`];
//! 2. the [classifier](separated) partitions the modifiers and
//!    [`VTree::to_vnode`] builds the patch-layer descriptor, a [`VNode`];
//! 3. a [`Patch`] implementation applies it to a document. Nodes owning stream
//!    receivers subscribe on insertion and patch only themselves on every
//!    emission, until the patch layer destroys them.
//!
//! ```
//! use waterdom_core::{Handler, dsl::*, modifiers};
//!
//! let names = Handler::with_seeds(["ada"]);
//! let tree = ul()
//!     .apply(modifiers![
//!         class("names"),
//!         children_stream(names.observable().map(|name| [li().with([name])])),
//!     ])
//!     .now_or_never()
//!     .expect("ready modifiers resolve without an executor")?;
//!
//! let separated = tree.separate();
//! assert_eq!(separated.children.len(), 1);
//! assert!(separated.children[0].is_stream());
//! # Ok::<(), waterdom_core::Error>(())
//! ```
//!
//! Mounting goes through [`render`] with a [`RenderContext`] pairing a
//! [`Scheduler`] with a [`Patch`] implementation such as [`DomPatcher`].

extern crate alloc;

pub mod attribute;
pub mod dsl;
pub mod effect;
pub mod element;
pub mod emitter;
pub mod error;
pub mod handler;
pub mod hook;
pub mod modifier;
pub mod observable;
pub mod patch;
pub mod receiver;
pub mod runtime;
pub mod separated;
pub mod vnode;
pub mod vtree;

#[cfg(test)]
mod tests;

/// Text used for tags, titles and string values.
pub type Str = alloc::borrow::Cow<'static, str>;

pub use effect::Effect;
pub use element::{Element, Event};
pub use error::{Error, Result};
pub use handler::{Handler, Pipe};
pub use modifier::Modifier;
pub use observable::{Ack, Observable, Observer};
pub use patch::{DomPatcher, Host, Patch};
pub use runtime::{Mounted, RenderContext, Scheduler, render};
pub use vnode::VNode;
pub use vtree::VTree;

/// The types needed to compose and render trees.
pub mod prelude {
    pub use crate::{
        Ack, DomPatcher, Effect, Element, Error, Event, Handler, Modifier, Mounted, Observable,
        Observer, Pipe, RenderContext, Result, Str, VTree, modifiers,
        observable::from_fn,
        render,
    };

    #[cfg(any(test, feature = "test-utils"))]
    pub use crate::patch::memory::{MemoryHost, MemoryNode};
}
