#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Browser backend for waterdom.
//!
//! [`WebHost`] implements the patch layer's [`Host`](waterdom_core::Host) on
//! top of `web-sys`, [`WebScheduler`] drives reactive subtrees with
//! `wasm-bindgen-futures`, and [`WebApp`] bundles both behind a root element.
//!
//! ```rust,ignore
//! use waterdom_core::dsl::*;
//!
//! let app = WebAppBuilder::new().with_root_id("app").build()?;
//! app.render(div().with(["hello from waterdom"]))?;
//! ```

mod app;
mod dom;
mod error;
mod scheduler;

pub use app::{WebApp, WebAppBuilder};
pub use dom::{DomRoot, WebHost};
pub use error::WebError;
pub use scheduler::WebScheduler;
