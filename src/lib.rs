#![doc = include_str!("../README.md")]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::future_not_send)]

pub mod config;
pub mod logging;

#[doc(inline)]
pub use tracing as log;
#[doc(inline)]
pub use waterdom_core::*;

pub mod prelude {
    //! Everything needed to build and render trees with one import.
    //!
    //! ```rust
    //! use waterdom::prelude::*;
    //!
    //! fn greeting(name: &'static str) -> VTree {
    //!     p().with([Modifier::from(class("greeting")), Modifier::from(name)])
    //! }
    //!
    //! assert_eq!(greeting("hello").modifiers().len(), 2);
    //! ```
    pub use crate::config::LogConfig;
    pub use waterdom_core::{dsl::*, prelude::*};
}
