use std::{cell::RefCell, rc::Rc};

use waterdom_core::{DomPatcher, Effect, Mounted, RenderContext, Scheduler, VTree};

use crate::{
    dom::{DomRoot, WebHost},
    error::WebError,
    scheduler::WebScheduler,
};

/// Builder for [`WebApp`].
#[derive(Debug, Default, Clone)]
pub struct WebAppBuilder {
    root_id: Option<String>,
    class_name: Option<String>,
    capture_panics: bool,
}

impl WebAppBuilder {
    /// Creates a new builder with default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root_id: None,
            class_name: None,
            capture_panics: true,
        }
    }

    /// Sets the DOM element identifier that should host the application.
    #[must_use]
    pub fn with_root_id(mut self, id: impl Into<String>) -> Self {
        self.root_id = Some(id.into());
        self
    }

    /// Sets the CSS class name of the root element.
    #[must_use]
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Controls whether panics are forwarded to the browser console.
    #[must_use]
    pub const fn capture_panics(mut self, capture: bool) -> Self {
        self.capture_panics = capture;
        self
    }

    /// Finalises the builder and creates a [`WebApp`].
    ///
    /// # Errors
    ///
    /// Returns an error if the DOM root element cannot be found or initialized.
    pub fn build(self) -> Result<WebApp, WebError> {
        WebApp::new_with_options(self)
    }
}

/// Entry point for running waterdom trees inside the browser.
#[wasm_bindgen]
#[derive(Debug)]
pub struct WebApp {
    root: DomRoot,
    context: RenderContext,
    mounted: Rc<RefCell<Option<Mounted>>>,
}

impl WebApp {
    #[allow(clippy::needless_pass_by_value)]
    fn new_with_options(builder: WebAppBuilder) -> Result<Self, WebError> {
        if builder.capture_panics {
            console_error_panic_hook::set_once();
        }
        let root = DomRoot::new(builder.root_id.as_deref())?;
        if let Some(class_name) = &builder.class_name {
            root.set_class_name(class_name);
        }
        let host = WebHost::new(root.document().clone());
        let context = RenderContext::new(WebScheduler, DomPatcher::new(host, WebScheduler));
        Ok(Self {
            root,
            context,
            mounted: Rc::new(RefCell::new(None)),
        })
    }

    /// The context trees are converted with.
    #[must_use]
    pub const fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Resolves `tree` and mounts it into the root element, replacing the
    /// currently mounted tree.
    ///
    /// Pending effects are resolved on the browser's task queue; a failing
    /// effect leaves the root empty and is logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the previous tree cannot be removed.
    pub fn render(&self, tree: impl Into<Effect<VTree>>) -> Result<(), WebError> {
        self.clear()?;
        let render = waterdom_core::render(&self.context, &self.root.container(), tree);
        let mounted = Rc::clone(&self.mounted);
        WebScheduler.spawn(Box::pin(async move {
            match render.await {
                Ok(tree) => {
                    if let Some(previous) = mounted.borrow_mut().replace(tree) {
                        if let Err(error) = previous.unmount() {
                            tracing::warn!(%error, "failed to unmount replaced tree");
                        }
                    }
                }
                Err(error) => tracing::error!(%error, "failed to render tree"),
            }
        }));
        Ok(())
    }

    /// Patches the mounted tree in place.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is mounted yet or patching fails.
    pub fn update(&self, tree: &VTree) -> Result<(), WebError> {
        let mounted = self.mounted.borrow();
        let mounted = mounted
            .as_ref()
            .ok_or(WebError::Render(waterdom_core::Error::NotMounted))?;
        mounted.update(tree)?;
        Ok(())
    }
}

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
impl WebApp {
    /// Convenience constructor exposed to JavaScript callers.
    #[wasm_bindgen(constructor)]
    /// Creates a new [`WebApp`] using the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the DOM root element cannot be found or initialized.
    pub fn new() -> Result<Self, WebError> {
        Self::new_with_options(WebAppBuilder::new())
    }

    /// Unmounts the current tree, cancelling its subscriptions, and empties
    /// the root element.
    ///
    /// # Errors
    ///
    /// Returns an error if the DOM rejects the removal.
    #[wasm_bindgen]
    pub fn clear(&self) -> Result<(), WebError> {
        let previous = self.mounted.borrow_mut().take();
        if let Some(previous) = previous {
            previous.unmount()?;
        }
        self.root.clear()
    }
}
