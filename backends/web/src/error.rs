use core::fmt;

/// Error type produced by the web backend.
#[derive(Debug, Clone)]
pub enum WebError {
    /// The DOM APIs are not accessible (e.g., when executed outside of a browser).
    DomUnavailable,
    /// The requested mounting node cannot be located.
    RootNotFound(String),
    /// Wrapper around JavaScript exceptions.
    Js(String),
    /// Composition, reconciliation or patching failed.
    Render(waterdom_core::Error),
}

impl WebError {
    /// Converts a failed DOM call into the core error of a host operation.
    pub(crate) fn into_host(self, op: &'static str) -> waterdom_core::Error {
        match self {
            Self::Render(error) => error,
            other => waterdom_core::Error::host(op, other),
        }
    }
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DomUnavailable => write!(f, "DOM is not available"),
            Self::RootNotFound(id) => write!(f, "Failed to find DOM element with id `{id}`"),
            Self::Js(msg) => write!(f, "JavaScript error: {msg}"),
            Self::Render(error) => write!(f, "Render error: {error}"),
        }
    }
}

impl std::error::Error for WebError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Render(error) => Some(error),
            _ => None,
        }
    }
}

impl From<wasm_bindgen::JsValue> for WebError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        value
            .as_string()
            .map_or_else(|| Self::Js(format!("{value:?}")), Self::Js)
    }
}

impl From<waterdom_core::Error> for WebError {
    fn from(value: waterdom_core::Error) -> Self {
        Self::Render(value)
    }
}

impl From<WebError> for wasm_bindgen::JsValue {
    fn from(value: WebError) -> Self {
        Self::from(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_failures_become_host_errors() {
        let error = WebError::Js("NotFoundError".into()).into_host("remove_child");
        assert_eq!(
            error.to_string(),
            "host operation `remove_child` failed: JavaScript error: NotFoundError"
        );
    }

    #[test]
    fn render_errors_pass_through_unchanged() {
        let error = WebError::from(waterdom_core::Error::NotMounted).into_host("insert_before");
        assert!(matches!(error, waterdom_core::Error::NotMounted));
        assert_eq!(
            WebError::RootNotFound("app".into()).to_string(),
            "Failed to find DOM element with id `app`"
        );
    }
}
