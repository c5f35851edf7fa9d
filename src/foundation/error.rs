/// Convenience result type used across capstack.
pub type CapResult<T> = Result<T, CapstackError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Every variant aborts the current render call; nothing partial is ever returned alongside it.
#[derive(thiserror::Error, Debug)]
pub enum CapstackError {
    /// No items were given to plan or render.
    #[error("empty input: at least one item is required")]
    EmptyInput,

    /// A source image could not be resolved or decoded.
    #[error("image decode error: {0:#}")]
    ImageDecode(anyhow::Error),

    /// Compositing or drawing failed; wraps the underlying cause.
    #[error("render error: {0:#}")]
    Render(anyhow::Error),

    /// Encoding the composited surface failed.
    #[error("export error: {0}")]
    Export(String),

    /// Invalid caller-provided items or options.
    #[error("validation error: {0}")]
    Validation(String),
}

impl CapstackError {
    /// Build a [`CapstackError::ImageDecode`] from any error cause.
    pub fn image_decode(cause: impl Into<anyhow::Error>) -> Self {
        Self::ImageDecode(cause.into())
    }

    /// Build a [`CapstackError::Render`] from a message.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(anyhow::Error::msg(msg.into()))
    }

    /// Wrap an arbitrary failure as a [`CapstackError::Render`], keeping its chain.
    pub fn render_from(cause: impl Into<anyhow::Error>) -> Self {
        Self::Render(cause.into())
    }

    /// Build a [`CapstackError::Export`] value.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Build a [`CapstackError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Re-tag any error raised while compositing as a render failure.
    ///
    /// Errors that are already `Render` pass through unchanged so the cause is not wrapped twice.
    pub(crate) fn into_render(self) -> Self {
        match self {
            Self::Render(_) => self,
            other => Self::Render(anyhow::Error::new(other)),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
