//! Context extension trait for error handling.

use super::types::HgdbError;

/// Extension trait for adding context to `Result` types.
///
/// This provides `anyhow`-style context methods while preserving the
/// typed error system.
pub trait HgdbResultExt<T> {
    /// Add context to an error.
    fn context<C: Into<String>>(self, context: C) -> Result<T, HgdbError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<C, F>(self, f: F) -> Result<T, HgdbError>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E: Into<HgdbError>> HgdbResultExt<T> for Result<T, E> {
    fn context<C: Into<String>>(self, context: C) -> Result<T, HgdbError> {
        self.map_err(|e| HgdbError::WithContext {
            context: context.into(),
            source: Box::new(e.into()),
        })
    }

    fn with_context<C, F>(self, f: F) -> Result<T, HgdbError>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| HgdbError::WithContext {
            context: f().into(),
            source: Box::new(e.into()),
        })
    }
}
