//! Error types for selector parsing and resolution.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Result type for selector operations.
pub type Result<T> = std::result::Result<T, SelectorError>;

/// Errors raised while turning selectors into a node set.
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum SelectorError {
    /// The selector text is malformed.
    #[error("Invalid selector '{selector}': {reason} at position {position} ('{token}')")]
    #[diagnostic(
        code(noderun_select::syntax),
        help("selectors look like `users`, `tag:nightly`, `+orders`, `orders+2`, `@base_models` or `*`")
    )]
    Syntax {
        /// The full argument that failed to parse
        #[source_code]
        selector: String,
        /// Location of the offending token
        #[label("here")]
        span: SourceSpan,
        /// The offending token
        token: String,
        /// Byte offset of the token within the argument
        position: usize,
        /// What is wrong with the token
        reason: String,
    },

    /// The include set minus the exclude set is empty.
    #[error("Selection matched no nodes (select: {select}, exclude: {exclude})")]
    #[diagnostic(
        code(noderun_select::empty),
        help("check selector spelling, or drop --strict to treat an empty selection as a warning")
    )]
    Empty {
        /// Rendered include expression
        select: String,
        /// Rendered exclude expression
        exclude: String,
    },
}

impl SelectorError {
    /// Create a syntax error pointing at `token` inside `selector`.
    pub fn syntax(
        selector: impl Into<String>,
        position: usize,
        token: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let token = token.into();
        Self::Syntax {
            selector: selector.into(),
            span: (position, token.len()).into(),
            token,
            position,
            reason: reason.into(),
        }
    }
}
