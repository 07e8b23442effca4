//! Directive error types.

/// Error produced when a fetch call's input cannot be normalized.
///
/// Fatal to the fetch call that produced it; never affects other calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectiveError {
    #[error("Fetch input has no URL")]
    MissingUrl,

    #[error("Invalid fetch URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}
