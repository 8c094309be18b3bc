//! Caller-visible failures.
//!
//! Almost everything in the engine resolves denials by closing the
//! connection and logging; the errors here are the ones a caller can
//! actually act on.

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The link name is already bound, possibly to another registration.
    #[error("link name already in use: {0}")]
    DuplicateLink(String),

    /// The owning registry was dropped while this registration was still
    /// held. Directory operations are no longer possible.
    #[error("registry has been dropped")]
    RegistryGone,
}
