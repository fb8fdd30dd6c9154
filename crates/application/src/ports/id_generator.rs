//! Identifier generation port

/// Produces collision-resistant identifiers for new variables.
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh identifier. Never returns the same value twice.
    fn generate(&self) -> String;
}
