//! UUID-based identifier generation.

use hostvar_application::ports::IdGenerator;
use hostvar_domain::generate_id;

/// Generates variable ids as hyphenated lowercase UUID v4 strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl UuidIdGenerator {
    /// Creates a generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        generate_id()
    }
}
