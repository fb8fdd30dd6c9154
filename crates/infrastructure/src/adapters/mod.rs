//! Adapters for the clock and identifier ports.

mod system_clock;
mod uuid_generator;

pub use system_clock::SystemClock;
pub use uuid_generator::UuidIdGenerator;
