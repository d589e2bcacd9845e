//! Everything that happens to messages after they have been scored.
pub mod filter;
pub mod output;
