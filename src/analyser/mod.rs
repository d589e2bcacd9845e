//! The core of bus capture analysis.
//! Reassemble transactions from byte rows, pair requests with replies, and score every
//! exchange against what the same address did before.
pub mod assembler;
pub mod containers;
pub mod core;
pub mod diff;
pub mod error;
pub mod grouper;
pub mod rules;
pub mod utils;
