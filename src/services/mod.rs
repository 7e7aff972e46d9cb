//! Business logic.
//!
//! - [`dedup`]: fingerprinting, the duplicate index and resolution
//! - [`scan`]: the streaming passes that drive a [`crate::MessageSource`]

pub mod dedup;
pub mod scan;
