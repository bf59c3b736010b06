//! Common types for the Audible session workspace

mod secret;

pub use secret::Secret;
