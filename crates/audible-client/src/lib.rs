//! Signed request execution against the Audible API
//!
//! `Client` wraps a persisted session and dispatches authenticated calls:
//! it checks token validity lazily on every request, repairs an expired
//! session through the refresh/re-register fallback, signs the canonical
//! request components with the device private key, and forwards to the
//! market's API host. No background refresh task exists — validity is only
//! ever ensured on demand.

mod client;
mod encode;
mod error;

pub use client::{Body, Client};
pub use error::{Error, Result};
