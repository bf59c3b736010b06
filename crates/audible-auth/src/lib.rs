//! Audible device-session authentication library
//!
//! Establishes and maintains an authenticated session against the
//! Amazon/Audible device API: the interactive web login (with CAPTCHA and
//! one-time-password challenges), virtual-device registration, token refresh
//! with a re-registration fallback, and the persisted session record. This
//! crate is a standalone library — the signed request executor lives in
//! `audible-client` and builds on it.
//!
//! Session lifecycle:
//! 1. `LoginFlow::run()` drives the interactive sign-in → access token + cookies
//! 2. `Session::from_login()` adopts the result into a session record
//! 3. `register::register()` obtains the adp_token, device key, and
//!    bearer/refresh tokens
//! 4. `SessionStore` persists the record across process runs
//! 5. `token::refresh_or_register()` repairs the session on expiry; only if
//!    both paths fail does the caller rerun the interactive login

pub mod challenge;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod jar;
pub mod locale;
pub mod login;
pub mod page;
pub mod register;
pub mod session;
pub mod token;

pub use challenge::{ChallengeSolver, ConsoleSolver};
pub use crypto::{CryptoProvider, RsaCrypto, SignedRequest};
pub use error::{Error, Result};
pub use locale::{LocaleConfig, Marketplace};
pub use login::{LoginFlow, LoginSuccess};
pub use session::{Session, SessionStore, now_unix};
