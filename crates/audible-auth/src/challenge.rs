//! Injected CAPTCHA / one-time-password capabilities
//!
//! The login flow suspends on these two operations; how a guess or a code is
//! actually produced (a human at a terminal, an authenticator app, a remote
//! solving service) is the implementation's business. Uses
//! `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`&dyn ChallengeSolver`).

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{Error, Result};

/// Human-verification steps the login flow can be challenged with.
pub trait ChallengeSolver: Send + Sync {
    /// Produce a guess for the CAPTCHA image at `image_url`.
    fn solve_captcha<'a>(
        &'a self,
        image_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

    /// Produce the account's current one-time password.
    fn otp_code(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;
}

/// Default solver: prompts on a line-based console.
pub struct ConsoleSolver;

impl ChallengeSolver for ConsoleSolver {
    fn solve_captcha<'a>(
        &'a self,
        image_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            println!("Open the CAPTCHA image and type the characters you see:");
            println!("  {image_url}");
            read_trimmed_line().await
        })
    }

    fn otp_code(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(async {
            println!("Enter the one-time password for your account:");
            read_trimmed_line().await
        })
    }
}

async fn read_trimmed_line() -> Result<String> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(|e| Error::Io(format!("reading console input: {e}")))?;
    Ok(line.trim().to_string())
}
