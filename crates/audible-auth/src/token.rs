//! Token refresh and the re-registration fallback
//!
//! `refresh` is the cheap path: exchange the refresh token for a new access
//! token. `refresh_or_register` is what the request executor calls on
//! expiry — it falls back to deregister + register so an expired session can
//! usually be repaired without dragging a human back through the interactive
//! login.

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::constants;
use crate::error::{Error, Result};
use crate::locale::LocaleConfig;
use crate::register;
use crate::session::{Session, now_unix};

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    /// Seconds until the new token expires (delta, not absolute)
    expires_in: u64,
}

/// Exchange the refresh token for a fresh access token.
///
/// On success only `access_token` and `expires` change; a failure leaves the
/// session untouched.
pub async fn refresh(
    client: &reqwest::Client,
    locale: &LocaleConfig,
    session: &mut Session,
) -> Result<()> {
    let url = format!("{}/auth/token", locale.api_host);
    debug!(url, "refreshing access token");

    let response = client
        .post(&url)
        .header(reqwest::header::USER_AGENT, constants::USER_AGENT)
        .form(&[
            ("app_name", constants::APP_NAME),
            ("app_version", constants::APP_VERSION),
            ("source_token", session.refresh_token.as_str()),
            ("source_token_type", "refresh_token"),
            ("requested_token_type", "access_token"),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::TokenRefresh(error_description(&body, status.as_u16())));
    }

    let refreshed: RefreshResponse = response
        .json()
        .await
        .map_err(|e| Error::TokenRefresh(format!("invalid token response: {e}")))?;

    session.access_token = refreshed.access_token;
    session.expires = now_unix() + refreshed.expires_in;
    info!(expires = session.expires, "access token refreshed");
    Ok(())
}

/// Repair an expired session: refresh, falling back to re-registration.
///
/// The fallback deregisters first (the issued device key is bound to one
/// registration) and then registers anew with the cookies and access token
/// the session still holds. A failed deregister is logged and skipped — the
/// point of the fallback is obtaining fresh credentials. Only when the
/// registration itself also fails is the session beyond repair and the
/// caller has to run the interactive login again.
pub async fn refresh_or_register(
    client: &reqwest::Client,
    locale: &LocaleConfig,
    session: &mut Session,
) -> Result<()> {
    let refresh_err = match refresh(client, locale, session).await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    warn!(error = %refresh_err, "token refresh failed, falling back to re-registration");

    if let Err(e) = register::deregister(client, locale, session).await {
        warn!(error = %e, "deregistration failed before re-registration");
    }

    register::register(client, locale, session).await.map_err(|e| {
        Error::FatalSession(format!(
            "refresh failed ({refresh_err}) and re-registration failed ({e}); \
             interactive login required"
        ))
    })
}

/// `error_description` from the endpoint, or a status-tagged fallback.
fn error_description(body: &str, status: u16) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error_description")
                .and_then(|d| d.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("token endpoint returned {status}: {body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::locale::Marketplace;

    fn test_locale(base: &str) -> LocaleConfig {
        LocaleConfig {
            country_code: "us".to_string(),
            login_host: base.to_string(),
            api_host: base.to_string(),
            audible_api_host: base.to_string(),
            assoc_handle: "amzn_audible_ios_us".to_string(),
            oauth_lang: "en_US".to_string(),
            market_place_id: "AF2M0KC94RCEA".to_string(),
            accept_language: "en-US".to_string(),
            registration_domain: ".amazon.com".to_string(),
        }
    }

    fn registered_session(expires: u64) -> Session {
        let mut cookies = HashMap::new();
        cookies.insert("session-id".to_string(), "123-4567890".to_string());
        Session {
            login_cookies: cookies,
            adp_token: "{enc:adp}".to_string(),
            access_token: "Atna|old".to_string(),
            refresh_token: "Atnr|refresh".to_string(),
            device_private_key: "pem".to_string(),
            expires,
            locale: Marketplace::Us,
        }
    }

    #[tokio::test]
    async fn refresh_advances_expiry_monotonically() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("source_token_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("requested_token_type".into(), "access_token".into()),
                mockito::Matcher::UrlEncoded("source_token".into(), "Atnr|refresh".into()),
            ]))
            .with_body(r#"{"access_token":"Atna|new","token_type":"bearer","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let locale = test_locale(&server.url());
        let previous_expires = now_unix() - 10;
        let mut session = registered_session(previous_expires);

        refresh(&reqwest::Client::new(), &locale, &mut session)
            .await
            .unwrap();

        assert_eq!(session.access_token, "Atna|new");
        assert!(session.expires > previous_expires);
        assert!(!session.access_token.is_empty());
        // refresh token and device credentials are not touched
        assert_eq!(session.refresh_token, "Atnr|refresh");
        assert_eq!(session.adp_token, "{enc:adp}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn refresh_failure_carries_error_description() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/token")
            .with_status(400)
            .with_body(
                r#"{"error":"invalid_grant","error_description":"The request has an invalid grant parameter"}"#,
            )
            .create_async()
            .await;

        let locale = test_locale(&server.url());
        let mut session = registered_session(now_unix() - 10);
        let before = session.clone();

        let err = refresh(&reqwest::Client::new(), &locale, &mut session)
            .await
            .unwrap_err();
        match err {
            Error::TokenRefresh(message) => {
                assert_eq!(message, "The request has an invalid grant parameter")
            }
            other => panic!("expected TokenRefresh error, got {other:?}"),
        }
        assert_eq!(session, before);
    }

    #[tokio::test]
    async fn fallback_re_registers_when_refresh_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/token")
            .with_status(400)
            .with_body(r#"{"error_description":"expired"}"#)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("POST", "/auth/deregister")
            .with_body(r#"{"response":{"success":{}}}"#)
            .expect(1)
            .create_async()
            .await;
        let register_mock = server
            .mock("POST", "/auth/register")
            .with_body(
                serde_json::json!({
                    "response": { "success": { "tokens": {
                        "bearer": {
                            "access_token": "Atna|reregistered",
                            "refresh_token": "Atnr|new",
                            "expires_in": 3600
                        },
                        "mac_dms": {
                            "device_private_key": "new-pem",
                            "adp_token": "{enc:new-adp}"
                        },
                        "website_cookies": []
                    } } }
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let locale = test_locale(&server.url());
        let mut session = registered_session(now_unix() - 10);

        refresh_or_register(&reqwest::Client::new(), &locale, &mut session)
            .await
            .unwrap();

        assert_eq!(session.access_token, "Atna|reregistered");
        assert_eq!(session.refresh_token, "Atnr|new");
        assert_eq!(session.adp_token, "{enc:new-adp}");
        assert!(session.expires > now_unix());
        register_mock.assert_async().await;
    }

    #[tokio::test]
    async fn fallback_failure_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/token")
            .with_status(400)
            .with_body(r#"{"error_description":"expired"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/auth/deregister")
            .with_status(400)
            .with_body(r#"{"response":{"error":{"message":"no registrations"}}}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/auth/register")
            .with_status(403)
            .with_body(r#"{"response":{"error":{"message":"Token has expired"}}}"#)
            .create_async()
            .await;

        let locale = test_locale(&server.url());
        let mut session = registered_session(now_unix() - 10);

        let err = refresh_or_register(&reqwest::Client::new(), &locale, &mut session)
            .await
            .unwrap_err();
        match err {
            Error::FatalSession(message) => {
                assert!(message.contains("expired"));
                assert!(message.contains("Token has expired"));
            }
            other => panic!("expected FatalSession error, got {other:?}"),
        }
    }
}
