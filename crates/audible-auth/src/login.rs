//! Interactive login state machine
//!
//! Drives the multi-step web sign-in against the login host: establish an
//! anti-bot session, submit credentials with an encrypted browser
//! fingerprint, and work through whatever challenges the upstream interleaves
//! (CAPTCHA, one-time password) until the authorization redirect hands back
//! an access token. The flow produces the token and the accumulated cookie
//! jar; device registration is the registrar's job.
//!
//! States: `Init → SessionEstablished → ChallengeSubmitted →
//! {CaptchaPending | MfaPending | Authorized | Failed}`. Each state has one
//! handler; the only suspension points are the injected captcha/OTP
//! capability calls. Failure is total — nothing is committed to a session
//! record on any failed run.

use std::collections::HashMap;

use common::Secret;
use reqwest::StatusCode;
use reqwest::header;
use tracing::{debug, info};
use url::Url;

use crate::challenge::ChallengeSolver;
use crate::constants;
use crate::crypto::CryptoProvider;
use crate::error::{Error, Result};
use crate::jar;
use crate::locale::LocaleConfig;
use crate::page;

/// Cap on landing-page round trips while waiting for the session cookie.
/// More than one trip is normal; a host that never issues the cookie is not.
const MAX_SESSION_ATTEMPTS: u32 = 10;

/// Query parameter carrying the access token on the authorization redirect.
const ACCESS_TOKEN_PARAM: &str = "openid.oa2.access_token";

/// Outcome of a successful flow: exactly what device registration needs.
#[derive(Debug)]
pub struct LoginSuccess {
    pub access_token: String,
    pub cookies: HashMap<String, String>,
}

/// One sign-in exchange as seen by the state machine.
struct SigninPage {
    status: StatusCode,
    location: Option<String>,
    body: String,
}

/// Typed state tag. `Failed` is expressed as the error return of `run`.
enum FlowState {
    Init,
    SessionEstablished,
    ChallengeSubmitted(SigninPage),
    CaptchaPending { image_url: String },
    MfaPending { location: String },
    Authorized { access_token: String },
}

/// Which challenge a terminal page error should be attributed to.
#[derive(Clone, Copy, PartialEq)]
enum Challenge {
    None,
    Captcha,
    Mfa,
}

/// Interactive login flow. Holds the working cookie jar and the accumulated
/// hidden form fields for the duration of one invocation.
pub struct LoginFlow<'a> {
    http: reqwest::Client,
    locale: &'a LocaleConfig,
    solver: &'a dyn ChallengeSolver,
    crypto: &'a dyn CryptoProvider,
    username: String,
    password: Secret<String>,
    fields: HashMap<String, String>,
    cookies: HashMap<String, String>,
    referer: String,
    challenge: Challenge,
}

impl<'a> LoginFlow<'a> {
    pub fn new(
        locale: &'a LocaleConfig,
        solver: &'a dyn ChallengeSolver,
        crypto: &'a dyn CryptoProvider,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        // Redirects are state transitions here, never followed blindly.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Http(format!("building login client: {e}")))?;
        Ok(Self {
            http,
            locale,
            solver,
            crypto,
            username: username.to_string(),
            password: Secret::new(password.to_string()),
            fields: HashMap::new(),
            cookies: HashMap::new(),
            referer: String::new(),
            challenge: Challenge::None,
        })
    }

    /// Run the flow to a terminal state.
    pub async fn run(mut self) -> Result<LoginSuccess> {
        let mut state = FlowState::Init;
        loop {
            state = match state {
                FlowState::Init => {
                    self.establish_session().await?;
                    FlowState::SessionEstablished
                }
                FlowState::SessionEstablished => {
                    FlowState::ChallengeSubmitted(self.submit_credentials().await?)
                }
                FlowState::ChallengeSubmitted(page) => self.classify(page)?,
                FlowState::CaptchaPending { image_url } => {
                    self.challenge = Challenge::Captcha;
                    FlowState::ChallengeSubmitted(self.submit_captcha_guess(&image_url).await?)
                }
                FlowState::MfaPending { location } => {
                    self.challenge = Challenge::Mfa;
                    FlowState::ChallengeSubmitted(self.submit_otp(&location).await?)
                }
                FlowState::Authorized { access_token } => {
                    info!("login authorized");
                    return Ok(LoginSuccess {
                        access_token,
                        cookies: self.cookies,
                    });
                }
            };
        }
    }

    /// GET the landing page until the anti-bot session cookie shows up.
    /// The host sometimes needs more than one round trip before issuing it.
    async fn establish_session(&mut self) -> Result<()> {
        for attempt in 1..=MAX_SESSION_ATTEMPTS {
            let response = self.get(&self.locale.login_host).await?;
            jar::merge_response_cookies(&mut self.cookies, &response);
            if self.cookies.contains_key(constants::SESSION_COOKIE) {
                debug!(attempt, "session cookie established");
                return Ok(());
            }
        }
        Err(Error::Login(format!(
            "login page issued no {} cookie after {MAX_SESSION_ATTEMPTS} attempts",
            constants::SESSION_COOKIE
        )))
    }

    /// GET the authorization page, collect its hidden fields, and POST the
    /// credentials with the encrypted fingerprint attached.
    async fn submit_credentials(&mut self) -> Result<SigninPage> {
        let oauth_url = self.oauth_url()?;
        let response = self.get(&oauth_url).await?;
        jar::merge_response_cookies(&mut self.cookies, &response);
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("reading authorization page: {e}")))?;
        self.fields.extend(page::hidden_inputs(&body));

        let fingerprint = self.fingerprint_payload(&oauth_url).to_string();
        let encrypted = self.crypto.encrypt_metadata(&fingerprint)?;
        self.fields.insert("metadata1".to_string(), encrypted);
        self.set_credential_fields();
        self.referer = oauth_url;

        debug!(fields = self.fields.len(), "submitting sign-in form");
        self.post_signin().await
    }

    /// Decide the next state from a sign-in exchange.
    fn classify(&self, page: SigninPage) -> Result<FlowState> {
        if page.status.is_redirection() {
            let location = page
                .location
                .ok_or_else(|| Error::Login("redirect without a location header".into()))?;
            let target = self.parse_redirect(&location)?;
            if let Some((_, token)) = target.query_pairs().find(|(k, _)| k == ACCESS_TOKEN_PARAM) {
                return Ok(FlowState::Authorized {
                    access_token: token.into_owned(),
                });
            }
            if target.path().contains("/ap/mfa") {
                return Ok(FlowState::MfaPending {
                    location: target.into(),
                });
            }
            // A redirect we don't recognize is not worth following blindly.
            return Err(self.challenge_error("unable to login".to_string()));
        }

        if let Some(image_url) = page::captcha_image_url(&page.body) {
            return Ok(FlowState::CaptchaPending { image_url });
        }

        let message = page::error_box_text(&page.body)
            .unwrap_or_else(|| "unable to login".to_string());
        Err(self.challenge_error(message))
    }

    /// Solve the CAPTCHA and resubmit the form with the guess attached.
    async fn submit_captcha_guess(&mut self, image_url: &str) -> Result<SigninPage> {
        info!("login challenged with a CAPTCHA");
        let guess = self.solver.solve_captcha(image_url).await?;
        self.fields
            .insert("guess".to_string(), guess.trim().to_lowercase());
        self.fields
            .insert("use_image_captcha".to_string(), "true".to_string());
        self.fields
            .insert("use_audio_captcha".to_string(), "false".to_string());
        self.fields
            .insert("showPasswordChecked".to_string(), "false".to_string());
        self.set_credential_fields();
        self.post_signin().await
    }

    /// Fetch the MFA page, collect its fields, and submit the one-time
    /// password.
    async fn submit_otp(&mut self, location: &str) -> Result<SigninPage> {
        info!("login challenged with a one-time password");
        let response = self.get(location).await?;
        jar::merge_response_cookies(&mut self.cookies, &response);
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("reading MFA page: {e}")))?;
        self.fields.extend(page::hidden_inputs(&body));

        let code = self.solver.otp_code().await?;
        self.fields
            .insert("otpCode".to_string(), code.trim().to_string());
        self.fields
            .insert("mfaSubmit".to_string(), "Submit".to_string());
        self.fields
            .insert("rememberDevice".to_string(), "false".to_string());
        self.post_signin().await
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .get(url)
            .header(header::USER_AGENT, constants::USER_AGENT)
            .header(header::ACCEPT_LANGUAGE, &self.locale.accept_language);
        if !self.cookies.is_empty() {
            request = request.header(header::COOKIE, jar::cookie_header(&self.cookies));
        }
        request
            .send()
            .await
            .map_err(|e| Error::Http(format!("GET {url}: {e}")))
    }

    async fn post_signin(&mut self) -> Result<SigninPage> {
        let url = format!("{}/ap/signin", self.locale.login_host);
        let mut request = self
            .http
            .post(&url)
            .header(header::USER_AGENT, constants::USER_AGENT)
            .header(header::ACCEPT_LANGUAGE, &self.locale.accept_language)
            .header(header::REFERER, &self.referer)
            .form(&self.fields);
        if !self.cookies.is_empty() {
            request = request.header(header::COOKIE, jar::cookie_header(&self.cookies));
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("POST {url}: {e}")))?;

        jar::merge_response_cookies(&mut self.cookies, &response);
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("reading sign-in response: {e}")))?;
        Ok(SigninPage {
            status,
            location,
            body,
        })
    }

    fn set_credential_fields(&mut self) {
        self.fields
            .insert("email".to_string(), self.username.clone());
        self.fields
            .insert("password".to_string(), self.password.expose().clone());
    }

    /// The fixed OAuth authorization request for this market.
    fn oauth_url(&self) -> Result<String> {
        let mut url = Url::parse(&format!("{}/ap/signin", self.locale.login_host))
            .map_err(|e| Error::Login(format!("bad login host: {e}")))?;
        let return_to = format!("{}/ap/maplanding", self.locale.login_host);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("openid.oa2.response_type", "token");
            query.append_pair("openid.oa2.client_id", &constants::oauth_client_id());
            query.append_pair("openid.return_to", &return_to);
            query.append_pair("openid.assoc_handle", &self.locale.assoc_handle);
            query.append_pair(
                "openid.identity",
                "http://specs.openid.net/auth/2.0/identifier_select",
            );
            query.append_pair(
                "openid.claimed_id",
                "http://specs.openid.net/auth/2.0/identifier_select",
            );
            query.append_pair("openid.mode", "checkid_setup");
            query.append_pair("openid.ns", "http://specs.openid.net/auth/2.0");
            query.append_pair("openid.ns.oa2", "http://www.amazon.com/ap/ext/oauth/2");
            query.append_pair("openid.ns.pape", "http://specs.openid.net/extensions/pape/1.0");
            query.append_pair("openid.pape.max_auth_age", "0");
            query.append_pair("marketPlaceId", &self.locale.market_place_id);
            query.append_pair("language", &self.locale.oauth_lang);
            query.append_pair("pageId", "amzn_audible_ios");
            query.append_pair("accountStatusPolicy", "P1");
            query.append_pair("forceMobileLayout", "true");
        }
        Ok(url.into())
    }

    /// Device/browser fingerprint submitted alongside the credentials:
    /// timing, capability flags, and form-interaction counters.
    fn fingerprint_payload(&self, location: &str) -> serde_json::Value {
        let now_ms = crate::session::now_unix() * 1000;
        serde_json::json!({
            "start": now_ms,
            "interaction": {
                "keys": 0,
                "keyPressTimeIntervals": [],
                "copies": 0,
                "cuts": 0,
                "pastes": 0,
                "clicks": 0,
                "touches": 0,
                "mouseClickPositions": [],
                "keyCycles": [],
                "mouseCycles": [],
                "touchCycles": []
            },
            "version": "3.0.0",
            "lsUbid": "X39-6721012-8795219:1549849158",
            "timeZone": -6,
            "scripts": { "dynamicUrls": [], "inlineHashes": [] },
            "plugins": "unknown||320-568-548-32-*-*-*",
            "screenInfo": "320-568-548-32-*-*-*",
            "capabilities": {
                "js": {
                    "audio": true,
                    "geolocation": true,
                    "localStorage": "supported",
                    "touch": true,
                    "video": true,
                    "webWorker": true
                },
                "css": {
                    "textShadow": true,
                    "textStroke": true,
                    "boxShadow": true,
                    "borderRadius": true,
                    "borderImage": true,
                    "opacity": true,
                    "transform": true,
                    "transition": true
                },
                "elapsed": 1
            },
            "referrer": "",
            "userAgent": constants::USER_AGENT,
            "location": location,
            "webDriver": null,
            "history": { "length": 1 },
            "performance": { "timing": { "navigationStart": now_ms } }
        })
    }

    /// The location header may be absolute or host-relative.
    fn parse_redirect(&self, location: &str) -> Result<Url> {
        match Url::parse(location) {
            Ok(url) => Ok(url),
            Err(_) => Url::parse(&self.locale.login_host)
                .and_then(|base| base.join(location))
                .map_err(|e| Error::Login(format!("unparseable redirect target {location}: {e}"))),
        }
    }

    fn challenge_error(&self, message: String) -> Error {
        match self.challenge {
            Challenge::Captcha => Error::Captcha(message),
            Challenge::Mfa => Error::Mfa(message),
            Challenge::None => Error::Login(message),
        }
    }
}
