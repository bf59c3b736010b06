//! Fixed virtual-device identity
//!
//! These values identify the mobile app to the login and registration
//! endpoints. They are not secrets — they describe the public client
//! application. The actual secrets (tokens, device private key) are issued
//! per account at registration and live in the session record.

/// Device type of the iOS app identity used for registration.
pub const DEVICE_TYPE: &str = "A2CZJZGLK2JJVM";

/// App name sent with token refresh and registration requests.
pub const APP_NAME: &str = "Audible";

/// App version matching the device identity above.
pub const APP_VERSION: &str = "3.56.2";

/// Software build number declared at registration.
pub const SOFTWARE_VERSION: &str = "35602678";

/// OS version string declared at registration.
pub const OS_VERSION: &str = "15.0.0";

/// Device model declared at registration.
pub const DEVICE_MODEL: &str = "iPhone";

/// Serial embedded in the OAuth authorization request's client id.
///
/// Constant by design: the login page only uses it to shape the
/// authorization request. Real device serials are generated fresh at
/// registration time.
pub const OAUTH_DEVICE_SERIAL: &str = "33CF9E0B4F7D4A2EAF9A8C1DE45E23FB";

/// Browser identity presented to the login pages.
pub const USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 15_7 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.6 Mobile/15E148 Safari/604.1";

/// Cookie that marks an established anti-bot session on the login host.
pub const SESSION_COOKIE: &str = "session-id";

/// OAuth client id: `device:` plus the lowercase hex of `SERIAL#TYPE`.
///
/// Only the serial-and-type part is hex encoded; the `device:` prefix stays
/// literal. The login endpoint rejects uppercase hex here.
pub fn oauth_client_id() -> String {
    let serial_and_type = format!("{OAUTH_DEVICE_SERIAL}#{DEVICE_TYPE}");
    let hex: String = serial_and_type
        .as_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    format!("device:{hex}")
}
