//! Per-market endpoint and protocol constant table
//!
//! Each marketplace maps to a fixed set of hosts and protocol parameters.
//! The table is keyed by the `Marketplace` enum rather than raw country-code
//! strings so a missing market is a compile error at the call site, not a
//! runtime lookup failure. Hosts are full base URLs, which also lets tests
//! point a config at a local fake server.

use serde::{Deserialize, Serialize};

/// Supported markets. Serializes as the lowercase country code, which is the
/// form the persisted session record carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marketplace {
    #[default]
    Us,
    Ca,
    Uk,
    Au,
    Fr,
    De,
    It,
    Es,
    In,
    Jp,
    Br,
}

impl Marketplace {
    /// Lowercase country code, matching the serialized form.
    pub fn country_code(self) -> &'static str {
        match self {
            Marketplace::Us => "us",
            Marketplace::Ca => "ca",
            Marketplace::Uk => "uk",
            Marketplace::Au => "au",
            Marketplace::Fr => "fr",
            Marketplace::De => "de",
            Marketplace::It => "it",
            Marketplace::Es => "es",
            Marketplace::In => "in",
            Marketplace::Jp => "jp",
            Marketplace::Br => "br",
        }
    }

    /// Reverse lookup from a country code, case-insensitive.
    pub fn from_country_code(code: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|m| m.country_code().eq_ignore_ascii_case(code))
    }

    pub fn all() -> &'static [Marketplace] {
        &[
            Marketplace::Us,
            Marketplace::Ca,
            Marketplace::Uk,
            Marketplace::Au,
            Marketplace::Fr,
            Marketplace::De,
            Marketplace::It,
            Marketplace::Es,
            Marketplace::In,
            Marketplace::Jp,
            Marketplace::Br,
        ]
    }

    /// Resolve this market's endpoint table entry.
    pub fn config(self) -> LocaleConfig {
        match self {
            Marketplace::Us => entry("us", "com", "com", "en_US", "en-US", "AF2M0KC94RCEA"),
            Marketplace::Ca => entry("ca", "ca", "ca", "en_CA", "en-CA", "A2CQZ5RBY40XE"),
            Marketplace::Uk => entry("uk", "co.uk", "co.uk", "en_GB", "en-GB", "A2I9A3Q2GNFNGQ"),
            Marketplace::Au => entry("au", "com.au", "com.au", "en_AU", "en-AU", "AN7EY7DTAW63G"),
            Marketplace::Fr => entry("fr", "fr", "fr", "fr_FR", "fr-FR", "A2728XDNODOQ8T"),
            Marketplace::De => entry("de", "de", "de", "de_DE", "de-DE", "AN7V1F1VY261K"),
            Marketplace::It => entry("it", "it", "it", "it_IT", "it-IT", "A2N7FU2W2BU2ZC"),
            Marketplace::Es => entry("es", "es", "es", "es_ES", "es-ES", "ALMIKO4SZCSAR"),
            Marketplace::In => entry("in", "in", "in", "en_IN", "en-IN", "AJO3FBRUE6J4S"),
            Marketplace::Jp => entry("jp", "co.jp", "co.jp", "ja_JP", "ja-JP", "A1QAP3MOU4173J"),
            Marketplace::Br => entry("br", "com.br", "com.br", "pt_BR", "pt-BR", "A10J1VAYUDTYRN"),
        }
    }
}

/// Endpoints and fixed protocol parameters for one market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleConfig {
    pub country_code: String,
    /// Login/landing host, e.g. `https://www.amazon.com`
    pub login_host: String,
    /// Device registration and token host, e.g. `https://api.amazon.com`
    pub api_host: String,
    /// Authenticated content API host, e.g. `https://api.audible.com`
    pub audible_api_host: String,
    /// OpenID association handle for the authorization request
    pub assoc_handle: String,
    /// Language tag sent as the `language` OAuth parameter
    pub oauth_lang: String,
    /// Marketplace identifier sent as `marketPlaceId`
    pub market_place_id: String,
    /// `Accept-Language` header value for login-page requests
    pub accept_language: String,
    /// Cookie domain declared in the registration request
    pub registration_domain: String,
}

fn entry(
    country_code: &str,
    amazon_tld: &str,
    audible_tld: &str,
    oauth_lang: &str,
    accept_language: &str,
    market_place_id: &str,
) -> LocaleConfig {
    LocaleConfig {
        country_code: country_code.to_string(),
        login_host: format!("https://www.amazon.{amazon_tld}"),
        api_host: format!("https://api.amazon.{amazon_tld}"),
        audible_api_host: format!("https://api.audible.{audible_tld}"),
        assoc_handle: format!("amzn_audible_ios_{country_code}"),
        oauth_lang: oauth_lang.to_string(),
        market_place_id: market_place_id.to_string(),
        accept_language: accept_language.to_string(),
        registration_domain: format!(".amazon.{amazon_tld}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn us_entry_points_at_dot_com() {
        let config = Marketplace::Us.config();
        assert_eq!(config.login_host, "https://www.amazon.com");
        assert_eq!(config.api_host, "https://api.amazon.com");
        assert_eq!(config.audible_api_host, "https://api.audible.com");
        assert_eq!(config.assoc_handle, "amzn_audible_ios_us");
        assert_eq!(config.market_place_id, "AF2M0KC94RCEA");
    }

    #[test]
    fn every_market_has_a_complete_entry() {
        for market in Marketplace::all() {
            let config = market.config();
            assert!(config.login_host.starts_with("https://www.amazon."));
            assert!(config.api_host.starts_with("https://api.amazon."));
            assert!(config.audible_api_host.starts_with("https://api.audible."));
            assert!(config.registration_domain.starts_with(".amazon."));
            assert!(!config.market_place_id.is_empty());
            assert_eq!(config.country_code, market.country_code());
        }
    }

    #[test]
    fn country_code_lookup_roundtrips() {
        for market in Marketplace::all() {
            assert_eq!(Marketplace::from_country_code(market.country_code()), Some(*market));
        }
        assert_eq!(Marketplace::from_country_code("UK"), Some(Marketplace::Uk));
        assert_eq!(Marketplace::from_country_code("xx"), None);
    }

    #[test]
    fn marketplace_serializes_as_country_code() {
        assert_eq!(serde_json::to_string(&Marketplace::De).unwrap(), "\"de\"");
        let parsed: Marketplace = serde_json::from_str("\"jp\"").unwrap();
        assert_eq!(parsed, Marketplace::Jp);
    }
}
