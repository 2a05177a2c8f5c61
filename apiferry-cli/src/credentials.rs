//! Credential store backed by the process environment.

use apiferry_common::Result;
use apiferry_plugin::{CredentialStore, SsoCredentials};

/// Name of the environment variable holding SSO session cookies.
pub const SSO_COOKIES_ENV: &str = "APIFERRY_SSO_COOKIES";

/// Reads SSO cookies from `APIFERRY_SSO_COOKIES`, formatted as a standard
/// cookie string: `name=value` pairs separated by `;`.
pub struct EnvCredentialStore {
    var: &'static str,
}

impl EnvCredentialStore {
    pub fn new() -> Self {
        Self {
            var: SSO_COOKIES_ENV,
        }
    }
}

impl Default for EnvCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for EnvCredentialStore {
    fn retrieve_sso_credentials(&self) -> Result<Option<SsoCredentials>> {
        let Ok(raw) = std::env::var(self.var) else {
            return Ok(None);
        };
        let creds = parse_cookie_string(&raw);
        if creds.is_empty() {
            Ok(None)
        } else {
            Ok(Some(creds))
        }
    }
}

/// Parse a `name=value; name2=value2` cookie string. Entries without an `=`
/// are ignored.
fn parse_cookie_string(raw: &str) -> SsoCredentials {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}
