//! RFC 2617 HTTP Digest authentication.
//!
//! Only `algorithm=MD5` is implemented, with `qop=auth` or the legacy
//! no-qop form. MD5-sess and `auth-int` are rejected rather than downgraded.

use parking_lot::Mutex;
use rand::RngCore;
use tracing::debug;

use crate::error::AuthError;

/// Algorithm assumed when the challenge does not name one.
pub const DEFAULT_ALGORITHM: &str = "MD5";

const DIGEST_PREFIX: &str = "digest";

/// Username and password presented to the endpoint.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Server challenge plus the client's nonce bookkeeping for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: String,
    pub algorithm: String,
    /// qop options as offered, e.g. `auth` or `auth,auth-int`
    pub qop: String,
    pub domain: String,
    pub stale: String,
    pub cnonce: String,
    pub nonce_count: u32,
}

impl Default for AuthChallenge {
    fn default() -> Self {
        Self {
            realm: String::new(),
            nonce: String::new(),
            opaque: String::new(),
            algorithm: DEFAULT_ALGORITHM.to_string(),
            qop: String::new(),
            domain: String::new(),
            stale: String::new(),
            cnonce: String::new(),
            nonce_count: 0,
        }
    }
}

impl AuthChallenge {
    /// Parse a `WWW-Authenticate: Digest ...` header value.
    pub fn parse(header: &str) -> Result<Self, AuthError> {
        let header = header.trim();
        let params = match header.get(..DIGEST_PREFIX.len()) {
            Some(scheme) if scheme.eq_ignore_ascii_case(DIGEST_PREFIX) => {
                &header[DIGEST_PREFIX.len()..]
            }
            _ => {
                return Err(AuthError::MalformedChallenge(
                    "missing Digest scheme prefix".to_string(),
                ))
            }
        };
        if !params.starts_with(char::is_whitespace) {
            return Err(AuthError::MalformedChallenge(
                "missing Digest scheme prefix".to_string(),
            ));
        }

        let mut challenge = Self::default();
        let mut has_realm = false;
        let mut has_nonce = false;

        for (key, value) in split_params(params)? {
            match key.to_ascii_lowercase().as_str() {
                "realm" => {
                    challenge.realm = value;
                    has_realm = true;
                }
                "nonce" => {
                    challenge.nonce = value;
                    has_nonce = true;
                }
                "opaque" => challenge.opaque = value,
                "algorithm" => challenge.algorithm = value,
                "qop" => challenge.qop = value,
                "domain" => challenge.domain = value,
                "stale" => challenge.stale = value,
                _ => {}
            }
        }

        if !has_realm {
            return Err(AuthError::MissingField("realm"));
        }
        if !has_nonce {
            return Err(AuthError::MissingField("nonce"));
        }
        Ok(challenge)
    }

    /// `MD5(username:realm:password)`
    pub fn ha1(&self, credentials: &Credentials) -> String {
        hash(&format!(
            "{}:{}:{}",
            credentials.username, self.realm, credentials.password
        ))
    }

    /// `MD5(method:uri)`
    pub fn ha2(&self, method: &str, uri: &str) -> String {
        hash(&format!("{method}:{uri}"))
    }

    /// Negotiated qop: `Some("auth")`, `None` for the legacy form.
    fn selected_qop(&self) -> Result<Option<&'static str>, AuthError> {
        let offered = self.qop.trim();
        if offered.is_empty() {
            return Ok(None);
        }
        if offered
            .split(',')
            .any(|qop| qop.trim().eq_ignore_ascii_case("auth"))
        {
            Ok(Some("auth"))
        } else {
            Err(AuthError::UnsupportedQop(offered.to_string()))
        }
    }

    /// Request digest for the current nonce count and client nonce.
    pub fn response(
        &self,
        credentials: &Credentials,
        method: &str,
        uri: &str,
    ) -> Result<String, AuthError> {
        let ha1 = self.ha1(credentials);
        let ha2 = self.ha2(method, uri);
        match self.selected_qop()? {
            Some(qop) => Ok(hash(&format!(
                "{}:{}:{:08x}:{}:{}:{}",
                ha1, self.nonce, self.nonce_count, self.cnonce, qop, ha2
            ))),
            None => Ok(hash(&format!("{}:{}:{}", ha1, self.nonce, ha2))),
        }
    }

    /// Produce the next `Authorization` header value.
    pub fn authorize(
        &mut self,
        credentials: &Credentials,
        method: &str,
        uri: &str,
    ) -> Result<String, AuthError> {
        self.authorize_with_cnonce(credentials, method, uri, None)
    }

    /// As [`Self::authorize`], with a fixed client nonce.
    pub fn authorize_with_cnonce(
        &mut self,
        credentials: &Credentials,
        method: &str,
        uri: &str,
        cnonce: Option<&str>,
    ) -> Result<String, AuthError> {
        if !self.algorithm.eq_ignore_ascii_case(DEFAULT_ALGORITHM) {
            return Err(AuthError::UnsupportedAlgorithm(self.algorithm.clone()));
        }
        let qop = self.selected_qop()?;

        self.nonce_count += 1;
        if qop.is_some() {
            self.cnonce = match cnonce {
                Some(cnonce) => cnonce.to_string(),
                None => generate_cnonce(),
            };
        }
        let response = self.response(credentials, method, uri)?;

        let mut parts = vec![
            format!(r#"username="{}""#, quote(&credentials.username)),
            format!(r#"realm="{}""#, quote(&self.realm)),
            format!(r#"nonce="{}""#, quote(&self.nonce)),
            format!(r#"uri="{}""#, quote(uri)),
            format!(r#"response="{response}""#),
        ];
        if !self.opaque.is_empty() {
            parts.push(format!(r#"opaque="{}""#, quote(&self.opaque)));
        }
        if let Some(qop) = qop {
            parts.push(format!("qop={qop}"));
            parts.push(format!("nc={:08x}", self.nonce_count));
            parts.push(format!(r#"cnonce="{}""#, self.cnonce));
        }
        Ok(format!("Digest {}", parts.join(", ")))
    }
}

/// Lock-guarded digest state shared by every call on one client.
#[derive(Debug)]
pub struct DigestSession {
    credentials: Credentials,
    challenge: Mutex<Option<AuthChallenge>>,
}

impl DigestSession {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            challenge: Mutex::new(None),
        }
    }

    /// Replace the current challenge with one parsed from `header`.
    pub fn install(&self, header: &str) -> Result<(), AuthError> {
        let challenge = AuthChallenge::parse(header)?;
        debug!(realm = %challenge.realm, qop = %challenge.qop, "Installed digest challenge");
        *self.challenge.lock() = Some(challenge);
        Ok(())
    }

    /// Authorization header for the next request, if a challenge is installed.
    pub fn authorize(&self, method: &str, uri: &str) -> Result<Option<String>, AuthError> {
        match self.challenge.lock().as_mut() {
            Some(challenge) => challenge.authorize(&self.credentials, method, uri).map(Some),
            None => Ok(None),
        }
    }

    pub fn nonce_count(&self) -> Option<u32> {
        self.challenge.lock().as_ref().map(|c| c.nonce_count)
    }
}

fn hash(data: &str) -> String {
    format!("{:x}", md5::compute(data.as_bytes()))
}

/// Escape `"` and `\` for a quoted-string.
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// 8 random bytes, hex encoded.
fn generate_cnonce() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut cnonce = hex::encode(bytes);
    cnonce.truncate(16);
    cnonce
}

/// Split `key=value, key="quoted, value"` pairs.
fn split_params(input: &str) -> Result<Vec<(String, String)>, AuthError> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' {
                break;
            }
            key.push(c);
            chars.next();
        }
        let key = key.trim().to_string();
        if chars.next() != Some('=') || key.is_empty() {
            return Err(AuthError::MalformedChallenge(format!(
                "expected key=value, found `{key}`"
            )));
        }
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            if !closed {
                return Err(AuthError::MalformedChallenge(format!(
                    "unterminated quoted value for `{key}`"
                )));
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value = value.trim().to_string();
        }

        params.push((key, value));
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AMT_CHALLENGE: &str = r#"Digest realm="Digest:A3829B3827DE4D33D4449B366831FD01", nonce="gpHbAAAAAAAAAAAAAAAAAAAAAAAAAAA=", stale="false", qop="auth""#;

    fn rfc_challenge() -> AuthChallenge {
        AuthChallenge::parse(
            r#"Digest realm="testrealm@host.com", qop="auth,auth-int", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#,
        )
        .unwrap()
    }

    fn mufasa() -> Credentials {
        Credentials::new("Mufasa", "Circle Of Life")
    }

    #[test]
    fn test_parse_amt_challenge() {
        let challenge = AuthChallenge::parse(AMT_CHALLENGE).unwrap();
        assert_eq!(challenge.realm, "Digest:A3829B3827DE4D33D4449B366831FD01");
        assert_eq!(challenge.nonce, "gpHbAAAAAAAAAAAAAAAAAAAAAAAAAAA=");
        assert_eq!(challenge.stale, "false");
        assert_eq!(challenge.qop, "auth");
        assert_eq!(challenge.algorithm, "MD5");
        assert_eq!(challenge.nonce_count, 0);
    }

    #[test]
    fn test_parse_keeps_commas_inside_quotes() {
        let challenge = rfc_challenge();
        assert_eq!(challenge.qop, "auth,auth-int");
        assert_eq!(challenge.opaque, "5ccc069c403ebaf9f0171e9517f40e41");
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        let err = AuthChallenge::parse(r#"Basic realm="x""#).unwrap_err();
        assert!(matches!(err, AuthError::MalformedChallenge(_)));
        let err = AuthChallenge::parse(r#"Digestrealm="x""#).unwrap_err();
        assert!(matches!(err, AuthError::MalformedChallenge(_)));
    }

    #[test]
    fn test_parse_requires_realm_and_nonce() {
        assert_eq!(
            AuthChallenge::parse(r#"Digest nonce="abc""#).unwrap_err(),
            AuthError::MissingField("realm")
        );
        assert_eq!(
            AuthChallenge::parse(r#"Digest realm="r""#).unwrap_err(),
            AuthError::MissingField("nonce")
        );
    }

    #[test]
    fn test_parse_unterminated_quote() {
        let err = AuthChallenge::parse(r#"Digest realm="r, nonce=abc"#).unwrap_err();
        assert!(matches!(err, AuthError::MalformedChallenge(_)));
    }

    #[test]
    fn test_ha1_is_deterministic() {
        let challenge = AuthChallenge {
            realm: "realm".to_string(),
            ..Default::default()
        };
        let creds = Credentials::new("test", "pass");
        let first = challenge.ha1(&creds);
        assert_eq!(first, challenge.ha1(&creds));
        assert_eq!(first, format!("{:x}", md5::compute("test:realm:pass")));
        assert_eq!(first.len(), 32);
    }

    #[test]
    fn test_rfc2617_vectors() {
        let mut challenge = rfc_challenge();
        let creds = mufasa();
        assert_eq!(challenge.ha1(&creds), "939e7578ed9e3c518a452acee763bce9");
        assert_eq!(
            challenge.ha2("GET", "/dir/index.html"),
            "39aff3a2bab6126f332b942af96d3366"
        );

        let header = challenge
            .authorize_with_cnonce(&creds, "GET", "/dir/index.html", Some("0a4f113b"))
            .unwrap();
        assert!(header.starts_with("Digest "));
        assert!(header.contains(r#"response="6629fae49393a05397450978507c4ef1""#));
        assert!(header.contains("qop=auth"));
        assert!(header.contains("nc=00000001"));
        assert!(header.contains(r#"cnonce="0a4f113b""#));
        assert!(header.contains(r#"opaque="5ccc069c403ebaf9f0171e9517f40e41""#));
    }

    #[test]
    fn test_legacy_response_without_qop() {
        let challenge = AuthChallenge {
            realm: "realm".to_string(),
            ..Default::default()
        };
        let creds = Credentials::new("test", "pass");
        let expected = format!(
            "{:x}",
            md5::compute(format!(
                "{}::{}",
                challenge.ha1(&creds),
                format!("{:x}", md5::compute("POST:/path"))
            ))
        );
        assert_eq!(challenge.response(&creds, "POST", "/path").unwrap(), expected);
        assert_eq!(challenge.response(&creds, "POST", "/path").unwrap(), expected);

        let mut challenge = challenge;
        let header = challenge.authorize(&creds, "POST", "/path").unwrap();
        assert!(header.contains(&format!(r#"response="{expected}""#)));
        assert!(!header.contains("qop="));
        assert!(!header.contains("cnonce="));
    }

    #[test]
    fn test_nonce_count_increments_per_authorize() {
        let mut challenge = AuthChallenge::parse(AMT_CHALLENGE).unwrap();
        let creds = Credentials::new("admin", "P@ssw0rd");
        for expected in 1..=5u32 {
            let header = challenge.authorize(&creds, "POST", "/wsman").unwrap();
            assert_eq!(challenge.nonce_count, expected);
            assert!(header.contains(&format!("nc={expected:08x}")));
        }
    }

    #[test]
    fn test_generated_cnonce_is_16_hex_chars() {
        let mut challenge = AuthChallenge::parse(AMT_CHALLENGE).unwrap();
        challenge
            .authorize(&Credentials::new("admin", "pw"), "POST", "/wsman")
            .unwrap();
        assert_eq!(challenge.cnonce.len(), 16);
        assert!(challenge.cnonce.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_unsupported_qop_is_an_error() {
        let mut challenge =
            AuthChallenge::parse(r#"Digest realm="r", nonce="n", qop="auth-int""#).unwrap();
        let err = challenge
            .authorize(&Credentials::new("u", "p"), "POST", "/wsman")
            .unwrap_err();
        assert_eq!(err, AuthError::UnsupportedQop("auth-int".to_string()));
        assert_eq!(challenge.nonce_count, 0);
    }

    #[test]
    fn test_unsupported_algorithm_is_an_error() {
        let mut challenge = AuthChallenge::parse(
            r#"Digest realm="r", nonce="n", qop="auth", algorithm=MD5-sess"#,
        )
        .unwrap();
        let err = challenge
            .authorize(&Credentials::new("u", "p"), "POST", "/wsman")
            .unwrap_err();
        assert_eq!(err, AuthError::UnsupportedAlgorithm("MD5-sess".to_string()));
    }

    #[test]
    fn test_session_resets_count_on_new_challenge() {
        let session = DigestSession::new(Credentials::new("admin", "pw"));
        assert_eq!(session.nonce_count(), None);
        assert_eq!(session.authorize("POST", "/wsman").unwrap(), None);

        session.install(AMT_CHALLENGE).unwrap();
        session.authorize("POST", "/wsman").unwrap();
        session.authorize("POST", "/wsman").unwrap();
        assert_eq!(session.nonce_count(), Some(2));

        session
            .install(r#"Digest realm="r2", nonce="rotated", qop="auth""#)
            .unwrap();
        assert_eq!(session.nonce_count(), Some(0));
        let header = session.authorize("POST", "/wsman").unwrap().unwrap();
        assert!(header.contains(r#"nonce="rotated""#));
        assert!(header.contains("nc=00000001"));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let debug = format!("{:?}", Credentials::new("admin", "secret"));
        assert!(debug.contains("admin"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_quoted_values_are_escaped() {
        let mut challenge =
            AuthChallenge::parse(r#"Digest realm="AMT \"lab\"", nonce="n", qop="auth""#).unwrap();
        assert_eq!(challenge.realm, r#"AMT "lab""#);

        let credentials = Credentials::new(r#"ad"min\x"#, "pw");
        let header = challenge
            .authorize_with_cnonce(&credentials, "POST", "/wsman", Some("0a4f113b"))
            .unwrap();
        assert!(header.contains(r#"username="ad\"min\\x""#));
        assert!(header.contains(r#"realm="AMT \"lab\"""#));

        // The digest is computed over the unescaped values
        let expected = challenge.response(&credentials, "POST", "/wsman").unwrap();
        assert!(header.contains(&format!(r#"response="{expected}""#)));
    }

    #[test]
    fn test_escaped_header_parses_back() {
        let mut challenge = AuthChallenge::parse(r#"Digest realm="r", nonce="n""#).unwrap();
        let header = challenge
            .authorize(&Credentials::new(r#"we"ird\"#, "pw"), "POST", "/wsman")
            .unwrap();
        let params = split_params(header.trim_start_matches("Digest ")).unwrap();
        assert!(params.contains(&("username".to_string(), r#"we"ird\"#.to_string())));
    }
}
