// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP Digest authentication (RFC 7616 subset).
//!
//! Supports the MD5, SHA-1, SHA-256, SHA-512 and SHA-512/256 hash functions,
//! their `-sess` variants, and the `auth`/`auth-int` quality of protection
//! values. When the challenge offers no `qop`, the legacy RFC 2069 response
//! is computed.

use std::collections::HashMap;
use std::fmt::Write as _;

use md5::Md5;
use parking_lot::Mutex;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512, Sha512_256};

use crate::error::ChallengeError;

/// Nonce counters kept before the least recently used one is evicted.
const MAX_TRACKED_NONCES: usize = 32;

/// Hash function requested by a digest challenge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// MD5, the default when the challenge names no algorithm.
    #[default]
    Md5,
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
    /// SHA-512/256.
    Sha512_256,
    /// SHA-512.
    Sha512,
}

impl DigestAlgorithm {
    /// Parses an `algorithm` token, returning the hash and whether the
    /// `-sess` variant was requested.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::UnsupportedAlgorithm`] for unknown tokens.
    pub fn parse(token: &str) -> Result<(Self, bool), ChallengeError> {
        let upper = token.trim().to_ascii_uppercase();
        let (base, sess) = match upper.strip_suffix("-SESS") {
            Some(base) => (base, true),
            None => (upper.as_str(), false),
        };

        let algorithm = match base {
            "MD5" => Self::Md5,
            "SHA" | "SHA-1" => Self::Sha1,
            "SHA-256" => Self::Sha256,
            "SHA-512-256" => Self::Sha512_256,
            "SHA-512" => Self::Sha512,
            _ => return Err(ChallengeError::UnsupportedAlgorithm(token.to_string())),
        };

        Ok((algorithm, sess))
    }

    /// Hashes `data` and returns the lowercase hex digest.
    #[must_use]
    pub fn hash(self, data: &str) -> String {
        match self {
            Self::Md5 => hex_digest::<Md5>(data),
            Self::Sha1 => hex_digest::<Sha1>(data),
            Self::Sha256 => hex_digest::<Sha256>(data),
            Self::Sha512_256 => hex_digest::<Sha512_256>(data),
            Self::Sha512 => hex_digest::<Sha512>(data),
        }
    }
}

fn hex_digest<D: Digest>(data: &str) -> String {
    hex::encode(D::digest(data.as_bytes()))
}

/// A parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    /// Protection space.
    pub realm: String,
    /// Server nonce.
    pub nonce: String,
    /// Opaque value to echo back, if any.
    pub opaque: Option<String>,
    /// Hash function.
    pub algorithm: DigestAlgorithm,
    /// Whether the `-sess` variant was requested.
    pub session: bool,
    /// The algorithm token exactly as sent by the server.
    pub algorithm_token: Option<String>,
    /// Offered quality of protection values, lowercased.
    pub qop: Vec<String>,
}

impl DigestChallenge {
    /// Parses a `WWW-Authenticate` header value.
    ///
    /// Parameters are comma separated `key=value` pairs; quoted values may
    /// themselves contain commas.
    ///
    /// # Errors
    ///
    /// - [`ChallengeError::Missing`] if the header is not a digest challenge
    /// - [`ChallengeError::Incomplete`] if `realm` or `nonce` is absent
    /// - [`ChallengeError::UnsupportedAlgorithm`] for unknown hash functions
    ///
    /// # Examples
    ///
    /// ```
    /// use twonr_lib::auth::DigestChallenge;
    ///
    /// let challenge = DigestChallenge::parse(
    ///     r#"Digest realm="HTTP API", qop="auth,auth-int", nonce="abc", opaque="x,y""#,
    /// ).unwrap();
    /// assert_eq!(challenge.realm, "HTTP API");
    /// assert_eq!(challenge.opaque.as_deref(), Some("x,y"));
    /// assert_eq!(challenge.selected_qop(), Some("auth"));
    /// ```
    pub fn parse(header: &str) -> Result<Self, ChallengeError> {
        let header = header.trim();
        let (scheme, params) = header
            .split_once(char::is_whitespace)
            .unwrap_or((header, ""));
        if !scheme.eq_ignore_ascii_case("digest") {
            return Err(ChallengeError::Missing);
        }

        let mut fields: HashMap<String, String> = HashMap::new();
        for part in split_params(params) {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            if key.is_empty() {
                continue;
            }
            fields.insert(key, unquote(value));
        }

        let realm = fields
            .remove("realm")
            .ok_or(ChallengeError::Incomplete("realm"))?;
        let nonce = fields
            .remove("nonce")
            .filter(|n| !n.is_empty())
            .ok_or(ChallengeError::Incomplete("nonce"))?;

        let algorithm_token = fields.remove("algorithm").filter(|a| !a.is_empty());
        let (algorithm, session) = match &algorithm_token {
            Some(token) => DigestAlgorithm::parse(token)?,
            None => (DigestAlgorithm::Md5, false),
        };

        let qop = fields
            .remove("qop")
            .map(|q| {
                q.split(',')
                    .map(|v| v.trim().to_ascii_lowercase())
                    .filter(|v| !v.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            realm,
            nonce,
            opaque: fields.remove("opaque"),
            algorithm,
            session,
            algorithm_token,
            qop,
        })
    }

    /// Returns the quality of protection to answer with.
    ///
    /// Prefers `auth` when offered, otherwise the first offered value.
    #[must_use]
    pub fn selected_qop(&self) -> Option<&str> {
        if self.qop.iter().any(|q| q == "auth") {
            return Some("auth");
        }
        self.qop.first().map(String::as_str)
    }
}

/// Splits on commas that are not inside a quoted string.
fn split_params(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Computes `Authorization: Digest ...` header values for one account.
///
/// The authenticator keeps a request counter (`nc`) per server nonce. The
/// counter is incremented under a lock, so concurrent requests answering the
/// same challenge each get a distinct, strictly increasing value.
///
/// # Examples
///
/// ```
/// use twonr_lib::auth::DigestAuthenticator;
///
/// let auth = DigestAuthenticator::new("admin", "secret");
/// let header = auth
///     .build_authorization(
///         "GET",
///         "/api/system/info",
///         r#"Digest realm="HTTP API", qop="auth", nonce="0123""#,
///     )
///     .unwrap();
/// assert!(header.starts_with("Digest username=\"admin\""));
/// assert!(header.contains("nc=00000001"));
/// ```
pub struct DigestAuthenticator {
    username: String,
    password: String,
    nonce_counts: Mutex<NonceCounts>,
}

/// Per-nonce request counters with least-recently-used eviction.
#[derive(Debug, Default)]
struct NonceCounts {
    tick: u64,
    entries: HashMap<String, NonceEntry>,
}

#[derive(Debug, Clone, Copy)]
struct NonceEntry {
    count: u32,
    last_used: u64,
}

impl NonceCounts {
    fn get(&self, nonce: &str) -> u32 {
        self.entries.get(nonce).map_or(0, |e| e.count)
    }

    fn next(&mut self, nonce: &str) -> u32 {
        self.tick += 1;
        if self.entries.len() >= MAX_TRACKED_NONCES && !self.entries.contains_key(nonce) {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }

        let entry = self
            .entries
            .entry(nonce.to_string())
            .or_insert(NonceEntry { count: 0, last_used: 0 });
        entry.count = entry.count.wrapping_add(1);
        entry.last_used = self.tick;
        entry.count
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl DigestAuthenticator {
    /// Creates an authenticator for the given account.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            nonce_counts: Mutex::new(NonceCounts::default()),
        }
    }

    /// Builds an `Authorization` header value answering `challenge_header`.
    ///
    /// A fresh random client nonce is generated for every call.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError`] if the challenge is missing or incomplete.
    pub fn build_authorization(
        &self,
        method: &str,
        target_uri: &str,
        challenge_header: &str,
    ) -> Result<String, ChallengeError> {
        let challenge = DigestChallenge::parse(challenge_header)?;
        Ok(self.authorize(method, target_uri, &challenge))
    }

    /// Builds an `Authorization` header value for an already parsed challenge.
    #[must_use]
    pub fn authorize(&self, method: &str, target_uri: &str, challenge: &DigestChallenge) -> String {
        let cnonce = hex::encode(rand::random::<[u8; 8]>());
        let nonce_count = self.next_nonce_count(&challenge.nonce);
        self.compose(method, target_uri, challenge, &cnonce, nonce_count)
    }

    /// Returns the current counter for `nonce` (0 if never used).
    #[must_use]
    pub fn nonce_count(&self, nonce: &str) -> u32 {
        self.nonce_counts.lock().get(nonce)
    }

    fn next_nonce_count(&self, nonce: &str) -> u32 {
        self.nonce_counts.lock().next(nonce)
    }

    fn compose(
        &self,
        method: &str,
        uri: &str,
        challenge: &DigestChallenge,
        cnonce: &str,
        nonce_count: u32,
    ) -> String {
        let algorithm = challenge.algorithm;
        let nc = format!("{nonce_count:08x}");
        let qop = challenge.selected_qop();

        let mut ha1 = algorithm.hash(&format!(
            "{}:{}:{}",
            self.username, challenge.realm, self.password
        ));
        if challenge.session {
            ha1 = algorithm.hash(&format!("{ha1}:{}:{cnonce}", challenge.nonce));
        }

        let ha2 = if qop == Some("auth-int") {
            // GET requests carry no entity body
            let body_hash = algorithm.hash("");
            algorithm.hash(&format!("{method}:{uri}:{body_hash}"))
        } else {
            algorithm.hash(&format!("{method}:{uri}"))
        };

        let response = match qop {
            Some(qop) => algorithm.hash(&format!(
                "{ha1}:{}:{nc}:{cnonce}:{qop}:{ha2}",
                challenge.nonce
            )),
            None => algorithm.hash(&format!("{ha1}:{}:{ha2}", challenge.nonce)),
        };

        let mut header = format!(
            "Digest username={}, realm={}, nonce={}, uri={}, response={}",
            quote(&self.username),
            quote(&challenge.realm),
            quote(&challenge.nonce),
            quote(uri),
            quote(&response),
        );
        if let Some(token) = &challenge.algorithm_token {
            let _ = write!(header, ", algorithm={token}");
        }
        if let Some(opaque) = &challenge.opaque {
            let _ = write!(header, ", opaque={}", quote(opaque));
        }
        if let Some(qop) = qop {
            let _ = write!(header, ", qop={qop}, nc={nc}, cnonce={}", quote(cnonce));
        }
        header
    }
}

impl std::fmt::Debug for DigestAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestAuthenticator")
            .field("username", &self.username)
            .field("tracked_nonces", &self.nonce_counts.lock().len())
            .finish_non_exhaustive()
    }
}
