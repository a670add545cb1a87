//! Composite tokens and presented credentials
//!
//! Wire format of the `Authorization` header, bit-exact:
//!
//! ```text
//! harperdb <subject_id>.<secret>
//! ```
//!
//! Case-sensitive scheme, one space, one `.` between the halves.

use std::fmt;

use common::Secret;
use rand::RngExt;

use crate::error::AuthError;

/// Authorization scheme literal.
pub const SCHEME: &str = "harperdb";

/// Random bytes in a subject id (hex-encoded to 24 characters).
pub const SUBJECT_ID_BYTES: usize = 12;

/// Generate a subject id from the thread-local CSPRNG.
pub fn generate_subject_id() -> String {
    let mut bytes = [0u8; SUBJECT_ID_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// `subject_id.secret`, handed to the client once at issuance.
pub struct CompositeToken(Secret<String>);

impl CompositeToken {
    pub(crate) fn compose(subject_id: &str, secret: &str) -> Self {
        Self(Secret::new(format!("{subject_id}.{secret}")))
    }

    pub fn as_str(&self) -> &str {
        self.0.expose()
    }

    pub fn subject_id(&self) -> &str {
        self.as_str()
            .split_once('.')
            .map(|(subject_id, _)| subject_id)
            .unwrap_or_default()
    }

    /// Full `Authorization` header value for this token.
    pub fn authorization_header(&self) -> String {
        format!("{SCHEME} {}", self.as_str())
    }
}

impl fmt::Debug for CompositeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompositeToken")
            .field(&self.subject_id())
            .field(&"[REDACTED]")
            .finish()
    }
}

/// Credential parsed out of an inbound `Authorization` header.
#[derive(Debug, PartialEq, Eq)]
pub struct PresentedCredential<'a> {
    pub subject_id: &'a str,
    pub secret: &'a str,
}

impl<'a> PresentedCredential<'a> {
    /// Parse the raw header value.
    ///
    /// An absent header is `MissingHeader`. Text before the first space must
    /// be exactly `harperdb`, else `InvalidScheme`. The rest must split on its
    /// first `.` into two non-empty halves with no further `.` or whitespace,
    /// else `MalformedToken`.
    pub fn parse(header: Option<&'a str>) -> Result<Self, AuthError> {
        let header = header.ok_or(AuthError::MissingHeader)?;
        let (scheme, rest) = header.split_once(' ').unwrap_or((header, ""));
        if scheme != SCHEME {
            return Err(AuthError::InvalidScheme);
        }

        let (subject_id, secret) = rest.split_once('.').ok_or(AuthError::MalformedToken)?;
        let well_formed = |part: &str| {
            !part.is_empty() && !part.contains('.') && !part.contains(char::is_whitespace)
        };
        if !well_formed(subject_id) || !well_formed(secret) {
            return Err(AuthError::MalformedToken);
        }

        Ok(Self { subject_id, secret })
    }
}
