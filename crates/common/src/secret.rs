//! Secret wrapper for sensitive values
//!
//! Used for the hashing salt, OAuth client secrets, record-store passwords and
//! provider access tokens. Nothing wrapped here ever reaches a log line.

use std::fmt;
use zeroize::Zeroize;

/// Sensitive value - redacted in Debug/Display/logs, zeroized on drop
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the inner value (use sparingly)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl Secret<String> {
    /// Read a secret from a file, trimming surrounding whitespace.
    ///
    /// Returns `Ok(None)` when the file holds only whitespace.
    pub fn from_file(path: &std::path::Path) -> std::io::Result<Option<Self>> {
        let mut raw = std::fs::read_to_string(path)?;
        let value = raw.trim().to_owned();
        raw.zeroize();
        if value.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Self(value)))
        }
    }
}

impl<T: Zeroize> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_secret_is_redacted() {
        let secret = Secret::new(String::from("oauth-client-secret"));
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn expose_returns_inner_value() {
        let secret: Secret<String> = String::from("salt-value").into();
        assert_eq!(secret.expose(), "salt-value");
    }

    #[test]
    fn from_file_trims_and_skips_blank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("salt");

        std::fs::write(&path, "  per-install-salt\n").unwrap();
        let secret = Secret::from_file(&path).unwrap().unwrap();
        assert_eq!(secret.expose(), "per-install-salt");

        std::fs::write(&path, " \n\t").unwrap();
        assert!(Secret::from_file(&path).unwrap().is_none());
    }

    #[test]
    fn from_file_missing_is_io_error() {
        let result = Secret::from_file(std::path::Path::new("/nonexistent/secret"));
        assert!(result.is_err());
    }
}
