//! Identifier Resolver.
//!
//! Maps a document filename to a pseudonymous patient token:
//! filename → raw patient key (filename convention) → SHA-256(secret ‖ key),
//! truncated to 12 hex characters.
//!
//! Key properties:
//! - The same raw key always yields the same token for a given secret
//! - Raw keys never leave this module and are never logged
//! - Filenames outside the convention become `SubjectId::Unidentified`;
//!   the filename itself is never hashed
//! - The cache is owned by one `PseudonymContext` and dies with it

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::config::{ConfigError, ParserConfig};

/// Hex characters kept from the digest.
pub const TOKEN_HEX_LEN: usize = 12;

/// Group identifier written for documents whose filename carries no patient code.
pub const UNIDENTIFIED: &str = "UNIDENTIFIED";

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Opaque pseudonymous patient token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PatientToken(String);

impl PatientToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
impl PatientToken {
    pub(crate) fn for_test(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl std::fmt::Display for PatientToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who a document belongs to, as far as the output is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectId {
    Pseudonym(PatientToken),
    /// Filename did not match the convention; the record needs operator review.
    Unidentified,
}

impl SubjectId {
    /// Value written to the `group_identifier` column.
    pub fn group_identifier(&self) -> &str {
        match self {
            Self::Pseudonym(token) => token.as_str(),
            Self::Unidentified => UNIDENTIFIED,
        }
    }

    pub fn is_identified(&self) -> bool {
        matches!(self, Self::Pseudonym(_))
    }
}

// ═══════════════════════════════════════════════════════════
// PseudonymContext
// ═══════════════════════════════════════════════════════════

/// Secret + filename convention + batch-scoped token cache.
pub struct PseudonymContext {
    secret: Zeroizing<String>,
    pattern: Regex,
    cache: Mutex<HashMap<String, PatientToken>>,
}

impl PseudonymContext {
    pub fn new(secret: Zeroizing<String>, filename_pattern: &str) -> Result<Self, ConfigError> {
        let pattern =
            Regex::new(filename_pattern).map_err(ConfigError::pattern("identity.filename_pattern"))?;
        Ok(Self {
            secret,
            pattern,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Build from configuration, resolving the secret from env or file.
    pub fn from_config(config: &ParserConfig) -> Result<Self, ConfigError> {
        let secret = config.resolve_secret()?;
        Self::new(secret, &config.identity.filename_pattern)
    }

    /// Resolve a filename to its subject.
    pub fn resolve(&self, filename: &str) -> SubjectId {
        match self.raw_key(filename) {
            Some(key) => SubjectId::Pseudonym(self.token_for(&key)),
            None => {
                tracing::warn!(
                    file = filename,
                    "Filename carries no patient code, subject marked unidentified"
                );
                SubjectId::Unidentified
            }
        }
    }

    /// The filename with its patient key replaced by the subject's group
    /// identifier. This is the only form of the name that is logged or
    /// reported.
    pub fn masked_filename(&self, filename: &str, subject: &SubjectId) -> String {
        match self.key_span(filename) {
            Some((start, end)) => format!(
                "{}{}{}",
                &filename[..start],
                subject.group_identifier(),
                &filename[end..]
            ),
            None => filename.to_string(),
        }
    }

    /// Raw patient key embedded in the filename, upper-cased.
    fn raw_key(&self, filename: &str) -> Option<String> {
        let (start, end) = self.key_span(filename)?;
        Some(filename[start..end].to_uppercase())
    }

    /// Byte range of the raw key: the first capture group, else the match.
    fn key_span(&self, filename: &str) -> Option<(usize, usize)> {
        let caps = self.pattern.captures(filename)?;
        let key = caps.get(1).or_else(|| caps.get(0))?;
        Some((key.start(), key.end()))
    }

    /// Memoized token for a raw key. Check and insert share one lock.
    fn token_for(&self, raw_key: &str) -> PatientToken {
        // A poisoned cache still holds only complete entries.
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(raw_key.to_string())
            .or_insert_with(|| digest_token(&self.secret, raw_key))
            .clone()
    }

    /// Number of distinct subjects seen so far in this run.
    pub fn subjects_seen(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn digest_token(secret: &str, raw_key: &str) -> PatientToken {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(raw_key.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest[..TOKEN_HEX_LEN / 2]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    PatientToken(hex)
}
