use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Maximum number of numbered fallback key slots scanned per provider
/// (`<PREFIX>_API_KEY_1` .. `<PREFIX>_API_KEY_10`).
const FALLBACK_KEY_SLOTS: usize = 10;

/// Supported vision providers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Provider {
    Gemini,
    OpenAi,
    Anthropic,
}

impl Provider {
    fn env_prefix(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI",
            Provider::OpenAi => "OPENAI",
            Provider::Anthropic => "ANTHROPIC",
        }
    }
}

/// One provider/API-key pair. Immutable once loaded.
#[derive(Clone)]
pub struct CredentialEntry {
    pub provider: Provider,
    pub api_key: String,
}

impl std::fmt::Debug for CredentialEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialEntry")
            .field("provider", &self.provider)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Ordered pool of provider credentials with a round-robin cursor.
///
/// The cursor is the only state mutated by concurrent callers (single-job
/// submissions and a running batch both draw from the pool), so it owns its
/// own mutex. Rotation is strict: every entry is revisited with equal
/// frequency, regardless of provider health.
pub struct CredentialPool {
    entries: Vec<CredentialEntry>,
    cursor: Mutex<usize>,
}

impl CredentialPool {
    pub fn new(entries: Vec<CredentialEntry>) -> Self {
        Self {
            entries,
            cursor: Mutex::new(0),
        }
    }

    /// Scan all configured credential sources: one primary slot per provider
    /// plus up to ten numbered fallback slots, in fixed provider-group order
    /// (gemini, openai, anthropic). Within a provider, source order is kept.
    pub fn from_env() -> Self {
        let mut entries = Vec::new();

        for provider in [Provider::Gemini, Provider::OpenAi, Provider::Anthropic] {
            let prefix = provider.env_prefix();

            if let Ok(key) = std::env::var(format!("{prefix}_API_KEY")) {
                if !key.is_empty() {
                    entries.push(CredentialEntry { provider, api_key: key });
                }
            }

            for slot in 1..=FALLBACK_KEY_SLOTS {
                if let Ok(key) = std::env::var(format!("{prefix}_API_KEY_{slot}")) {
                    if !key.is_empty() {
                        entries.push(CredentialEntry { provider, api_key: key });
                    }
                }
            }
        }

        Self::new(entries)
    }

    /// Issue the entry at the cursor and advance it modulo the pool length.
    /// `None` means no provider is configured; callers must treat that as a
    /// hard failure for the current job, not a retryable condition.
    pub fn next_credential(&self) -> Option<CredentialEntry> {
        if self.entries.is_empty() {
            return None;
        }

        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        let entry = self.entries[*cursor].clone();
        *cursor = (*cursor + 1) % self.entries.len();
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
