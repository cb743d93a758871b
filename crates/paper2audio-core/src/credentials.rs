//! Credential lookup seam for the remote backends.
//!
//! Backends ask a [`CredentialProvider`] for keys at call time, before any
//! request is built. Production code reads the process environment; tests
//! hand in fixed values.

use std::collections::HashMap;

/// Environment variable holding the OpenAI API key (chat and speech).
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable holding the ElevenLabs API key.
pub const ELEVEN_API_KEY: &str = "ELEVEN_API_KEY";

pub trait CredentialProvider: Send + Sync {
    /// Look up a credential by name. Empty values are reported as absent.
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads credentials from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialProvider for EnvCredentials {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Fixed credential set.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        f.debug_struct("StaticCredentials")
            .field("names", &names)
            .finish()
    }
}

impl CredentialProvider for StaticCredentials {
    fn get(&self, name: &str) -> Option<String> {
        self.values
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}
