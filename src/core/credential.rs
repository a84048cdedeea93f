//! API credential resolution
//!
//! A [`CredentialProvider`] walks an ordered chain of resolvers and returns
//! the first non-empty key. Which resolvers make up the chain is fixed per
//! build ([`Variant`]); a key entered for the current session is held in an
//! explicit [`SessionCredential`] and never written anywhere.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, warn};
use zeroize::Zeroize;

/// Environment variable read by the default build
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Secrets file name inside `.bomx/` or the global config directory
pub const SECRETS_FILE: &str = "secrets.yaml";

/// Two-level key looked up in the secrets file
pub const SECRETS_SECTION: &str = "general";
pub const SECRETS_KEY: &str = "GOOGLE_API_KEY";

/// Fallback key compiled into `embedded-key` builds
const EMBEDDED_KEY: Option<&str> = option_env!("BOMX_FALLBACK_API_KEY");

/// Where to get a key, shown when prompting for one
pub const API_KEY_URL: &str = "https://aistudio.google.com/app/apikey";

/// An API key that never shows up in logs or debug output
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    inner: String,
}

impl Credential {
    /// Wrap a key, rejecting empty or whitespace-only values
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let mut key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            key.zeroize();
            return None;
        }
        let inner = trimmed.to_string();
        key.zeroize();
        Some(Self { inner })
    }

    /// The actual key, for the outgoing request only
    #[inline]
    pub fn expose(&self) -> &str {
        &self.inner
    }

    /// First and last characters, safe to display
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.inner.chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 3..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential([REDACTED])")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED API KEY]")
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

/// Where a resolved key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Session,
    SecretStore,
    Embedded,
    Environment,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Session => write!(f, "session"),
            CredentialSource::SecretStore => write!(f, "secrets file"),
            CredentialSource::Embedded => write!(f, "built-in fallback"),
            CredentialSource::Environment => write!(f, "environment"),
        }
    }
}

/// One link of the resolution chain
pub trait CredentialResolver {
    fn source(&self) -> CredentialSource;

    /// Look the key up; `None` means "try the next resolver"
    fn resolve(&self) -> Option<Credential>;

    /// How a user configures this source, for error messages
    fn describe(&self) -> String;
}

/// `general.GOOGLE_API_KEY` in the first readable secrets file
pub struct SecretStore {
    paths: Vec<PathBuf>,
}

impl SecretStore {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    fn read(path: &std::path::Path) -> Option<Credential> {
        let contents = std::fs::read_to_string(path).ok()?;
        let value: serde_yml::Value = match serde_yml::from_str(&contents) {
            Ok(v) => v,
            Err(e) => {
                warn!("Ignoring unreadable secrets file {}: {}", path.display(), e);
                return None;
            }
        };
        value
            .get(SECRETS_SECTION)
            .and_then(|section| section.get(SECRETS_KEY))
            .and_then(|key| key.as_str())
            .and_then(Credential::new)
    }
}

impl CredentialResolver for SecretStore {
    fn source(&self) -> CredentialSource {
        CredentialSource::SecretStore
    }

    fn resolve(&self) -> Option<Credential> {
        self.paths.iter().find_map(|path| {
            let found = Self::read(path);
            if found.is_some() {
                debug!("API key found in {}", path.display());
            }
            found
        })
    }

    fn describe(&self) -> String {
        let locations: Vec<String> = self
            .paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        if locations.is_empty() {
            format!("add {}.{} to a secrets file", SECRETS_SECTION, SECRETS_KEY)
        } else {
            format!(
                "add {}.{} to {}",
                SECRETS_SECTION,
                SECRETS_KEY,
                locations.join(" or ")
            )
        }
    }
}

/// Key read from an environment variable
pub struct EnvVar {
    name: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl CredentialResolver for EnvVar {
    fn source(&self) -> CredentialSource {
        CredentialSource::Environment
    }

    fn resolve(&self) -> Option<Credential> {
        std::env::var(&self.name).ok().and_then(Credential::new)
    }

    fn describe(&self) -> String {
        format!("set the {} environment variable", self.name)
    }
}

/// Key embedded in the binary at build time
pub struct StaticFallback {
    value: Option<&'static str>,
}

impl StaticFallback {
    pub fn new(value: Option<&'static str>) -> Self {
        Self { value }
    }

    pub fn embedded() -> Self {
        Self::new(EMBEDDED_KEY)
    }
}

impl CredentialResolver for StaticFallback {
    fn source(&self) -> CredentialSource {
        CredentialSource::Embedded
    }

    fn resolve(&self) -> Option<Credential> {
        self.value.and_then(Credential::new)
    }

    fn describe(&self) -> String {
        "rebuild with BOMX_FALLBACK_API_KEY set".to_string()
    }
}

/// Key entered by the user for the current session only
#[derive(Debug, Default)]
pub struct SessionCredential {
    value: Option<Credential>,
}

impl SessionCredential {
    /// Save a key for this session; empty input is rejected
    pub fn set(&mut self, key: impl Into<String>) -> bool {
        match Credential::new(key) {
            Some(credential) => {
                self.value = Some(credential);
                true
            }
            None => false,
        }
    }

    /// Forget the saved key
    pub fn clear(&mut self) {
        self.value = None;
    }

    pub fn get(&self) -> Option<&Credential> {
        self.value.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

/// Build variant deciding which resolvers back the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Secrets file, then the key compiled into the binary
    Embedded,
    /// Secrets file, then `GOOGLE_API_KEY`
    Environment,
    /// Secrets file, then whatever the user enters
    Session,
}

impl Variant {
    /// Variant selected by cargo features for this build
    pub const fn current() -> Self {
        if cfg!(feature = "embedded-key") {
            Variant::Embedded
        } else if cfg!(feature = "session-key") {
            Variant::Session
        } else {
            Variant::Environment
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Embedded => write!(f, "embedded"),
            Variant::Environment => write!(f, "env"),
            Variant::Session => write!(f, "session"),
        }
    }
}

/// A key together with the source that produced it
#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    pub credential: Credential,
    pub source: CredentialSource,
}

/// Ordered chain of resolvers; the first present value wins
pub struct CredentialProvider {
    chain: Vec<Box<dyn CredentialResolver>>,
}

impl CredentialProvider {
    pub fn new(chain: Vec<Box<dyn CredentialResolver>>) -> Self {
        Self { chain }
    }

    /// The chain for a build variant, with secrets files searched in order
    pub fn for_variant(variant: Variant, secrets_paths: Vec<PathBuf>) -> Self {
        let mut chain: Vec<Box<dyn CredentialResolver>> =
            vec![Box::new(SecretStore::new(secrets_paths))];
        match variant {
            Variant::Embedded => chain.push(Box::new(StaticFallback::embedded())),
            Variant::Environment => chain.push(Box::new(EnvVar::new(API_KEY_ENV))),
            Variant::Session => {}
        }
        Self::new(chain)
    }

    /// Resolve a key.
    ///
    /// A key saved in `session` is used until cleared; otherwise the chain
    /// is tried in order.
    pub fn resolve(&self, session: &SessionCredential) -> Option<ResolvedCredential> {
        if let Some(credential) = session.get() {
            return Some(ResolvedCredential {
                credential: credential.clone(),
                source: CredentialSource::Session,
            });
        }

        self.chain.iter().find_map(|resolver| {
            resolver.resolve().map(|credential| ResolvedCredential {
                credential,
                source: resolver.source(),
            })
        })
    }

    /// Actionable message listing every way to provide a key
    pub fn missing_hint(&self) -> String {
        let mut steps: Vec<String> = self.chain.iter().map(|r| r.describe()).collect();
        steps.push("enter a key for this session".to_string());
        let mut hint = String::from("Please ensure your Google API Key is set: ");
        hint.push_str(&steps.join(", or "));
        hint.push_str(&format!(". Get a key at {}", API_KEY_URL));
        hint
    }
}
