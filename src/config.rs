//! Controller connection settings and SSH algorithm preferences.
//!
//! [`ControllerConfig`] carries everything a session, the session pool and the
//! mutation commands need to know about the target controller. The algorithm
//! tables below back [`SecurityLevel`]: wireless controllers commonly run old
//! SSH stacks, so the legacy profile keeps CBC ciphers and SHA-1 key exchange.

use std::fmt;
use std::time::Duration;

use russh::keys::{Algorithm, EcdsaCurve, HashAlg};
use russh::{cipher, compression, kex, mac};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::WlcError;
use crate::mutation::MutationKind;
use crate::session::SecurityLevel;

/// Key exchange algorithms for the secure profile.
pub const SECURE_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
    kex::DH_G16_SHA512,
    kex::DH_G14_SHA256,
];

/// Key exchange algorithms for the legacy profile, newest first.
pub const LEGACY_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::ECDH_SHA2_NISTP256,
    kex::DH_G14_SHA256,
    kex::DH_GEX_SHA256,
    kex::DH_G14_SHA1,
    kex::DH_GEX_SHA1,
    kex::DH_G1_SHA1,
];

pub static SECURE_CIPHERS: &[cipher::Name] = &[
    cipher::CHACHA20_POLY1305,
    cipher::AES_256_GCM,
    cipher::AES_256_CTR,
    cipher::AES_192_CTR,
    cipher::AES_128_CTR,
];

/// Legacy controllers often only offer CBC modes.
pub static LEGACY_CIPHERS: &[cipher::Name] = &[
    cipher::AES_256_GCM,
    cipher::AES_256_CTR,
    cipher::AES_128_CTR,
    cipher::AES_256_CBC,
    cipher::AES_192_CBC,
    cipher::AES_128_CBC,
];

pub const SECURE_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA512_ETM,
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA512,
    mac::HMAC_SHA256,
];

pub const LEGACY_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA256,
    mac::HMAC_SHA512,
    mac::HMAC_SHA1_ETM,
    mac::HMAC_SHA1,
];

pub const DEFAULT_COMPRESSION_ALGORITHMS: &[compression::Name] =
    &[compression::NONE, compression::ZLIB, compression::ZLIB_LEGACY];

pub const SECURE_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Ed25519,
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP256,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP384,
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha512),
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
];

pub const LEGACY_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Ed25519,
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP256,
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
    Algorithm::Rsa { hash: None },
    Algorithm::Dsa,
];

fn default_port() -> u16 {
    22
}

fn default_pool_size() -> usize {
    2
}

fn default_connect_retries() -> u32 {
    3
}

fn default_settle_delay_ms() -> u64 {
    250
}

fn default_command_timeout_secs() -> u64 {
    60
}

fn default_api_concurrency() -> usize {
    4
}

fn default_confirm() -> Vec<MutationKind> {
    vec![MutationKind::SetGroup, MutationKind::SaveConfig]
}

fn default_security() -> SecurityLevel {
    SecurityLevel::LegacyCompatible
}

/// Settings for one wireless LAN controller.
///
/// Pool size and the confirmation policy differ between controller firmware
/// releases, so both are configuration rather than constants.
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
pub struct ControllerConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Number of concurrent sessions opened for a harvest.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Connect attempts per session before giving up.
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
    /// Pause after every mutation; the CLI has no "change applied" signal.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Concurrent detail requests on the HTTP inventory path.
    #[serde(default = "default_api_concurrency")]
    pub api_concurrency: usize,
    /// Mutations followed by a literal `y` confirmation line.
    #[serde(default = "default_confirm")]
    pub confirm: Vec<MutationKind>,
    #[serde(default = "default_security")]
    pub security: SecurityLevel,
}

impl ControllerConfig {
    /// Creates a config with default tuning for the given target.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            username: username.into(),
            password: password.into(),
            pool_size: default_pool_size(),
            connect_retries: default_connect_retries(),
            settle_delay_ms: default_settle_delay_ms(),
            command_timeout_secs: default_command_timeout_secs(),
            api_concurrency: default_api_concurrency(),
            confirm: default_confirm(),
            security: default_security(),
        }
    }

    /// Rejects settings no session or pool can work with.
    pub fn validate(&self) -> Result<(), WlcError> {
        if self.host.trim().is_empty() {
            return Err(WlcError::InvalidConfig("host is empty".to_string()));
        }
        if self.pool_size == 0 {
            return Err(WlcError::InvalidConfig(
                "pool_size must be at least 1".to_string(),
            ));
        }
        if self.api_concurrency == 0 {
            return Err(WlcError::InvalidConfig(
                "api_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Whether the given mutation is followed by a `y` line.
    pub fn needs_confirmation(&self, kind: MutationKind) -> bool {
        self.confirm.contains(&kind)
    }

    /// `user@host:port`, used in logs and recordings.
    pub fn device_addr(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}

// Password stays out of logs.
impl fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("pool_size", &self.pool_size)
            .field("connect_retries", &self.connect_retries)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .field("api_concurrency", &self.api_concurrency)
            .field("confirm", &self.confirm)
            .field("security", &self.security)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_defaults() {
        let config = ControllerConfig::new("10.0.0.2", "admin", "secret");

        assert_eq!(config.port, 22);
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.connect_retries, 3);
        assert_eq!(config.api_concurrency, 4);
        assert_eq!(config.settle_delay(), Duration::from_millis(250));
        assert!(config.needs_confirmation(MutationKind::SetGroup));
        assert!(config.needs_confirmation(MutationKind::SaveConfig));
        assert!(!config.needs_confirmation(MutationKind::Rename));
        assert_eq!(config.device_addr(), "admin@10.0.0.2:22");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unusable_settings_are_rejected() {
        let mut config = ControllerConfig::new("wlc", "admin", "secret");
        config.pool_size = 0;
        assert!(matches!(config.validate(), Err(WlcError::InvalidConfig(msg)) if msg.contains("pool_size")));

        let mut config = ControllerConfig::new("wlc", "admin", "secret");
        config.api_concurrency = 0;
        assert!(matches!(config.validate(), Err(WlcError::InvalidConfig(msg)) if msg.contains("api_concurrency")));

        let config = ControllerConfig::new("  ", "admin", "secret");
        assert!(matches!(config.validate(), Err(WlcError::InvalidConfig(_))));
    }

    #[test]
    fn json_config_fills_defaults_and_confirm_policy() {
        let config: ControllerConfig = serde_json::from_str(
            r#"{"host":"wlc","username":"a","password":"b","confirm":["set_group"]}"#,
        )
        .expect("deserialize");

        assert_eq!(config.pool_size, 2);
        assert_eq!(config.security, SecurityLevel::LegacyCompatible);
        assert!(config.needs_confirmation(MutationKind::SetGroup));
        assert!(!config.needs_confirmation(MutationKind::SaveConfig));
    }

    #[test]
    fn debug_output_hides_password() {
        let config = ControllerConfig::new("wlc", "admin", "hunter2");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
