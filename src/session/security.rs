use super::*;

/// Which algorithm table a controller session offers during the SSH handshake.
///
/// Controllers default to [`SecurityLevel::LegacyCompatible`]; many AireOS
/// releases still only negotiate SHA-1 key exchange and CBC ciphers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    /// SHA-2 key exchange, AEAD and CTR ciphers, SHA-2 MACs only.
    Secure,
    /// Adds SHA-1 key exchange and CBC ciphers for older controller firmware.
    LegacyCompatible,
}

/// Algorithm level plus host-key policy for one controller session.
///
/// Built from `ControllerConfig::security` by the SSH session factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSecurityOptions {
    pub level: SecurityLevel,
    /// How the controller's host key is verified.
    pub server_check: ServerCheckMethod,
}

impl Default for ConnectionSecurityOptions {
    fn default() -> Self {
        Self::secure_default()
    }
}

impl ConnectionSecurityOptions {
    /// Modern algorithms; the controller's key must be in `~/.ssh/known_hosts`.
    pub fn secure_default() -> Self {
        Self {
            level: SecurityLevel::Secure,
            server_check: ServerCheckMethod::DefaultKnownHostsFile,
        }
    }

    /// Old-firmware algorithms without host-key checking. Controllers
    /// regenerate their key on upgrade and are rarely listed in known_hosts.
    pub fn legacy_compatible() -> Self {
        Self {
            level: SecurityLevel::LegacyCompatible,
            server_check: ServerCheckMethod::NoCheck,
        }
    }

    pub fn for_level(level: SecurityLevel) -> Self {
        match level {
            SecurityLevel::Secure => Self::secure_default(),
            SecurityLevel::LegacyCompatible => Self::legacy_compatible(),
        }
    }

    pub(super) fn preferred(&self) -> Preferred {
        match self.level {
            SecurityLevel::Secure => Preferred {
                kex: Cow::Borrowed(config::SECURE_KEX_ORDER),
                key: Cow::Borrowed(config::SECURE_KEY_TYPES),
                cipher: Cow::Borrowed(config::SECURE_CIPHERS),
                mac: Cow::Borrowed(config::SECURE_MAC_ALGORITHMS),
                compression: Cow::Borrowed(config::DEFAULT_COMPRESSION_ALGORITHMS),
            },
            SecurityLevel::LegacyCompatible => Preferred {
                kex: Cow::Borrowed(config::LEGACY_KEX_ORDER),
                key: Cow::Borrowed(config::LEGACY_KEY_TYPES),
                cipher: Cow::Borrowed(config::LEGACY_CIPHERS),
                mac: Cow::Borrowed(config::LEGACY_MAC_ALGORITHMS),
                compression: Cow::Borrowed(config::DEFAULT_COMPRESSION_ALGORITHMS),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectionSecurityOptions, SecurityLevel};
    use async_ssh2_tokio::ServerCheckMethod;
    use russh::{cipher, kex, mac};

    #[test]
    fn default_security_options_are_secure() {
        let options = ConnectionSecurityOptions::default();
        assert_eq!(options.level, SecurityLevel::Secure);
        assert!(matches!(
            options.server_check,
            ServerCheckMethod::DefaultKnownHostsFile
        ));
    }

    #[test]
    fn for_level_maps_legacy_to_no_host_check() {
        let options = ConnectionSecurityOptions::for_level(SecurityLevel::LegacyCompatible);
        assert_eq!(options.level, SecurityLevel::LegacyCompatible);
        assert!(matches!(options.server_check, ServerCheckMethod::NoCheck));
    }

    #[test]
    fn controller_default_selects_legacy_profile() {
        let config = crate::config::ControllerConfig::new("wlc", "admin", "secret");
        let options = ConnectionSecurityOptions::for_level(config.security);
        assert_eq!(options, ConnectionSecurityOptions::legacy_compatible());
    }

    #[test]
    fn secure_profile_excludes_weak_algorithms() {
        let preferred = ConnectionSecurityOptions::secure_default().preferred();

        assert!(preferred.kex.iter().all(|alg| *alg != kex::DH_G1_SHA1));
        assert!(preferred.cipher.iter().all(|alg| *alg != cipher::AES_128_CBC));
        assert!(preferred.mac.iter().all(|alg| *alg != mac::HMAC_SHA1));
    }

    #[test]
    fn legacy_profile_keeps_controller_compatible_algorithms() {
        let preferred = ConnectionSecurityOptions::legacy_compatible().preferred();

        assert!(preferred.kex.contains(&kex::DH_G14_SHA1));
        assert!(preferred.cipher.contains(&cipher::AES_256_CBC));
        assert!(preferred.mac.contains(&mac::HMAC_SHA1));
    }
}
