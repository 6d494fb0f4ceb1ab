//! Typed client configuration (§6 "Client configuration options"). Built
//! with `typed-builder`; `validate()` rejects bad configuration before any
//! I/O is attempted, matching the ambient-stack convention described in
//! SPEC_FULL §1.

use std::time::Duration;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Transport {
    WSMan,
    HvSocket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    Basic,
    Negotiate,
    Ntlm,
    Kerberos,
}

#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct ReconnectPolicy {
    #[builder(default = false)]
    pub enabled: bool,
    #[builder(default = 5)]
    pub max_attempts: u32,
    #[builder(default = Duration::from_secs(1))]
    pub initial_delay: Duration,
    #[builder(default = Duration::from_secs(30))]
    pub max_delay: Duration,
    #[builder(default = 0.2)]
    pub jitter: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct RetryPolicy {
    #[builder(default = Duration::from_millis(100))]
    pub initial_delay: Duration,
    #[builder(default = Duration::from_secs(5))]
    pub max_delay: Duration,
    #[builder(default = 2.0)]
    pub multiplier: f64,
    #[builder(default = 0.1)]
    pub jitter: f64,
    #[builder(default = 5)]
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct CircuitBreakerConfig {
    #[builder(default = false)]
    pub enabled: bool,
    #[builder(default = 5)]
    pub failure_threshold: u32,
    #[builder(default = Duration::from_secs(30))]
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct FileTransferConfig {
    #[builder(default)]
    pub chunk_size: Option<usize>,
    #[builder(default = 4)]
    pub max_concurrency: usize,
    #[builder(default = Duration::from_secs(60))]
    pub chunk_timeout: Duration,
    #[builder(default = 1024 * 1024 * 1024)]
    pub max_file_size: i64,
    #[builder(default = false)]
    pub verify_checksum: bool,
    #[builder(default = false)]
    pub no_overwrite: bool,
}

impl Default for FileTransferConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FileTransferConfig {
    pub fn resolved_chunk_size(&self, transport: Transport) -> usize {
        self.chunk_size.unwrap_or(match transport {
            Transport::WSMan => 256 * 1024,
            Transport::HvSocket => 1024 * 1024,
        })
    }
}

#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct ClientConfig {
    #[builder(default)]
    pub port: Option<u16>,
    #[builder(default = false)]
    pub use_tls: bool,
    #[builder(default = false)]
    pub insecure_skip_verify: bool,
    #[builder(default = Duration::from_secs(60))]
    pub timeout: Duration,
    #[builder(default = AuthType::Negotiate)]
    pub auth_type: AuthType,
    #[builder(default, setter(strip_option))]
    pub username: Option<String>,
    #[builder(default, setter(strip_option))]
    pub password: Option<String>,
    #[builder(default, setter(strip_option))]
    pub domain: Option<String>,
    #[builder(default, setter(strip_option))]
    pub realm: Option<String>,
    #[builder(default, setter(strip_option))]
    pub krb5_conf_path: Option<String>,
    #[builder(default, setter(strip_option))]
    pub keytab_path: Option<String>,
    #[builder(default, setter(strip_option))]
    pub ccache_path: Option<String>,
    #[builder(default = Transport::WSMan)]
    pub transport: Transport,
    #[builder(default, setter(strip_option))]
    pub vmid: Option<String>,
    #[builder(default, setter(strip_option))]
    pub configuration_name: Option<String>,
    #[builder(default, setter(strip_option))]
    pub resource_uri: Option<String>,
    #[builder(default = 5)]
    pub max_runspaces: u32,
    /// ≥0: strict limit; -1: unbounded; 0: no queue (reject when saturated).
    #[builder(default = 0)]
    pub max_queue_size: i64,
    #[builder(default = 5)]
    pub max_concurrent_commands: u32,
    #[builder(default)]
    pub keep_alive_interval: Option<Duration>,
    #[builder(default)]
    pub reconnect: ReconnectPolicy,
    #[builder(default)]
    pub retry: RetryPolicy,
    #[builder(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[builder(default)]
    pub file_transfer: FileTransferConfig,
}

impl ClientConfig {
    pub fn resolved_port(&self) -> u16 {
        self.port.unwrap_or(if self.use_tls { 5986 } else { 5985 })
    }

    /// Validated `configuration-name`: must not contain `/` or `\`; invalid
    /// values fall back to `Microsoft.PowerShell` (§6).
    pub fn resolved_configuration_name(&self) -> String {
        match &self.configuration_name {
            Some(name) if !name.contains('/') && !name.contains('\\') && !name.is_empty() => {
                name.clone()
            }
            _ => "Microsoft.PowerShell".to_string(),
        }
    }

    pub fn resolved_resource_uri(&self) -> String {
        self.resource_uri.clone().unwrap_or_else(|| {
            format!(
                "http://schemas.microsoft.com/powershell/{}",
                self.resolved_configuration_name()
            )
        })
    }

    /// Rejects configuration that could not succeed before any I/O is
    /// attempted (§1 ambient-stack "Config").
    pub fn validate(&self) -> Result<(), ClientError> {
        match self.transport {
            Transport::WSMan => {
                if self.username.is_none() && self.auth_type == AuthType::Basic {
                    return Err(ClientError::ConfigInvalid(
                        "basic auth requires a username".to_string(),
                    ));
                }
                if self.auth_type == AuthType::Basic && self.password.is_none() {
                    return Err(ClientError::ConfigInvalid(
                        "basic auth requires a password".to_string(),
                    ));
                }
                if self.auth_type == AuthType::Kerberos && self.realm.is_none() {
                    return Err(ClientError::ConfigInvalid(
                        "kerberos auth requires a realm".to_string(),
                    ));
                }
            }
            Transport::HvSocket => {
                if self.vmid.is_none() {
                    return Err(ClientError::ConfigInvalid(
                        "HvSocket transport requires vmid".to_string(),
                    ));
                }
            }
        }

        if self.max_runspaces == 0 {
            return Err(ClientError::ConfigInvalid(
                "max_runspaces must be at least 1".to_string(),
            ));
        }

        if self.max_queue_size < -1 {
            return Err(ClientError::ConfigInvalid(
                "max_queue_size must be >= -1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        let http = ClientConfig::builder().build();
        assert_eq!(http.resolved_port(), 5985);

        let https = ClientConfig::builder().use_tls(true).build();
        assert_eq!(https.resolved_port(), 5986);
    }

    #[test]
    fn test_invalid_configuration_name_falls_back() {
        let config = ClientConfig::builder()
            .configuration_name("bad/name".to_string())
            .build();
        assert_eq!(config.resolved_configuration_name(), "Microsoft.PowerShell");
    }

    #[test]
    fn test_valid_configuration_name_kept() {
        let config = ClientConfig::builder()
            .configuration_name("CustomShell".to_string())
            .build();
        assert_eq!(config.resolved_configuration_name(), "CustomShell");
    }

    #[test]
    fn test_validate_rejects_basic_auth_without_username() {
        let config = ClientConfig::builder().auth_type(AuthType::Basic).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_hvsocket_without_vmid() {
        let config = ClientConfig::builder().transport(Transport::HvSocket).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_sane_defaults() {
        let config = ClientConfig::builder().build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_transfer_default_chunk_sizes() {
        let ft = FileTransferConfig::default();
        assert_eq!(ft.resolved_chunk_size(Transport::WSMan), 256 * 1024);
        assert_eq!(ft.resolved_chunk_size(Transport::HvSocket), 1024 * 1024);
    }
}
