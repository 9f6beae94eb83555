//! Configuration types for the nios-host system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::FieldSpec;
use crate::reconcile::Presence;

/// WAPI object type for host records
pub const NIOS_HOST_RECORD: &str = "record:host";

/// Main apply configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyConfig {
    /// Object store configuration
    pub provider: ProviderConfig,

    /// Objects to reconcile, in order
    pub objects: Vec<ObjectRequest>,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl ApplyConfig {
    /// Create a new configuration with defaults
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            objects: Vec::new(),
            engine: EngineConfig::default(),
        }
    }

    /// Add an object request
    pub fn with_object(mut self, request: ObjectRequest) -> Self {
        self.objects.push(request);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.objects.is_empty() {
            return Err(crate::Error::config("No objects configured"));
        }

        self.provider.validate()?;
        self.engine.validate()?;

        for request in &self.objects {
            request.validate()?;
        }

        Ok(())
    }
}

/// Object store configuration
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Infoblox WAPI over HTTPS
    Wapi {
        /// Grid master host name or address
        host: String,
        /// WAPI user
        username: String,
        /// WAPI password
        password: String,
        /// WAPI version (e.g. "2.12.3")
        #[serde(default = "default_wapi_version")]
        wapi_version: String,
        /// Verify the appliance certificate
        #[serde(default = "default_validate_certs")]
        validate_certs: bool,
        /// Per-request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,

    /// Custom store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: Value,
    },
}

// The password must never show up in logs
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Wapi {
                host,
                username,
                wapi_version,
                validate_certs,
                timeout_secs,
                ..
            } => f
                .debug_struct("Wapi")
                .field("host", host)
                .field("username", username)
                .field("password", &"<REDACTED>")
                .field("wapi_version", wapi_version)
                .field("validate_certs", validate_certs)
                .field("timeout_secs", timeout_secs)
                .finish(),
            ProviderConfig::Memory => f.write_str("Memory"),
            ProviderConfig::Custom { factory, config } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", config)
                .finish(),
        }
    }
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Wapi {
                host,
                username,
                password,
                wapi_version,
                timeout_secs,
                ..
            } => {
                if host.is_empty() {
                    return Err(crate::Error::config("WAPI host cannot be empty"));
                }
                if username.is_empty() || password.is_empty() {
                    return Err(crate::Error::config(
                        "WAPI username and password are required",
                    ));
                }
                if wapi_version.is_empty()
                    || !wapi_version
                        .split('.')
                        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
                {
                    return Err(crate::Error::config(format!(
                        "Invalid WAPI version: '{}'",
                        wapi_version
                    )));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("WAPI timeout must be > 0"));
                }
                Ok(())
            }
            ProviderConfig::Memory => Ok(()),
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Wapi { .. } => "wapi",
            ProviderConfig::Memory => "memory",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

fn default_wapi_version() -> String {
    "2.12.3".to_string()
}

fn default_validate_certs() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

/// One object to reconcile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRequest {
    /// WAPI object type
    #[serde(default = "default_object_type")]
    pub object_type: String,

    /// Whether the object should exist
    #[serde(default)]
    pub state: Presence,

    /// Field specification
    #[serde(default = "FieldSpec::host_record")]
    pub fields: FieldSpec,

    /// Declared parameter values
    pub params: Map<String, Value>,
}

impl ObjectRequest {
    /// Create a host record request from raw parameters
    pub fn host_record(state: Presence, params: Map<String, Value>) -> Self {
        Self {
            object_type: default_object_type(),
            state,
            fields: FieldSpec::host_record(),
            params,
        }
    }

    /// Create a request for any object type
    pub fn new(
        object_type: impl Into<String>,
        state: Presence,
        fields: FieldSpec,
        params: Map<String, Value>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            state,
            fields,
            params,
        }
    }

    /// Validate the request shape (not the parameter values)
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.object_type.is_empty() {
            return Err(crate::Error::config("Object type cannot be empty"));
        }
        self.fields.validate()
    }
}

fn default_object_type() -> String {
    NIOS_HOST_RECORD.to_string()
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Decide and report without mutating the remote store
    #[serde(default)]
    pub check_mode: bool,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 100 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            check_mode: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wapi(password: &str, version: &str) -> ProviderConfig {
        ProviderConfig::Wapi {
            host: "nios01.example.com".to_string(),
            username: "admin".to_string(),
            password: password.to_string(),
            wapi_version: version.to_string(),
            validate_certs: true,
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_request_defaults_to_host_record() {
        let request: ObjectRequest = serde_json::from_value(json!({
            "params": { "name": "host.example.com" }
        }))
        .unwrap();

        assert_eq!(request.object_type, NIOS_HOST_RECORD);
        assert_eq!(request.state, Presence::Present);
        assert_eq!(request.fields, FieldSpec::host_record());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_provider_config_tagged() {
        let config: ProviderConfig = serde_json::from_value(json!({
            "type": "wapi",
            "host": "nios01.example.com",
            "username": "admin",
            "password": "infoblox"
        }))
        .unwrap();

        assert_eq!(config.type_name(), "wapi");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_provider_validation() {
        assert!(wapi("secret", "2.12.3").validate().is_ok());
        assert!(wapi("", "2.12.3").validate().is_err());
        assert!(wapi("secret", "v2").validate().is_err());
        assert!(wapi("secret", "2..1").validate().is_err());
    }

    #[test]
    fn test_password_not_exposed_in_debug() {
        let debug_str = format!("{:?}", wapi("secret_password_123", "2.12.3"));
        assert!(!debug_str.contains("secret_password_123"));
        assert!(debug_str.contains("<REDACTED>"));
    }

    #[test]
    fn test_apply_config_requires_objects() {
        let config = ApplyConfig::new(ProviderConfig::Memory);
        assert!(config.validate().is_err());

        let config = config.with_object(ObjectRequest::host_record(
            Presence::Absent,
            json!({ "name": "host.example.com" }).as_object().cloned().unwrap(),
        ));
        assert!(config.validate().is_ok());
    }
}
