// # Infoblox WAPI Transport
//
// This crate provides the WAPI REST transport for the nios-host reconciler.
// It implements the `Lookup` and `Mutate` capabilities and nothing else.
//
// ## Behavior
//
// - ✅ One HTTP request per trait call
// - ✅ Full error propagation to the engine
// - ✅ HTTP timeout configured (default 30 seconds)
// - ✅ Specific error handling for HTTP status codes (401, 403, 404, 429, 5xx)
// - ❌ NO retry logic (a failed pass is fatal to the caller)
// - ❌ NO caching (every pass fetches fresh)
// - ❌ NO decision logic (owned by the Reconciler)
//
// ## Security Requirements
//
// - Password NEVER appears in logs or Debug output
// - Client construction fails fast if credentials are empty
//
// ## API Reference
//
// - Read objects:   GET    `/wapi/v{version}/{object_type}?name=...&_return_fields+=...`
// - Create object:  POST   `/wapi/v{version}/{object_type}`
// - Update object:  PUT    `/wapi/v{version}/{ref}`
// - Delete object:  DELETE `/wapi/v{version}/{ref}`

use async_trait::async_trait;
use nios_core::config::ProviderConfig;
use nios_core::model::RemoteRecord;
use nios_core::traits::{Lookup, Mutate, ObjectStore, ObjectStoreFactory};
use nios_core::{Error, Result};
use serde_json::{Map, Value};
use std::time::Duration;

/// Provider name used in errors and logs
const PROVIDER: &str = "wapi";

/// WAPI transport
///
/// Stateless and single-shot. All decisions are owned by the `Reconciler`,
/// all sequencing by the `WapiEngine`.
pub struct WapiClient {
    /// `https://{host}/wapi/v{version}`
    base_url: String,

    /// WAPI user
    username: String,

    /// WAPI password
    /// ⚠️ NEVER log this value
    password: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for WapiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WapiClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

impl WapiClient {
    /// Create a new WAPI client
    ///
    /// # Parameters
    ///
    /// - `host`: Grid master host name, address, or full `https://` URL
    /// - `username` / `password`: WAPI credentials
    /// - `wapi_version`: WAPI version (e.g. "2.12.3")
    /// - `validate_certs`: verify the appliance certificate
    /// - `timeout`: per-request timeout
    pub fn new(
        host: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        wapi_version: &str,
        validate_certs: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let username = username.into();
        let password = password.into();

        if username.is_empty() || password.is_empty() {
            return Err(Error::config("WAPI username and password cannot be empty"));
        }

        if !validate_certs {
            tracing::warn!("WAPI certificate validation disabled for {}", host);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!validate_certs)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url(host, wapi_version),
            username,
            password,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and return the parsed JSON body, mapping failures
    async fn send(&self, request: reqwest::RequestBuilder, context: &str) -> Result<Value> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| Error::transport(PROVIDER, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status.as_u16(), &body, context));
        }

        response
            .json()
            .await
            .map_err(|e| Error::transport(PROVIDER, format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl Lookup for WapiClient {
    async fn get_objects(
        &self,
        object_type: &str,
        filter: &Map<String, Value>,
        return_fields: &[String],
    ) -> Result<Vec<RemoteRecord>> {
        let query = lookup_query(filter, return_fields);
        tracing::debug!("GET {} with {} filter(s)", object_type, filter.len());

        let body = self
            .send(
                self.client.get(self.url(object_type)).query(&query),
                &format!("Lookup of {}", object_type),
            )
            .await?;

        let Value::Array(objects) = body else {
            return Err(Error::transport(
                PROVIDER,
                "Invalid response format: expected a JSON array",
            ));
        };

        objects.into_iter().map(RemoteRecord::from_value).collect()
    }
}

#[async_trait]
impl Mutate for WapiClient {
    async fn create_object(&self, object_type: &str, payload: &Map<String, Value>) -> Result<String> {
        tracing::info!("POST {}", object_type);
        let body = self
            .send(
                self.client.post(self.url(object_type)).json(payload),
                &format!("Create of {}", object_type),
            )
            .await?;
        reference_from(body)
    }

    async fn update_object(&self, reference: &str, payload: &Map<String, Value>) -> Result<String> {
        tracing::info!("PUT {}", reference);
        let body = self
            .send(
                self.client.put(self.url(reference)).json(payload),
                &format!("Update of {}", reference),
            )
            .await?;
        reference_from(body)
    }

    async fn delete_object(&self, reference: &str) -> Result<String> {
        tracing::info!("DELETE {}", reference);
        let body = self
            .send(
                self.client.delete(self.url(reference)),
                &format!("Delete of {}", reference),
            )
            .await?;
        reference_from(body)
    }
}

impl ObjectStore for WapiClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Build the versioned API root for a host
fn base_url(host: &str, wapi_version: &str) -> String {
    let host = host.trim_end_matches('/');
    let root = if host.starts_with("https://") || host.starts_with("http://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };
    format!("{}/wapi/v{}", root, wapi_version)
}

/// Query pairs for a lookup: the filter, then the extra return fields
fn lookup_query(filter: &Map<String, Value>, return_fields: &[String]) -> Vec<(String, String)> {
    let mut query: Vec<(String, String)> = filter
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect();

    if !return_fields.is_empty() {
        query.push(("_return_fields+".to_string(), return_fields.join(",")));
    }
    query
}

/// Extract the object reference WAPI returns from mutations
fn reference_from(body: Value) -> Result<String> {
    match body {
        Value::String(reference) if !reference.is_empty() => Ok(reference),
        _ => Err(Error::transport(
            PROVIDER,
            "Invalid response format: expected an object reference",
        )),
    }
}

/// Map a non-success HTTP status to an error
///
/// WAPI error bodies look like `{"Error": "...", "code": "...", "text": "..."}`;
/// the `text` is surfaced when present.
fn status_error(status: u16, body: &str, context: &str) -> Error {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("text").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string());

    match status {
        401 | 403 => Error::auth(format!(
            "{}: invalid credentials or insufficient permissions. Status: {}",
            context, status
        )),
        404 => Error::not_found(format!("{}: {}", context, detail)),
        429 => Error::transport(
            PROVIDER,
            format!("{}: rate limit exceeded. Status: {}", context, status),
        ),
        500..=599 => Error::transport(
            PROVIDER,
            format!("{}: server error {} - {}", context, status, detail),
        ),
        _ => Error::transport(
            PROVIDER,
            format!("{} failed: {} - {}", context, status, detail),
        ),
    }
}

/// Factory for creating WAPI clients
pub struct WapiFactory;

impl ObjectStoreFactory for WapiFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn ObjectStore>> {
        match config {
            ProviderConfig::Wapi {
                host,
                username,
                password,
                wapi_version,
                validate_certs,
                timeout_secs,
            } => {
                config.validate()?;
                Ok(Box::new(WapiClient::new(
                    host,
                    username.clone(),
                    password.clone(),
                    wapi_version,
                    *validate_certs,
                    Duration::from_secs(*timeout_secs),
                )?))
            }
            _ => Err(Error::config("Invalid config for WAPI provider")),
        }
    }
}

/// Register the WAPI transport with a registry
///
/// # Example
///
/// ```rust
/// use nios_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// nios_provider_wapi::register(&registry);
/// assert!(registry.has_store("wapi"));
/// ```
pub fn register(registry: &nios_core::ProviderRegistry) {
    registry.register_store(PROVIDER, Box::new(WapiFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> WapiClient {
        WapiClient::new(
            "nios01.example.com",
            "admin",
            "secret_password_12345",
            "2.12.3",
            true,
            Duration::from_secs(30),
        )
        .unwrap()
    }

    #[test]
    fn test_base_url() {
        assert_eq!(
            base_url("nios01.example.com", "2.12.3"),
            "https://nios01.example.com/wapi/v2.12.3"
        );
        assert_eq!(
            base_url("http://127.0.0.1:8080/", "2.9"),
            "http://127.0.0.1:8080/wapi/v2.9"
        );
    }

    #[test]
    fn test_reference_url() {
        let client = client();
        assert_eq!(
            client.url("record:host/ZG5zLmhvc3Qk:ansible/default"),
            "https://nios01.example.com/wapi/v2.12.3/record:host/ZG5zLmhvc3Qk:ansible/default"
        );
    }

    #[test]
    fn test_lookup_query() {
        let filter = json!({ "name": "ansible", "configure_for_dns": false });
        let query = lookup_query(
            filter.as_object().unwrap(),
            &["comment".to_string(), "ipv4addrs".to_string()],
        );
        assert!(query.contains(&("name".to_string(), "ansible".to_string())));
        assert!(query.contains(&("configure_for_dns".to_string(), "false".to_string())));
        assert!(query.contains(&(
            "_return_fields+".to_string(),
            "comment,ipv4addrs".to_string()
        )));
    }

    #[test]
    fn test_reference_from() {
        assert_eq!(
            reference_from(json!("record:host/ZG5z:ansible/default")).unwrap(),
            "record:host/ZG5z:ansible/default"
        );
        assert!(reference_from(json!({ "_ref": "x" })).is_err());
        assert!(reference_from(json!("")).is_err());
    }

    #[test]
    fn test_status_errors() {
        assert!(matches!(status_error(401, "", "Lookup"), Error::Authentication(_)));
        assert!(matches!(status_error(404, "", "Update"), Error::NotFound(_)));

        let wapi_body = r#"{"Error": "AdmConDataError: None (IBDataConflictError)", "code": "Client.Ibap.Data.Conflict", "text": "The record already exists."}"#;
        let err = status_error(400, wapi_body, "Create of record:host");
        assert!(err.is_transport());
        assert!(err.to_string().contains("The record already exists."));

        assert!(status_error(502, "bad gateway", "Lookup").to_string().contains("server error"));
    }

    #[test]
    fn test_password_not_exposed_in_debug() {
        let debug_str = format!("{:?}", client());
        assert!(!debug_str.contains("secret_password_12345"));
        assert!(debug_str.contains("WapiClient"));
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let result = WapiClient::new(
            "nios01.example.com",
            "admin",
            "",
            "2.12.3",
            true,
            Duration::from_secs(30),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_factory() {
        let config = ProviderConfig::Wapi {
            host: "nios01.example.com".to_string(),
            username: "admin".to_string(),
            password: "infoblox".to_string(),
            wapi_version: "2.12.3".to_string(),
            validate_certs: true,
            timeout_secs: 30,
        };
        let store = WapiFactory.create(&config).unwrap();
        assert_eq!(store.provider_name(), "wapi");

        assert!(WapiFactory.create(&ProviderConfig::Memory).is_err());
    }
}
