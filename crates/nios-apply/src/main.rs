// # nios-apply - WAPI Object Reconciler
//
// This binary is a THIN integration layer ONLY:
// - DO NOT add matching, diffing, or retry logic here
// - All reconciliation logic lives in nios-core
// - Configuration is via environment variables ONLY
//
// The nios-apply binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering object stores
// 4. Running one reconciliation pass per requested object
//
// ## Configuration
//
// ### Object Store
// - `NIOS_PROVIDER_TYPE`: Store type (wapi, memory). Default: wapi
// - `NIOS_HOST`: Grid master host name or URL (for wapi)
// - `NIOS_USERNAME`: WAPI user (for wapi)
// - `NIOS_PASSWORD`: WAPI password (for wapi)
// - `NIOS_WAPI_VERSION`: WAPI version. Default: 2.12.3
// - `NIOS_TIMEOUT_SECS`: Per-request timeout in seconds. Default: 30
// - `NIOS_VALIDATE_CERTS`: Verify the appliance certificate. Default: true
//
// ### Requests
// - `NIOS_REQUEST_FILE`: Path to a JSON array of object requests
//
// ### Engine
// - `NIOS_CHECK_MODE`: Decide but do not mutate. Default: false
// - `NIOS_LOG_LEVEL`: trace, debug, info, warn, error. Default: info
//
// ## Output
//
// One JSON outcome per request on stdout, in request order. Logs go to stderr.
//
// ## Example
//
// ```bash
// export NIOS_HOST=nios01.example.com
// export NIOS_USERNAME=admin
// export NIOS_PASSWORD=secret
// export NIOS_REQUEST_FILE=/etc/nios/hosts.json
//
// nios-apply
// ```

use anyhow::{Context, Result};
use nios_core::config::{ApplyConfig, EngineConfig, ObjectRequest, ProviderConfig};
use nios_core::{ProviderRegistry, WapiEngine};
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy)]
enum ApplyExitCode {
    /// Every request reconciled
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// A reconciliation pass failed
    RuntimeError = 2,
}

impl From<ApplyExitCode> for ExitCode {
    fn from(code: ApplyExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    provider_type: String,
    host: Option<String>,
    username: Option<String>,
    password: Option<String>,
    wapi_version: Option<String>,
    timeout_secs: Option<u64>,
    validate_certs: bool,
    request_file: String,
    check_mode: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            provider_type: env::var("NIOS_PROVIDER_TYPE").unwrap_or_else(|_| "wapi".to_string()),
            host: env::var("NIOS_HOST").ok(),
            username: env::var("NIOS_USERNAME").ok(),
            password: env::var("NIOS_PASSWORD").ok(),
            wapi_version: env::var("NIOS_WAPI_VERSION").ok(),
            timeout_secs: env::var("NIOS_TIMEOUT_SECS")
                .ok()
                .map(|s| s.parse::<u64>())
                .transpose()
                .context("NIOS_TIMEOUT_SECS must be a whole number of seconds")?,
            validate_certs: parse_flag("NIOS_VALIDATE_CERTS", true)?,
            request_file: env::var("NIOS_REQUEST_FILE").context(
                "NIOS_REQUEST_FILE is required. \
                Set it via: export NIOS_REQUEST_FILE=/etc/nios/hosts.json",
            )?,
            check_mode: parse_flag("NIOS_CHECK_MODE", false)?,
            log_level: env::var("NIOS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.provider_type.as_str() {
            "wapi" | "memory" => {}
            _ => anyhow::bail!(
                "NIOS_PROVIDER_TYPE '{}' is not supported. \
                Supported types: wapi, memory",
                self.provider_type
            ),
        }

        if self.provider_type == "wapi" {
            for (var, value) in [
                ("NIOS_HOST", &self.host),
                ("NIOS_USERNAME", &self.username),
                ("NIOS_PASSWORD", &self.password),
            ] {
                if value.as_ref().is_none_or(|v| v.is_empty()) {
                    anyhow::bail!("{} is required when NIOS_PROVIDER_TYPE=wapi", var);
                }
            }

            if let Some(host) = &self.host
                && host.starts_with("http://")
            {
                eprintln!(
                    "WARNING: NIOS_HOST uses HTTP (not HTTPS). \
                    Credentials will be sent in clear text."
                );
            }
        }

        if let Some(timeout) = self.timeout_secs
            && !(1..=600).contains(&timeout)
        {
            anyhow::bail!(
                "NIOS_TIMEOUT_SECS must be between 1 and 600 seconds. Got: {}",
                timeout
            );
        }

        if self.request_file.is_empty() {
            anyhow::bail!("NIOS_REQUEST_FILE cannot be empty");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "NIOS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the store configuration
    fn provider_config(&self) -> ProviderConfig {
        match self.provider_type.as_str() {
            "wapi" => ProviderConfig::Wapi {
                host: self.host.clone().unwrap_or_default(),
                username: self.username.clone().unwrap_or_default(),
                password: self.password.clone().unwrap_or_default(),
                wapi_version: self
                    .wapi_version
                    .clone()
                    .unwrap_or_else(|| "2.12.3".to_string()),
                validate_certs: self.validate_certs,
                timeout_secs: self.timeout_secs.unwrap_or(30),
            },
            _ => ProviderConfig::Memory,
        }
    }

    /// Read the request file and assemble the full apply configuration
    fn load_apply_config(&self) -> Result<ApplyConfig> {
        let raw = std::fs::read_to_string(&self.request_file)
            .with_context(|| format!("Failed to read {}", self.request_file))?;
        let objects: Vec<ObjectRequest> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid request file {}", self.request_file))?;

        let mut config = ApplyConfig::new(self.provider_config());
        config.objects = objects;
        config.engine = EngineConfig {
            check_mode: self.check_mode,
            ..EngineConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

/// Parse a boolean environment variable
fn parse_flag(var: &str, default: bool) -> Result<bool> {
    match env::var(var) {
        Ok(value) => match value.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("{} must be true or false. Got: {}", var, value),
        },
        Err(_) => Ok(default),
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ApplyExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ApplyExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ApplyExitCode::ConfigError.into();
    }

    let apply = match config.load_apply_config() {
        Ok(apply) => apply,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return ApplyExitCode::ConfigError.into();
        }
    };

    info!(
        "Reconciling {} object(s) via {}{}",
        apply.objects.len(),
        apply.provider.type_name(),
        if apply.engine.check_mode { " (check mode)" } else { "" }
    );

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ApplyExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run(apply).await {
            Ok(()) => ApplyExitCode::Success,
            Err(e) => {
                error!("Apply failed: {:#}", e);
                ApplyExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Build the store and engine, then reconcile every request in order
async fn run(apply: ApplyConfig) -> Result<()> {
    let registry = ProviderRegistry::with_builtin();

    #[cfg(feature = "wapi")]
    {
        tracing::debug!("Registering WAPI transport");
        nios_provider_wapi::register(&registry);
    }

    let store = registry.create_store(&apply.provider)?;
    let (engine, mut events) = WapiEngine::new(store, apply.engine.clone())?;

    let monitor = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            tracing::debug!("Engine event: {:?}", event);
        }
    });

    let result = apply_all(&engine, &apply.objects).await;

    // Closing the channel ends the monitor
    drop(engine);
    join_monitor(monitor).await;

    result?;
    info!("Done");
    Ok(())
}

/// Wait for the event monitor, logging a task failure
///
/// Returns whether the monitor finished cleanly.
async fn join_monitor(monitor: tokio::task::JoinHandle<()>) -> bool {
    match monitor.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Event monitor task failed: {}", e);
            false
        }
    }
}

/// Reconcile requests in order, printing each outcome as it completes
async fn apply_all(engine: &WapiEngine, requests: &[ObjectRequest]) -> Result<()> {
    for request in requests {
        let outcome = engine.run(request).await?;
        println!("{}", serde_json::to_string(&outcome)?);
    }
    Ok(())
}
