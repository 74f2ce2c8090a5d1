use crate::descriptor::TargetIdentity;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_DIR: &str = ".pier";
pub const CONFIG_FILE: &str = "config.toml";

/// Well-known port a workload's debug process listens on by default.
pub const DEFAULT_DEBUG_PORT: u16 = 5858;

const DEFAULT_DEBUG_HOST: &str = "127.0.0.1";
const DEFAULT_APPLICATION: &str = "app";
const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "no workspace configuration at {path}; run from a pier workspace or pass --context"
    )]
    Missing { path: PathBuf },
    #[error("failed to read workspace configuration {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid workspace configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    component: RawComponent,
    #[serde(default)]
    debug: RawDebug,
}

#[derive(Debug, Deserialize)]
struct RawComponent {
    name: String,
    application: Option<String>,
    namespace: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDebug {
    port: Option<u16>,
    host: Option<String>,
}

/// Resolved view of the workspace configuration: which workload is targeted
/// and where its debug process listens.
#[derive(Clone, Debug)]
pub struct WorkspaceConfig {
    target: TargetIdentity,
    debug_port: u16,
    debug_host: String,
}

impl WorkspaceConfig {
    /// Loads `.pier/config.toml` from the given context directory.
    pub fn load(context: &Path) -> Result<Self, ConfigError> {
        let path = context.join(CONFIG_DIR).join(CONFIG_FILE);
        if !path.exists() {
            return Err(ConfigError::Missing { path });
        }
        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let parsed: RawConfig =
            toml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })?;

        Ok(Self {
            target: TargetIdentity {
                component: parsed.component.name,
                application: parsed
                    .component
                    .application
                    .unwrap_or_else(|| DEFAULT_APPLICATION.to_string()),
                namespace: parsed
                    .component
                    .namespace
                    .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            },
            debug_port: parsed.debug.port.unwrap_or(DEFAULT_DEBUG_PORT),
            debug_host: parsed
                .debug
                .host
                .unwrap_or_else(|| DEFAULT_DEBUG_HOST.to_string()),
        })
    }

    pub fn target(&self) -> &TargetIdentity {
        &self.target
    }

    /// Fixed port the target's debug process listens on; never negotiated.
    pub fn remote_debug_port(&self) -> u16 {
        self.debug_port
    }

    /// Address the tunnel dials to reach the workload.
    pub fn debug_host(&self) -> &str {
        &self.debug_host
    }
}
