//! Configuration system for loanform.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/loanform/config.toml` and/or `.loanform/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::handler::ConcurrencyPolicy;
use crate::page::{DEFAULT_FORM_ID, DEFAULT_RESULT_ID};
use crate::render::StylePolicy;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanformConfig {
    pub endpoint: EndpointConfig,
    pub page: PageConfig,
    pub render: RenderConfig,
    pub handler: HandlerConfig,
}

/// Where submissions are posted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Scheme, host and port of the prediction server.
    pub base_url: String,
    /// Path of the prediction endpoint.
    pub predict_path: String,
    /// Request timeout. `None` leaves the HTTP client's default in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            predict_path: "/predict".to_string(),
            request_timeout_secs: None,
        }
    }
}

impl EndpointConfig {
    /// Full URL of the prediction endpoint.
    pub fn predict_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.predict_path.trim_start_matches('/')
        )
    }
}

/// Ids of the page elements the handler is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageConfig {
    pub form_id: String,
    pub result_id: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            form_id: DEFAULT_FORM_ID.to_string(),
            result_id: DEFAULT_RESULT_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub style_policy: StylePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    pub concurrency: ConcurrencyPolicy,
}

impl LoanformConfig {
    /// Reject values that would make every submission fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.endpoint.base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::Invalid {
                message: "endpoint.base_url is empty".into(),
            });
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                message: format!("endpoint.base_url must be http(s): {base}"),
            });
        }
        if self.endpoint.request_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                message: "endpoint.request_timeout_secs must be greater than 0".into(),
            });
        }
        if self.page.form_id.is_empty() || self.page.result_id.is_empty() {
            return Err(ConfigError::Invalid {
                message: "page element ids must not be empty".into(),
            });
        }
        Ok(())
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "loanform", "loanform")
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".loanform").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `LOANFORM_`)
/// 3. Workspace-local config (`.loanform/config.toml`)
/// 4. User config (`~/.config/loanform/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&LoanformConfig>,
) -> Result<LoanformConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(LoanformConfig::default()));

    // User-level config
    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (LOANFORM_ENDPOINT__BASE_URL, LOANFORM_RENDER__STYLE_POLICY, etc.)
    figment = figment.merge(Env::prefixed("LOANFORM_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: LoanformConfig = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from one explicit file on top of the defaults.
pub fn load_config_file(path: &Path) -> Result<LoanformConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let config: LoanformConfig = Figment::from(Serialized::defaults(LoanformConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LOANFORM_").split("__"))
        .extract()?;
    config.validate()?;
    Ok(config)
}

/// Check whether any loanform configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(dirs) = project_dirs() {
        if dirs.config_dir().join("config.toml").exists() {
            return true;
        }
    }

    if let Some(ws) = workspace {
        if workspace_config_path(ws).exists() {
            return true;
        }
    }

    false
}
