//! Transport configuration module / 传输配置模块
//!
//! Loaded from an optional JSON file; every field has a default so a missing
//! file or a partial file is fine / 配置文件可选，所有字段均有默认值

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::drivers::s3::S3Config;

/// Transport configuration / 传输配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// S3 client configuration / S3客户端配置
    #[serde(default)]
    pub storage: S3Config,
    /// Credential discovery configuration / 凭证发现配置
    #[serde(default)]
    pub credentials: CredentialSettings,
    /// Remember directory markers written on this connection / 缓存已写入的目录标记
    #[serde(default)]
    pub cache_directory_markers: bool,
}

/// Credential discovery configuration / 凭证发现配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialSettings {
    /// Variable holding the role ARN / 角色ARN变量名
    #[serde(default = "default_role_arn_env")]
    pub role_arn_env: String,
    /// Variable holding the role session name / 角色会话名变量名
    #[serde(default = "default_role_session_env")]
    pub role_session_env: String,
    /// Variable pointing at the role config file / 配置文件路径变量名
    #[serde(default = "default_config_file_env")]
    pub config_file_env: String,
    /// Role config file used when the variable is unset / 默认配置文件
    #[serde(default = "default_config_file")]
    pub default_config_file: String,
    /// Region of the STS endpoint / STS区域
    #[serde(default = "default_sts_region")]
    pub sts_region: String,
}

fn default_role_arn_env() -> String {
    "AWS_ASSUME_ROLE_ARN".to_string()
}

fn default_role_session_env() -> String {
    "AWS_ASSUME_ROLE_NAME".to_string()
}

fn default_config_file_env() -> String {
    "S3_MAVEN_CONFIG_FILE".to_string()
}

fn default_config_file() -> String {
    ".s3_config".to_string()
}

fn default_sts_region() -> String {
    "us-east-1".to_string()
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            role_arn_env: default_role_arn_env(),
            role_session_env: default_role_session_env(),
            config_file_env: default_config_file_env(),
            default_config_file: default_config_file(),
            sts_region: default_sts_region(),
        }
    }
}

/// Load configuration from file, or defaults if it does not exist / 加载配置文件，不存在则使用默认配置
pub fn load_config(path: &Path) -> Result<TransportConfig, String> {
    if !path.exists() {
        tracing::debug!("No configuration at {:?}, using defaults", path);
        return Ok(TransportConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file: {}", e))?;

    let config: TransportConfig = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse config file: {}", e))?;

    tracing::info!("Loaded configuration from {:?}", path);
    Ok(config)
}
