//! Assumed-role credentials / 角色扮演凭证
//!
//! The role ARN and session name come from the environment first and from a
//! flat `KEY=value` config file second. A value that is present in the
//! environment wins even when blank.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::{CredentialResolver, CredentialStrategy, StorageCredentials};
use crate::config::CredentialSettings;
use crate::error::WagonResult;

/// Source of environment values / 环境变量来源
pub trait Environment: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment / 进程环境变量
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Names used for role discovery / 角色发现所用的键名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSettings {
    pub role_arn_key: String,
    pub session_name_key: String,
    pub config_file_key: String,
    pub default_config_file: PathBuf,
}

impl Default for RoleSettings {
    fn default() -> Self {
        RoleSettings::from(&CredentialSettings::default())
    }
}

impl From<&CredentialSettings> for RoleSettings {
    fn from(settings: &CredentialSettings) -> Self {
        Self {
            role_arn_key: settings.role_arn_env.clone(),
            session_name_key: settings.role_session_env.clone(),
            config_file_key: settings.config_file_env.clone(),
            default_config_file: PathBuf::from(&settings.default_config_file),
        }
    }
}

/// Role to assume / 待扮演的角色
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumedRoleDescriptor {
    pub role_arn: String,
    pub session_name: String,
}

impl AssumedRoleDescriptor {
    /// Look up both values; `None` unless both are present and non-blank
    pub fn discover(env: &dyn Environment, settings: &RoleSettings) -> Option<Self> {
        let mut file: Option<HashMap<String, String>> = None;
        let mut lookup = |key: &str| -> Option<String> {
            if let Some(value) = env.var(key) {
                return Some(value);
            }
            let entries = file.get_or_insert_with(|| {
                let path = env
                    .var(&settings.config_file_key)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| settings.default_config_file.clone());
                read_config_file(&path)
            });
            entries.get(key).cloned()
        };

        let role_arn = lookup(&settings.role_arn_key)?;
        let session_name = lookup(&settings.session_name_key)?;
        if role_arn.trim().is_empty() || session_name.trim().is_empty() {
            return None;
        }
        Some(Self { role_arn, session_name })
    }
}

/// 读取配置文件，任何错误都视为空
fn read_config_file(path: &Path) -> HashMap<String, String> {
    match dotenvy::from_path_iter(path) {
        Ok(iter) => iter.filter_map(Result::ok).collect(),
        Err(e) => {
            tracing::debug!("Role config file {} not usable: {}", path.display(), e);
            HashMap::new()
        }
    }
}

/// Exchanges a base identity for role credentials / 角色凭证交换
#[async_trait]
pub trait RoleAssumer: Send + Sync {
    async fn assume_role(
        &self,
        base: &StorageCredentials,
        role: &AssumedRoleDescriptor,
    ) -> WagonResult<StorageCredentials>;
}

pub struct AssumedRoleStrategy {
    env: Arc<dyn Environment>,
    settings: RoleSettings,
    assumer: Arc<dyn RoleAssumer>,
    base: CredentialResolver,
}

impl AssumedRoleStrategy {
    /// `base` resolves the identity that performs the assumption
    pub fn new(
        env: Arc<dyn Environment>,
        settings: RoleSettings,
        assumer: Arc<dyn RoleAssumer>,
        base: CredentialResolver,
    ) -> Self {
        Self { env, settings, assumer, base }
    }
}

#[async_trait]
impl CredentialStrategy for AssumedRoleStrategy {
    fn name(&self) -> &'static str {
        "assumed-role"
    }

    async fn resolve(&self) -> WagonResult<Option<StorageCredentials>> {
        let Some(role) = AssumedRoleDescriptor::discover(self.env.as_ref(), &self.settings) else {
            return Ok(None);
        };
        tracing::info!("Assuming role {} as session '{}'", role.role_arn, role.session_name);

        let base = self.base.resolve().await?;
        let credentials = self.assumer.assume_role(&base, &role).await?;
        Ok(Some(credentials))
    }
}
