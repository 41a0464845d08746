//! Credential resolution / 凭证解析
//!
//! Strategies are tried in a fixed order and the first one that yields
//! credentials wins:
//! 1. static credentials handed over by the host
//! 2. an assumed role, when a role ARN and session name can be discovered
//! 3. the SDK default chain (environment, profile, instance metadata)

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::TransportConfig;
use crate::error::{TransportError, WagonResult};

pub mod role;
pub mod sts;

pub use role::{AssumedRoleDescriptor, AssumedRoleStrategy, Environment, ProcessEnvironment, RoleAssumer, RoleSettings};
pub use sts::StsRoleAssumer;

/// Username/password pair supplied by the host / 调用方提供的认证信息
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthenticationInfo {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AuthenticationInfo {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }
}

impl fmt::Debug for AuthenticationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationInfo")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Access key pair, optionally temporary / 存储访问凭证
#[derive(Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    access_key: String,
    secret_key: String,
    session_token: Option<String>,
    expiration: Option<DateTime<Utc>>,
}

impl StorageCredentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: None,
            expiration: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_expiration(mut self, expiration: Option<DateTime<Utc>>) -> Self {
        self.expiration = expiration;
        self
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// One way of obtaining credentials / 凭证获取策略
///
/// `Ok(None)` means "not applicable, try the next strategy"; an error stops
/// the chain.
#[async_trait]
pub trait CredentialStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self) -> WagonResult<Option<StorageCredentials>>;
}

/// Credentials taken verbatim from the host / 静态凭证
pub struct StaticCredentials {
    auth: Option<AuthenticationInfo>,
}

impl StaticCredentials {
    pub fn new(auth: Option<AuthenticationInfo>) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl CredentialStrategy for StaticCredentials {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn resolve(&self) -> WagonResult<Option<StorageCredentials>> {
        let Some(auth) = &self.auth else {
            return Ok(None);
        };
        match (auth.username.as_deref(), auth.password.as_deref()) {
            (Some(user), Some(pass)) if !user.trim().is_empty() && !pass.trim().is_empty() => {
                Ok(Some(StorageCredentials::new(user, pass)))
            }
            _ => Ok(None),
        }
    }
}

/// SDK default provider chain / 默认凭证链
#[derive(Debug, Default)]
pub struct DefaultChain;

#[async_trait]
impl CredentialStrategy for DefaultChain {
    fn name(&self) -> &'static str {
        "default-chain"
    }

    async fn resolve(&self) -> WagonResult<Option<StorageCredentials>> {
        // 实例元数据查询是阻塞IO
        let lookup = tokio::task::spawn_blocking(s3::creds::Credentials::default)
            .await
            .map_err(|e| {
                TransportError::authentication_failed("Default credential lookup aborted")
                    .with_source(e)
            })?;

        match lookup {
            Ok(found) => match (found.access_key, found.secret_key) {
                (Some(access_key), Some(secret_key)) => {
                    let mut credentials = StorageCredentials::new(access_key, secret_key);
                    if let Some(token) = found.session_token.or(found.security_token) {
                        credentials = credentials.with_session_token(token);
                    }
                    Ok(Some(credentials))
                }
                _ => Ok(None),
            },
            Err(e) => {
                tracing::debug!("Default credential chain yielded nothing: {}", e);
                Ok(None)
            }
        }
    }
}

/// Identity used to call STS when assuming a role / 扮演角色时的基础凭证
///
/// Static credentials are absent here: when present they already win ahead
/// of the assumed-role strategy.
fn role_base_chain() -> CredentialResolver {
    CredentialResolver::new(vec![Box::new(DefaultChain)])
}

/// Ordered strategy chain / 凭证策略链
pub struct CredentialResolver {
    strategies: Vec<Box<dyn CredentialStrategy>>,
}

impl CredentialResolver {
    pub fn new(strategies: Vec<Box<dyn CredentialStrategy>>) -> Self {
        Self { strategies }
    }

    /// Static → assumed role → default chain, wired to the process environment and STS
    pub fn standard(auth: Option<&AuthenticationInfo>, config: &TransportConfig) -> Self {
        let assumed_role = AssumedRoleStrategy::new(
            Arc::new(ProcessEnvironment),
            RoleSettings::from(&config.credentials),
            Arc::new(StsRoleAssumer::new(&config.credentials.sts_region)),
            role_base_chain(),
        );

        Self::new(vec![
            Box::new(StaticCredentials::new(auth.cloned())),
            Box::new(assumed_role),
            Box::new(DefaultChain),
        ])
    }

    /// Names of the strategies in evaluation order
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// 依次尝试各策略，第一个成功的生效
    pub async fn resolve(&self) -> WagonResult<StorageCredentials> {
        for strategy in &self.strategies {
            if let Some(credentials) = strategy.resolve().await? {
                tracing::debug!("Credentials resolved by '{}' strategy", strategy.name());
                return Ok(credentials);
            }
        }
        Err(TransportError::authentication_failed(
            "No credential strategy produced usable credentials",
        ))
    }
}
