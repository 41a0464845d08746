//! STS AssumeRole / STS 角色扮演

use async_trait::async_trait;
use aws_sdk_sts::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_sts::error::DisplayErrorContext;
use chrono::DateTime;

use super::{AssumedRoleDescriptor, RoleAssumer, StorageCredentials};
use crate::error::{TransportError, WagonResult};

/// `RoleAssumer` backed by AWS STS / 基于 AWS STS 的角色扮演
#[derive(Debug, Clone)]
pub struct StsRoleAssumer {
    region: String,
}

impl StsRoleAssumer {
    pub fn new(region: &str) -> Self {
        Self { region: region.to_string() }
    }

    fn client(&self, base: &StorageCredentials) -> aws_sdk_sts::Client {
        let provider = Credentials::new(
            base.access_key(),
            base.secret_key(),
            base.session_token().map(str::to_string),
            None,
            "s3-wagon",
        );
        let config = aws_sdk_sts::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(provider)
            .build();
        aws_sdk_sts::Client::from_conf(config)
    }
}

#[async_trait]
impl RoleAssumer for StsRoleAssumer {
    async fn assume_role(
        &self,
        base: &StorageCredentials,
        role: &AssumedRoleDescriptor,
    ) -> WagonResult<StorageCredentials> {
        let output = self
            .client(base)
            .assume_role()
            .role_arn(&role.role_arn)
            .role_session_name(&role.session_name)
            .send()
            .await
            .map_err(|e| {
                TransportError::authentication_failed(format!(
                    "Cannot assume role {}: {}",
                    role.role_arn,
                    DisplayErrorContext(&e)
                ))
            })?;

        let issued = output.credentials().ok_or_else(|| {
            TransportError::authentication_failed(format!(
                "STS returned no credentials for role {}",
                role.role_arn
            ))
        })?;

        let expiration = DateTime::from_timestamp(issued.expiration().secs(), 0);
        tracing::debug!("Role {} credentials valid until {:?}", role.role_arn, expiration);

        Ok(StorageCredentials::new(issued.access_key_id(), issued.secret_access_key())
            .with_session_token(issued.session_token())
            .with_expiration(expiration))
    }
}
