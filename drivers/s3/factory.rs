//! S3驱动工厂

use std::sync::Arc;

use s3::creds::Credentials;

use super::config::S3Config;
use super::driver::S3Driver;
use crate::credentials::StorageCredentials;
use crate::error::{StoreError, StoreResult};
use crate::region::Region;
use crate::storage::{ObjectStore, StoreFactory};

/// 无区域客户端使用的签名区域与端点
const AGNOSTIC_REGION: &str = "us-east-1";
const AGNOSTIC_ENDPOINT: &str = "s3.amazonaws.com";

/// S3驱动工厂
#[derive(Debug, Clone, Default)]
pub struct S3DriverFactory {
    config: S3Config,
}

impl S3DriverFactory {
    pub fn new(config: S3Config) -> Self {
        Self { config }
    }

    /// 计算rust-s3区域：自定义端点优先，否则使用区域表中的AWS端点
    fn s3_region(&self, region: Option<Region>) -> s3::Region {
        let signing = region.map(|r| r.signing_name()).unwrap_or(AGNOSTIC_REGION);
        let endpoint = if self.config.endpoint.is_empty() {
            let host = region.map(|r| r.endpoint()).unwrap_or(AGNOSTIC_ENDPOINT);
            format!("{}://{}", self.config.scheme, host)
        } else {
            self.config.endpoint.clone()
        };
        s3::Region::Custom {
            region: signing.to_string(),
            endpoint,
        }
    }
}

impl StoreFactory for S3DriverFactory {
    fn driver_type(&self) -> &'static str {
        "s3"
    }

    fn create_store(
        &self,
        credentials: &StorageCredentials,
        region: Option<Region>,
    ) -> StoreResult<Arc<dyn ObjectStore>> {
        let s3_credentials = Credentials::new(
            Some(credentials.access_key()),
            Some(credentials.secret_key()),
            None,
            credentials.session_token(),
            None,
        )
        .map_err(|e| StoreError::Client(format!("创建S3凭证失败: {}", e)))?;

        Ok(Arc::new(S3Driver::new(
            self.config.clone(),
            self.s3_region(region),
            s3_credentials,
        )))
    }
}
