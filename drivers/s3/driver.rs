//! S3驱动核心实现
//!
//! 设计原则：
//! - 只提供原语（list, get, put, head, location）
//! - 上传下载均为流式，不在内存中缓存整个对象
//! - 重试、签名、HTTP由rust-s3负责

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::Region;
use tokio::io::{AsyncRead, AsyncWrite};

use super::config::S3Config;
use crate::error::{StoreError, StoreResult};
use crate::storage::{ListObjectsRequest, ListingPage, ObjectMetadata, ObjectStore, PutObjectRequest};

/// S3驱动
pub struct S3Driver {
    config: S3Config,
    region: Region,
    credentials: Credentials,
}

impl S3Driver {
    /// 创建新的S3驱动实例
    pub fn new(config: S3Config, region: Region, credentials: Credentials) -> Self {
        Self { config, region, credentials }
    }

    /// 创建S3 Bucket客户端
    fn bucket(&self, name: &str) -> StoreResult<Box<Bucket>> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())
            .map_err(|e| StoreError::Client(format!("创建S3 Bucket失败: {}", e)))?;

        let bucket = if self.config.force_path_style {
            bucket.with_path_style()
        } else {
            bucket
        };

        if self.config.request_timeout_secs > 0 {
            bucket
                .with_request_timeout(Duration::from_secs(self.config.request_timeout_secs))
                .map_err(map_s3_error)
        } else {
            Ok(bucket)
        }
    }
}

/// rust-s3错误转换：HTTP失败为服务端错误，其余为客户端错误
pub(crate) fn map_s3_error(error: S3Error) -> StoreError {
    match error {
        S3Error::HttpFailWithBody(status, body) => StoreError::service(status, body),
        other => StoreError::Client(other.to_string()),
    }
}

/// 将rust-s3解析出的区域还原为位置约束字符串
pub(crate) fn location_constraint(region: &Region) -> String {
    match region {
        Region::UsEast1 => String::new(),
        Region::EuWest1 => "EU".to_string(),
        // 空的LocationConstraint元素（US Standard）被rust-s3解析为该占位区域
        Region::Custom { region, endpoint } if region == "Custom" && endpoint.is_empty() => String::new(),
        other => other.to_string(),
    }
}

fn parse_last_modified(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|d| d.with_timezone(&Utc))
        .ok()
}

#[async_trait]
impl ObjectStore for S3Driver {
    fn name(&self) -> &str {
        "s3"
    }

    async fn list_objects(&self, request: &ListObjectsRequest) -> StoreResult<ListingPage> {
        let bucket = self.bucket(&request.bucket)?;
        tracing::debug!(
            "S3 ListObjects: bucket={}, prefix={}, token={:?}",
            request.bucket,
            request.prefix,
            request.continuation_token
        );

        let (result, _) = bucket
            .list_page(
                request.prefix.clone(),
                request.delimiter.clone(),
                request.continuation_token.clone(),
                None,
                None,
            )
            .await
            .map_err(map_s3_error)?;

        Ok(ListingPage {
            common_prefixes: result
                .common_prefixes
                .unwrap_or_default()
                .into_iter()
                .map(|cp| cp.prefix)
                .collect(),
            keys: result.contents.into_iter().map(|obj| obj.key).collect(),
            is_truncated: result.is_truncated,
            continuation_token: result.next_continuation_token,
        })
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        mut sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> StoreResult<()> {
        let client = self.bucket(bucket)?;
        tracing::debug!("S3 GetObject: bucket={}, key={}", bucket, key);

        // 流式写入，不在内存中缓存
        client
            .get_object_to_writer(key, &mut sink)
            .await
            .map_err(map_s3_error)?;
        Ok(())
    }

    async fn put_object(
        &self,
        request: &PutObjectRequest,
        mut body: &mut (dyn AsyncRead + Unpin + Send),
    ) -> StoreResult<()> {
        let mut client = self.bucket(&request.bucket)?;
        client.add_header("x-amz-acl", request.acl.as_str());
        tracing::debug!(
            "S3 PutObject: bucket={}, key={}, length={}, type={}",
            request.bucket,
            request.key,
            request.content_length,
            request.content_type_or_default()
        );

        client
            .put_object_stream_with_content_type(&mut body, &request.key, request.content_type_or_default())
            .await
            .map_err(map_s3_error)?;
        Ok(())
    }

    async fn get_object_metadata(&self, bucket: &str, key: &str) -> StoreResult<ObjectMetadata> {
        let client = self.bucket(bucket)?;
        let (head, _) = client.head_object(key).await.map_err(map_s3_error)?;

        Ok(ObjectMetadata {
            content_length: head.content_length.unwrap_or(0).max(0) as u64,
            content_type: head.content_type,
            last_modified: head.last_modified.as_deref().and_then(parse_last_modified),
            e_tag: head.e_tag,
        })
    }

    async fn get_bucket_location(&self, bucket: &str) -> StoreResult<String> {
        let client = self.bucket(bucket)?;
        let (region, _) = client.location().await.map_err(map_s3_error)?;
        Ok(location_constraint(&region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_keep_status() {
        let err = map_s3_error(S3Error::HttpFailWithBody(404, "NoSuchKey".to_string()));
        assert!(err.is_service());
        assert_eq!(err.status(), Some(404));

        let err = map_s3_error(S3Error::HttpFailWithBody(403, "AccessDenied".to_string()));
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn test_location_constraint_round_trip() {
        assert_eq!(location_constraint(&Region::UsEast1), "");
        assert_eq!(location_constraint(&Region::EuWest1), "EU");
        assert_eq!(location_constraint(&Region::UsWest2), "us-west-2");
        assert_eq!(location_constraint(&Region::SaEast1), "sa-east-1");
    }

    #[test]
    fn test_empty_location_element_is_us_standard() {
        let parsed = Region::Custom {
            region: "Custom".to_string(),
            endpoint: String::new(),
        };
        let constraint = location_constraint(&parsed);
        assert_eq!(constraint, "");

        let region = crate::region::Region::from_location_constraint(&constraint).unwrap();
        assert_eq!(region, crate::region::Region::Us);
        assert_eq!(region.endpoint(), "s3.amazonaws.com");

        let eu = location_constraint(&Region::EuWest1);
        let region = crate::region::Region::from_location_constraint(&eu).unwrap();
        assert_eq!(region, crate::region::Region::Eu);
    }

    #[test]
    fn test_last_modified_formats() {
        let rfc2822 = parse_last_modified("Wed, 21 Oct 2015 07:28:00 GMT").unwrap();
        assert_eq!(rfc2822.to_rfc3339(), "2015-10-21T07:28:00+00:00");
        let rfc3339 = parse_last_modified("2015-10-21T07:28:00.000Z").unwrap();
        assert_eq!(rfc3339, rfc2822);
        assert!(parse_last_modified("yesterday").is_none());
    }

    #[test]
    fn test_bucket_client_creation() {
        let credentials = Credentials::new(Some("AKID"), Some("SECRET"), None, None, None).unwrap();
        let region = Region::Custom {
            region: "us-east-1".to_string(),
            endpoint: "http://localhost:9000".to_string(),
        };
        let config = S3Config { force_path_style: true, ..S3Config::default() };
        let driver = S3Driver::new(config, region, credentials);
        let bucket = driver.bucket("artifacts").unwrap();
        assert_eq!(bucket.name(), "artifacts");
        assert_eq!(driver.name(), "s3");
    }
}
