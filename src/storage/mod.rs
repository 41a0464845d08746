use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::StoreResult;

/// 进度回调类型 / Progress callback type
/// 参数: (已完成字节数, 总字节数) / Parameters: (completed_bytes, total_bytes)
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Path delimiter used to emulate directories / 目录分隔符
pub const DELIMITER: &str = "/";

/// Access control policy applied on write / 写入时的访问控制策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CannedAcl {
    Private,
    #[default]
    BucketOwnerFullControl,
}

impl CannedAcl {
    /// Value of the `x-amz-acl` header
    pub fn as_str(&self) -> &'static str {
        match self {
            CannedAcl::Private => "private",
            CannedAcl::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

/// List request scoped to a prefix / 列表请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListObjectsRequest {
    pub bucket: String,
    pub prefix: String,
    pub delimiter: Option<String>,
    pub continuation_token: Option<String>,
}

impl ListObjectsRequest {
    pub fn new(bucket: &str, prefix: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            delimiter: None,
            continuation_token: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = Some(delimiter.to_string());
        self
    }
}

/// One page of a listing / 一页列表结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Pseudo-directories (keys grouped up to the next delimiter) / 公共前缀
    pub common_prefixes: Vec<String>,
    /// Keys of concrete objects / 对象键
    pub keys: Vec<String>,
    /// More results available / 是否还有更多结果
    pub is_truncated: bool,
    pub continuation_token: Option<String>,
}

/// Object metadata / 对象元数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_length: u64,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub e_tag: Option<String>,
}

/// Write request / 写入请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub content_length: u64,
    pub content_type: Option<String>,
    pub acl: CannedAcl,
}

impl PutObjectRequest {
    pub fn new(bucket: &str, key: &str, content_length: u64) -> Self {
        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_length,
            content_type: None,
            acl: CannedAcl::default(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_acl(mut self, acl: CannedAcl) -> Self {
        self.acl = acl;
        self
    }

    /// Content type sent to the store / 实际发送的内容类型
    pub fn content_type_or_default(&self) -> &str {
        self.content_type.as_deref().unwrap_or("application/octet-stream")
    }
}

/// Object store interface (provides only primitive operations) / 对象存储接口
///
/// The wagon talks to storage exclusively through this trait; retries,
/// signing and the HTTP stack belong to the implementation.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Driver name / 驱动名称
    fn name(&self) -> &str;

    /// List one page under a prefix / 列出一页对象
    async fn list_objects(&self, request: &ListObjectsRequest) -> StoreResult<ListingPage>;

    /// Stream an object into `sink` / 下载对象到写入器
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> StoreResult<()>;

    /// Write an object from `body` / 从读取器上传对象
    async fn put_object(
        &self,
        request: &PutObjectRequest,
        body: &mut (dyn AsyncRead + Unpin + Send),
    ) -> StoreResult<()>;

    /// Fetch metadata without the body / 获取对象元数据
    async fn get_object_metadata(&self, bucket: &str, key: &str) -> StoreResult<ObjectMetadata>;

    /// Location constraint of a bucket ("" for the US standard region) / 获取存储桶区域
    async fn get_bucket_location(&self, bucket: &str) -> StoreResult<String>;
}

pub mod factory;

pub use factory::StoreFactory;
