//! 内存对象存储驱动
//!
//! 行为与S3保持一致：键有序、按分隔符分组公共前缀、分页与继续令牌、
//! 不存在的桶或键返回404。所有调用都会被记录，便于检查调用顺序。

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{StoreError, StoreResult};
use crate::storage::{
    CannedAcl, ListObjectsRequest, ListingPage, ObjectMetadata, ObjectStore, PutObjectRequest,
};

/// A call received by the driver / 驱动收到的调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List {
        prefix: String,
        continuation_token: Option<String>,
    },
    Get {
        key: String,
    },
    Put {
        key: String,
        content_length: u64,
        content_type: String,
        acl: CannedAcl,
    },
    Head {
        key: String,
    },
    Location {
        bucket: String,
    },
}

/// 存储的对象
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub acl: CannedAcl,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Service(u16),
    Client,
}

impl Failure {
    fn to_error(self, key: &str) -> StoreError {
        match self {
            Failure::Service(status) => StoreError::service(status, format!("injected failure for {}", key)),
            Failure::Client => StoreError::Client(format!("connection reset while accessing {}", key)),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryBucket {
    location: String,
    objects: BTreeMap<String, StoredObject>,
}

#[derive(Debug, Default)]
struct State {
    buckets: HashMap<String, MemoryBucket>,
    calls: Vec<StoreCall>,
    failures: HashMap<String, Failure>,
    /// 下载写出指定字节数后中断
    interruptions: HashMap<String, usize>,
    /// 每页最多条目数，0表示不分页
    page_size: usize,
    /// 模拟异常服务：截断的页面不返回继续令牌
    drop_continuation_tokens: bool,
}

/// 一页中的条目（公共前缀或对象键）
enum Entry {
    Prefix(String),
    Key(String),
}

impl Entry {
    fn as_str(&self) -> &str {
        match self {
            Entry::Prefix(p) => p,
            Entry::Key(k) => k,
        }
    }
}

/// In-memory object store / 内存对象存储
///
/// Clones share the same buckets, so a test can keep one handle for
/// inspection while the wagon owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    state: Arc<Mutex<State>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建位于US标准区域的桶
    pub fn create_bucket(&self, bucket: &str) {
        self.create_bucket_in(bucket, "");
    }

    /// 创建指定位置约束的桶
    pub fn create_bucket_in(&self, bucket: &str, location: &str) {
        self.state.lock().buckets.insert(
            bucket.to_string(),
            MemoryBucket { location: location.to_string(), objects: BTreeMap::new() },
        );
    }

    /// Store an object directly, bypassing the call log / 直接写入对象（不记录调用）
    pub fn insert_object(&self, bucket: &str, key: &str, data: &[u8]) {
        let mut state = self.state.lock();
        let target = state.buckets.entry(bucket.to_string()).or_default();
        target.objects.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: "application/octet-stream".to_string(),
                acl: CannedAcl::default(),
                last_modified: Some(Utc::now()),
            },
        );
    }

    pub fn set_last_modified(&self, bucket: &str, key: &str, last_modified: Option<DateTime<Utc>>) {
        let mut state = self.state.lock();
        if let Some(object) = state
            .buckets
            .get_mut(bucket)
            .and_then(|b| b.objects.get_mut(key))
        {
            object.last_modified = last_modified;
        }
    }

    pub fn set_page_size(&self, page_size: usize) {
        self.state.lock().page_size = page_size;
    }

    pub fn set_drop_continuation_tokens(&self, drop: bool) {
        self.state.lock().drop_continuation_tokens = drop;
    }

    /// Every access to `key` answers with the given service status / 注入服务端错误
    pub fn fail_with_status(&self, key: &str, status: u16) {
        self.state.lock().failures.insert(key.to_string(), Failure::Service(status));
    }

    /// Every access to `key` fails before reaching the service / 注入客户端错误
    pub fn fail_with_client_error(&self, key: &str) {
        self.state.lock().failures.insert(key.to_string(), Failure::Client);
    }

    /// Downloads of `key` stop with a client error after `after` bytes / 注入下载中断
    pub fn interrupt_download(&self, key: &str, after: usize) {
        self.state.lock().interruptions.insert(key.to_string(), after);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let state = self.state.lock();
        state.buckets.get(bucket).and_then(|b| b.objects.get(key)).cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let state = self.state.lock();
        state
            .buckets
            .get(bucket)
            .map(|b| b.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().calls.clone()
    }

    /// Keys written, in call order / 按调用顺序返回写入的键
    pub fn put_keys(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::Put { key, .. } => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn record(&self, call: StoreCall) {
        self.state.lock().calls.push(call);
    }

    fn check_failure(state: &State, key: &str) -> StoreResult<()> {
        match state.failures.get(key) {
            Some(failure) => Err(failure.to_error(key)),
            None => Ok(()),
        }
    }

    fn no_such_bucket(bucket: &str) -> StoreError {
        StoreError::service(404, format!("NoSuchBucket: {}", bucket))
    }

    fn no_such_key(key: &str) -> StoreError {
        StoreError::service(404, format!("NoSuchKey: {}", key))
    }

    /// 按S3语义生成有序条目：键与公共前缀合并排序，公共前缀去重
    fn entries(objects: &BTreeMap<String, StoredObject>, prefix: &str, delimiter: Option<&str>) -> Vec<Entry> {
        let mut prefixes = BTreeSet::new();
        let mut entries = Vec::new();

        for key in objects.keys().filter(|k| k.starts_with(prefix)) {
            let rest = &key[prefix.len()..];
            match delimiter.and_then(|d| rest.find(d).map(|i| i + d.len())) {
                Some(end) => {
                    let common = format!("{}{}", prefix, &rest[..end]);
                    if prefixes.insert(common.clone()) {
                        entries.push(Entry::Prefix(common));
                    }
                }
                None => entries.push(Entry::Key(key.clone())),
            }
        }

        entries.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        entries
    }
}

#[async_trait]
impl ObjectStore for MemoryDriver {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_objects(&self, request: &ListObjectsRequest) -> StoreResult<ListingPage> {
        self.record(StoreCall::List {
            prefix: request.prefix.clone(),
            continuation_token: request.continuation_token.clone(),
        });

        let state = self.state.lock();
        Self::check_failure(&state, &request.prefix)?;
        let bucket = state
            .buckets
            .get(&request.bucket)
            .ok_or_else(|| Self::no_such_bucket(&request.bucket))?;

        let entries = Self::entries(&bucket.objects, &request.prefix, request.delimiter.as_deref());
        let start = match &request.continuation_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StoreError::service(400, format!("InvalidArgument: continuation token {}", token)))?,
            None => 0,
        };
        let end = if state.page_size == 0 {
            entries.len()
        } else {
            (start + state.page_size).min(entries.len())
        };

        let mut page = ListingPage::default();
        for entry in entries.iter().take(end).skip(start) {
            match entry {
                Entry::Prefix(p) => page.common_prefixes.push(p.clone()),
                Entry::Key(k) => page.keys.push(k.clone()),
            }
        }
        page.is_truncated = end < entries.len();
        if page.is_truncated && !state.drop_continuation_tokens {
            page.continuation_token = Some(end.to_string());
        }
        Ok(page)
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> StoreResult<()> {
        self.record(StoreCall::Get { key: key.to_string() });

        let (data, interruption) = {
            let state = self.state.lock();
            Self::check_failure(&state, key)?;
            let bucket = state.buckets.get(bucket).ok_or_else(|| Self::no_such_bucket(bucket))?;
            let data = bucket.objects.get(key).ok_or_else(|| Self::no_such_key(key))?.data.clone();
            (data, state.interruptions.get(key).copied())
        };

        if let Some(after) = interruption {
            sink.write_all(&data[..after.min(data.len())]).await?;
            sink.flush().await?;
            return Err(StoreError::Client(format!("connection reset while reading {}", key)));
        }

        sink.write_all(&data).await?;
        sink.flush().await?;
        Ok(())
    }

    async fn put_object(
        &self,
        request: &PutObjectRequest,
        body: &mut (dyn AsyncRead + Unpin + Send),
    ) -> StoreResult<()> {
        self.record(StoreCall::Put {
            key: request.key.clone(),
            content_length: request.content_length,
            content_type: request.content_type_or_default().to_string(),
            acl: request.acl,
        });

        let mut data = Vec::with_capacity(request.content_length as usize);
        body.read_to_end(&mut data).await?;

        let mut state = self.state.lock();
        Self::check_failure(&state, &request.key)?;
        let bucket = state
            .buckets
            .get_mut(&request.bucket)
            .ok_or_else(|| Self::no_such_bucket(&request.bucket))?;
        bucket.objects.insert(
            request.key.clone(),
            StoredObject {
                data,
                content_type: request.content_type_or_default().to_string(),
                acl: request.acl,
                last_modified: Some(Utc::now()),
            },
        );
        Ok(())
    }

    async fn get_object_metadata(&self, bucket: &str, key: &str) -> StoreResult<ObjectMetadata> {
        self.record(StoreCall::Head { key: key.to_string() });

        let state = self.state.lock();
        Self::check_failure(&state, key)?;
        let bucket = state.buckets.get(bucket).ok_or_else(|| Self::no_such_bucket(bucket))?;
        let object = bucket.objects.get(key).ok_or_else(|| Self::no_such_key(key))?;
        Ok(ObjectMetadata {
            content_length: object.data.len() as u64,
            content_type: Some(object.content_type.clone()),
            last_modified: object.last_modified,
            e_tag: None,
        })
    }

    async fn get_bucket_location(&self, bucket: &str) -> StoreResult<String> {
        self.record(StoreCall::Location { bucket: bucket.to_string() });

        let state = self.state.lock();
        Self::check_failure(&state, bucket)?;
        state
            .buckets
            .get(bucket)
            .map(|b| b.location.clone())
            .ok_or_else(|| Self::no_such_bucket(bucket))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> MemoryDriver {
        let driver = MemoryDriver::new();
        driver.create_bucket("bucket");
        for key in ["a/1", "a/2/x", "a/2/y", "a/3/", "b", "a/0"] {
            driver.insert_object("bucket", key, b"data");
        }
        driver
    }

    #[tokio::test]
    async fn test_list_groups_common_prefixes() {
        let driver = driver();
        let request = ListObjectsRequest::new("bucket", "a/").with_delimiter("/");
        let page = driver.list_objects(&request).await.unwrap();
        assert_eq!(page.common_prefixes, vec!["a/2/", "a/3/"]);
        assert_eq!(page.keys, vec!["a/0", "a/1"]);
        assert!(!page.is_truncated);
    }

    #[tokio::test]
    async fn test_list_pages() {
        let driver = driver();
        driver.set_page_size(3);
        let mut request = ListObjectsRequest::new("bucket", "a/").with_delimiter("/");

        let first = driver.list_objects(&request).await.unwrap();
        assert_eq!(first.keys, vec!["a/0", "a/1"]);
        assert_eq!(first.common_prefixes, vec!["a/2/"]);
        assert!(first.is_truncated);

        request.continuation_token = first.continuation_token;
        let second = driver.list_objects(&request).await.unwrap();
        assert_eq!(second.common_prefixes, vec!["a/3/"]);
        assert!(second.keys.is_empty());
        assert!(!second.is_truncated);
        assert!(second.continuation_token.is_none());
    }

    #[tokio::test]
    async fn test_missing_bucket_and_key() {
        let driver = driver();
        let err = driver
            .list_objects(&ListObjectsRequest::new("nope", ""))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));

        let err = driver.get_object_metadata("bucket", "missing").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let driver = driver();
        let request = PutObjectRequest::new("bucket", "c/file.txt", 5).with_content_type("text/plain");
        let mut body: &[u8] = b"hello";
        driver.put_object(&request, &mut body).await.unwrap();

        let mut out = Vec::new();
        driver.get_object("bucket", "c/file.txt", &mut out).await.unwrap();
        assert_eq!(out, b"hello");

        let stored = driver.object("bucket", "c/file.txt").unwrap();
        assert_eq!(stored.content_type, "text/plain");
        assert_eq!(stored.acl, CannedAcl::BucketOwnerFullControl);
        assert_eq!(driver.put_keys(), vec!["c/file.txt"]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let driver = driver();
        driver.fail_with_status("b", 500);
        driver.fail_with_client_error("a/1");

        assert_eq!(driver.get_object_metadata("bucket", "b").await.unwrap_err().status(), Some(500));
        assert!(!driver.get_object_metadata("bucket", "a/1").await.unwrap_err().is_service());
    }

    #[tokio::test]
    async fn test_interrupted_download() {
        let driver = driver();
        driver.insert_object("bucket", "big", b"0123456789");
        driver.interrupt_download("big", 4);

        let mut sink = Vec::new();
        let err = driver.get_object("bucket", "big", &mut sink).await.unwrap_err();
        assert!(!err.is_service());
        assert_eq!(sink, b"0123");
        assert!(driver.get_object_metadata("bucket", "big").await.is_ok());
    }
}
