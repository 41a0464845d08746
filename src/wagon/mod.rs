//! S3 wagon: the operations a build tool drives / S3 传输器
//!
//! Lifecycle: [`S3Wagon::connect`] resolves credentials and the bucket's
//! region, data operations run against that connection, and
//! [`S3Wagon::disconnect`] drops it. Connecting twice is a no-op.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::io::AsyncWriteExt;

use crate::config::TransportConfig;
use crate::credentials::{AuthenticationInfo, CredentialResolver};
use crate::drivers::s3::S3DriverFactory;
use crate::error::{StoreError, TransportError, WagonResult};
use crate::key::to_key;
use crate::progress::{ProgressReader, ProgressWriter};
use crate::region::{self, Region};
use crate::repository::Repository;
use crate::storage::{CannedAcl, ObjectMetadata, ProgressCallback, PutObjectRequest, StoreFactory};

mod connection;
mod listing;
mod materialize;

use connection::{Connection, ConnectionState};

/// Artifact transport over an object store / 基于对象存储的制品传输
pub struct S3Wagon {
    config: TransportConfig,
    factory: Arc<dyn StoreFactory>,
    state: RwLock<ConnectionState>,
}

impl S3Wagon {
    /// Wagon backed by rust-s3 / 使用 rust-s3 客户端
    pub fn new(config: TransportConfig) -> Self {
        let factory = Arc::new(S3DriverFactory::new(config.storage.clone()));
        Self::with_factory(config, factory)
    }

    /// Wagon backed by any store implementation / 使用指定的存储工厂
    pub fn with_factory(config: TransportConfig, factory: Arc<dyn StoreFactory>) -> Self {
        Self {
            config,
            factory,
            state: RwLock::new(ConnectionState::Disconnected),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Connect using the standard credential chain / 使用标准凭证链连接
    pub async fn connect(
        &self,
        repository: &Repository,
        auth: Option<&AuthenticationInfo>,
    ) -> WagonResult<()> {
        if self.is_connected() {
            tracing::debug!("Already connected, ignoring connect to {}", repository);
            return Ok(());
        }
        let resolver = CredentialResolver::standard(auth, &self.config);
        self.connect_with(repository, &resolver).await
    }

    /// Connect resolving credentials through `resolver` / 使用指定凭证链连接
    pub async fn connect_with(
        &self,
        repository: &Repository,
        resolver: &CredentialResolver,
    ) -> WagonResult<()> {
        if self.is_connected() {
            tracing::debug!("Already connected, ignoring connect to {}", repository);
            return Ok(());
        }

        let credentials = resolver.resolve().await?;
        let (region, store) =
            region::negotiate(self.factory.as_ref(), &credentials, repository.bucket()).await?;
        let connection = Connection::new(
            store,
            repository.clone(),
            region,
            self.config.cache_directory_markers,
        );

        let mut state = self.state.write();
        if let ConnectionState::Connected(existing) = &*state {
            tracing::debug!(
                "Connection to {} was established concurrently, keeping it",
                existing.repository()
            );
            return Ok(());
        }
        *state = ConnectionState::Connected(Arc::new(connection));
        tracing::info!("Connected to {} ({})", repository, region.endpoint());
        Ok(())
    }

    /// Drop the connection; always safe / 断开连接
    pub fn disconnect(&self) {
        let previous = std::mem::take(&mut *self.state.write());
        if let ConnectionState::Connected(connection) = previous {
            tracing::info!("Disconnected from {}", connection.repository());
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.state.read(), ConnectionState::Connected(_))
    }

    /// Repository of the current connection / 当前连接的仓库
    pub fn repository(&self) -> Option<Repository> {
        self.state.read().connection().map(|c| c.repository().clone())
    }

    /// Region the current connection is bound to / 当前连接的区域
    pub fn region(&self) -> Option<Region> {
        self.state.read().connection().map(|c| c.region())
    }

    fn connection(&self) -> WagonResult<Arc<Connection>> {
        self.state.read().connection().ok_or(TransportError::NotConnected)
    }

    /// Whether `name` exists; any service answer other than success means no / 资源是否存在
    pub async fn resource_exists(&self, name: &str) -> WagonResult<bool> {
        let connection = self.connection()?;
        let key = to_key(connection.base_directory(), name);
        match connection.store().get_object_metadata(connection.bucket(), &key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_service() => {
                tracing::debug!("'{}' treated as absent: {}", name, e);
                Ok(false)
            }
            Err(e) => Err(TransportError::transfer_failed(format!("Cannot check '{}'", name)).with_source(e)),
        }
    }

    /// True when the remote copy has no modification time or is newer than `timestamp` / 远程是否更新
    pub async fn is_newer(&self, name: &str, timestamp: DateTime<Utc>) -> WagonResult<bool> {
        let connection = self.connection()?;
        let metadata = metadata(&connection, name).await?;
        Ok(match metadata.last_modified {
            Some(last_modified) => last_modified > timestamp,
            None => true,
        })
    }

    /// Names directly under `directory` / 列出目录
    pub async fn list(&self, directory: &str) -> WagonResult<Vec<String>> {
        let connection = self.connection()?;
        listing::list_directory(&connection, directory).await
    }

    /// Download `name` into `destination` / 下载资源
    ///
    /// The object is streamed into a temporary file next to `destination`
    /// and renamed over it only after the transfer completed, so a failed
    /// download leaves an existing destination untouched.
    pub async fn get(
        &self,
        name: &str,
        destination: &Path,
        progress: Option<ProgressCallback>,
    ) -> WagonResult<()> {
        let connection = self.connection()?;
        let key = to_key(connection.base_directory(), name);

        let cannot_transfer = |e: StoreError| {
            if e.is_service() {
                TransportError::not_found(format!("'{}' does not exist", name)).with_source(e)
            } else {
                TransportError::transfer_failed(format!(
                    "Cannot read from '{}' and write to '{}'",
                    name,
                    destination.display()
                ))
                .with_source(e)
            }
        };

        // 先确认资源存在，再触碰本地文件
        let total = connection
            .store()
            .get_object_metadata(connection.bucket(), &key)
            .await
            .map_err(cannot_transfer)?
            .content_length;

        let cannot_create = |e: std::io::Error| {
            TransportError::transfer_failed(format!(
                "Cannot write file to '{}'",
                destination.display()
            ))
            .with_source(e)
        };
        let parent = match destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                tokio::fs::create_dir_all(parent).await.map_err(cannot_create)?;
                parent
            }
            None => Path::new("."),
        };
        let (file, temp_path) = tempfile::NamedTempFile::new_in(parent)
            .map_err(cannot_create)?
            .into_parts();

        let mut writer = ProgressWriter::new(tokio::fs::File::from_std(file), total, progress);
        let result = match connection.store().get_object(connection.bucket(), &key, &mut writer).await {
            Ok(()) => writer.flush().await.map_err(StoreError::from),
            Err(e) => Err(e),
        };
        drop(writer);

        // 失败时丢弃临时文件即可删除它
        result.map_err(cannot_transfer)?;
        temp_path.persist(destination).map_err(|e| cannot_create(e.error))?;

        tracing::debug!("Downloaded {} to {}", key, destination.display());
        Ok(())
    }

    /// Download only when the remote copy is newer; returns whether it did / 仅在远程更新时下载
    pub async fn get_if_newer(
        &self,
        name: &str,
        destination: &Path,
        timestamp: DateTime<Utc>,
        progress: Option<ProgressCallback>,
    ) -> WagonResult<bool> {
        if !self.is_newer(name, timestamp).await? {
            tracing::debug!("'{}' is not newer than {}, skipping", name, timestamp);
            return Ok(false);
        }
        self.get(name, destination, progress).await?;
        Ok(true)
    }

    /// Upload `source` as `destination`, creating directory markers first / 上传资源
    pub async fn put(
        &self,
        source: &Path,
        destination: &str,
        progress: Option<ProgressCallback>,
    ) -> WagonResult<()> {
        let connection = self.connection()?;
        let key = to_key(connection.base_directory(), destination);

        materialize::ensure_directories(&connection, &key).await?;

        let cannot_read = |e: std::io::Error| {
            let message = format!("Cannot read file from '{}'", source.display());
            if e.kind() == ErrorKind::NotFound {
                TransportError::not_found(message).with_source(e)
            } else {
                TransportError::transfer_failed(message).with_source(e)
            }
        };
        let file = tokio::fs::File::open(source).await.map_err(cannot_read)?;
        let length = file.metadata().await.map_err(cannot_read)?.len();

        let content_type = mime_guess::from_path(source).first_or_octet_stream();
        let request = PutObjectRequest::new(connection.bucket(), &key, length)
            .with_content_type(content_type.essence_str())
            .with_acl(CannedAcl::BucketOwnerFullControl);

        let mut reader = ProgressReader::new(file, length, progress);
        connection
            .store()
            .put_object(&request, &mut reader)
            .await
            .map_err(|e| {
                TransportError::transfer_failed(format!("Cannot write file to '{}'", destination))
                    .with_source(e)
            })?;

        tracing::debug!("Uploaded {} ({} bytes) to {}", source.display(), length, key);
        Ok(())
    }
}

/// Metadata lookup with read-path error mapping
async fn metadata(connection: &Connection, name: &str) -> WagonResult<ObjectMetadata> {
    let key = to_key(connection.base_directory(), name);
    connection
        .store()
        .get_object_metadata(connection.bucket(), &key)
        .await
        .map_err(|e| {
            if e.is_service() {
                TransportError::not_found(format!("'{}' does not exist", name)).with_source(e)
            } else {
                TransportError::transfer_failed(format!("Cannot read metadata of '{}'", name))
                    .with_source(e)
            }
        })
}
