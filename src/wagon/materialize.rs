//! Directory markers / 目录标记
//!
//! Every `/` in a key closes a directory; each such directory gets a
//! zero-byte object so the bucket can be browsed as a tree.

use super::connection::Connection;
use crate::error::{TransportError, WagonResult};
use crate::storage::{CannedAcl, PutObjectRequest};

/// Write a marker for each directory of `key`, shallowest first / 写入目录标记
pub(crate) async fn ensure_directories(connection: &Connection, key: &str) -> WagonResult<()> {
    for (index, _) in key.match_indices('/') {
        let directory = &key[..=index];

        if let Some(markers) = connection.markers() {
            if markers.contains(directory) {
                continue;
            }
        }

        let request = PutObjectRequest::new(connection.bucket(), directory, 0)
            .with_acl(CannedAcl::BucketOwnerFullControl);
        let mut empty = tokio::io::empty();
        connection
            .store()
            .put_object(&request, &mut empty)
            .await
            .map_err(|e| {
                TransportError::transfer_failed(format!("Cannot write directory '{}'", directory))
                    .with_source(e)
            })?;

        if let Some(markers) = connection.markers() {
            markers.insert(directory);
        }
    }
    Ok(())
}
