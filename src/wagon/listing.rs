//! Directory listing over a flat key space / 目录列表模拟

use super::connection::Connection;
use crate::error::{TransportError, WagonResult};
use crate::key::{to_key, ResourcePattern};
use crate::storage::{ListObjectsRequest, DELIMITER};

/// List the entries directly under `directory`, subdirectories first per page
///
/// Subdirectories come back with their trailing `/`. Store order is kept.
pub(crate) async fn list_directory(connection: &Connection, directory: &str) -> WagonResult<Vec<String>> {
    let prefix = to_key(connection.base_directory(), directory);
    let pattern = ResourcePattern::new(&prefix)?;
    let mut request = ListObjectsRequest::new(connection.bucket(), &prefix).with_delimiter(DELIMITER);
    let mut names = Vec::new();

    loop {
        let page = connection
            .store()
            .list_objects(&request)
            .await
            .map_err(|e| {
                if e.is_service() {
                    TransportError::not_found(format!("'{}' does not exist", directory)).with_source(e)
                } else {
                    TransportError::transfer_failed(format!("Cannot list '{}'", directory)).with_source(e)
                }
            })?;

        names.extend(page.common_prefixes.iter().map(|p| pattern.resource_name(p)));
        names.extend(page.keys.iter().map(|k| pattern.resource_name(k)));

        if !page.is_truncated {
            break;
        }
        match page.continuation_token {
            Some(token) => request.continuation_token = Some(token),
            None => {
                tracing::warn!(
                    "Listing of '{}' reported more results without a continuation token, stopping",
                    prefix
                );
                break;
            }
        }
    }

    tracing::debug!("Listed {} entries under '{}'", names.len(), prefix);
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::memory::{MemoryDriver, StoreCall};
    use crate::region::Region;
    use crate::repository::Repository;
    use std::sync::Arc;

    fn connect(driver: &MemoryDriver, repository: &str) -> Connection {
        let repository = Repository::parse(repository).unwrap();
        Connection::new(Arc::new(driver.clone()), repository, Region::Us, false)
    }

    #[tokio::test]
    async fn test_list_scenario() {
        let driver = MemoryDriver::new();
        driver.create_bucket("my-bucket");
        driver.insert_object("my-bucket", "releases/com/acme/1.0/acme-1.0.jar", b"jar");
        driver.insert_object("my-bucket", "releases/com/acme/README", b"readme");

        let connection = connect(&driver, "s3://my-bucket/releases/");
        let names = list_directory(&connection, "com/acme/").await.unwrap();
        assert_eq!(names, vec!["1.0/", "README"]);
    }

    #[tokio::test]
    async fn test_list_prefixes_then_keys_per_page() {
        let driver = MemoryDriver::new();
        driver.create_bucket("bucket");
        for key in ["a", "b/x", "c", "d/y", "e"] {
            driver.insert_object("bucket", key, b"");
        }
        driver.set_page_size(2);

        let connection = connect(&driver, "s3://bucket");
        let names = list_directory(&connection, "").await.unwrap();
        // 每页先公共前缀后对象
        assert_eq!(names, vec!["b/", "a", "d/", "c", "e"]);

        let tokens: Vec<Option<String>> = driver
            .calls()
            .into_iter()
            .map(|call| match call {
                StoreCall::List { continuation_token, .. } => continuation_token,
                other => panic!("unexpected call {:?}", other),
            })
            .collect();
        assert_eq!(tokens, vec![None, Some("2".to_string()), Some("4".to_string())]);
    }

    #[tokio::test]
    async fn test_list_empty_prefix() {
        let driver = MemoryDriver::new();
        driver.create_bucket("bucket");
        let connection = connect(&driver, "s3://bucket/base");
        assert!(list_directory(&connection, "nothing/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_missing_bucket() {
        let driver = MemoryDriver::new();
        let connection = connect(&driver, "s3://missing/base");
        let err = list_directory(&connection, "dir/").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "'dir/' does not exist");
    }

    #[tokio::test]
    async fn test_list_client_failure() {
        let driver = MemoryDriver::new();
        driver.create_bucket("bucket");
        driver.fail_with_client_error("base/dir/");
        let connection = connect(&driver, "s3://bucket/base");
        assert!(list_directory(&connection, "dir/").await.unwrap_err().is_transfer_failed());
    }

    #[tokio::test]
    async fn test_truncated_page_without_token_stops() {
        let driver = MemoryDriver::new();
        driver.create_bucket("bucket");
        for key in ["a", "b", "c"] {
            driver.insert_object("bucket", key, b"");
        }
        driver.set_page_size(1);
        driver.set_drop_continuation_tokens(true);

        let connection = connect(&driver, "s3://bucket");
        assert_eq!(list_directory(&connection, "").await.unwrap(), vec!["a"]);
        assert_eq!(driver.calls().len(), 1);
    }
}
