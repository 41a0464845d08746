//! Connection state / 连接状态

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::region::Region;
use crate::repository::Repository;
use crate::storage::ObjectStore;

/// Either nothing is set or store, bucket and base directory all are
#[derive(Default)]
pub(crate) enum ConnectionState {
    #[default]
    Disconnected,
    Connected(Arc<Connection>),
}

impl ConnectionState {
    pub(crate) fn connection(&self) -> Option<Arc<Connection>> {
        match self {
            ConnectionState::Connected(connection) => Some(connection.clone()),
            ConnectionState::Disconnected => None,
        }
    }
}

/// A live connection to one bucket / 已建立的连接
pub(crate) struct Connection {
    store: Arc<dyn ObjectStore>,
    repository: Repository,
    region: Region,
    markers: Option<MarkerCache>,
}

impl Connection {
    pub(crate) fn new(
        store: Arc<dyn ObjectStore>,
        repository: Repository,
        region: Region,
        cache_markers: bool,
    ) -> Self {
        Self {
            store,
            repository,
            region,
            markers: cache_markers.then(MarkerCache::default),
        }
    }

    pub(crate) fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub(crate) fn repository(&self) -> &Repository {
        &self.repository
    }

    pub(crate) fn bucket(&self) -> &str {
        self.repository.bucket()
    }

    pub(crate) fn base_directory(&self) -> &str {
        self.repository.base_directory()
    }

    pub(crate) fn region(&self) -> Region {
        self.region
    }

    pub(crate) fn markers(&self) -> Option<&MarkerCache> {
        self.markers.as_ref()
    }
}

/// Directory markers already written on this connection / 本连接已写入的目录标记
#[derive(Debug, Default)]
pub(crate) struct MarkerCache {
    written: Mutex<HashSet<String>>,
}

impl MarkerCache {
    pub(crate) fn contains(&self, directory: &str) -> bool {
        self.written.lock().contains(directory)
    }

    pub(crate) fn insert(&self, directory: &str) {
        self.written.lock().insert(directory.to_string());
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.written.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::memory::MemoryDriver;

    fn connection(cache: bool) -> Connection {
        let repository = Repository::parse("s3://my-bucket/releases").unwrap();
        Connection::new(Arc::new(MemoryDriver::new()), repository, Region::Us, cache)
    }

    #[test]
    fn test_connection_fields() {
        let connection = connection(false);
        assert_eq!(connection.bucket(), "my-bucket");
        assert_eq!(connection.base_directory(), "releases/");
        assert_eq!(connection.region(), Region::Us);
        assert_eq!(connection.store().name(), "memory");
        assert!(connection.markers().is_none());
    }

    #[test]
    fn test_marker_cache() {
        let connection = connection(true);
        let markers = connection.markers().unwrap();
        assert!(!markers.contains("releases/"));
        markers.insert("releases/");
        markers.insert("releases/");
        assert!(markers.contains("releases/"));
        assert_eq!(markers.len(), 1);
    }

    #[test]
    fn test_state_snapshot() {
        assert!(ConnectionState::default().connection().is_none());
        let state = ConnectionState::Connected(Arc::new(connection(false)));
        assert_eq!(state.connection().unwrap().bucket(), "my-bucket");
    }
}
