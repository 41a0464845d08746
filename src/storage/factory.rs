use std::sync::Arc;

use super::ObjectStore;
use crate::credentials::StorageCredentials;
use crate::error::StoreResult;
use crate::region::Region;

/// Store factory trait / 存储客户端工厂 trait
///
/// Builds a client for a set of credentials. `region == None` asks for a
/// region-agnostic client, good enough for a bucket-location lookup.
pub trait StoreFactory: Send + Sync {
    /// Driver type name / 驱动类型名称
    fn driver_type(&self) -> &'static str;

    /// 创建存储客户端
    fn create_store(
        &self,
        credentials: &StorageCredentials,
        region: Option<Region>,
    ) -> StoreResult<Arc<dyn ObjectStore>>;
}
