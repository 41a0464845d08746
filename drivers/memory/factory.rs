//! 内存驱动工厂

use std::sync::Arc;

use parking_lot::Mutex;

use super::driver::MemoryDriver;
use crate::credentials::StorageCredentials;
use crate::error::{StoreError, StoreResult};
use crate::region::Region;
use crate::storage::{ObjectStore, StoreFactory};

/// 内存驱动工厂，所有客户端共享同一份数据
#[derive(Debug, Default)]
pub struct MemoryDriverFactory {
    driver: MemoryDriver,
    requested: Mutex<Vec<Option<Region>>>,
    fail_creation: bool,
}

impl MemoryDriverFactory {
    pub fn new(driver: MemoryDriver) -> Self {
        Self {
            driver,
            requested: Mutex::new(Vec::new()),
            fail_creation: false,
        }
    }

    /// 模拟客户端创建失败
    pub fn failing(driver: MemoryDriver) -> Self {
        Self { fail_creation: true, ..Self::new(driver) }
    }

    pub fn driver(&self) -> &MemoryDriver {
        &self.driver
    }

    /// Regions requested so far, `None` for region-agnostic clients / 已请求的区域
    pub fn requested_regions(&self) -> Vec<Option<Region>> {
        self.requested.lock().clone()
    }
}

impl StoreFactory for MemoryDriverFactory {
    fn driver_type(&self) -> &'static str {
        "memory"
    }

    fn create_store(
        &self,
        _credentials: &StorageCredentials,
        region: Option<Region>,
    ) -> StoreResult<Arc<dyn ObjectStore>> {
        self.requested.lock().push(region);
        if self.fail_creation {
            return Err(StoreError::Client("client construction refused".to_string()));
        }
        Ok(Arc::new(self.driver.clone()))
    }
}
