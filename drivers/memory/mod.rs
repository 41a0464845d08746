//! In-memory object storage driver / 内存对象存储驱动

pub mod driver;
pub mod factory;

pub use driver::{MemoryDriver, StoreCall, StoredObject};
pub use factory::MemoryDriverFactory;
