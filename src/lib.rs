pub mod config;
pub mod credentials;
pub mod error;
pub mod key;
pub mod progress;
pub mod region;
pub mod repository;
pub mod storage;
pub mod wagon;

// Driver modules (point to project root drivers via path attribute) / 驱动模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

pub use config::TransportConfig;
pub use credentials::{AuthenticationInfo, CredentialResolver, StorageCredentials};
pub use error::{TransportError, WagonResult};
pub use region::Region;
pub use repository::Repository;
pub use storage::ProgressCallback;
pub use wagon::S3Wagon;
