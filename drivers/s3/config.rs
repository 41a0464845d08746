//! S3驱动配置

use serde::{Deserialize, Serialize};

/// S3配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Config {
    /// S3端点地址，为空时按区域使用AWS端点
    /// MinIO: http://localhost:9000
    #[serde(default)]
    pub endpoint: String,
    /// 使用AWS端点时的协议
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// 强制使用路径风格（而非虚拟主机风格）
    /// MinIO等需要设置为true
    #[serde(default)]
    pub force_path_style: bool,
    /// 请求超时（秒），0表示使用客户端默认值
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            scheme: default_scheme(),
            force_path_style: false,
            request_timeout_secs: default_request_timeout(),
        }
    }
}
