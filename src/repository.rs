//! Repository reference / 仓库地址
//!
//! `s3://bucket/optional/base/path` → bucket `bucket`, base directory
//! `optional/base/path/`.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::TransportError;

/// Bucket and base directory of a remote repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    url: String,
    scheme: String,
    bucket: String,
    base_directory: String,
}

impl Repository {
    /// Parse a repository identifier / 解析仓库地址
    pub fn parse(identifier: &str) -> Result<Self, TransportError> {
        let url = Url::parse(identifier).map_err(|e| {
            TransportError::invalid_configuration(format!(
                "Malformed repository URL '{}'",
                identifier
            ))
            .with_source(e)
        })?;

        let bucket = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                TransportError::invalid_configuration(format!(
                    "Repository URL '{}' does not name a bucket",
                    identifier
                ))
            })?
            .to_string();

        let path = urlencoding::decode(url.path()).map_err(|e| {
            TransportError::invalid_configuration(format!(
                "Repository URL '{}' has an invalid path",
                identifier
            ))
            .with_source(e)
        })?;

        Ok(Self {
            url: identifier.to_string(),
            scheme: url.scheme().to_string(),
            bucket,
            base_directory: normalize_base_directory(&path),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Base directory, empty or ending with `/`
    pub fn base_directory(&self) -> &str {
        &self.base_directory
    }
}

impl FromStr for Repository {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.base_directory)
    }
}

/// 去掉开头的 `/`，非空时保证以 `/` 结尾
fn normalize_base_directory(path: &str) -> String {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}
