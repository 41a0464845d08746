//! Object key mapping / 对象键映射
//!
//! A key is the base directory followed by the resource path, verbatim. Going
//! back from a key to a resource name strips a leading prefix; a key that does
//! not start with the prefix is returned untouched.

use regex::Regex;

use crate::error::{TransportError, WagonResult};

/// Build the object key for a resource / 生成对象键
///
/// No normalization happens here: `..` and repeated separators are kept as-is,
/// so callers hand in already-normalized relative paths.
pub fn to_key(base_directory: &str, resource_name: &str) -> String {
    let mut key = String::with_capacity(base_directory.len() + resource_name.len());
    key.push_str(base_directory);
    key.push_str(resource_name);
    key
}

/// Recover the resource name from a key / 从对象键还原资源名
pub fn to_resource_name(key: &str, base_directory: &str) -> WagonResult<String> {
    Ok(ResourcePattern::new(base_directory)?.resource_name(key))
}

/// Compiled prefix matcher, built once per listing
#[derive(Debug, Clone)]
pub struct ResourcePattern {
    regex: Regex,
}

impl ResourcePattern {
    /// Fails only when the compiled pattern outgrows the regex size limit
    pub fn new(prefix: &str) -> WagonResult<Self> {
        let regex = Regex::new(&format!("(?s)^{}(.*)", regex::escape(prefix))).map_err(|e| {
            TransportError::invalid_configuration(format!("Cannot build key pattern for '{}'", prefix))
                .with_source(e)
        })?;
        Ok(Self { regex })
    }

    /// Everything after the prefix, or the raw key when the prefix does not match
    pub fn resource_name(&self, key: &str) -> String {
        match self.regex.captures(key).and_then(|c| c.get(1)) {
            Some(rest) => rest.as_str().to_string(),
            None => key.to_string(),
        }
    }
}
