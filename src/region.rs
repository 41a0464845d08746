//! Region table and negotiation / 区域表与区域协商
//!
//! Buckets live in one region. On connect a region-agnostic client asks where
//! the bucket lives, and the answer picks the endpoint of the real client.

use std::fmt;
use std::sync::Arc;

use crate::credentials::StorageCredentials;
use crate::error::{StoreError, TransportError, WagonResult};
use crate::storage::{ObjectStore, StoreFactory};

/// Known S3 regions keyed by location constraint / 已知区域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// US Standard, reported as `US` or an empty constraint
    Us,
    UsWest1,
    UsWest2,
    /// Reported as `EU`
    Eu,
    ApSoutheast1,
    ApSoutheast2,
    ApNortheast1,
    SaEast1,
}

impl Region {
    pub const ALL: [Region; 8] = [
        Region::Us,
        Region::UsWest1,
        Region::UsWest2,
        Region::Eu,
        Region::ApSoutheast1,
        Region::ApSoutheast2,
        Region::ApNortheast1,
        Region::SaEast1,
    ];

    /// Map a bucket-location answer to a region / 由位置约束得到区域
    pub fn from_location_constraint(constraint: &str) -> WagonResult<Self> {
        match constraint {
            "US" | "" => Ok(Region::Us),
            "us-west-1" => Ok(Region::UsWest1),
            "us-west-2" => Ok(Region::UsWest2),
            "EU" => Ok(Region::Eu),
            "ap-southeast-1" => Ok(Region::ApSoutheast1),
            "ap-southeast-2" => Ok(Region::ApSoutheast2),
            "ap-northeast-1" => Ok(Region::ApNortheast1),
            "sa-east-1" => Ok(Region::SaEast1),
            other => Err(TransportError::invalid_configuration(format!(
                "'{}' is not a valid location constraint",
                other
            ))),
        }
    }

    pub fn location_constraint(&self) -> &'static str {
        match self {
            Region::Us => "US",
            Region::UsWest1 => "us-west-1",
            Region::UsWest2 => "us-west-2",
            Region::Eu => "EU",
            Region::ApSoutheast1 => "ap-southeast-1",
            Region::ApSoutheast2 => "ap-southeast-2",
            Region::ApNortheast1 => "ap-northeast-1",
            Region::SaEast1 => "sa-east-1",
        }
    }

    /// Service endpoint host / 服务端点
    pub fn endpoint(&self) -> &'static str {
        match self {
            Region::Us => "s3.amazonaws.com",
            Region::UsWest1 => "s3-us-west-1.amazonaws.com",
            Region::UsWest2 => "s3-us-west-2.amazonaws.com",
            Region::Eu => "s3-eu-west-1.amazonaws.com",
            Region::ApSoutheast1 => "s3-ap-southeast-1.amazonaws.com",
            Region::ApSoutheast2 => "s3-ap-southeast-2.amazonaws.com",
            Region::ApNortheast1 => "s3-ap-northeast-1.amazonaws.com",
            Region::SaEast1 => "s3-sa-east-1.amazonaws.com",
        }
    }

    /// Region name used for request signing / 签名用区域名
    pub fn signing_name(&self) -> &'static str {
        match self {
            Region::Us => "us-east-1",
            Region::Eu => "eu-west-1",
            other => other.location_constraint(),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signing_name())
    }
}

/// Discover the bucket's region and build a client bound to it / 区域协商
pub async fn negotiate(
    factory: &dyn StoreFactory,
    credentials: &StorageCredentials,
    bucket: &str,
) -> WagonResult<(Region, Arc<dyn ObjectStore>)> {
    let agnostic = factory
        .create_store(credentials, None)
        .map_err(|e| client_error(e, factory.driver_type()))?;

    let constraint = agnostic
        .get_bucket_location(bucket)
        .await
        .map_err(|e| location_error(e, bucket))?;
    tracing::debug!("Bucket '{}' location constraint: {:?}", bucket, constraint);

    let region = Region::from_location_constraint(&constraint)?;
    let store = factory
        .create_store(credentials, Some(region))
        .map_err(|e| client_error(e, factory.driver_type()))?;

    tracing::info!("Bucket '{}' is served by {}", bucket, region.endpoint());
    Ok((region, store))
}

fn client_error(error: StoreError, driver: &str) -> TransportError {
    TransportError::invalid_configuration(format!("Cannot create {} client", driver))
        .with_source(error)
}

fn location_error(error: StoreError, bucket: &str) -> TransportError {
    match error.status() {
        Some(401) | Some(403) => TransportError::authentication_failed(format!(
            "Access to bucket '{}' was denied",
            bucket
        ))
        .with_source(error),
        Some(404) => {
            TransportError::not_found(format!("Bucket '{}' does not exist", bucket)).with_source(error)
        }
        _ => TransportError::transfer_failed(format!(
            "Cannot determine the location of bucket '{}'",
            bucket
        ))
        .with_source(error),
    }
}
