use crate::domain::model::{Artifact, Procedure, StorageKind};
use crate::domain::ports::Storage;
use crate::storage::expired_backups;
use crate::utils::error::{BackupError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_url};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use serde::Deserialize;

const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct S3Options {
    pub bucket: String,
    pub prefix: Option<String>,
    pub region: Option<String>,
    /// S3 相容服務（MinIO 等）的端點，設定後改用 path-style
    pub endpoint: Option<String>,
}

/// 上傳到 S3；認證沿用 AWS SDK 的預設來源（環境變數、profile、instance role）
#[derive(Debug, Clone)]
pub struct S3Storage {
    options: S3Options,
}

impl S3Storage {
    pub fn from_procedure(procedure: &Procedure) -> Result<Self> {
        let options: S3Options = procedure.storage_options()?;
        let field = |name: &str| format!("procedure.{}.storage_options.{}", procedure.trigger, name);

        validate_s3_bucket_name(&field("bucket"), &options.bucket)?;
        if let Some(region) = &options.region {
            validate_aws_region(&field("region"), region)?;
        }
        if let Some(endpoint) = &options.endpoint {
            validate_url(&field("endpoint"), endpoint)?;
        }

        Ok(Self { options })
    }

    pub fn object_key(&self, file_name: &str) -> String {
        match self.list_prefix() {
            Some(prefix) => format!("{}{}", prefix, file_name),
            None => file_name.to_string(),
        }
    }

    /// 列出物件時使用的前綴，結尾固定帶 `/`
    fn list_prefix(&self) -> Option<String> {
        match self.options.prefix.as_deref().map(|p| p.trim_matches('/')) {
            Some(prefix) if !prefix.is_empty() => Some(format!("{}/", prefix)),
            _ => None,
        }
    }

    /// 只取直接位於前綴下的物件名稱，子目錄內的不算
    fn file_name_of<'a>(&self, key: &'a str) -> Option<&'a str> {
        let name = match self.list_prefix() {
            Some(prefix) => key.strip_prefix(prefix.as_str())?,
            None => key,
        };
        (!name.is_empty() && !name.contains('/')).then_some(name)
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.options.bucket, key)
    }

    async fn client(&self) -> S3Client {
        let shared = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let region = Region::new(
            self.options
                .region
                .clone()
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        );

        let mut builder = aws_sdk_s3::config::Builder::from(&shared).region(region);
        if let Some(endpoint) = &self.options.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        S3Client::from_conf(builder.build())
    }
}

#[async_trait]
impl Storage for S3Storage {
    fn kind(&self) -> StorageKind {
        StorageKind::S3
    }

    async fn store(&self, artifact: &Artifact) -> Result<String> {
        let key = self.object_key(&artifact.file_name);
        tracing::info!("📤 Uploading {} to s3://{}/{}", artifact.file_name, self.options.bucket, key);

        let body = ByteStream::from_path(&artifact.path)
            .await
            .map_err(|e| BackupError::StorageError {
                message: format!("Failed to read artifact for upload: {}", e),
            })?;

        self.client()
            .await
            .put_object()
            .bucket(&self.options.bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .map_err(|e| BackupError::StorageError {
                message: format!("Failed to write to S3: {}", DisplayErrorContext(&e)),
            })?;

        Ok(self.location(&key))
    }

    async fn prune(&self, trigger: &str, keep: usize) -> Result<Vec<String>> {
        let client = self.client().await;

        let mut names = Vec::new();
        let mut pages = client
            .list_objects_v2()
            .bucket(&self.options.bucket)
            .set_prefix(self.list_prefix())
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| BackupError::StorageError {
                message: format!("Failed to list S3 objects: {}", DisplayErrorContext(&e)),
            })?;
            names.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .filter_map(|key| self.file_name_of(key))
                    .map(str::to_string),
            );
        }

        let mut removed = Vec::new();
        for name in expired_backups(names, trigger, keep) {
            let key = self.object_key(&name);
            client
                .delete_object()
                .bucket(&self.options.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| BackupError::StorageError {
                    message: format!("Failed to delete {}: {}", key, DisplayErrorContext(&e)),
                })?;

            let location = self.location(&key);
            tracing::info!("🧹 Removed old backup {}", location);
            removed.push(location);
        }

        Ok(removed)
    }
}

fn validate_s3_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    let invalid = |reason: &str| BackupError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: bucket_name.to_string(),
        reason: reason.to_string(),
    };

    if bucket_name.is_empty() {
        return Err(invalid("S3 bucket name cannot be empty"));
    }

    if bucket_name.len() < 3 || bucket_name.len() > 63 {
        return Err(invalid("S3 bucket name must be between 3 and 63 characters"));
    }

    if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(invalid(
            "S3 bucket name can only contain lowercase letters, numbers, hyphens, and dots",
        ));
    }

    if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        return Err(invalid("S3 bucket name cannot start or end with a hyphen"));
    }

    Ok(())
}

fn validate_aws_region(field_name: &str, region: &str) -> Result<()> {
    validate_non_empty_string(field_name, region)?;

    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(BackupError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: region.to_string(),
            reason: "AWS region can only contain lowercase letters, numbers, and hyphens"
                .to_string(),
        });
    }

    Ok(())
}
