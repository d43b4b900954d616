#![doc = "S3 implementation of the core ObjectStore trait, used by the CLI for real transfers."]
//
//! # Storage Integration (CLI <-> Core)
//!
//! This module bridges the [`ObjectStore`] abstraction in `keepa-core` to any
//! S3-compatible service through `aws-sdk-s3`.
//!
//! - Construct [`S3Store`] from the `client_settings` section of the config. Settings that
//!   are left out fall back to the SDK default chain (`AWS_*` environment variables, profiles).
//! - Custom endpoints and path-style addressing cover MinIO, Yandex Object Storage and similar.
//! - All calls are awaited one at a time by the core; the client holds no per-run state.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Builder as S3ConfigBuilder, Credentials};
use aws_sdk_s3::primitives::{ByteStream, Length};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, Delete, ObjectIdentifier};
use aws_sdk_s3::Client as S3Client;
use keepa_core::contract::{ObjectStore, ObjectSummary, StoreError};
use std::path::Path;

use crate::load_config::ClientSettings;

/// S3 accepts at most this many keys per DeleteObjects request.
const MAX_DELETE_BATCH: usize = 1000;
/// Files larger than this are sent as multipart uploads.
const MULTIPART_THRESHOLD_BYTES: u64 = 64 * 1024 * 1024;
const PART_SIZE_BYTES: u64 = 16 * 1024 * 1024;

pub struct S3Store {
    client: S3Client,
}

impl S3Store {
    pub async fn new(settings: &ClientSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region_name {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(key_id), Some(secret)) =
            (&settings.aws_access_key_id, &settings.aws_secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                key_id,
                secret,
                None,
                None,
                "keepa-config",
            ));
        }
        let sdk_config = loader.load().await;

        let s3_config = S3ConfigBuilder::from(&sdk_config)
            .force_path_style(settings.force_path_style)
            .build();

        tracing::info!(
            endpoint = settings.endpoint_url.as_deref().unwrap_or("default"),
            region = settings.region_name.as_deref().unwrap_or("default"),
            static_credentials = settings.aws_access_key_id.is_some(),
            force_path_style = settings.force_path_style,
            "Initialized S3 store"
        );
        Self {
            client: S3Client::from_conf(s3_config),
        }
    }

    async fn put_single(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), StoreError> {
        let body = ByteStream::from_path(local_path).await?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await?;
        Ok(())
    }

    async fn put_multipart(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        size: u64,
    ) -> Result<(), StoreError> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await?;
        let upload_id = created
            .upload_id()
            .ok_or("No upload ID in create_multipart_upload response")?
            .to_string();

        match self
            .upload_parts(local_path, bucket, key, &upload_id, size)
            .await
        {
            Ok(parts) => {
                self.client
                    .complete_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(
                        CompletedMultipartUpload::builder()
                            .set_parts(Some(parts))
                            .build(),
                    )
                    .send()
                    .await?;
                Ok(())
            }
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(error = ?abort_err, bucket, key, "Failed to abort multipart upload");
                }
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        upload_id: &str,
        size: u64,
    ) -> Result<Vec<CompletedPart>, StoreError> {
        let mut parts = Vec::new();
        let mut offset = 0u64;
        let mut part_number = 1i32;
        while offset < size {
            let length = PART_SIZE_BYTES.min(size - offset);
            let body = ByteStream::read_from()
                .path(local_path)
                .offset(offset)
                .length(Length::Exact(length))
                .build()
                .await?;
            let uploaded = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(body)
                .send()
                .await?;
            parts.push(
                CompletedPart::builder()
                    .set_e_tag(uploaded.e_tag().map(String::from))
                    .part_number(part_number)
                    .build(),
            );
            tracing::debug!(bucket, key, part_number, length, "Uploaded part");
            offset += length;
            part_number += 1;
        }
        Ok(parts)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>, StoreError> {
        tracing::info!(bucket, "Listing objects in bucket");
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;
        loop {
            let mut req = self.client.list_objects_v2().bucket(bucket);
            if let Some(token) = continuation_token.take() {
                req = req.continuation_token(token);
            }
            let resp = match req.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::error!(error = ?e, bucket, "Failed to list objects");
                    return Err(Box::new(e));
                }
            };
            objects.extend(
                resp.contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(ObjectSummary::new)),
            );
            continuation_token = resp.next_continuation_token().map(String::from);
            if continuation_token.is_none() {
                break;
            }
        }
        tracing::info!(bucket, count = objects.len(), "Listed objects in bucket");
        Ok(objects)
    }

    async fn upload_file(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
    ) -> Result<(), StoreError> {
        let size = std::fs::metadata(local_path)?.len();
        tracing::info!(path = %local_path.display(), bucket, key, size, "Uploading file");
        let result = if size > MULTIPART_THRESHOLD_BYTES {
            self.put_multipart(local_path, bucket, key, size).await
        } else {
            self.put_single(local_path, bucket, key).await
        };
        match &result {
            Ok(()) => tracing::info!(bucket, key, "Successfully uploaded file"),
            Err(e) => tracing::error!(error = %e, bucket, key, "Upload failed"),
        }
        result
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), StoreError> {
        tracing::info!(bucket, count = keys.len(), "Deleting objects");
        for chunk in keys.chunks(MAX_DELETE_BATCH) {
            let identifiers = chunk
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()?;
            let delete = Delete::builder()
                .set_objects(Some(identifiers))
                .quiet(true)
                .build()?;
            let resp = match self
                .client
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::error!(error = ?e, bucket, "DeleteObjects request failed");
                    return Err(Box::new(e));
                }
            };
            let errors = resp.errors();
            if let Some(first) = errors.first() {
                tracing::error!(
                    bucket,
                    failed = errors.len(),
                    key = first.key().unwrap_or_default(),
                    message = first.message().unwrap_or_default(),
                    "DeleteObjects reported per-key failures"
                );
                return Err(format!(
                    "{} of {} keys could not be deleted from {bucket}; first: {} ({})",
                    errors.len(),
                    chunk.len(),
                    first.key().unwrap_or_default(),
                    first.message().unwrap_or_default()
                )
                .into());
            }
        }
        tracing::info!(bucket, count = keys.len(), "Successfully deleted objects");
        Ok(())
    }
}
