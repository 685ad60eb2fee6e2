//! src/services/object_store.rs
//!
//! Object store client. `ObjectStore` is the capability set the catalog
//! needs from the bucket (put, get, count); `S3ObjectStore` implements it
//! against Amazon S3 or any S3-compatible endpoint.

use crate::config::S3Config;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
};
use bytes::Bytes;
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("failed to upload `{key}`: {message}")]
    Upload { key: String, message: String },
    #[error("failed to download `{key}`: {message}")]
    Download { key: String, message: String },
    #[error("failed to list bucket `{bucket}`: {message}")]
    List { bucket: String, message: String },
    #[error("destination `{0}` has no parent directory")]
    InvalidDestination(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Result of a successful put.
#[derive(Clone, Debug)]
pub struct PutReceipt {
    pub size_bytes: u64,
    /// MD5 of the uploaded bytes, lowercase hex.
    pub md5: String,
    pub etag: Option<String>,
}

/// The bucket operations the catalog depends on.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    fn bucket_name(&self) -> &str;

    /// Write the file at `local_path` under `key`, replacing any existing object.
    async fn put(&self, local_path: &Path, key: &str) -> StorageResult<PutReceipt>;

    /// Fetch `key` into the file `dest`. Returns the number of bytes written.
    async fn get(&self, key: &str, dest: &Path) -> StorageResult<u64>;

    /// Number of objects in the bucket.
    async fn count(&self) -> StorageResult<usize>;
}

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build the S3 session from the config file's credential profile.
    ///
    /// Falls back to the default AWS provider chain for anything the
    /// profile leaves out.
    pub async fn connect(cfg: &S3Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(creds) = &cfg.credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                None,
                None,
                "photoapp-config",
            ));
        }
        if let Some(region) = &cfg.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(url) = &cfg.endpoint_url {
            debug!("Using custom S3 endpoint {}", url);
            builder = builder.endpoint_url(url).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: cfg.bucket_name.clone(),
        }
    }
}

impl ObjectStore for S3ObjectStore {
    fn bucket_name(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, local_path: &Path, key: &str) -> StorageResult<PutReceipt> {
        let data = Bytes::from(fs::read(local_path).await?);
        let size_bytes = data.len() as u64;
        let md5 = format!("{:x}", md5::compute(&data));

        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| StorageError::Upload {
                key: key.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            })?;

        let etag = output.e_tag().map(|e| e.trim_matches('"').to_string());
        match etag.as_deref() {
            Some(tag) if tag == md5 => debug!("etag matches md5 for {}", key),
            Some(tag) => debug!("etag {} differs from md5 {} for {}", tag, md5, key),
            None => debug!("no etag returned for {}", key),
        }

        Ok(PutReceipt {
            size_bytes,
            md5,
            etag,
        })
    }

    async fn get(&self, key: &str, dest: &Path) -> StorageResult<u64> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(service_err) if service_err.is_no_such_key() => StorageError::ObjectNotFound {
                    bucket: self.bucket.clone(),
                    key: key.to_string(),
                },
                _ => StorageError::Download {
                    key: key.to_string(),
                    message: DisplayErrorContext(&err).to_string(),
                },
            })?;

        let mut reader = std::pin::pin!(output.body.into_async_read());
        write_atomically(dest, &mut reader).await
    }

    async fn count(&self) -> StorageResult<usize> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .into_paginator()
            .send();

        let mut total = 0;
        while let Some(page) = pages.next().await {
            let page = page.map_err(|err| StorageError::List {
                bucket: self.bucket.clone(),
                message: DisplayErrorContext(&err).to_string(),
            })?;
            total += page.contents().len();
        }
        Ok(total)
    }
}

/// Stream `reader` into a temp file beside `dest`, then rename into place.
///
/// A failed download never leaves a partial file at `dest`.
pub(crate) async fn write_atomically<R>(dest: &Path, reader: &mut R) -> StorageResult<u64>
where
    R: tokio::io::AsyncRead + Unpin + ?Sized,
{
    let parent = dest
        .parent()
        .ok_or_else(|| StorageError::InvalidDestination(dest.to_path_buf()))?;
    let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
    let mut file = File::create(&tmp_path).await?;

    let written = match tokio::io::copy(reader, &mut file).await {
        Ok(n) => n,
        Err(err) => {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
    };
    if let Err(err) = file.flush().await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(StorageError::Io(err));
    }
    if let Err(err) = file.sync_all().await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(StorageError::Io(err));
    }
    drop(file);

    if let Err(err) = fs::rename(&tmp_path, dest).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(StorageError::Io(err));
    }

    debug!("wrote {} bytes to {}", written, dest.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_atomically_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("photo.jpg");
        std::fs::write(&dest, b"old contents").unwrap();

        let mut reader: &[u8] = b"new";
        let written = write_atomically(&dest, &mut reader).await.unwrap();

        assert_eq!(written, 3);
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn write_atomically_fails_when_directory_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing").join("photo.jpg");

        let mut reader: &[u8] = b"bytes";
        let err = write_atomically(&dest, &mut reader).await.unwrap_err();

        assert!(matches!(err, StorageError::Io(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn not_found_names_bucket_and_key() {
        let err = StorageError::ObjectNotFound {
            bucket: "photoapp".into(),
            key: "f/photo.jpg".into(),
        };
        assert_eq!(
            err.to_string(),
            "object `f/photo.jpg` not found in bucket `photoapp`"
        );
    }
}
