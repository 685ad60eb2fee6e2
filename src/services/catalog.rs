//! src/services/catalog.rs
//!
//! Catalog operations: statistics, listings, and the upload/download flows
//! that join the bucket with the metadata tables. Uploads always write the
//! object before inserting its asset row, so a failure in between can leave
//! an orphan object but never a row pointing at nothing.

use crate::{
    errors::{CatalogError, CatalogResult},
    models::{
        asset::{Asset, NewAsset},
        user::{NewUser, User},
    },
    services::{
        metadata::MetadataStore,
        object_store::ObjectStore,
        viewer::{ImageInfo, ImageViewer},
    },
};
use chrono::NaiveDateTime;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;
/// Width of the `assets.assetname` column.
const MAX_ASSET_NAME_LEN: usize = 128;

/// Session context: the bucket, the metadata store and the viewer, plus the
/// database endpoint label used by `stats`.
pub struct Catalog<S, M, V> {
    pub store: S,
    pub metadata: M,
    pub viewer: V,
    pub db_endpoint: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    pub bucket_name: String,
    pub object_count: usize,
    pub db_endpoint: String,
    /// `None` when the clock query failed or returned nothing.
    pub server_time: Option<NaiveDateTime>,
    pub user_count: i64,
    pub asset_count: i64,
}

#[derive(Clone, Debug)]
pub struct Download {
    pub asset: Asset,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Set when the image was displayed.
    pub image: Option<ImageInfo>,
}

#[derive(Clone, Debug)]
pub struct Upload {
    pub asset_id: i64,
    pub bucket_key: String,
    pub size_bytes: u64,
}

#[derive(Clone, Debug)]
pub struct Registration {
    pub user_id: i64,
    pub bucket_folder: String,
}

impl<S, M, V> Catalog<S, M, V>
where
    S: ObjectStore,
    M: MetadataStore,
    V: ImageViewer,
{
    pub fn new(store: S, metadata: M, viewer: V, db_endpoint: impl Into<String>) -> Self {
        Self {
            store,
            metadata,
            viewer,
            db_endpoint: db_endpoint.into(),
        }
    }

    /// Bucket and database summary.
    ///
    /// A failed clock query is logged and reported as `server_time: None`.
    pub async fn stats(&self) -> CatalogResult<Stats> {
        let object_count = self.store.count().await?;

        let server_time = match self.metadata.server_time().await {
            Ok(time) => time,
            Err(err) => {
                warn!("clock query against {} failed: {}", self.db_endpoint, err);
                None
            }
        };

        Ok(Stats {
            bucket_name: self.store.bucket_name().to_string(),
            object_count,
            db_endpoint: self.db_endpoint.clone(),
            server_time,
            user_count: self.metadata.count_users().await?,
            asset_count: self.metadata.count_assets().await?,
        })
    }

    pub async fn list_users(&self) -> CatalogResult<Vec<User>> {
        Ok(self.metadata.list_users().await?)
    }

    pub async fn list_assets(&self) -> CatalogResult<Vec<Asset>> {
        Ok(self.metadata.list_assets().await?)
    }

    /// Download an asset into `dest_dir` under its original filename and
    /// optionally display it.
    ///
    /// The bucket is not contacted when the asset id is unknown.
    pub async fn download_asset(
        &self,
        asset_id: i64,
        dest_dir: &Path,
        display: bool,
    ) -> CatalogResult<Download> {
        let asset = self
            .metadata
            .find_asset(asset_id)
            .await?
            .ok_or(CatalogError::AssetNotFound(asset_id))?;

        let filename = local_filename(&asset.asset_name)?;
        fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(filename);

        let size_bytes = self.store.get(&asset.bucket_key, &path).await?;
        info!(
            "downloaded asset {} ({}) to {}",
            asset.asset_id,
            asset.bucket_key,
            path.display()
        );

        let image = if display {
            let info = self
                .viewer
                .show(&path)
                .map_err(|source| CatalogError::Display {
                    path: path.clone(),
                    source,
                })?;
            Some(info)
        } else {
            None
        };

        Ok(Download {
            asset,
            path,
            size_bytes,
            image,
        })
    }

    /// Upload `local_path` for `user_id` under `<bucket folder>/<filename>`
    /// and record the asset.
    ///
    /// Nothing is written to the bucket when the user id is unknown.
    pub async fn upload_asset(
        &self,
        local_path: &Path,
        filename: &str,
        user_id: i64,
    ) -> CatalogResult<Upload> {
        let folder = self
            .metadata
            .user_bucket_folder(user_id)
            .await?
            .ok_or(CatalogError::UserNotFound(user_id))?;

        let bucket_key = storage_key(&folder, filename)?;
        let receipt = self.store.put(local_path, &bucket_key).await?;
        debug!(
            "stored {} ({} bytes, md5 {}, etag {:?})",
            bucket_key, receipt.size_bytes, receipt.md5, receipt.etag
        );

        let new_asset = NewAsset {
            user_id,
            asset_name: filename.to_string(),
            bucket_key: bucket_key.clone(),
        };
        let asset_id = match self.metadata.insert_asset(new_asset).await {
            Ok(id) => id,
            Err(source) => {
                warn!("orphaned object {} after failed insert: {}", bucket_key, source);
                return Err(CatalogError::OrphanedObject {
                    key: bucket_key,
                    source,
                });
            }
        };

        info!("recorded asset {} for user {}", asset_id, user_id);
        Ok(Upload {
            asset_id,
            bucket_key,
            size_bytes: receipt.size_bytes,
        })
    }

    /// Register a user with a freshly generated bucket folder.
    pub async fn add_user(
        &self,
        email: &str,
        last_name: &str,
        first_name: &str,
    ) -> CatalogResult<Registration> {
        let bucket_folder = Uuid::new_v4().to_string();
        let user_id = self
            .metadata
            .insert_user(NewUser {
                email: email.to_string(),
                last_name: last_name.to_string(),
                first_name: first_name.to_string(),
                bucket_folder: bucket_folder.clone(),
            })
            .await?;

        info!("recorded user {} with folder {}", user_id, bucket_folder);
        Ok(Registration {
            user_id,
            bucket_folder,
        })
    }
}

/// Build the object key for a user's upload.
///
/// Rejects names that would escape the folder or produce an unusable key.
pub fn storage_key(bucket_folder: &str, filename: &str) -> CatalogResult<String> {
    let invalid = |reason| CatalogError::InvalidFilename {
        name: filename.to_string(),
        reason,
    };

    if filename.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if filename.len() > MAX_ASSET_NAME_LEN {
        return Err(invalid("must be at most 128 bytes"));
    }
    if filename.starts_with('/')
        || Path::new(filename)
            .components()
            .any(|c| c == Component::ParentDir)
    {
        return Err(invalid("must be relative and must not contain `..` components"));
    }
    if filename
        .bytes()
        .any(|b| b.is_ascii_control() || b == b'\\')
    {
        return Err(invalid("must not contain control characters or backslashes"));
    }

    let key = format!("{}/{}", bucket_folder, filename);
    if key.len() > MAX_OBJECT_KEY_LEN {
        return Err(invalid("resulting key is longer than 1024 bytes"));
    }
    Ok(key)
}

/// Final path component of an asset name, used as the local file name.
fn local_filename(asset_name: &str) -> CatalogResult<&str> {
    Path::new(asset_name)
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CatalogError::InvalidFilename {
            name: asset_name.to_string(),
            reason: "has no file name component",
        })
}
