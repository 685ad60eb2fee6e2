//! Represents a stored photo: one metadata row plus one object in the bucket.

use sqlx::FromRow;

/// A row of the `assets` table.
///
/// `bucket_key` always equals the owner's bucket folder, a `/`, and
/// `asset_name`. The object at that key is written before this row exists.
#[derive(Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Asset {
    /// Surrogate key (`AUTO_INCREMENT`).
    #[sqlx(rename = "assetid")]
    pub asset_id: i64,

    /// Owning user.
    #[sqlx(rename = "userid")]
    pub user_id: i64,

    /// Filename as given at upload time.
    #[sqlx(rename = "assetname")]
    pub asset_name: String,

    /// Full object key in the bucket.
    #[sqlx(rename = "bucketkey")]
    pub bucket_key: String,
}

/// Fields needed to insert a new asset.
#[derive(Clone, Debug)]
pub struct NewAsset {
    pub user_id: i64,
    pub asset_name: String,
    pub bucket_key: String,
}
