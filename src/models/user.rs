//! Represents a catalog user, the owner of a bucket folder.

use sqlx::FromRow;

/// A row of the `users` table.
///
/// Users are created once and never mutated. The `bucket_folder` is generated
/// at creation time and namespaces every object the user uploads.
#[derive(Clone, FromRow, Debug, PartialEq, Eq)]
pub struct User {
    /// Surrogate key (`AUTO_INCREMENT`).
    #[sqlx(rename = "userid")]
    pub user_id: i64,

    pub email: String,

    #[sqlx(rename = "lastname")]
    pub last_name: String,

    #[sqlx(rename = "firstname")]
    pub first_name: String,

    /// Key prefix in the bucket, a UUID v4 string.
    #[sqlx(rename = "bucketfolder")]
    pub bucket_folder: String,
}

/// Fields needed to insert a new user; the id is assigned by the database.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub last_name: String,
    pub first_name: String,
    pub bucket_folder: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
