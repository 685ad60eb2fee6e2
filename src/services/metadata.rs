//! src/services/metadata.rs
//!
//! Typed catalog queries over the relational access layer. `MetadataStore`
//! is the seam the catalog depends on; `MySqlMetadataStore` is the
//! production implementation built from the datatier primitives.

use crate::models::{
    asset::{Asset, NewAsset},
    user::{NewUser, User},
};
use crate::services::datatier::{self, DbError, DbResult, SqlParam};
use chrono::NaiveDateTime;
use sqlx::MySqlPool;

pub(crate) const SQL_NOW: &str = "SELECT NOW()";
pub(crate) const SQL_COUNT_USERS: &str = "SELECT COUNT(*) FROM users";
pub(crate) const SQL_COUNT_ASSETS: &str = "SELECT COUNT(*) FROM assets";
pub(crate) const SQL_ALL_USERS: &str = "
    SELECT userid, email, lastname, firstname, bucketfolder
    FROM users
    ORDER BY userid DESC";
pub(crate) const SQL_ALL_ASSETS: &str = "
    SELECT assetid, userid, assetname, bucketkey
    FROM assets
    ORDER BY assetid DESC";
pub(crate) const SQL_FIND_ASSET: &str = "
    SELECT assetid, userid, assetname, bucketkey
    FROM assets
    WHERE assetid = ?";
pub(crate) const SQL_USER_FOLDER: &str = "SELECT bucketfolder FROM users WHERE userid = ?";
pub(crate) const SQL_INSERT_ASSET: &str = "
    INSERT INTO assets (userid, assetname, bucketkey)
    VALUES (?, ?, ?)";
pub(crate) const SQL_INSERT_USER: &str = "
    INSERT INTO users (email, lastname, firstname, bucketfolder)
    VALUES (?, ?, ?, ?)";

/// Catalog metadata operations.
///
/// Listing methods return rows newest first (descending surrogate key).
/// Insert methods return the generated id.
#[allow(async_fn_in_trait)]
pub trait MetadataStore {
    /// Current server time; `None` when the query yields no row.
    async fn server_time(&self) -> DbResult<Option<NaiveDateTime>>;
    async fn count_users(&self) -> DbResult<i64>;
    async fn count_assets(&self) -> DbResult<i64>;
    async fn list_users(&self) -> DbResult<Vec<User>>;
    async fn list_assets(&self) -> DbResult<Vec<Asset>>;
    async fn find_asset(&self, asset_id: i64) -> DbResult<Option<Asset>>;
    async fn user_bucket_folder(&self, user_id: i64) -> DbResult<Option<String>>;
    async fn insert_asset(&self, asset: NewAsset) -> DbResult<i64>;
    async fn insert_user(&self, user: NewUser) -> DbResult<i64>;
}

#[derive(Clone)]
pub struct MySqlMetadataStore {
    pool: MySqlPool,
}

impl MySqlMetadataStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &'static str) -> DbResult<i64> {
        datatier::retrieve_one_row::<(i64,)>(&self.pool, sql, &[])
            .await?
            .map(|(count,)| count)
            .ok_or(DbError::NoRow(sql))
    }

    async fn insert(
        &self,
        table: &'static str,
        sql: &str,
        params: &[SqlParam],
    ) -> DbResult<i64> {
        let outcome = datatier::perform_action(&self.pool, sql, params).await?;
        if outcome.last_insert_id == 0 {
            return Err(DbError::NoInsertId(table));
        }
        i64::try_from(outcome.last_insert_id).map_err(|_| DbError::NoInsertId(table))
    }
}

impl MetadataStore for MySqlMetadataStore {
    async fn server_time(&self) -> DbResult<Option<NaiveDateTime>> {
        let row = datatier::retrieve_one_row::<(NaiveDateTime,)>(&self.pool, SQL_NOW, &[]).await?;
        Ok(row.map(|(now,)| now))
    }

    async fn count_users(&self) -> DbResult<i64> {
        self.count(SQL_COUNT_USERS).await
    }

    async fn count_assets(&self) -> DbResult<i64> {
        self.count(SQL_COUNT_ASSETS).await
    }

    async fn list_users(&self) -> DbResult<Vec<User>> {
        datatier::retrieve_all_rows(&self.pool, SQL_ALL_USERS, &[]).await
    }

    async fn list_assets(&self) -> DbResult<Vec<Asset>> {
        datatier::retrieve_all_rows(&self.pool, SQL_ALL_ASSETS, &[]).await
    }

    async fn find_asset(&self, asset_id: i64) -> DbResult<Option<Asset>> {
        datatier::retrieve_one_row(&self.pool, SQL_FIND_ASSET, &[asset_id.into()]).await
    }

    async fn user_bucket_folder(&self, user_id: i64) -> DbResult<Option<String>> {
        let row = datatier::retrieve_one_row::<(String,)>(
            &self.pool,
            SQL_USER_FOLDER,
            &[user_id.into()],
        )
        .await?;
        Ok(row.map(|(folder,)| folder))
    }

    async fn insert_asset(&self, asset: NewAsset) -> DbResult<i64> {
        let params = [
            SqlParam::Int(asset.user_id),
            SqlParam::Text(asset.asset_name),
            SqlParam::Text(asset.bucket_key),
        ];
        self.insert("assets", SQL_INSERT_ASSET, &params).await
    }

    async fn insert_user(&self, user: NewUser) -> DbResult<i64> {
        let params = [
            SqlParam::Text(user.email),
            SqlParam::Text(user.last_name),
            SqlParam::Text(user.first_name),
            SqlParam::Text(user.bucket_folder),
        ];
        self.insert("users", SQL_INSERT_USER, &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(sql: &str) -> String {
        sql.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn listings_are_newest_first() {
        assert!(normalized(SQL_ALL_USERS).ends_with("ORDER BY userid DESC"));
        assert!(normalized(SQL_ALL_ASSETS).ends_with("ORDER BY assetid DESC"));
    }

    #[test]
    fn inserts_bind_one_param_per_column() {
        assert_eq!(SQL_INSERT_ASSET.matches('?').count(), 3);
        assert_eq!(SQL_INSERT_USER.matches('?').count(), 4);
    }

    #[test]
    fn listing_columns_match_row_models() {
        assert_eq!(
            normalized(SQL_ALL_USERS),
            "SELECT userid, email, lastname, firstname, bucketfolder FROM users ORDER BY userid DESC"
        );
        assert!(normalized(SQL_FIND_ASSET).starts_with("SELECT assetid, userid, assetname, bucketkey"));
    }
}
