//! src/services/datatier.rs
//!
//! Relational access layer: three primitives over the MySQL connection.
//! `retrieve_one_row` and `retrieve_all_rows` decode rows into `FromRow`
//! types, `perform_action` runs a statement and reports what it changed.
//! The pool is capped at a single connection so `LAST_INSERT_ID` semantics
//! hold for the whole session.

use crate::config::RdsConfig;
use sqlx::{
    FromRow, MySqlPool,
    mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlPoolOptions, MySqlRow},
    query::{Query, QueryAs},
};
use thiserror::Error;
use tracing::debug;

/// A positional `?` parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SqlParam {
    Int(i64),
    Text(String),
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(value)
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

/// What a write statement did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionOutcome {
    pub rows_affected: u64,
    /// Id generated by an `AUTO_INCREMENT` column, 0 when none was.
    pub last_insert_id: u64,
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database operation failed: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("query `{0}` returned no row")]
    NoRow(&'static str),
    #[error("insert into `{0}` did not generate an id")]
    NoInsertId(&'static str),
}

pub type DbResult<T> = Result<T, DbError>;

/// Open the session's database connection.
///
/// Connects eagerly so a bad endpoint or credentials fail at startup rather
/// than on the first command.
pub async fn get_db_conn(cfg: &RdsConfig) -> DbResult<MySqlPool> {
    let options = MySqlConnectOptions::new()
        .host(&cfg.endpoint)
        .port(cfg.port)
        .username(&cfg.user_name)
        .password(&cfg.user_pwd)
        .database(&cfg.db_name);

    debug!(
        "Connecting to mysql://{}@{}:{}/{}",
        cfg.user_name, cfg.endpoint, cfg.port, cfg.db_name
    );

    let pool = MySqlPoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Run a query expected to yield at most one row.
pub async fn retrieve_one_row<T>(
    pool: &MySqlPool,
    sql: &str,
    params: &[SqlParam],
) -> DbResult<Option<T>>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    debug!("retrieve_one_row: {} {:?}", sql.trim(), params);
    let query = bind_as(sqlx::query_as::<MySql, T>(sql), params);
    Ok(query.fetch_optional(pool).await?)
}

/// Run a query and collect every row, in the order the server returns them.
pub async fn retrieve_all_rows<T>(
    pool: &MySqlPool,
    sql: &str,
    params: &[SqlParam],
) -> DbResult<Vec<T>>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    debug!("retrieve_all_rows: {} {:?}", sql.trim(), params);
    let query = bind_as(sqlx::query_as::<MySql, T>(sql), params);
    Ok(query.fetch_all(pool).await?)
}

/// Execute an INSERT/UPDATE/DELETE.
pub async fn perform_action(
    pool: &MySqlPool,
    sql: &str,
    params: &[SqlParam],
) -> DbResult<ActionOutcome> {
    debug!("perform_action: {} {:?}", sql.trim(), params);
    let result = bind(sqlx::query::<MySql>(sql), params)
        .execute(pool)
        .await?;
    Ok(ActionOutcome {
        rows_affected: result.rows_affected(),
        last_insert_id: result.last_insert_id(),
    })
}

fn bind_as<'q, O>(
    mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    params: &'q [SqlParam],
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    for param in params {
        query = match param {
            SqlParam::Int(value) => query.bind(*value),
            SqlParam::Text(value) => query.bind(value.as_str()),
        };
    }
    query
}

fn bind<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [SqlParam],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            SqlParam::Int(value) => query.bind(*value),
            SqlParam::Text(value) => query.bind(value.as_str()),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_convert_from_ids_and_strings() {
        assert_eq!(SqlParam::from(7), SqlParam::Int(7));
        assert_eq!(SqlParam::from("a@x.com"), SqlParam::Text("a@x.com".into()));
        assert_eq!(
            SqlParam::from(String::from("Doe")),
            SqlParam::Text("Doe".into())
        );
    }

    #[test]
    fn errors_render_the_failing_statement() {
        assert_eq!(
            DbError::NoRow("SELECT COUNT(*) FROM users").to_string(),
            "query `SELECT COUNT(*) FROM users` returned no row"
        );
        assert_eq!(
            DbError::NoInsertId("assets").to_string(),
            "insert into `assets` did not generate an id"
        );
    }
}
