use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Input;
use sqlx::MySqlPool;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use config::{AppConfig, Args, DEFAULT_CONFIG_FILE};
use services::{
    catalog::Catalog, datatier, metadata::MySqlMetadataStore, object_store::S3ObjectStore,
    viewer::SystemViewer,
};

const MIGRATION_SQL: &str = include_str!("../migrations/0001_init.sql");

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("** Welcome to PhotoApp **");
    println!();

    let args = Args::parse();

    // --- Resolve + load config ---
    let config_path = match args.config_path() {
        Some(path) => path,
        None => match prompt_config_path() {
            Ok(path) => path,
            Err(err) => {
                println!("{}", exit_notice(&err));
                return Ok(());
            }
        },
    };

    let cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(err) => {
            println!("**ERROR: {}, exiting", err);
            return Ok(());
        }
    };
    tracing::info!("Starting photoapp with config: {:?}", cfg);

    // --- Connect to MySQL ---
    let pool = match datatier::get_db_conn(&cfg.rds).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!("connecting to {}: {}", cfg.rds.endpoint, err);
            println!("**ERROR: unable to connect to database, exiting");
            return Ok(());
        }
    };

    // --- Handle migration mode ---
    if args.migrate {
        match run_migrations(&pool).await {
            Ok(()) => println!("Database migration complete."),
            Err(err) => println!("**ERROR: migration failed: {:#}", err),
        }
        pool.close().await;
        return Ok(());
    }

    // --- Open S3 session + build catalog ---
    let store = S3ObjectStore::connect(&cfg.s3).await;
    let catalog = Catalog::new(
        store,
        MySqlMetadataStore::new(pool.clone()),
        SystemViewer,
        cfg.rds.endpoint.clone(),
    );

    let download_dir = match args.download_dir() {
        Ok(dir) => dir,
        Err(err) => {
            println!("{}", exit_notice(&err));
            pool.close().await;
            return Ok(());
        }
    };
    routes::routes::run(&catalog, &download_dir).await;
    pool.close().await;

    println!();
    println!("** done **");
    Ok(())
}

/// Ask which config file to use, defaulting to `photoapp-config.ini`.
fn prompt_config_path() -> Result<PathBuf> {
    println!("What config file to use for this session?");
    println!("Press ENTER to use default ({}),", DEFAULT_CONFIG_FILE);
    println!("otherwise enter name of config file>");

    let answer: String = Input::new()
        .default(DEFAULT_CONFIG_FILE.to_string())
        .show_default(false)
        .allow_empty(true)
        .interact_text()
        .context("reading config file name")?;

    let answer = answer.trim();
    Ok(PathBuf::from(if answer.is_empty() {
        DEFAULT_CONFIG_FILE
    } else {
        answer
    }))
}

/// Message printed before a clean exit when startup cannot continue.
fn exit_notice(err: &anyhow::Error) -> String {
    tracing::error!("startup aborted: {:#}", err);
    format!("**ERROR: {:#}, exiting", err)
}

/// Create the catalog tables from the embedded migration.
async fn run_migrations(db: &MySqlPool) -> Result<()> {
    let statements = migration_statements(MIGRATION_SQL);

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        datatier::perform_action(db, stmt, &[])
            .await
            .with_context(|| format!("executing `{}`", stmt))?;
    }

    Ok(())
}

fn migration_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_creates_users_before_assets() {
        let statements = migration_statements(MIGRATION_SQL);

        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS users"));
        assert!(statements[1].starts_with("CREATE TABLE IF NOT EXISTS assets"));
        assert!(statements[1].contains("REFERENCES users(userid)"));
    }

    #[test]
    fn unreadable_prompt_becomes_an_error_notice() {
        let err = anyhow::Error::from(std::io::Error::other("not a terminal"))
            .context("reading config file name");

        assert_eq!(
            exit_notice(&err),
            "**ERROR: reading config file name: not a terminal, exiting"
        );
    }
}
