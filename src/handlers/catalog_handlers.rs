//! Interactive handlers for catalog commands.
//! Each handler prompts for its inputs, calls the catalog, and prints the
//! outcome. Catalog errors are reported here and never end the session.

use crate::{
    errors::CatalogError,
    models::{asset::Asset, user::User},
    services::{
        catalog::{Catalog, Stats},
        metadata::MetadataStore,
        object_store::ObjectStore,
        viewer::ImageViewer,
    },
};
use anyhow::{Context, Result};
use dialoguer::Input;
use std::{env, path::Path};
use tracing::{error, warn};

/// `1` => stats
pub async fn stats<S: ObjectStore, M: MetadataStore, V: ImageViewer>(
    catalog: &Catalog<S, M, V>,
) {
    match catalog.stats().await {
        Ok(stats) => println!("{}", render_stats(&stats)),
        Err(err) => report(&err),
    }
}

/// `2` => users
pub async fn list_users<S: ObjectStore, M: MetadataStore, V: ImageViewer>(
    catalog: &Catalog<S, M, V>,
) {
    match catalog.list_users().await {
        Ok(users) => users.iter().for_each(|u| println!("{}", render_user(u))),
        Err(err) => report(&err),
    }
}

/// `3` => assets
pub async fn list_assets<S: ObjectStore, M: MetadataStore, V: ImageViewer>(
    catalog: &Catalog<S, M, V>,
) {
    match catalog.list_assets().await {
        Ok(assets) => assets.iter().for_each(|a| println!("{}", render_asset(a))),
        Err(err) => report(&err),
    }
}

/// `4` / `5` => download, optionally displaying the image.
pub async fn download_asset<S: ObjectStore, M: MetadataStore, V: ImageViewer>(
    catalog: &Catalog<S, M, V>,
    download_dir: &Path,
    display: bool,
) -> Result<()> {
    let asset_id = prompt_id("Enter asset id")?;

    match catalog.download_asset(asset_id, download_dir, display).await {
        Ok(download) => {
            println!(
                "Downloaded {} from S3 and saved as: {} ({} bytes)",
                download.asset.bucket_key,
                download.path.display(),
                download.size_bytes
            );
            if let Some(image) = download.image {
                println!("Displaying {}x{} image", image.width, image.height);
            }
        }
        Err(err) => report(&err),
    }
    Ok(())
}

/// `6` => upload a file from the working directory.
pub async fn upload_asset<S: ObjectStore, M: MetadataStore, V: ImageViewer>(
    catalog: &Catalog<S, M, V>,
) -> Result<()> {
    let filename: String = Input::new().with_prompt("Enter filename").interact_text()?;
    let local_path = env::current_dir()
        .context("reading current directory")?
        .join(&filename);

    if !local_path.is_file() {
        warn!("local file {} does not exist", local_path.display());
        println!("**ERROR: Local file '{}' does not exist...", filename);
        return Ok(());
    }

    let user_id = prompt_id("Enter user id")?;

    match catalog.upload_asset(&local_path, &filename, user_id).await {
        Ok(upload) => {
            println!(
                "Uploaded to S3 as: {} ({} bytes)",
                upload.bucket_key, upload.size_bytes
            );
            println!("Recorded in RDS under asset id {}", upload.asset_id);
        }
        Err(err) => report(&err),
    }
    Ok(())
}

/// `7` => add user
pub async fn add_user<S: ObjectStore, M: MetadataStore, V: ImageViewer>(
    catalog: &Catalog<S, M, V>,
) -> Result<()> {
    let email: String = Input::new()
        .with_prompt("Enter user's email")
        .interact_text()?;
    let last_name: String = Input::new()
        .with_prompt("Enter user's last (family) name")
        .interact_text()?;
    let first_name: String = Input::new()
        .with_prompt("Enter user's first (given) name")
        .interact_text()?;

    match catalog.add_user(&email, &last_name, &first_name).await {
        Ok(reg) => {
            println!("Recorded in RDS under user id {}", reg.user_id);
            println!("  Folder: {}", reg.bucket_folder);
        }
        Err(err) => report(&err),
    }
    Ok(())
}

/// Prompt until the user enters a positive integer.
fn prompt_id(prompt: &str) -> Result<i64> {
    let id = Input::<i64>::new()
        .with_prompt(prompt)
        .validate_with(|value: &i64| {
            if *value > 0 {
                Ok(())
            } else {
                Err("must be a positive integer")
            }
        })
        .interact_text()?;
    Ok(id)
}

fn report(err: &CatalogError) {
    match err {
        CatalogError::AssetNotFound(_) => println!("No such asset..."),
        CatalogError::UserNotFound(_) => println!("No such user..."),
        other => {
            error!("{}", other);
            println!("**ERROR: {}", other);
        }
    }
}

pub fn render_stats(stats: &Stats) -> String {
    let time = match stats.server_time {
        Some(time) => time.to_string(),
        None => "Database operation failed...".to_string(),
    };
    format!(
        "S3 bucket name: {}\nS3 assets: {}\nRDS MySQL endpoint: {}\n{}\n# of users: {}\n# of assets: {}",
        stats.bucket_name,
        stats.object_count,
        stats.db_endpoint,
        time,
        stats.user_count,
        stats.asset_count
    )
}

pub fn render_user(user: &User) -> String {
    format!(
        "User id: {}\n  Email: {}\n  Name: {}\n  Folder: {}",
        user.user_id,
        user.email,
        user.full_name(),
        user.bucket_folder
    )
}

pub fn render_asset(asset: &Asset) -> String {
    format!(
        "Asset id: {}\n  User id: {}\n  Original Name: {}\n  Key name: {}",
        asset.asset_id, asset.user_id, asset.asset_name, asset.bucket_key
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn stats_render_counts_and_clock() {
        let time = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(12, 30, 0))
            .unwrap();
        let stats = Stats {
            bucket_name: "photoapp-nu".into(),
            object_count: 0,
            db_endpoint: "db.local".into(),
            server_time: Some(time),
            user_count: 0,
            asset_count: 0,
        };

        assert_eq!(
            render_stats(&stats),
            "S3 bucket name: photoapp-nu\nS3 assets: 0\nRDS MySQL endpoint: db.local\n\
             2024-05-01 12:30:00\n# of users: 0\n# of assets: 0"
        );
    }

    #[test]
    fn stats_render_reports_failed_clock_query() {
        let stats = Stats {
            bucket_name: "b".into(),
            object_count: 3,
            db_endpoint: "db".into(),
            server_time: None,
            user_count: 1,
            asset_count: 3,
        };

        assert!(render_stats(&stats).contains("\nDatabase operation failed...\n"));
    }

    #[test]
    fn user_render_joins_first_and_last_name() {
        let user = User {
            user_id: 1,
            email: "a@x.com".into(),
            last_name: "Doe".into(),
            first_name: "Jane".into(),
            bucket_folder: "f00d".into(),
        };

        assert_eq!(
            render_user(&user),
            "User id: 1\n  Email: a@x.com\n  Name: Jane Doe\n  Folder: f00d"
        );
    }

    #[test]
    fn asset_render_shows_key() {
        let asset = Asset {
            asset_id: 1,
            user_id: 1,
            asset_name: "photo.jpg".into(),
            bucket_key: "f00d/photo.jpg".into(),
        };

        assert_eq!(
            render_asset(&asset),
            "Asset id: 1\n  User id: 1\n  Original Name: photo.jpg\n  Key name: f00d/photo.jpg"
        );
    }
}
