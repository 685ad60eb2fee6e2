//! Maps menu codes to catalog handlers and runs the prompt loop.
//!
//! ## Commands
//! - `0` => end the session
//! - `1` => bucket and database statistics
//! - `2` => list users, newest first
//! - `3` => list assets, newest first
//! - `4` => download an asset
//! - `5` => download an asset and display it
//! - `6` => upload a local file for a user
//! - `7` => add a user

use crate::{
    handlers::catalog_handlers::{
        add_user, download_asset, list_assets, list_users, stats, upload_asset,
    },
    services::{
        catalog::Catalog, metadata::MetadataStore, object_store::ObjectStore,
        viewer::ImageViewer,
    },
};
use anyhow::Result;
use dialoguer::Input;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    End,
    Stats,
    Users,
    Assets,
    Download,
    DownloadAndDisplay,
    Upload,
    AddUser,
}

impl Command {
    pub fn from_code(code: i64) -> Option<Self> {
        let command = match code {
            0 => Command::End,
            1 => Command::Stats,
            2 => Command::Users,
            3 => Command::Assets,
            4 => Command::Download,
            5 => Command::DownloadAndDisplay,
            6 => Command::Upload,
            7 => Command::AddUser,
            _ => return None,
        };
        Some(command)
    }
}

pub const MENU: &str = "\
>> Enter a command:
   0 => end
   1 => stats
   2 => users
   3 => assets
   4 => download
   5 => download and display
   6 => upload
   7 => add user";

/// What the loop does once a command has run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Next {
    Prompt,
    End,
}

/// Read commands until `0`, dispatching each to its handler.
///
/// Non-numeric input reprompts. Handler failures are reported by the
/// handlers themselves. A terminal I/O error (EOF, or stdin that is not a
/// terminal) ends the session like `0` does.
pub async fn run<S, M, V>(catalog: &Catalog<S, M, V>, download_dir: &Path)
where
    S: ObjectStore,
    M: MetadataStore,
    V: ImageViewer,
{
    loop {
        println!();
        println!("{}", MENU);
        let outcome = read_and_dispatch(catalog, download_dir).await;
        if after_command(outcome) == Next::End {
            break;
        }
    }
}

async fn read_and_dispatch<S, M, V>(catalog: &Catalog<S, M, V>, download_dir: &Path) -> Result<Next>
where
    S: ObjectStore,
    M: MetadataStore,
    V: ImageViewer,
{
    let code: i64 = Input::new().with_prompt(">").interact_text()?;

    let Some(command) = Command::from_code(code) else {
        println!("** Unknown command, try again...");
        return Ok(Next::Prompt);
    };
    debug!("dispatching {:?}", command);

    match command {
        Command::End => return Ok(Next::End),
        Command::Stats => stats(catalog).await,
        Command::Users => list_users(catalog).await,
        Command::Assets => list_assets(catalog).await,
        Command::Download => download_asset(catalog, download_dir, false).await?,
        Command::DownloadAndDisplay => download_asset(catalog, download_dir, true).await?,
        Command::Upload => upload_asset(catalog).await?,
        Command::AddUser => add_user(catalog).await?,
    }
    Ok(Next::Prompt)
}

/// Prompt errors end the session with a message instead of failing it.
fn after_command(outcome: Result<Next>) -> Next {
    match outcome {
        Ok(next) => next,
        Err(err) => {
            warn!("terminal input failed: {:#}", err);
            println!("**ERROR: {:#}, ending session", err);
            Next::End
        }
    }
}
