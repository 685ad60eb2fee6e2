use anyhow::{Context, Result};
use clap::Parser;
use ini::{Ini, Properties};
use std::{
    env, fmt,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "photoapp-config.ini";

/// Section holding the S3 session's credential profile.
pub const S3_PROFILE: &str = "s3readwrite";

/// Session configuration loaded from the INI file.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub s3: S3Config,
    pub rds: RdsConfig,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket_name: String,
    /// Keys from the `[s3readwrite]` profile; `None` uses the default chain.
    pub credentials: Option<S3Credentials>,
    pub region: Option<String>,
    /// Alternate endpoint for S3-compatible stores.
    pub endpoint_url: Option<String>,
}

#[derive(Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}

#[derive(Clone)]
pub struct RdsConfig {
    pub endpoint: String,
    pub port: u16,
    pub user_name: String,
    pub user_pwd: String,
    pub db_name: String,
}

impl fmt::Debug for RdsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RdsConfig")
            .field("endpoint", &self.endpoint)
            .field("port", &self.port)
            .field("user_name", &self.user_name)
            .field("user_pwd", &"***")
            .field("db_name", &self.db_name)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file '{}' does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read config file '{}': {message}", .path.display())]
    Read { path: PathBuf, message: String },
    #[error("missing section [{0}]")]
    MissingSection(&'static str),
    #[error("missing key `{key}` in section [{section}]")]
    MissingKey {
        section: &'static str,
        key: &'static str,
    },
    #[error("invalid value `{value}` for `{key}` in section [{section}]")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
    },
}

/// Command-line + environment options.
#[derive(Parser, Debug)]
#[command(author, version, about = "Photo catalog client for S3 and MySQL")]
pub struct Args {
    /// Config file to use (overrides PHOTOAPP_CONFIG; prompts when neither is set)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory downloads are saved into
    #[arg(long, default_value = "download")]
    pub download_dir: PathBuf,

    /// Create the users and assets tables if missing, then exit
    #[arg(long)]
    pub migrate: bool,
}

impl Args {
    /// Config path from `--config`, then `PHOTOAPP_CONFIG`.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| env::var_os("PHOTOAPP_CONFIG").map(PathBuf::from))
    }

    /// Download directory resolved against the working directory.
    pub fn download_dir(&self) -> Result<PathBuf> {
        if self.download_dir.is_absolute() {
            return Ok(self.download_dir.clone());
        }
        let cwd = env::current_dir().context("reading current directory")?;
        Ok(cwd.join(&self.download_dir))
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let ini = Ini::load_from_file(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let s3 = section(ini, "s3")?;
        let rds = section(ini, "rds")?;

        let port_raw = required(rds, "rds", "port_number")?;
        let port = port_raw
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue {
                section: "rds",
                key: "port_number",
                value: port_raw.to_string(),
            })?;

        let profile = ini.section(Some(S3_PROFILE));
        let credentials = match profile {
            Some(props) => match (
                props.get("aws_access_key_id"),
                props.get("aws_secret_access_key"),
            ) {
                (Some(id), Some(secret)) => Some(S3Credentials {
                    access_key_id: id.to_string(),
                    secret_access_key: secret.to_string(),
                }),
                _ => None,
            },
            None => None,
        };
        let region = profile
            .and_then(|props| props.get("region_name").or_else(|| props.get("region")))
            .map(str::to_string);
        let endpoint_url = profile
            .and_then(|props| props.get("endpoint_url"))
            .map(str::to_string);

        Ok(Self {
            s3: S3Config {
                bucket_name: required(s3, "s3", "bucket_name")?.to_string(),
                credentials,
                region,
                endpoint_url,
            },
            rds: RdsConfig {
                endpoint: required(rds, "rds", "endpoint")?.to_string(),
                port,
                user_name: required(rds, "rds", "user_name")?.to_string(),
                user_pwd: required(rds, "rds", "user_pwd")?.to_string(),
                db_name: required(rds, "rds", "db_name")?.to_string(),
            },
        })
    }
}

fn section<'a>(ini: &'a Ini, name: &'static str) -> Result<&'a Properties, ConfigError> {
    ini.section(Some(name))
        .ok_or(ConfigError::MissingSection(name))
}

fn required<'a>(
    props: &'a Properties,
    section: &'static str,
    key: &'static str,
) -> Result<&'a str, ConfigError> {
    props
        .get(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingKey { section, key })
}
