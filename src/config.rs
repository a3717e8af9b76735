use anyhow::{Context, Result};
use clap::Parser;
use std::env;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    /// Base URL prepended to public media links.
    pub public_base_url: String,
    /// Bucket that holds draft media.
    pub bucket: String,
    /// Grants the elevated credentials needed to remove media.
    pub service_role_key: Option<String>,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Social post draft manager")]
pub struct Args {
    /// Host to bind to (overrides DRAFTS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides DRAFTS_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where media objects are stored (overrides DRAFTS_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides DRAFTS_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Base URL for public media links (overrides DRAFTS_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Media bucket name (overrides DRAFTS_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Maximum accepted upload size in bytes (overrides DRAFTS_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::resolve(args, |name| env::var(name))?;
        Ok((cfg, migrate))
    }

    /// Merge parsed arguments over values produced by `lookup`.
    ///
    /// `lookup` has the shape of [`std::env::var`] so tests can feed a map.
    pub fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let env_host = lookup("DRAFTS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env(&lookup, "DRAFTS_PORT", 3000u16)?;
        let env_storage = lookup("DRAFTS_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_db = lookup("DRAFTS_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/drafts.db".into());
        let env_bucket = lookup("DRAFTS_BUCKET").unwrap_or_else(|_| "post-media".into());
        let env_max_upload =
            parse_env(&lookup, "DRAFTS_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        let port = args.port.unwrap_or(env_port);
        let public_base_url = args
            .public_base_url
            .or_else(|| lookup("DRAFTS_PUBLIC_BASE_URL").ok())
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let service_role_key = lookup("DRAFTS_SERVICE_ROLE_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port,
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            bucket: args.bucket.unwrap_or(env_bucket),
            service_role_key,
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Result<String, env::VarError>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
