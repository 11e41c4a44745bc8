use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, str::FromStr};

/// Which durable collaborator backs the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Sqlite,
    Memory,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "memory" => Ok(Backend::Memory),
            other => bail!("unknown backend `{}` (expected `sqlite` or `memory`)", other),
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub backend: Backend,
    /// Base URL used to synthesize bucket addresses.
    pub public_url: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Local S3-style bucket emulator")]
pub struct Args {
    /// Host to bind to (overrides BUCKET_EMULATOR_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides BUCKET_EMULATOR_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides BUCKET_EMULATOR_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Storage backend (overrides BUCKET_EMULATOR_BACKEND)
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Public base URL for bucket addresses (overrides BUCKET_EMULATOR_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::merge(args, |name| env::var(name))?, migrate))
    }

    /// CLI values win over environment values, which win over defaults.
    fn merge<F>(args: Args, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let env_host = var("BUCKET_EMULATOR_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match var("BUCKET_EMULATOR_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing BUCKET_EMULATOR_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 7777,
            Err(err) => return Err(err).context("reading BUCKET_EMULATOR_PORT"),
        };
        let env_db = var("BUCKET_EMULATOR_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/bucket-emulator.db".into());
        let env_backend = match var("BUCKET_EMULATOR_BACKEND") {
            Ok(value) => value.parse::<Backend>()?,
            Err(env::VarError::NotPresent) => Backend::Sqlite,
            Err(err) => return Err(err).context("reading BUCKET_EMULATOR_BACKEND"),
        };

        let port = args.port.unwrap_or(env_port);
        let public_url = args
            .public_url
            .or_else(|| var("BUCKET_EMULATOR_PUBLIC_URL").ok())
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port,
            database_url: args.database_url.unwrap_or(env_db),
            backend: args.backend.unwrap_or(env_backend),
            public_url,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
