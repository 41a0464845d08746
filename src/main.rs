//! s3-wagon - move build artifacts to and from an S3 repository

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use s3_wagon::config;
use s3_wagon::{AuthenticationInfo, ProgressCallback, Repository, S3Wagon};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")");

/// Artifact repository transport over S3 / S3制品仓库传输工具
#[derive(Parser)]
#[command(name = "s3-wagon", version = VERSION, about, long_about = None)]
struct Cli {
    /// Transport configuration file (JSON) / 配置文件
    #[arg(short, long, global = true, default_value = "config.json")]
    config: PathBuf,

    /// Access key used as static credentials / 访问密钥
    #[arg(long, global = true, env = "S3_WAGON_USERNAME")]
    username: Option<String>,

    /// Secret key used as static credentials / 私有密钥
    #[arg(long, global = true, env = "S3_WAGON_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Print transfer progress / 显示传输进度
    #[arg(long, global = true)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a directory of the repository
    List {
        /// Repository URL, e.g. s3://bucket/releases
        repository: String,
        /// Directory relative to the repository, ending with '/'
        #[arg(default_value = "")]
        directory: String,
    },

    /// Download a resource
    Get {
        repository: String,
        /// Resource name relative to the repository
        name: String,
        /// Local destination file
        destination: PathBuf,
        /// Only download when the remote copy is newer than this RFC 3339 instant
        #[arg(long)]
        if_newer_than: Option<DateTime<Utc>>,
    },

    /// Upload a file
    Put {
        repository: String,
        /// Local source file
        source: PathBuf,
        /// Resource name relative to the repository
        name: String,
    },

    /// Check whether a resource exists
    Exists {
        repository: String,
        name: String,
    },
}

impl Commands {
    fn repository(&self) -> &str {
        match self {
            Commands::List { repository, .. }
            | Commands::Get { repository, .. }
            | Commands::Put { repository, .. }
            | Commands::Exists { repository, .. } => repository,
        }
    }
}

fn progress_printer(name: &str) -> ProgressCallback {
    let name = name.to_string();
    Arc::new(move |done, total| {
        if total > 0 {
            eprint!("\r{}: {}/{} bytes ({}%)", name, done, total, done * 100 / total);
        } else {
            eprint!("\r{}: {} bytes", name, done);
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "s3_wagon=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration / 加载配置
    let transport_config = config::load_config(&cli.config).map_err(anyhow::Error::msg)?;

    let repository = Repository::parse(cli.command.repository())?;
    let auth = match (cli.username, cli.password) {
        (Some(username), Some(password)) => Some(AuthenticationInfo::new(username, password)),
        _ => None,
    };

    let wagon = S3Wagon::new(transport_config);
    wagon
        .connect(&repository, auth.as_ref())
        .await
        .with_context(|| format!("Cannot connect to {}", repository))?;

    let result = run(&wagon, cli.command, cli.progress).await;
    wagon.disconnect();
    result
}

async fn run(wagon: &S3Wagon, command: Commands, progress: bool) -> anyhow::Result<()> {
    match command {
        Commands::List { directory, .. } => {
            for name in wagon.list(&directory).await? {
                println!("{}", name);
            }
        }
        Commands::Get { name, destination, if_newer_than, .. } => {
            let callback = progress.then(|| progress_printer(&name));
            match if_newer_than {
                Some(timestamp) => {
                    if !wagon.get_if_newer(&name, &destination, timestamp, callback).await? {
                        tracing::info!("{} is up to date", destination.display());
                    }
                }
                None => wagon.get(&name, &destination, callback).await?,
            }
            if progress {
                eprintln!();
            }
        }
        Commands::Put { source, name, .. } => {
            let callback = progress.then(|| progress_printer(&name));
            wagon.put(&source, &name, callback).await?;
            if progress {
                eprintln!();
            }
        }
        Commands::Exists { name, .. } => {
            let exists = wagon.resource_exists(&name).await?;
            println!("{}", exists);
            if !exists {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
