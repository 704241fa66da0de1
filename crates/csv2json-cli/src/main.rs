mod config;
mod server;

use std::fs::File;
use std::io::{Read, stdin};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "csv2json",
    about = "Convert CSV uploads to nested JSON documents and serve them",
    version
)]
struct Args {
    /// Config file (defaults to ./csv2json.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve,

    /// Convert CSV to JSON and print it
    Convert {
        /// Field separator: one of , | ; ~ (anything else means comma)
        #[arg(short, long, default_value = ",")]
        separator: String,

        /// Pretty-print JSON output
        #[arg(long, default_value_t = false)]
        pretty: bool,

        /// Input file (defaults to stdin)
        input: Option<PathBuf>,
    },

    /// Convert a CSV file and store it under its file stem
    Import {
        #[arg(short, long, default_value = ",")]
        separator: String,

        file: PathBuf,
    },

    /// List stored documents
    List,

    /// Print a stored document, optionally filtered on one field
    Get {
        name: String,

        /// Field to filter on (dotted paths allowed)
        #[arg(long, default_value = "")]
        key: String,

        /// Value the field must equal
        #[arg(long, default_value = "")]
        value: String,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(db) = args.db {
        config.database.file = db;
    }

    match args.command {
        Command::Serve => {
            let store = open_store(&config.database.file)?;
            let state = server::AppState {
                store: Arc::new(store),
                max_upload_bytes: config.server.max_upload_bytes,
            };
            server::run(&config.listen_addr(), state)?;
        }
        Command::Convert {
            separator,
            pretty,
            input,
        } => {
            let options = csv2json::Options {
                delimiter: csv2json::Delimiter::resolve(&separator),
                pretty,
            };
            let json = match &input {
                Some(path) => {
                    let f = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
                    csv2json::csv_to_json(f, &options)?
                }
                None => csv2json::csv_to_json(stdin().lock(), &options)?,
            };
            println!("{}", json);
        }
        Command::Import { separator, file } => {
            let store = open_store(&config.database.file)?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut buf = Vec::new();
            File::open(&file)
                .with_context(|| format!("failed to open {}", file.display()))?
                .read_to_end(&mut buf)?;
            let id = csv2json::ingest(&store, &filename, buf.as_slice(), &separator)?;
            println!("file {} saved", id);
        }
        Command::List => {
            let store = open_store(&config.database.file)?;
            println!("{}", serde_json::to_string_pretty(&store.get_all()?)?);
        }
        Command::Get { name, key, value } => {
            let store = open_store(&config.database.file)?;
            let doc = store.get_file(&name)?;
            println!("{}", csv2json::filter_json(&doc, &key, &value)?);
        }
    }

    Ok(())
}

fn open_store(path: &Path) -> Result<csv2json::DocumentStore> {
    csv2json::DocumentStore::open(path)
        .with_context(|| format!("failed to open database {}", path.display()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
