//! riakwire CLI Client
//!
//! Command-line interface for talking to a cluster node.

use clap::{Parser, Subcommand};
use riakwire::client::{DeleteOptions, FetchOptions, GetOptions, PutOptions, UpdateOptions};
use riakwire::datatype::DtOp;
use riakwire::{Client, ClientConfig, Quorum, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// riakwire CLI
#[derive(Parser, Debug)]
#[command(name = "riakwire-cli")]
#[command(about = "CLI for Riak-style key-value clusters")]
#[command(version)]
struct Args {
    /// Node host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Node protocol port
    #[arg(short, long, default_value = "8087")]
    port: u16,

    /// Maximum concurrent connections
    #[arg(long, default_value = "16")]
    max_transports: usize,

    /// Bucket type
    #[arg(short = 't', long, default_value = "default")]
    bucket_type: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the node
    Ping,

    /// Show node name and version
    Info,

    /// Get a value by key
    Get {
        bucket: String,
        key: String,

        /// Read quorum (number, one, quorum, all, default)
        #[arg(short)]
        r: Option<Quorum>,
    },

    /// Store a value
    Put {
        bucket: String,
        key: String,
        value: String,

        #[arg(long, default_value = "text/plain")]
        content_type: String,

        /// Write quorum (number, one, quorum, all, default)
        #[arg(short)]
        w: Option<Quorum>,
    },

    /// Delete a key
    Del { bucket: String, key: String },

    /// List every key in a bucket (expensive)
    Keys { bucket: String },

    /// Show bucket properties
    Props { bucket: String },

    /// Query a secondary index
    Index {
        bucket: String,
        index: String,
        start: String,
        end: Option<String>,
    },

    /// Increment a counter datatype
    Incr {
        bucket: String,
        key: String,
        #[arg(default_value = "1")]
        by: i64,
    },

    /// Fetch a datatype
    Fetch { bucket: String, key: String },

    /// Delete every key in a bucket and reset its properties (IRREVERSIBLE)
    Purge {
        bucket: String,

        /// Concurrent deletes per chunk; sequential when omitted
        #[arg(long)]
        parallel: Option<usize>,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,riakwire=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let config = ClientConfig::builder()
        .host(&args.host)
        .port(args.port)
        .max_transports(args.max_transports)
        .build();

    let client = match Client::new(config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = run(&client, &args);
    client.quit();

    if let Err(e) = outcome {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(client: &Client, args: &Args) -> Result<()> {
    let bucket = |name: &String| client.bucket_type(&args.bucket_type, name);

    match &args.command {
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
        Commands::Info => {
            let info = client.server_info()?;
            println!(
                "node={} version={}",
                info.node.unwrap_or_default(),
                info.server_version.unwrap_or_default()
            );
        }
        Commands::Get { bucket: name, key, r } => {
            let opts = GetOptions {
                r: *r,
                ..Default::default()
            };
            let obj = bucket(name).get_binary(key, &opts)?;
            if obj.exists() {
                println!("{}", String::from_utf8_lossy(obj.encoded_data()));
            } else {
                println!("(not found)");
            }
        }
        Commands::Put {
            bucket: name,
            key,
            value,
            content_type,
            w,
        } => {
            let opts = PutOptions {
                w: *w,
                ..Default::default()
            };
            bucket(name)
                .new_binary(Some(key.as_str()), value.as_bytes(), content_type)
                .store(&opts)?;
            println!("OK");
        }
        Commands::Del { bucket: name, key } => {
            bucket(name).delete(key, &DeleteOptions::default())?;
            println!("OK");
        }
        Commands::Keys { bucket: name } => {
            for key in bucket(name).get_keys()? {
                println!("{}", key);
            }
        }
        Commands::Props { bucket: name } => {
            for (prop, value) in bucket(name).get_properties()? {
                println!("{} = {:?}", prop, value);
            }
        }
        Commands::Index {
            bucket: name,
            index,
            start,
            end,
        } => {
            let page = bucket(name).get_index(index, start, end.as_deref())?;
            for key in page.keys {
                println!("{}", key);
            }
        }
        Commands::Incr { bucket: name, key, by } => {
            let opts = UpdateOptions {
                return_body: true,
                ..Default::default()
            };
            let update = bucket(name).update_datatype(Some(key.as_str()), DtOp::increment(*by), &opts)?;
            match update.value.and_then(|v| v.as_counter()) {
                Some(n) => println!("{}", n),
                None => println!("OK"),
            }
        }
        Commands::Fetch { bucket: name, key } => {
            let value = bucket(name).fetch_datatype(key, &FetchOptions::default())?;
            match value.value {
                Some(dt) => println!("{:?}", dt),
                None => println!("(not found)"),
            }
        }
        Commands::Purge { bucket: name, parallel } => {
            let report = bucket(name).purge_keys(*parallel)?;
            println!(
                "deleted {}/{} keys ({} failed)",
                report.deleted,
                report.listed,
                report.failed.len()
            );
        }
    }
    Ok(())
}
