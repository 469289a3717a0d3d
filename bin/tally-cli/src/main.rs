//! Tally CLI - Admin Command Line Interface
//!
//! Drives sharded counters in a local redb file: increment, read the
//! aggregate, grow the shard count, and inspect shard records.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tally_common::{CounterConfig, CounterName};
use tally_counter::{ShardKeyring, ShardedCounter};
use tally_store::{CounterCache, KvStore, RedbStore, TtlCache};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tally-cli")]
#[command(about = "Tally Admin CLI")]
#[command(version)]
struct Args {
    /// Path to the counter database
    #[arg(short, long, default_value = "tally.redb")]
    db: PathBuf,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Increment a counter
    Incr {
        /// Counter name
        counter: String,
        /// Number of increments to apply
        #[arg(short, long, default_value_t = 1)]
        times: u64,
    },
    /// Read a counter's aggregated value
    Get {
        /// Counter name
        counter: String,
    },
    /// Grow a counter's shard count
    AddShards {
        /// Counter name
        counter: String,
        /// Number of shards to add
        count: u64,
    },
    /// Show a counter's shard records
    Shards {
        /// Counter name
        counter: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log_level)?)
        .init();

    let store: Arc<dyn KvStore> = Arc::new(RedbStore::open(&args.db)?);
    let cache: Arc<dyn CounterCache> = Arc::new(TtlCache::new());
    let config = CounterConfig::default();
    debug!(db = %args.db.display(), "opened counter database");

    let open = |name: &str| -> Result<ShardedCounter> {
        ShardedCounter::open(name, Arc::clone(&store), Arc::clone(&cache), &config)
            .map_err(Into::into)
    };

    match args.command {
        Commands::Incr { counter, times } => {
            let counter = open(&counter)?;
            for _ in 0..times {
                counter.increment()?;
            }
            println!("{}: +{times}", counter.name());
        }
        Commands::Get { counter } => {
            let counter = open(&counter)?;
            println!("{}", counter.get_count()?);
        }
        Commands::AddShards { counter, count } => {
            let counter = open(&counter)?;
            let new_count = counter.add_shards(count)?;
            println!("{}: {new_count} shards", counter.name());
        }
        Commands::Shards { counter } => {
            let name = CounterName::new(counter)?;
            let keyring = ShardKeyring::new(name);
            let records = store.scan(keyring.shard_namespace())?;
            for record in &records {
                println!("{}\t{}", record.key, record.value);
            }
            let total: u64 = records.iter().map(|r| r.value).sum();
            println!("total\t{total}");
        }
    }

    Ok(())
}
