//! Stampede CLI
//!
//! Command-line demonstrations of the Stampede single-flight compute cache.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stampede_cache::{
    CacheKey, Clock, EmptyReason, Fetch, LockMode, ManualClock, MemoryStore, Store,
    SystemClock, Transient, TransientConfig,
};

/// Stampede - single-flight TTL compute cache
#[derive(Parser)]
#[command(name = "stampede")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cache key and lock key derived from a seed
    Key {
        /// Key seed (any non-empty string)
        seed: String,
    },

    /// Hammer one key from concurrent callers and count regenerations
    Demo {
        /// Key seed
        #[arg(short, long, default_value = "weather:NYC")]
        seed: String,
        /// Number of concurrent callers
        #[arg(short, long, default_value = "16")]
        callers: usize,
        /// Simulated producer latency in milliseconds
        #[arg(short, long, default_value = "250")]
        work_ms: u64,
        /// Cache lifetime in seconds
        #[arg(short, long, default_value = "600")]
        ttl: i64,
        /// Use atomic create-if-absent locking
        #[arg(short, long)]
        exclusive: bool,
        /// Maximum lock age in seconds before reclamation
        #[arg(long, env = "STAMPEDE_MAX_LOCK_DURATION", default_value = "100")]
        max_lock: i64,
    },

    /// Replay the expiry / lock / stale-lock scenario on a simulated clock
    Simulate {
        /// Maximum lock age in seconds before reclamation
        #[arg(long, default_value = "100")]
        max_lock: i64,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Weather {
    city: String,
    temp: i32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "stampede=debug,info"
    } else {
        "stampede=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Key { seed } => cmd_key(&seed),
        Commands::Demo {
            seed,
            callers,
            work_ms,
            ttl,
            exclusive,
            max_lock,
        } => cmd_demo(&seed, callers, work_ms, ttl, exclusive, max_lock),
        Commands::Simulate { max_lock } => cmd_simulate(max_lock),
    }
}

/// Print derived keys
fn cmd_key(seed: &str) -> Result<()> {
    let key = CacheKey::derive(seed).context("Cannot derive cache key")?;
    println!("{} {}", "Cache key:".cyan().bold(), key);
    println!("{} {}", "Lock key: ".cyan().bold(), key.lock_key());
    Ok(())
}

/// Run concurrent callers against one key
fn cmd_demo(
    seed: &str,
    callers: usize,
    work_ms: u64,
    ttl: i64,
    exclusive: bool,
    max_lock: i64,
) -> Result<()> {
    anyhow::ensure!(callers > 0, "need at least one caller");

    let mode = if exclusive {
        LockMode::Exclusive
    } else {
        LockMode::Advisory
    };
    println!(
        "{} {} callers on '{}' ({} lock, {}ms producer)",
        "🐘 Stampede:".cyan().bold(),
        callers,
        seed,
        mode,
        work_ms
    );

    let store = Arc::new(MemoryStore::new());
    let config = TransientConfig::from_env()
        .with_max_lock_duration(max_lock)
        .with_lock_mode(mode);
    let calls = Arc::new(AtomicUsize::new(0));

    let mut entry =
        Transient::<Weather>::with_config(seed, store, Arc::new(SystemClock), config)?;
    {
        let calls = calls.clone();
        entry.expires_in(ttl)?.updates_using(
            move |args: &[Value]| {
                calls.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(work_ms));
                Ok(Weather {
                    city: args[0].as_str().unwrap_or("unknown").to_string(),
                    temp: 72,
                })
            },
            vec![json!(seed.rsplit(':').next().unwrap_or(seed))],
        );
    }

    let entry = Arc::new(entry);
    let barrier = Arc::new(Barrier::new(callers));
    let start = Instant::now();

    let handles: Vec<_> = (0..callers)
        .map(|i| {
            let entry = entry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let fetch = entry.get();
                debug!(caller = i, ?fetch, "Caller finished");
                fetch
            })
        })
        .collect();

    let mut regenerated = 0;
    let mut cached = 0;
    let mut locked = 0;
    let mut failed = 0;
    for handle in handles {
        let fetch = handle
            .join()
            .map_err(|_| anyhow::anyhow!("caller thread panicked"))??;
        match fetch {
            Fetch::Regenerated(_) => regenerated += 1,
            Fetch::Cached(_) => cached += 1,
            Fetch::Empty(EmptyReason::Locked) => locked += 1,
            Fetch::Empty(_) => failed += 1,
        }
    }
    let elapsed = start.elapsed();

    println!("\n{}", "Results:".yellow().bold());
    println!("   Producer invocations: {}", calls.load(Ordering::SeqCst));
    println!("   Regenerated:          {}", regenerated);
    println!("   Served from cache:    {}", cached);
    println!("   Skipped (locked):     {}", locked);
    println!("   Failed:               {}", failed);
    println!("   Wall time:            {:?}", elapsed);

    match entry.get()? {
        Fetch::Cached(w) => println!(
            "\n{} {} is {}°F",
            "✅ Cached:".green(),
            w.city,
            w.temp
        ),
        other => println!("\n{} {:?}", "⚠️  Not cached:".red(), other),
    }

    Ok(())
}

/// Replay the weather scenario on a manual clock
fn cmd_simulate(max_lock: i64) -> Result<()> {
    println!("{}", "🕰  Simulated weather:NYC cache".cyan().bold());

    let clock = Arc::new(ManualClock::starting_now());
    let store = Arc::new(MemoryStore::with_clock(clock.clone()));
    let config = TransientConfig::default().with_max_lock_duration(max_lock);
    let max_lock = config.max_lock_duration_secs as i64;
    let calls = Arc::new(AtomicUsize::new(0));

    let mut entry =
        Transient::<Weather>::with_config("weather:NYC", store.clone(), clock.clone(), config)?;
    {
        let calls = calls.clone();
        entry.expires_in(600)?.updates_using(
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Weather {
                    city: "NYC".into(),
                    temp: 72,
                })
            },
            vec![],
        );
    }

    let report = |step: &str, fetch: &Fetch<Weather>| {
        let outcome = match fetch {
            Fetch::Cached(w) => format!("cached {}°F", w.temp).green(),
            Fetch::Regenerated(w) => format!("regenerated {}°F", w.temp).blue(),
            Fetch::Empty(reason) => format!("empty ({reason})").red(),
        };
        println!(
            "   {:<44} {:<28} producer calls: {}",
            step,
            outcome,
            calls.load(Ordering::SeqCst)
        );
    };

    report("t=0      first lookup", &entry.get()?);

    clock.advance(300);
    report("t=300    within TTL", &entry.get()?);

    clock.advance(301);
    let held_for = max_lock / 2;
    let stamp = (clock.now() - held_for).to_string();
    store.write(&entry.key().lock_key(), stamp.as_bytes(), 0)?;
    report(
        &format!("t=601    expired, lock held {held_for}s"),
        &entry.get()?,
    );

    clock.advance(max_lock);
    report(
        &format!("t={}    lock now {}s old", 601 + max_lock, held_for + max_lock),
        &entry.get()?,
    );

    Ok(())
}
