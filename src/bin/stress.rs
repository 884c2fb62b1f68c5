//! driftkv stress driver
//!
//! Opens a store and writes synthetic records from several threads, letting
//! the rotation monitor flush memtables along the way.

use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::{Parser, ValueEnum};
use driftkv::fingerprint::Xxh64Fingerprint;
use driftkv::{Config, Db, FingerprintKind, MemtableBackend, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// driftkv write stress test
#[derive(Parser, Debug)]
#[command(name = "driftkv-stress")]
#[command(about = "Write synthetic records into a driftkv store")]
#[command(version)]
struct Args {
    /// Data directory (created if missing)
    #[arg(short, long, default_value = "./driftkv_data")]
    data_dir: PathBuf,

    /// Number of records to write
    #[arg(short, long, default_value = "1000000")]
    records: u64,

    /// Writer threads
    #[arg(short, long, default_value = "4")]
    threads: u64,

    /// Record count that triggers a memtable rotation
    #[arg(long, default_value = "300000")]
    rotation_threshold: u64,

    /// Memtable layout
    #[arg(long, value_enum, default_value = "flat")]
    backend: Backend,

    /// Key fingerprint (fixed once the store exists)
    #[arg(long, default_value = "xxh64")]
    fingerprint: FingerprintKind,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Flat,
    Bucketed,
}

const SOURCE_FILE: &str = "bfa032537a3d8cb1b79d161afe00819f";

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,driftkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("driftkv stress v{}", driftkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir.display());

    if let Err(e) = run(&args) {
        tracing::error!("Stress run failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> driftkv::Result<()> {
    std::fs::create_dir_all(&args.data_dir)?;

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .rotation_threshold(args.rotation_threshold)
        .memtable_backend(match args.backend {
            Backend::Flat => MemtableBackend::Flat,
            Backend::Bucketed => MemtableBackend::Bucketed,
        })
        .fingerprint(args.fingerprint)
        .build();

    let db = Db::open_with(config)?;
    let threads = args.threads.max(1);
    let per_thread = args.records / threads;
    let started = Instant::now();

    std::thread::scope(|scope| -> driftkv::Result<()> {
        let workers: Vec<_> = (0..threads)
            .map(|t| {
                let db = &db;
                let first = t * per_thread;
                let last = if t + 1 == threads { args.records } else { first + per_thread };
                scope.spawn(move || -> driftkv::Result<()> {
                    for i in first..last {
                        db.put(key_for(i), value_for(i))?;
                        if (i - first) % 100_000 == 0 && i > first {
                            tracing::debug!(thread = t, written = i - first, "progress");
                        }
                    }
                    Ok(())
                })
            })
            .collect();

        for worker in workers {
            match worker.join() {
                Ok(result) => result?,
                Err(_) => tracing::error!("writer thread panicked"),
            }
        }
        Ok(())
    })?;

    let elapsed = started.elapsed();
    tracing::info!(
        records = args.records,
        secs = elapsed.as_secs_f64(),
        per_sec = args.records as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        rotations = db.rotation_count(),
        generation = db.generation(),
        "done writing"
    );

    // Give a pending rotation a moment, then spot-check the newest writes
    std::thread::sleep(Duration::from_millis(100));
    let probe = args.records.saturating_sub(1);
    match db.get(&key_for(probe)) {
        Some(value) => tracing::info!(key = %key_for(probe), offset = value.offset, "read back"),
        None => tracing::info!(key = %key_for(probe), "newest key already flushed to disk"),
    }

    db.close()
}

fn key_for(i: u64) -> String {
    format!("{:016x}-{:012}", Xxh64Fingerprint::hash64(&i.to_le_bytes()), i)
}

fn value_for(i: u64) -> Value {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default();
    Value::new(now, i as i64, SOURCE_FILE)
}
