//! Inspect command implementation.

use super::{format_size, open_store};
use forumdb_core::Store;
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store file path.
    pub path: String,
    /// Log size in bytes.
    pub log_size: u64,
    /// Complete log records.
    pub record_count: usize,
    /// Committed transactions in the log.
    pub transaction_count: usize,
    /// Bytes compaction would reclaim.
    pub reclaimable_bytes: u64,
    /// Bytes cut from a torn tail when the store was opened.
    pub truncated_bytes: u64,
    /// Latest commit sequence number.
    pub committed_seq: u64,
    /// Key count per bucket.
    pub buckets: Vec<BucketStats>,
}

/// Statistics for a single bucket.
#[derive(Debug, Serialize)]
pub struct BucketStats {
    /// Bucket name.
    pub name: String,
    /// Number of keys.
    pub keys: usize,
}

/// Gathers inspection data from an open store.
pub fn inspect(store: &Store) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let summary = store.log_summary()?;
    let tx = store.begin_read()?;

    let buckets = tx
        .bucket_names()
        .into_iter()
        .map(|name| BucketStats {
            name: name.to_string(),
            keys: tx.len(name).unwrap_or(0),
        })
        .collect();

    Ok(InspectResult {
        path: store
            .path()
            .map_or_else(|| "<memory>".to_string(), |p| p.display().to_string()),
        log_size: summary.bytes,
        record_count: summary.records,
        transaction_count: summary.transactions,
        reclaimable_bytes: summary.reclaimable_bytes,
        truncated_bytes: store.recovery().truncated_bytes,
        committed_seq: store.committed_seq().as_u64(),
        buckets,
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;
    let result = inspect(&store)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    store.close()?;
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("ForumDB Store Inspection");
    println!("========================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Log:");
    println!("  Size:          {}", format_size(result.log_size));
    println!("  Records:       {}", result.record_count);
    println!("  Transactions:  {}", result.transaction_count);
    println!("  Reclaimable:   {}", format_size(result.reclaimable_bytes));
    println!("  Committed seq: {}", result.committed_seq);
    if result.truncated_bytes > 0 {
        println!("  Torn tail cut: {}", format_size(result.truncated_bytes));
    }
    println!();
    println!("Buckets:");
    for bucket in &result.buckets {
        println!("  {:<16} {} keys", bucket.name, bucket.keys);
    }
}
