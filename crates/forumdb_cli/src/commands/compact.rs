//! Compact command implementation.

use super::{format_size, open_store};
use std::path::Path;

/// Runs the compact command.
pub fn run(path: &Path, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;

    println!("Compacting store at {}", path.display());
    if dry_run {
        println!("(dry run - no changes will be made)");
    }
    println!();

    let summary = store.log_summary()?;
    println!("Compaction Analysis:");
    println!("  Records:      {}", summary.records);
    println!("  Transactions: {}", summary.transactions);
    println!("  Size:         {}", format_size(summary.bytes));
    println!("  Reclaimable:  {}", format_size(summary.reclaimable_bytes));

    if !dry_run {
        if summary.transactions > 1 {
            println!();
            println!("Performing compaction...");
            let stats = store.compact()?;
            println!("  Size before: {}", format_size(stats.bytes_before));
            println!("  Size after:  {}", format_size(stats.bytes_after));
            println!("  Keys kept:   {}", stats.keys);
            println!("✓ Compaction complete");
        } else {
            println!();
            println!("No compaction needed - log already holds a single snapshot");
        }
    }

    store.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forumdb::Forum;
    use tempfile::tempdir;

    #[test]
    fn compact_shrinks_log_and_keeps_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forum.db");
        let cat_id = {
            let forum = Forum::open(&path).unwrap();
            let mut cat = forum.new_category().unwrap();
            for name in ["a", "b", "c"] {
                cat.name = name.to_string();
                cat.save(&forum).unwrap();
            }
            forum.close().unwrap();
            cat.id().to_string()
        };
        let before = std::fs::metadata(&path).unwrap().len();

        run(&path, true).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), before);

        run(&path, false).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() < before);

        let forum = Forum::open(&path).unwrap();
        assert_eq!(forum.read_category(&cat_id).unwrap().unwrap().name, "c");
    }
}
