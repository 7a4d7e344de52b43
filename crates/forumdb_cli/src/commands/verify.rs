//! Verify command implementation.
//!
//! Verification never writes to the store file. The log is read once and
//! every later step works on that copy.

use forumdb::{Category, Config, Forum, ForumConfig, Record, Reply, Topic};
use forumdb_core::log::CommitLog;
use forumdb_core::Store;
use forumdb_storage::{FileBackend, InMemoryBackend, StorageBackend};
use std::path::Path;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Complete log records.
    pub log_records: usize,
    /// Bytes of an incomplete record at the end of the log.
    pub torn_bytes: u64,
    /// Forum records that decoded.
    pub valid_records: usize,
    /// Forum records that did not.
    pub corrupt_records: usize,
    /// Category entries naming deleted topics.
    pub stale_refs: usize,
    /// Errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.corrupt_records == 0 && self.errors.is_empty()
    }
}

/// Reads the raw log and scans it.
///
/// Returns the log bytes when the scan succeeded, `None` when the log itself
/// is corrupt.
pub fn verify_log(
    path: &Path,
    result: &mut VerifyResult,
) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error>> {
    let data = FileBackend::open(path)?.read_all()?;
    let log = CommitLog::new(Box::new(InMemoryBackend::with_data(data.clone())), false);
    match log.scan() {
        Ok(scan) => {
            result.log_records = scan.records.len();
            result.torn_bytes = scan.torn_bytes;
            Ok(Some(data))
        }
        Err(err) => {
            result.errors.push(format!("log: {err}"));
            Ok(None)
        }
    }
}

/// Opens a forum over an in-memory copy of the log. Recovery and bucket
/// creation only touch the copy.
pub fn open_copy(data: Vec<u8>) -> Result<Forum, Box<dyn std::error::Error>> {
    let store = Store::open_with_backend(Config::new(), Box::new(InMemoryBackend::with_data(data)))?;
    Ok(Forum::with_store(store, &ForumConfig::new())?)
}

/// Decodes every record of the three forum buckets.
pub fn verify_records(forum: &Forum, result: &mut VerifyResult) -> Result<(), Box<dyn std::error::Error>> {
    check::<Category>(forum, result)?;
    check::<Topic>(forum, result)?;
    check::<Reply>(forum, result)?;

    match forum.stale_topic_refs() {
        Ok(stale) => result.stale_refs = stale.len(),
        // Already reported by the category check.
        Err(err) if err.is_corruption() => {}
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn check<T: Record>(forum: &Forum, result: &mut VerifyResult) -> Result<(), Box<dyn std::error::Error>> {
    let report = forum.scan_lenient::<T>()?;
    tracing::debug!(bucket = T::BUCKET, valid = report.records.len(), corrupt = report.errors.len(), "bucket checked");

    result.valid_records += report.records.len();
    result.corrupt_records += report.errors.len();
    result
        .errors
        .extend(report.errors.iter().map(ToString::to_string));
    Ok(())
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {}", path.display()).into());
    }

    println!("Verifying store at {}", path.display());
    println!();

    let mut result = VerifyResult::default();

    println!("Checking log...");
    let data = verify_log(path, &mut result)?;
    println!("  Records:    {}", result.log_records);
    if result.torn_bytes > 0 {
        println!(
            "  Torn tail:  {} bytes (cut the next time the store is opened)",
            result.torn_bytes
        );
    }

    if let Some(data) = data {
        println!("Checking records...");
        let forum = open_copy(data)?;
        verify_records(&forum, &mut result)?;
        println!("  Valid:      {}", result.valid_records);
        println!("  Corrupt:    {}", result.corrupt_records);
        println!("  Stale refs: {}", result.stale_refs);
    }

    if !result.errors.is_empty() {
        println!();
        println!("Errors:");
        for err in &result.errors {
            println!("  - {err}");
        }
    }

    println!();
    if result.is_ok() {
        println!("✓ Store verification passed");
        Ok(())
    } else {
        println!("✗ Store verification failed");
        Err("Verification failed".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forumdb::Forum;
    use tempfile::tempdir;

    #[test]
    fn clean_store_passes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forum.db");
        {
            let forum = Forum::open(&path).unwrap();
            let cat = forum.new_category().unwrap();
            cat.save(&forum).unwrap();
            forum.close().unwrap();
        }

        assert!(run(&path).is_ok());
    }

    #[test]
    fn corrupt_record_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forum.db");
        {
            let forum = Forum::open(&path).unwrap();
            forum.facade().write(Reply::BUCKET, "bad", b"junk").unwrap();
            forum.close().unwrap();
        }

        let mut result = VerifyResult::default();
        let data = verify_log(&path, &mut result).unwrap().unwrap();
        verify_records(&open_copy(data).unwrap(), &mut result).unwrap();
        assert_eq!(result.corrupt_records, 1);
        assert!(!result.is_ok());

        assert!(run(&path).is_err());
    }

    #[test]
    fn torn_log_is_left_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forum.db");
        {
            let forum = Forum::open(&path).unwrap();
            let cat = forum.new_category().unwrap();
            cat.save(&forum).unwrap();
            forum.close().unwrap();
        }
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.extend_from_slice(b"FDBL\x01\x00\x02");
        std::fs::write(&path, &bytes).unwrap();

        let mut result = VerifyResult::default();
        verify_log(&path, &mut result).unwrap();
        assert_eq!(result.torn_bytes, 7);

        assert!(run(&path).is_ok());
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn corrupt_log_skips_record_checks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forum.db");
        {
            let forum = Forum::open(&path).unwrap();
            forum.close().unwrap();
        }
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] = b'X';
        std::fs::write(&path, &bytes).unwrap();

        let mut result = VerifyResult::default();
        assert!(verify_log(&path, &mut result).unwrap().is_none());
        assert_eq!(result.errors.len(), 1);

        assert!(run(&path).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }
}
