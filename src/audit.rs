//! Audit log - balance mutation trail
//!
//! Records every successful holding mutation as one CSV row for offline
//! reconciliation. Write failures are logged and never propagate into the
//! mutation that triggered them; the in-memory ledger stays authoritative.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use rust_decimal::Decimal;
use tracing::error;

use crate::core_types::UserId;

/// One balance mutation, as appended to the CSV trail.
#[derive(Debug)]
pub struct AuditRecord<'a> {
    pub user_id: UserId,
    pub symbol: &'a str,
    pub op: &'static str,
    pub delta: Decimal,
    pub amount_after: Decimal,
    pub locked_after: Decimal,
    pub version: u64,
}

/// Appends audit records to a CSV file.
pub struct AuditLog {
    file: Mutex<File>,
    entry_count: AtomicU64,
}

impl AuditLog {
    /// Open the audit file, creating parent directories as needed.
    ///
    /// Appends to an existing file; the header row is written only when
    /// the file is empty.
    pub fn open(path: &str) -> std::io::Result<Self> {
        if let Some(dir) = Path::new(path).parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if file.metadata()?.len() == 0 {
            // Header: ts_ms,user_id,symbol,op,delta,amount_after,locked_after,version
            writeln!(
                file,
                "ts_ms,user_id,symbol,op,delta,amount_after,locked_after,version"
            )?;
        }

        Ok(Self {
            file: Mutex::new(file),
            entry_count: AtomicU64::new(0),
        })
    }

    /// Append a single record. Never fails the caller; errors are logged.
    pub fn record(&self, entry: &AuditRecord<'_>) {
        let ts_ms = chrono::Utc::now().timestamp_millis();
        let mut file = match self.file.lock() {
            Ok(f) => f,
            Err(poisoned) => poisoned.into_inner(),
        };

        let res = writeln!(
            file,
            "{},{},{},{},{},{},{},{}",
            ts_ms,
            entry.user_id,
            entry.symbol,
            entry.op,
            entry.delta,
            entry.amount_after,
            entry.locked_after,
            entry.version
        );
        match res {
            Ok(()) => {
                self.entry_count.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                error!(op = entry.op, user_id = entry.user_id, "audit write failed: {}", e);
            }
        }
    }

    /// Total records appended by this process.
    pub fn entry_count(&self) -> u64 {
        self.entry_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn temp_path(tag: &str) -> String {
        let dir = std::env::temp_dir();
        dir.join(format!(
            "custodia_audit_{}_{}.csv",
            tag,
            std::process::id()
        ))
        .to_string_lossy()
        .into_owned()
    }

    #[test]
    fn test_writes_header_and_rows() {
        let path = temp_path("rows");
        let _ = std::fs::remove_file(&path);

        let audit = AuditLog::open(&path).unwrap();
        audit.record(&AuditRecord {
            user_id: 42,
            symbol: "BTC",
            op: "credit",
            delta: dec!(1.5),
            amount_after: dec!(1.5),
            locked_after: Decimal::ZERO,
            version: 1,
        });
        audit.record(&AuditRecord {
            user_id: 42,
            symbol: "BTC",
            op: "reserve",
            delta: dec!(0.5),
            amount_after: dec!(1.5),
            locked_after: dec!(0.5),
            version: 2,
        });
        assert_eq!(audit.entry_count(), 2);
        drop(audit);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ts_ms,user_id,symbol,op"));
        assert!(lines[1].contains(",42,BTC,credit,1.5,1.5,0,1"));
        assert!(lines[2].contains(",42,BTC,reserve,0.5,1.5,0.5,2"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_reopen_appends_without_second_header() {
        let path = temp_path("reopen");
        let _ = std::fs::remove_file(&path);

        {
            let audit = AuditLog::open(&path).unwrap();
            audit.record(&AuditRecord {
                user_id: 1,
                symbol: "ETH",
                op: "credit",
                delta: dec!(2),
                amount_after: dec!(2),
                locked_after: Decimal::ZERO,
                version: 1,
            });
        }
        {
            let audit = AuditLog::open(&path).unwrap();
            audit.record(&AuditRecord {
                user_id: 1,
                symbol: "ETH",
                op: "debit",
                delta: dec!(1),
                amount_after: dec!(1),
                locked_after: Decimal::ZERO,
                version: 2,
            });
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let headers = contents
            .lines()
            .filter(|l| l.starts_with("ts_ms"))
            .count();
        assert_eq!(headers, 1);
        assert_eq!(contents.lines().count(), 3);

        let _ = std::fs::remove_file(&path);
    }
}
