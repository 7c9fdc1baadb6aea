//! SQLite-backed calibration store.
//!
//! Schema: one `calibration_records` header row per save, owning N
//! `calibration_samples` rows through `record_id`. Both are written in a
//! single transaction. Rows are never updated or deleted.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, warn};

use crate::config::DEFAULT_DB_PATH;
use crate::domain::{
    CalibrationRecord, FitResult, ModelKind, RecordId, RecordSummary, Sample, SampleSet, TIMESTAMP_FORMAT,
};
use crate::error::{CalibrationError, Result};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS calibration_records (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at  TEXT NOT NULL,
    title       TEXT NOT NULL,
    a           REAL NOT NULL,
    b           REAL NOT NULL,
    r_squared   REAL NOT NULL,
    model_kind  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS calibration_samples (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id   INTEGER NOT NULL REFERENCES calibration_records(id),
    maturity    REAL NOT NULL CHECK (maturity > 0),
    strength    REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_calibration_samples_record
    ON calibration_samples(record_id, id);
"#;

/// Connection and locking parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub path: PathBuf,
    /// SQLite `busy_timeout`: how long a statement waits on another process's lock.
    pub busy_timeout: Duration,
    /// Longest wait for the in-process connection lock before a call fails.
    pub lock_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_PATH),
            busy_timeout: Duration::from_millis(2000),
            lock_timeout: Duration::from_millis(5000),
        }
    }
}

/// Append-only store of calibration records.
#[derive(Debug)]
pub struct ResultStore {
    conn: Mutex<Connection>,
    lock_timeout: Duration,
}

impl ResultStore {
    /// Open (creating if needed) the database at `config.path`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalibrationError::Persistence(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(&config.path)?;
        conn.busy_timeout(config.busy_timeout)?;
        let store = Self::init(conn, config)?;
        info!(path = %config.path.display(), "opened calibration store");
        Ok(store)
    }

    /// Private in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, &StoreConfig::default())
    }

    fn init(conn: Connection, config: &StoreConfig) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", 1)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            lock_timeout: config.lock_timeout,
        })
    }

    /// Persist a fit and its samples as one record. Returns the new id.
    pub fn save(&self, title: &str, fit: &FitResult, samples: &SampleSet) -> Result<RecordId> {
        self.save_at(title, fit, samples, Local::now().naive_local())
    }

    /// [`ResultStore::save`] with an explicit creation time.
    pub fn save_at(
        &self,
        title: &str,
        fit: &FitResult,
        samples: &SampleSet,
        created_at: NaiveDateTime,
    ) -> Result<RecordId> {
        self.save_with(title, fit, samples, created_at, |_| Ok(()))
    }

    /// `after_row(n)` runs inside the transaction after the header (`n == 0`)
    /// and after each sample row (`n == 1..`); an error aborts the save.
    fn save_with(
        &self,
        title: &str,
        fit: &FitResult,
        samples: &SampleSet,
        created_at: NaiveDateTime,
        after_row: impl Fn(usize) -> Result<()>,
    ) -> Result<RecordId> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CalibrationError::InvalidInput("title must not be empty".to_string()));
        }
        if ![fit.intercept, fit.slope, fit.r_squared].iter().all(|v| v.is_finite()) {
            return Err(CalibrationError::Persistence(
                "refusing to store non-finite fit parameters".to_string(),
            ));
        }

        let mut conn = self.lock()?;
        let result = write_record(&mut conn, title, fit, samples, created_at, after_row);

        match result {
            Ok(id) => {
                info!(id, title, samples = samples.len(), model = fit.model_kind.as_str(), "saved calibration");
                Ok(id)
            }
            Err(err) => {
                warn!(error = %err, "calibration save rolled back");
                Err(match err {
                    CalibrationError::Persistence(_) => err,
                    other => CalibrationError::Persistence(format!("save rolled back: {other}")),
                })
            }
        }
    }

    /// All records, oldest first.
    pub fn list(&self) -> Result<Vec<RecordSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT r.id, r.created_at, r.title, r.a, r.b, r.r_squared, r.model_kind,
                    (SELECT COUNT(*) FROM calibration_samples s WHERE s.record_id = r.id)
             FROM calibration_records r
             ORDER BY r.id ASC",
        )?;
        let rows = stmt.query_map([], |row| Ok((HeaderRow::from_row(row)?, row.get::<_, i64>(7)?)))?;

        let mut out = Vec::new();
        for row in rows {
            let (header, count) = row?;
            let (created_at, fit) = header.decode()?;
            out.push(RecordSummary {
                id: header.id,
                created_at,
                title: header.title,
                fit,
                sample_count: count as usize,
            });
        }
        debug!(records = out.len(), "listed calibrations");
        Ok(out)
    }

    /// One record with its samples in insertion order.
    pub fn get(&self, id: RecordId) -> Result<CalibrationRecord> {
        let conn = self.lock()?;
        let header = conn
            .query_row(
                "SELECT id, created_at, title, a, b, r_squared, model_kind
                 FROM calibration_records WHERE id = ?1",
                params![id],
                HeaderRow::from_row,
            )
            .optional()?
            .ok_or(CalibrationError::RecordNotFound(id))?;

        let mut stmt = conn.prepare(
            "SELECT maturity, strength FROM calibration_samples WHERE record_id = ?1 ORDER BY id ASC",
        )?;
        let samples = stmt
            .query_map(params![id], |row| Ok(Sample::new(row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let samples = SampleSet::new(samples)
            .map_err(|e| CalibrationError::Persistence(format!("record {id} has invalid samples: {e}")))?;

        let (created_at, fit) = header.decode()?;
        Ok(CalibrationRecord {
            id: header.id,
            created_at,
            title: header.title,
            fit,
            samples,
        })
    }

    /// Wait up to `lock_timeout` for the connection; waiters wake as soon as it is released.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.try_lock_for(self.lock_timeout).ok_or_else(|| {
            let waited_ms = self.lock_timeout.as_millis();
            warn!(waited_ms, "store lock not acquired");
            CalibrationError::Persistence(format!("store is busy (waited {waited_ms} ms)"))
        })
    }
}

fn write_record(
    conn: &mut Connection,
    title: &str,
    fit: &FitResult,
    samples: &SampleSet,
    created_at: NaiveDateTime,
    after_row: impl Fn(usize) -> Result<()>,
) -> Result<RecordId> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO calibration_records (created_at, title, a, b, r_squared, model_kind)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            created_at.format(TIMESTAMP_FORMAT).to_string(),
            title,
            fit.intercept,
            fit.slope,
            fit.r_squared,
            fit.model_kind.as_str(),
        ],
    )?;
    let id = tx.last_insert_rowid();
    after_row(0)?;

    {
        let mut stmt =
            tx.prepare("INSERT INTO calibration_samples (record_id, maturity, strength) VALUES (?1, ?2, ?3)")?;
        for (i, s) in samples.iter().enumerate() {
            stmt.execute(params![id, s.maturity, s.strength])?;
            after_row(i + 1)?;
        }
    }

    // Dropping `tx` on any early return above rolls back.
    tx.commit()?;
    Ok(id)
}

struct HeaderRow {
    id: RecordId,
    created_at: String,
    title: String,
    a: f64,
    b: f64,
    r_squared: f64,
    model_kind: String,
}

impl HeaderRow {
    /// Columns 0..=6 must be `id, created_at, title, a, b, r_squared, model_kind`.
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            title: row.get(2)?,
            a: row.get(3)?,
            b: row.get(4)?,
            r_squared: row.get(5)?,
            model_kind: row.get(6)?,
        })
    }

    fn decode(&self) -> Result<(NaiveDateTime, FitResult)> {
        let created_at = NaiveDateTime::parse_from_str(&self.created_at, TIMESTAMP_FORMAT).map_err(|e| {
            CalibrationError::Persistence(format!(
                "record {} has invalid created_at {:?}: {e}",
                self.id, self.created_at
            ))
        })?;
        let model_kind = ModelKind::parse(&self.model_kind).ok_or_else(|| {
            CalibrationError::Persistence(format!(
                "record {} has unknown model_kind {:?}",
                self.id, self.model_kind
            ))
        })?;
        Ok((
            created_at,
            FitResult {
                model_kind,
                intercept: self.a,
                slope: self.b,
                r_squared: self.r_squared,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, day).unwrap().and_hms_opt(14, 5, 9).unwrap()
    }

    fn fixture() -> (FitResult, SampleSet) {
        let samples = SampleSet::new(vec![
            Sample::new(1500.0, 12.0),
            Sample::new(500.0, 5.0),
            Sample::new(30000.0, 35.0),
        ])
        .unwrap();
        let fit = crate::fit::fit_samples(&samples, ModelKind::LogLinear).unwrap();
        (fit, samples)
    }

    #[test]
    fn store_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResultStore>();
    }

    #[test]
    fn save_then_get_round_trips() {
        let store = ResultStore::open_in_memory().unwrap();
        let (fit, samples) = fixture();

        let id = store.save_at("  Pour 7  ", &fit, &samples, at(3)).unwrap();
        let record = store.get(id).unwrap();

        assert_eq!(record.id, id);
        assert_eq!(record.title, "Pour 7");
        assert_eq!(record.created_at, at(3));
        assert_eq!(record.fit, fit);
        assert_eq!(record.samples, samples);
    }

    #[test]
    fn ids_increase_and_list_is_ordered() {
        let store = ResultStore::open_in_memory().unwrap();
        let (fit, samples) = fixture();

        let first = store.save_at("a", &fit, &samples, at(1)).unwrap();
        let second = store.save_at("b", &fit, &samples, at(2)).unwrap();
        assert!(second > first);

        let list = store.list().unwrap();
        assert_eq!(list.iter().map(|r| r.id).collect::<Vec<_>>(), vec![first, second]);
        assert_eq!(list[1].title, "b");
        assert_eq!(list[1].sample_count, 3);
    }

    #[test]
    fn failure_mid_save_leaves_nothing_behind() {
        let store = ResultStore::open_in_memory().unwrap();
        let (fit, samples) = fixture();
        store.save_at("kept", &fit, &samples, at(1)).unwrap();
        let before = store.list().unwrap();

        for fail_at in [0, 2] {
            let err = store
                .save_with("lost", &fit, &samples, at(2), |n| {
                    if n == fail_at {
                        Err(CalibrationError::Persistence("injected".to_string()))
                    } else {
                        Ok(())
                    }
                })
                .unwrap_err();
            assert!(matches!(err, CalibrationError::Persistence(_)));
        }

        assert_eq!(store.list().unwrap(), before);
        let orphans: i64 = store
            .conn
            .lock()
            .query_row(
                "SELECT COUNT(*) FROM calibration_samples WHERE record_id NOT IN (SELECT id FROM calibration_records)",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn ids_are_not_reused_after_rollback() {
        let store = ResultStore::open_in_memory().unwrap();
        let (fit, samples) = fixture();
        let first = store.save_at("a", &fit, &samples, at(1)).unwrap();
        let _ = store.save_with("b", &fit, &samples, at(1), |_| {
            Err(CalibrationError::Persistence("injected".to_string()))
        });
        let next = store.save_at("c", &fit, &samples, at(1)).unwrap();
        assert!(next > first);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = ResultStore::open_in_memory().unwrap();
        assert!(matches!(store.get(42), Err(CalibrationError::RecordNotFound(42))));
    }

    #[test]
    fn blank_title_is_rejected() {
        let store = ResultStore::open_in_memory().unwrap();
        let (fit, samples) = fixture();
        assert!(matches!(
            store.save("   ", &fit, &samples),
            Err(CalibrationError::InvalidInput(_))
        ));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn busy_lock_fails_fast() {
        let config = StoreConfig {
            lock_timeout: Duration::from_millis(20),
            ..StoreConfig::default()
        };
        let store = ResultStore::init(Connection::open_in_memory().unwrap(), &config).unwrap();
        let (fit, samples) = fixture();

        let held = store.conn.lock();
        let err = store.save("blocked", &fit, &samples).unwrap_err();
        drop(held);

        assert!(matches!(err, CalibrationError::Persistence(ref m) if m.contains("busy")));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn concurrent_saves_all_land_intact() {
        const THREADS: usize = 8;
        const SAVES: usize = 20;

        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            path: dir.path().join("shared.db"),
            ..StoreConfig::default()
        };
        let store = ResultStore::open(&config).unwrap();

        // Each (thread, save) pair gets its own sample count and strengths.
        let sample_set = |t: usize, k: usize| {
            let n = 2 + (t + k) % 4;
            let rows = (0..n)
                .map(|j| Sample::new(500.0 * (j + 1) as f64, (t * 1000 + k * 10 + j) as f64 + 1.0))
                .collect();
            SampleSet::new(rows).unwrap()
        };

        let saved: Vec<(RecordId, SampleSet)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|t| {
                    let store = &store;
                    scope.spawn(move || {
                        (0..SAVES)
                            .map(|k| {
                                let samples = sample_set(t, k);
                                let fit = crate::fit::fit_samples(&samples, ModelKind::LogLinear).unwrap();
                                let id = store.save(&format!("t{t}-{k}"), &fit, &samples).unwrap();
                                assert_eq!(store.get(id).unwrap().samples, samples);
                                (id, samples)
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });

        let list = store.list().unwrap();
        assert_eq!(list.len(), THREADS * SAVES);
        for (id, samples) in &saved {
            let summary = list.iter().find(|r| r.id == *id).unwrap();
            assert_eq!(summary.sample_count, samples.len());
            assert_eq!(&store.get(*id).unwrap().samples, samples);
        }

        let orphans: i64 = store
            .conn
            .lock()
            .query_row(
                "SELECT COUNT(*) FROM calibration_samples WHERE record_id NOT IN (SELECT id FROM calibration_records)",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn opens_file_store_and_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            path: dir.path().join("nested").join("cal.db"),
            ..StoreConfig::default()
        };
        let (fit, samples) = fixture();

        let id = {
            let store = ResultStore::open(&config).unwrap();
            store.save_at("disk", &fit, &samples, at(5)).unwrap()
        };

        let reopened = ResultStore::open(&config).unwrap();
        assert_eq!(reopened.get(id).unwrap().samples, samples);
    }
}
