use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use cmr_types::{ComponentRecord, ComponentTuple, NewRecord};
use tracing::{debug, error, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::RecordStore;

/// Flush/sync strategy for appended records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// `fsync` after every write.
    EveryWrite,
    /// Rely on OS page-cache buffering.
    #[default]
    OsDefault,
}

type Records = RwLock<Vec<ComponentRecord>>;

fn poisoned<T>(e: PoisonError<T>) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {e}"))
}

/// What the append path needs from the log file.
trait LogFile: Write {
    fn byte_len(&self) -> io::Result<u64>;
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl LogFile for File {
    fn byte_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

fn write_line<L: LogFile>(log: &mut L, line: &[u8], sync_mode: SyncMode) -> io::Result<()> {
    log.write_all(line)?;
    log.flush()?;
    if sync_mode == SyncMode::EveryWrite {
        log.sync()?;
    }
    Ok(())
}

/// Append one encoded line. On any failure the log is cut back to its
/// previous length, so a partial or unsynced line never outlives the error.
fn append_line<L: LogFile>(log: &mut L, line: &[u8], sync_mode: SyncMode) -> StoreResult<()> {
    let prev_len = log.byte_len()?;
    if let Err(e) = write_line(log, line, sync_mode) {
        if let Err(rollback) = log.truncate_to(prev_len) {
            error!(error = %rollback, prev_len, "failed to roll back partial append");
        }
        return Err(e.into());
    }
    Ok(())
}

fn encode(record: &ComponentRecord) -> StoreResult<Vec<u8>> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    Ok(line)
}

/// Record store backed by a JSON-lines append log.
///
/// On-disk format is one JSON-encoded [`ComponentRecord`] per line, in
/// insertion order. The whole log is loaded into memory on open; lookups only
/// read the in-memory copy and never wait on disk I/O. Writers are serialized
/// by the file lock and run on the blocking thread pool; the in-memory copy is
/// updated only after the append succeeds.
///
/// On open, a final line without its terminating newline is treated as a torn
/// write from a crash: it is logged, cut off the file, and skipped. Any
/// complete line that fails to decode is reported as [`StoreError::Corrupt`].
pub struct FileRecordStore {
    path: PathBuf,
    sync_mode: SyncMode,
    file: Arc<Mutex<File>>,
    records: Arc<Records>,
}

impl FileRecordStore {
    /// Open (or create) the log at `path`.
    pub fn open(path: impl AsRef<Path>, sync_mode: SyncMode) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let mut content = String::new();
        file.read_to_string(&mut content)?;
        let (records, good_len) = parse_log(&content)?;
        if good_len < content.len() {
            warn!(
                path = %path.display(),
                dropped_bytes = content.len() - good_len,
                "truncating torn trailing record"
            );
            file.set_len(good_len as u64)?;
        }
        if good_len > 0 && !content[..good_len].ends_with('\n') {
            file.write_all(b"\n")?;
        }

        info!(path = %path.display(), records = records.len(), "opened record log");
        Ok(Self {
            path: path.to_path_buf(),
            sync_mode,
            file: Arc::new(Mutex::new(file)),
            records: Arc::new(RwLock::new(records)),
        })
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a write under the file lock on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut File, &Records, SyncMode) -> StoreResult<T> + Send + 'static,
    {
        let file = Arc::clone(&self.file);
        let records = Arc::clone(&self.records);
        let sync_mode = self.sync_mode;
        tokio::task::spawn_blocking(move || {
            let mut file = file.lock().map_err(poisoned)?;
            op(&mut *file, &records, sync_mode)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("blocking task failed: {e}")))?
    }

    fn snapshot<T>(&self, f: impl FnOnce(&[ComponentRecord]) -> T) -> StoreResult<T> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(f(&records))
    }
}

/// Parse a log, returning the records and the byte length of the valid prefix.
fn parse_log(content: &str) -> StoreResult<(Vec<ComponentRecord>, usize)> {
    let mut records = Vec::new();
    let mut good_len = 0;
    let chunks: Vec<&str> = content.split_inclusive('\n').collect();
    let last = chunks.len().saturating_sub(1);

    for (idx, chunk) in chunks.iter().enumerate() {
        let line = chunk.trim();
        if line.is_empty() {
            good_len += chunk.len();
            continue;
        }
        match serde_json::from_str::<ComponentRecord>(line) {
            Ok(record) => {
                records.push(record);
                good_len += chunk.len();
            }
            Err(e) if idx == last && !chunk.ends_with('\n') => {
                debug!(line = idx + 1, error = %e, "unterminated trailing line");
                break;
            }
            Err(e) => {
                return Err(StoreError::Corrupt {
                    line: idx + 1,
                    reason: e.to_string(),
                })
            }
        }
    }
    Ok((records, good_len))
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn create(&self, record: NewRecord) -> StoreResult<ComponentRecord> {
        let record = record.into_record();
        let line = encode(&record)?;

        let stored = record.clone();
        self.blocking(move |file, records, sync_mode| {
            append_line(file, &line, sync_mode)?;
            records.write().map_err(poisoned)?.push(stored);
            Ok(())
        })
        .await?;

        debug!(id = %record.id, tuple = %record.tuple, "record appended");
        Ok(record)
    }

    async fn create_unique(&self, record: NewRecord) -> StoreResult<Result<ComponentRecord, ComponentRecord>> {
        self.blocking(move |file, records, sync_mode| {
            let existing = records
                .read()
                .map_err(poisoned)?
                .iter()
                .find(|r| r.matches(&record.tuple))
                .cloned();
            if let Some(existing) = existing {
                return Ok(Err(existing));
            }

            let record = record.into_record();
            append_line(file, &encode(&record)?, sync_mode)?;
            records.write().map_err(poisoned)?.push(record.clone());
            debug!(id = %record.id, tuple = %record.tuple, "unique record appended");
            Ok(Ok(record))
        })
        .await
    }

    async fn find_by_components(&self, tuple: &ComponentTuple) -> StoreResult<Option<ComponentRecord>> {
        self.snapshot(|records| records.iter().find(|r| r.matches(tuple)).cloned())
    }

    async fn find_all_by_components(&self, tuple: &ComponentTuple) -> StoreResult<Vec<ComponentRecord>> {
        self.snapshot(|records| records.iter().filter(|r| r.matches(tuple)).cloned().collect())
    }

    async fn list_all(&self) -> StoreResult<Vec<ComponentRecord>> {
        self.snapshot(|records| records.to_vec())
    }

    async fn clear_all(&self) -> StoreResult<usize> {
        let removed = self
            .blocking(|file, records, _| {
                file.set_len(0)?;
                file.sync_data()?;
                let mut records = records.write().map_err(poisoned)?;
                let removed = records.len();
                records.clear();
                Ok(removed)
            })
            .await?;
        warn!(path = %self.path.display(), removed, "record log cleared");
        Ok(removed)
    }

    async fn count(&self) -> StoreResult<usize> {
        self.snapshot(|records| records.len())
    }
}

impl std::fmt::Debug for FileRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRecordStore")
            .field("path", &self.path)
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmr_types::AssetRefs;

    fn refs(meta: &str) -> AssetRefs {
        AssetRefs::new("ipfs://img", "ipfs://vox", meta)
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let tuple = ComponentTuple::new(6, 29, 394, 400);

        let created = {
            let store = FileRecordStore::open(&path, SyncMode::EveryWrite).unwrap();
            store.create(NewRecord::new(tuple, refs("ipfs://abc"))).await.unwrap()
        };

        let store = FileRecordStore::open(&path, SyncMode::OsDefault).unwrap();
        let found = store.find_by_components(&tuple).await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/records.jsonl");
        let store = FileRecordStore::open(&path, SyncMode::default()).unwrap();
        assert_eq!(store.path(), path.as_path());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn insertion_order_preserved_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let tuple = ComponentTuple::new(1, 1, 1, 1);
        {
            let store = FileRecordStore::open(&path, SyncMode::default()).unwrap();
            store.create(NewRecord::new(tuple, refs("ipfs://first"))).await.unwrap();
            store.create(NewRecord::new(tuple, refs("ipfs://second"))).await.unwrap();
        }
        let store = FileRecordStore::open(&path, SyncMode::default()).unwrap();
        let found = store.find_by_components(&tuple).await.unwrap().unwrap();
        assert_eq!(found.metadata_ref(), "ipfs://first");
        assert_eq!(store.find_all_by_components(&tuple).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn torn_trailing_line_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        {
            let store = FileRecordStore::open(&path, SyncMode::default()).unwrap();
            store.create(NewRecord::draft(ComponentTuple::new(1, 2, 3, 4))).await.unwrap();
        }
        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(br#"{"id":"0190"#).unwrap();
        drop(f);

        let store = FileRecordStore::open(&path, SyncMode::default()).unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        // The torn bytes were cut, so the next append starts on a clean line.
        store.create(NewRecord::draft(ComponentTuple::new(5, 6, 7, 8))).await.unwrap();
        drop(store);
        let reopened = FileRecordStore::open(&path, SyncMode::default()).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unterminated_last_record_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let good = serde_json::to_string(&NewRecord::draft(ComponentTuple::new(1, 1, 1, 1)).into_record()).unwrap();
        fs::write(&path, &good).unwrap();

        let store = FileRecordStore::open(&path, SyncMode::default()).unwrap();
        store.create(NewRecord::draft(ComponentTuple::new(2, 2, 2, 2))).await.unwrap();
        drop(store);
        let reopened = FileRecordStore::open(&path, SyncMode::default()).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
    }

    #[test]
    fn complete_undecodable_last_line_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let mut record = serde_json::to_value(NewRecord::draft(ComponentTuple::new(1, 1, 1, 1)).into_record()).unwrap();
        let good = record.to_string();
        record["wheel"] = serde_json::json!(-1);
        let content = format!("{good}\n{record}\n");
        fs::write(&path, &content).unwrap();

        let err = FileRecordStore::open(&path, SyncMode::default()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { line: 2, .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    /// In-memory log that accepts `accept` more bytes, then fails writes.
    struct FlakyLog {
        data: Vec<u8>,
        accept: usize,
        fail_sync: bool,
    }

    impl Write for FlakyLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.accept == 0 {
                return Err(io::Error::other("no space left on device"));
            }
            let n = buf.len().min(self.accept);
            self.data.extend_from_slice(&buf[..n]);
            self.accept -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogFile for FlakyLog {
        fn byte_len(&self) -> io::Result<u64> {
            Ok(self.data.len() as u64)
        }

        fn truncate_to(&mut self, len: u64) -> io::Result<()> {
            self.data.truncate(len as usize);
            Ok(())
        }

        fn sync(&mut self) -> io::Result<()> {
            if self.fail_sync {
                Err(io::Error::other("sync failed"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn partial_append_is_rolled_back() {
        let mut log = FlakyLog { data: b"{\"a\":1}\n".to_vec(), accept: 5, fail_sync: false };
        let err = append_line(&mut log, b"{\"b\":2}\n", SyncMode::OsDefault).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(log.data, b"{\"a\":1}\n");
    }

    #[test]
    fn failed_sync_is_rolled_back() {
        let mut log = FlakyLog { data: Vec::new(), accept: usize::MAX, fail_sync: true };
        assert!(append_line(&mut log, b"{\"b\":2}\n", SyncMode::EveryWrite).is_err());
        assert!(log.data.is_empty());

        // Without per-write sync the same log accepts the line.
        append_line(&mut log, b"{\"b\":2}\n", SyncMode::OsDefault).unwrap();
        assert_eq!(log.data, b"{\"b\":2}\n");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_create_unique_appends_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let store = Arc::new(FileRecordStore::open(&path, SyncMode::default()).unwrap());
        let tuple = ComponentTuple::new(3, 1, 4, 1);

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let meta = format!("ipfs://{i}");
            handles.push(tokio::spawn(async move {
                store.create_unique(NewRecord::new(tuple, refs(&meta))).await
            }));
        }
        let mut created = 0;
        for h in handles {
            if h.await.unwrap().unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        drop(store);

        let reopened = FileRecordStore::open(&path, SyncMode::default()).unwrap();
        assert_eq!(reopened.find_all_by_components(&tuple).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lookups_do_not_wait_on_writers() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::open(dir.path().join("records.jsonl"), SyncMode::default()).unwrap();
        let tuple = ComponentTuple::new(1, 2, 3, 4);
        store.create(NewRecord::draft(tuple)).await.unwrap();

        // Hold the writer lock as an in-flight append would.
        let _writer = store.file.lock().unwrap();
        let found = tokio::time::timeout(std::time::Duration::from_secs(1), store.find_by_components(&tuple))
            .await
            .expect("lookup blocked behind the writer lock")
            .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn corrupt_middle_line_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let good = serde_json::to_string(&NewRecord::draft(ComponentTuple::new(1, 1, 1, 1)).into_record()).unwrap();
        fs::write(&path, format!("not json\n{good}\n")).unwrap();

        let err = FileRecordStore::open(&path, SyncMode::default()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { line: 1, .. }));
    }

    #[tokio::test]
    async fn clear_truncates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let store = FileRecordStore::open(&path, SyncMode::default()).unwrap();
        store.create(NewRecord::draft(ComponentTuple::new(1, 2, 3, 4))).await.unwrap();
        store.create(NewRecord::draft(ComponentTuple::new(1, 2, 3, 4))).await.unwrap();

        assert_eq!(store.clear_all().await.unwrap(), 2);
        assert!(store.list_all().await.unwrap().is_empty());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);

        // Appends after a clear still land in the log.
        store.create(NewRecord::draft(ComponentTuple::new(9, 9, 9, 9))).await.unwrap();
        drop(store);
        let reopened = FileRecordStore::open(&path, SyncMode::default()).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }

    #[test]
    fn blank_lines_are_ignored() {
        let good = serde_json::to_string(&NewRecord::draft(ComponentTuple::new(1, 1, 1, 1)).into_record()).unwrap();
        let content = format!("\n{good}\n\n");
        let (records, good_len) = parse_log(&content).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(good_len, content.len());
    }
}
