//! RocksDB wrapper with one column family per schema namespace

use crate::error::{StorageError, StorageResult};
use crate::schema::ALL_NAMESPACES;
use crate::traits::KvStore;
use parking_lot::RwLock;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options,
    WriteBatch,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

type RocksDB = DBWithThreadMode<MultiThreaded>;

/// Database configuration
#[derive(Clone, Debug)]
pub struct DbConfig {
    /// Create database if missing
    pub create_if_missing: bool,
    /// Maximum number of open files
    pub max_open_files: i32,
    /// Write buffer size
    pub write_buffer_size: usize,
    /// Maximum write buffers
    pub max_write_buffer_number: i32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            max_open_files: 512,
            write_buffer_size: 64 * 1024 * 1024, // 64MB
            max_write_buffer_number: 3,
        }
    }
}

/// Staged key-value mutation
struct StagedOp {
    namespace: String,
    key: Vec<u8>,
    value: Vec<u8>,
    /// Conditional insert: commit fails if the key is already present
    if_not_exists: bool,
    /// Surfaced when this operation rejects the commit
    message: String,
}

/// A staged sequence of mutations that commits atomically.
///
/// Every operation carries a human-readable failure message; a conditional
/// insert that collides rejects the whole batch with its message.
#[derive(Default)]
pub struct Batch {
    ops: Vec<StagedOp>,
}

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Stage an unconditional write
    pub fn put(
        &mut self,
        namespace: &str,
        key: Vec<u8>,
        value: Vec<u8>,
        message: impl Into<String>,
    ) {
        self.ops.push(StagedOp {
            namespace: namespace.to_string(),
            key,
            value,
            if_not_exists: false,
            message: message.into(),
        });
    }

    /// Stage a conditional insert
    pub fn put_if_not_exists(
        &mut self,
        namespace: &str,
        key: Vec<u8>,
        value: Vec<u8>,
        message: impl Into<String>,
    ) {
        self.ops.push(StagedOp {
            namespace: namespace.to_string(),
            key,
            value,
            if_not_exists: true,
            message: message.into(),
        });
    }

    /// Number of staged operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if the batch is empty
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// RocksDB wrapper exposing the schema namespaces as column families
pub struct Database {
    db: Arc<RwLock<Option<RocksDB>>>,
    path: String,
    config: DbConfig,
}

impl Database {
    /// Create a new database instance (not yet opened)
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_config(path, DbConfig::default())
    }

    /// Create a new database instance with a custom config
    pub fn with_config(path: impl AsRef<Path>, config: DbConfig) -> Self {
        Self {
            db: Arc::new(RwLock::new(None)),
            path: path.as_ref().to_string_lossy().to_string(),
            config,
        }
    }

    /// Check if the database is open
    pub fn is_open(&self) -> bool {
        self.db.read().is_some()
    }

    /// Get the database path
    pub fn path(&self) -> &str {
        &self.path
    }

    fn cf<'a>(&self, db: &'a RocksDB, name: &str) -> StorageResult<Arc<BoundColumnFamily<'a>>> {
        db.cf_handle(name)
            .ok_or_else(|| StorageError::InvalidNamespace(name.to_string()))
    }
}

impl KvStore for Database {
    fn open(&self) -> StorageResult<()> {
        let mut db_guard = self.db.write();
        if db_guard.is_some() {
            return Err(StorageError::AlreadyOpen);
        }

        let mut opts = Options::default();
        opts.create_if_missing(self.config.create_if_missing);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(self.config.max_open_files);
        opts.set_write_buffer_size(self.config.write_buffer_size);
        opts.set_max_write_buffer_number(self.config.max_write_buffer_number);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_NAMESPACES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = RocksDB::open_cf_descriptors(&opts, &self.path, cf_descriptors)?;
        *db_guard = Some(db);
        Ok(())
    }

    fn close(&self) {
        let mut db_guard = self.db.write();
        *db_guard = None;
    }

    fn get(&self, namespace: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let db_guard = self.db.read();
        let db = db_guard.as_ref().ok_or(StorageError::NotOpen)?;
        let cf = self.cf(db, namespace)?;
        Ok(db.get_cf(&cf, key)?)
    }

    fn put(&self, namespace: &str, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let db_guard = self.db.read();
        let db = db_guard.as_ref().ok_or(StorageError::NotOpen)?;
        let cf = self.cf(db, namespace)?;
        db.put_cf(&cf, key, value)?;
        Ok(())
    }

    fn put_if_not_exists(&self, namespace: &str, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let db_guard = self.db.read();
        let db = db_guard.as_ref().ok_or(StorageError::NotOpen)?;
        let cf = self.cf(db, namespace)?;
        // Single-writer contract: nothing may interleave between the
        // check and the write.
        if db.get_cf(&cf, key)?.is_some() {
            return Err(StorageError::AlreadyExists);
        }
        db.put_cf(&cf, key, value)?;
        Ok(())
    }

    fn write_batch(&self, batch: Batch) -> StorageResult<()> {
        let db_guard = self.db.read();
        let db = db_guard.as_ref().ok_or(StorageError::NotOpen)?;

        // Validate conditional inserts against the store and against
        // earlier operations in this batch, then apply in one write.
        let mut rocks_batch = WriteBatch::default();
        let mut staged: HashSet<(String, Vec<u8>)> = HashSet::new();
        for op in batch.ops {
            let cf = self.cf(db, &op.namespace)?;
            let staged_key = (op.namespace, op.key);
            if op.if_not_exists
                && (staged.contains(&staged_key) || db.get_cf(&cf, &staged_key.1)?.is_some())
            {
                return Err(StorageError::BatchCommit(op.message));
            }
            rocks_batch.put_cf(&cf, &staged_key.1, &op.value);
            staged.insert(staged_key);
        }

        db.write(rocks_batch)
            .map_err(|e| StorageError::BatchCommit(e.to_string()))?;
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            path: self.path.clone(),
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ns;
    use std::fs;

    fn temp_db_path() -> String {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let cnt = COUNTER.fetch_add(1, Ordering::SeqCst);
        format!("/tmp/ravel_db_test_{}_{}", id, cnt)
    }

    fn cleanup(path: &str) {
        let _ = fs::remove_dir_all(path);
    }

    #[test]
    fn test_open_close() {
        let path = temp_db_path();
        let db = Database::new(&path);

        assert!(!db.is_open());
        db.open().unwrap();
        assert!(db.is_open());
        assert!(matches!(db.open(), Err(StorageError::AlreadyOpen)));
        db.close();
        assert!(!db.is_open());

        cleanup(&path);
    }

    #[test]
    fn test_not_open_errors() {
        let db = Database::new("/tmp/ravel_db_never_opened");
        assert!(matches!(
            db.get(ns::BLOCKS, b"key"),
            Err(StorageError::NotOpen)
        ));
        assert!(matches!(
            db.put(ns::BLOCKS, b"key", b"value"),
            Err(StorageError::NotOpen)
        ));
        assert!(matches!(
            db.write_batch(Batch::new()),
            Err(StorageError::NotOpen)
        ));
    }

    #[test]
    fn test_put_get() {
        let path = temp_db_path();
        let db = Database::new(&path);
        db.open().unwrap();

        db.put(ns::BLOCKS, b"key1", b"value1").unwrap();
        assert_eq!(db.get(ns::BLOCKS, b"key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(db.get(ns::BLOCKS, b"missing").unwrap(), None);

        db.close();
        cleanup(&path);
    }

    #[test]
    fn test_put_overwrites() {
        let path = temp_db_path();
        let db = Database::new(&path);
        db.open().unwrap();

        db.put(ns::BLOCKS, b"key1", b"original").unwrap();
        db.put(ns::BLOCKS, b"key1", b"updated").unwrap();
        assert_eq!(db.get(ns::BLOCKS, b"key1").unwrap(), Some(b"updated".to_vec()));

        db.close();
        cleanup(&path);
    }

    #[test]
    fn test_put_if_not_exists() {
        let path = temp_db_path();
        let db = Database::new(&path);
        db.open().unwrap();

        db.put_if_not_exists(ns::BLOCKS, b"key1", b"first").unwrap();
        let result = db.put_if_not_exists(ns::BLOCKS, b"key1", b"second");
        assert!(matches!(result, Err(StorageError::AlreadyExists)));
        assert_eq!(db.get(ns::BLOCKS, b"key1").unwrap(), Some(b"first".to_vec()));

        db.close();
        cleanup(&path);
    }

    #[test]
    fn test_namespace_isolation() {
        let path = temp_db_path();
        let db = Database::new(&path);
        db.open().unwrap();

        db.put(ns::BLOCKS, b"same_key", b"blocks_value").unwrap();
        db.put(ns::TRANSFER_BLOCK, b"same_key", b"transfer_value").unwrap();

        assert_eq!(
            db.get(ns::BLOCKS, b"same_key").unwrap(),
            Some(b"blocks_value".to_vec())
        );
        assert_eq!(
            db.get(ns::TRANSFER_BLOCK, b"same_key").unwrap(),
            Some(b"transfer_value".to_vec())
        );
        assert_eq!(db.get(ns::VOTE_BLOCK, b"same_key").unwrap(), None);

        db.close();
        cleanup(&path);
    }

    #[test]
    fn test_all_namespaces_usable() {
        let path = temp_db_path();
        let db = Database::new(&path);
        db.open().unwrap();

        for namespace in ALL_NAMESPACES {
            db.put(namespace, b"test_key", b"test_value").unwrap();
            assert_eq!(
                db.get(namespace, b"test_key").unwrap(),
                Some(b"test_value".to_vec())
            );
        }

        db.close();
        cleanup(&path);
    }

    #[test]
    fn test_unknown_namespace() {
        let path = temp_db_path();
        let db = Database::new(&path);
        db.open().unwrap();

        assert!(matches!(
            db.get("no-such-namespace", b"key"),
            Err(StorageError::InvalidNamespace(_))
        ));

        db.close();
        cleanup(&path);
    }

    #[test]
    fn test_write_batch_applies_all() {
        let path = temp_db_path();
        let db = Database::new(&path);
        db.open().unwrap();

        let mut batch = Batch::new();
        batch.put(ns::BLOCKS, b"a".to_vec(), b"1".to_vec(), "failed to put a");
        batch.put(ns::BLOCKS, b"b".to_vec(), b"2".to_vec(), "failed to put b");
        batch.put(
            ns::TRANSFER_BLOCK,
            b"c".to_vec(),
            b"3".to_vec(),
            "failed to put c",
        );
        assert_eq!(batch.len(), 3);
        db.write_batch(batch).unwrap();

        assert_eq!(db.get(ns::BLOCKS, b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(db.get(ns::BLOCKS, b"b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(db.get(ns::TRANSFER_BLOCK, b"c").unwrap(), Some(b"3".to_vec()));

        db.close();
        cleanup(&path);
    }

    #[test]
    fn test_write_batch_conditional_collision_rejects_all() {
        let path = temp_db_path();
        let db = Database::new(&path);
        db.open().unwrap();

        db.put(ns::BLOCKS, b"existing", b"old").unwrap();

        let mut batch = Batch::new();
        batch.put(ns::BLOCKS, b"fresh".to_vec(), b"1".to_vec(), "failed to put fresh");
        batch.put_if_not_exists(
            ns::BLOCKS,
            b"existing".to_vec(),
            b"new".to_vec(),
            "existing key collided",
        );
        let result = db.write_batch(batch);
        match result {
            Err(StorageError::BatchCommit(msg)) => assert_eq!(msg, "existing key collided"),
            other => panic!("expected BatchCommit, got {:?}", other.err()),
        }

        // Nothing from the rejected batch is visible.
        assert_eq!(db.get(ns::BLOCKS, b"fresh").unwrap(), None);
        assert_eq!(db.get(ns::BLOCKS, b"existing").unwrap(), Some(b"old".to_vec()));

        db.close();
        cleanup(&path);
    }

    #[test]
    fn test_write_batch_conditional_collision_within_batch() {
        let path = temp_db_path();
        let db = Database::new(&path);
        db.open().unwrap();

        let mut batch = Batch::new();
        batch.put(ns::BLOCKS, b"key".to_vec(), b"1".to_vec(), "failed to put");
        batch.put_if_not_exists(
            ns::BLOCKS,
            b"key".to_vec(),
            b"2".to_vec(),
            "staged key collided",
        );
        assert!(matches!(
            db.write_batch(batch),
            Err(StorageError::BatchCommit(_))
        ));
        assert_eq!(db.get(ns::BLOCKS, b"key").unwrap(), None);

        db.close();
        cleanup(&path);
    }

    #[test]
    fn test_write_batch_conditional_insert_succeeds_when_absent() {
        let path = temp_db_path();
        let db = Database::new(&path);
        db.open().unwrap();

        let mut batch = Batch::new();
        batch.put_if_not_exists(ns::BLOCKS, b"key".to_vec(), b"1".to_vec(), "collision");
        db.write_batch(batch).unwrap();
        assert_eq!(db.get(ns::BLOCKS, b"key").unwrap(), Some(b"1".to_vec()));

        db.close();
        cleanup(&path);
    }

    #[test]
    fn test_batch_default_is_empty() {
        let batch = Batch::default();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }

    #[test]
    fn test_reopen_persists_data() {
        let path = temp_db_path();
        let db = Database::new(&path);

        db.open().unwrap();
        db.put(ns::BLOCKS, b"key1", b"value1").unwrap();
        db.close();

        db.open().unwrap();
        assert_eq!(db.get(ns::BLOCKS, b"key1").unwrap(), Some(b"value1".to_vec()));
        db.close();

        cleanup(&path);
    }

    #[test]
    fn test_clone_shares_handle() {
        let path = temp_db_path();
        let db = Database::new(&path);
        db.open().unwrap();

        let db_clone = db.clone();
        db.put(ns::BLOCKS, b"key1", b"value1").unwrap();
        assert_eq!(
            db_clone.get(ns::BLOCKS, b"key1").unwrap(),
            Some(b"value1".to_vec())
        );

        db.close();
        cleanup(&path);
    }
}
