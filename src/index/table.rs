//! Clustered table: a unique [`TreeIndex`] over records in a [`RecordStore`].

use std::path::Path;

use tracing::debug;

use crate::common::config::TreeConfig;
use crate::common::{Error, RecordPosition, Result};
use crate::index::{Key, TreeIndex};
use crate::record::{RecordCodec, RecordStore};
use crate::storage::RecordFile;

/// Records keyed by a unique index.
///
/// The index maps each record's key (as named by the codec) to the
/// record's position in the store. Both files are owned by the table.
///
/// # Example
/// ```no_run
/// use bptree_index::{Key, Product, ProductCodec, Table, TreeConfig, KeyType};
///
/// let config = TreeConfig::new(KeyType::Int);
/// let mut table = Table::create("products.idx", "products.dat", ProductCodec, config)?;
/// table.insert(&Product::new(1, "lamp", 19.5))?;
/// assert_eq!(table.get(&Key::Int(1))?.map(|p| p.name), Some("lamp".to_string()));
/// # Ok::<(), bptree_index::Error>(())
/// ```
pub struct Table<C: RecordCodec, S: RecordStore = RecordFile> {
    index: TreeIndex,
    records: S,
    codec: C,
}

impl<C: RecordCodec> Table<C, RecordFile> {
    /// Create a new table backed by fresh index and data files.
    ///
    /// Duplicates are always disabled regardless of `config`.
    pub fn create<P: AsRef<Path>, Q: AsRef<Path>>(
        index_path: P,
        data_path: Q,
        codec: C,
        config: TreeConfig,
    ) -> Result<Self> {
        let config = config.with_duplicates(false);
        let index = TreeIndex::create(index_path, config)?;
        let records = RecordFile::create(data_path, codec.record_size())?;
        Self::with_store(index, records, codec)
    }

    /// Open an existing table.
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(
        index_path: P,
        data_path: Q,
        codec: C,
        config: TreeConfig,
    ) -> Result<Self> {
        let config = config.with_duplicates(false);
        let index = TreeIndex::open(index_path, config)?;
        let records = RecordFile::open(data_path, codec.record_size())?;
        Self::with_store(index, records, codec)
    }

    /// Open the table, creating whichever file is missing.
    pub fn open_or_create<P: AsRef<Path>, Q: AsRef<Path>>(
        index_path: P,
        data_path: Q,
        codec: C,
        config: TreeConfig,
    ) -> Result<Self> {
        let config = config.with_duplicates(false);
        let index = TreeIndex::open_or_create(index_path, config)?;
        let records = RecordFile::open_or_create(data_path, codec.record_size())?;
        Self::with_store(index, records, codec)
    }

    /// Flush both files to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.index.sync()?;
        self.records.sync()
    }
}

impl<C: RecordCodec, S: RecordStore> Table<C, S> {
    /// Assemble a table from parts.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if `index` allows duplicate keys.
    pub fn with_store(index: TreeIndex, records: S, codec: C) -> Result<Self> {
        if index.allows_duplicates() {
            return Err(Error::InvalidConfig(
                "a table needs a unique index".into(),
            ));
        }
        Ok(Self {
            index,
            records,
            codec,
        })
    }

    /// Store `record` and index it under its key.
    ///
    /// # Errors
    /// Returns `Error::DuplicateKey` before anything is written if the key
    /// already exists.
    pub fn insert(&mut self, record: &C::Record) -> Result<RecordPosition> {
        let key = self.codec.key(record);
        if self.index.search(&key)?.is_some() {
            return Err(Error::DuplicateKey(key.to_string()));
        }

        let mut bytes = vec![0u8; self.codec.record_size()];
        self.codec.encode(record, &mut bytes)?;
        let position = self.records.append(&bytes)?;
        self.index.insert(key, position)?;

        debug!(position, "inserted record");
        Ok(position)
    }

    pub fn get(&mut self, key: &Key) -> Result<Option<C::Record>> {
        match self.index.search(key)? {
            Some(position) => self.read(position).map(Some),
            None => Ok(None),
        }
    }

    /// All records stored under `key`; at most one in a unique table.
    pub fn get_all(&mut self, key: &Key) -> Result<Vec<C::Record>> {
        let positions = self.index.search_all(key)?;
        self.read_all(positions)
    }

    /// Records with keys in `low..=high`, in key order.
    pub fn range(&mut self, low: &Key, high: &Key) -> Result<Vec<C::Record>> {
        let positions = self.index.range_search(low, high)?;
        self.read_all(positions)
    }

    /// Every record in key order.
    pub fn scan(&mut self) -> Result<Vec<C::Record>> {
        let positions = self
            .index
            .entries()?
            .into_iter()
            .map(|(_, position)| position)
            .collect();
        self.read_all(positions)
    }

    /// Remove the record stored under `key`. Returns `false` if absent.
    pub fn delete(&mut self, key: &Key) -> Result<bool> {
        let Some(position) = self.index.remove(key)? else {
            return Ok(false);
        };
        self.records.remove(position)?;
        debug!(position, "deleted record");
        Ok(true)
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn index(&self) -> &TreeIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut TreeIndex {
        &mut self.index
    }

    pub fn records(&self) -> &S {
        &self.records
    }

    fn read(&mut self, position: RecordPosition) -> Result<C::Record> {
        let bytes = self.records.read(position)?;
        self.codec.decode(&bytes)
    }

    fn read_all(&mut self, positions: Vec<RecordPosition>) -> Result<Vec<C::Record>> {
        positions.into_iter().map(|p| self.read(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::KeyType;
    use crate::record::{Product, ProductCodec};
    use tempfile::tempdir;

    fn table(dir: &tempfile::TempDir) -> Table<ProductCodec> {
        Table::create(
            dir.path().join("products.idx"),
            dir.path().join("products.dat"),
            ProductCodec,
            TreeConfig::new(KeyType::Int).with_order(4),
        )
        .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let dir = tempdir().unwrap();
        let mut table = table(&dir);

        table.insert(&Product::new(2, "desk", 120.0)).unwrap();
        table.insert(&Product::new(1, "lamp", 19.5)).unwrap();

        assert_eq!(table.get(&Key::Int(1)).unwrap(), Some(Product::new(1, "lamp", 19.5)));
        assert_eq!(table.get(&Key::Int(3)).unwrap(), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_duplicate_writes_nothing() {
        let dir = tempdir().unwrap();
        let mut table = table(&dir);
        table.insert(&Product::new(1, "lamp", 19.5)).unwrap();

        let err = table.insert(&Product::new(1, "other", 1.0)).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));
        assert_eq!(table.len(), 1);
        assert_eq!(table.records().slot_count(), 1);
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let mut table = table(&dir);
        for id in 1..=5 {
            table.insert(&Product::new(id, format!("item{}", id), id as f32)).unwrap();
        }

        assert!(table.delete(&Key::Int(3)).unwrap());
        assert!(!table.delete(&Key::Int(3)).unwrap());
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(&Key::Int(3)).unwrap(), None);

        let ids: Vec<i32> = table.scan().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 4, 5]);
    }

    #[test]
    fn test_range_and_get_all() {
        let dir = tempdir().unwrap();
        let mut table = table(&dir);
        for id in [50, 10, 40, 20, 30] {
            table.insert(&Product::new(id, "x", 0.0)).unwrap();
        }

        let ids: Vec<i32> = table
            .range(&Key::Int(15), &Key::Int(40))
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![20, 30, 40]);
        assert_eq!(table.get_all(&Key::Int(10)).unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_duplicate_index() {
        let dir = tempdir().unwrap();
        let config = TreeConfig::new(KeyType::Int).with_duplicates(true);
        let index = TreeIndex::create(dir.path().join("i.idx"), config).unwrap();
        let records = RecordFile::create(dir.path().join("d.dat"), ProductCodec::SIZE).unwrap();

        let result = Table::with_store(index, records, ProductCodec);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
