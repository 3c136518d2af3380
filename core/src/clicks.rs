use crate::error::{Result, SearchError};
use crate::snapshot::IndexSnapshot;
use crate::{DocId, KeywordId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Click counts keyed by document id and keyword text. Text, not term id, so
/// counts stay attached to the right keyword across index rebuilds.
pub trait ClickStore: Send + Sync {
    fn increment(&self, doc: DocId, keyword: &str) -> Result<u64>;

    fn count(&self, doc: DocId, keyword: &str) -> Result<u64>;

    fn clicks_for(&self, doc: DocId) -> Result<Vec<(String, u64)>>;

    fn flush(&self) -> Result<()> { Ok(()) }
}

#[derive(Debug, Default)]
pub struct MemoryClickStore {
    counts: RwLock<BTreeMap<(DocId, String), AtomicU64>>,
}

impl MemoryClickStore {
    pub fn new() -> Self { Self::default() }
}

impl ClickStore for MemoryClickStore {
    fn increment(&self, doc: DocId, keyword: &str) -> Result<u64> {
        let key = (doc, keyword.to_owned());
        {
            let counts = self.counts.read();
            if let Some(c) = counts.get(&key) {
                return Ok(c.fetch_add(1, Ordering::SeqCst) + 1);
            }
        }
        let mut counts = self.counts.write();
        let c = counts.entry(key).or_insert_with(|| AtomicU64::new(0));
        Ok(c.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn count(&self, doc: DocId, keyword: &str) -> Result<u64> {
        let counts = self.counts.read();
        Ok(counts.get(&(doc, keyword.to_owned())).map(|c| c.load(Ordering::SeqCst)).unwrap_or(0))
    }

    fn clicks_for(&self, doc: DocId) -> Result<Vec<(String, u64)>> {
        let counts = self.counts.read();
        Ok(counts
            .range((Bound::Included((doc, String::new())), Bound::Unbounded))
            .take_while(|((d, _), _)| *d == doc)
            .map(|((_, kw), c)| (kw.clone(), c.load(Ordering::SeqCst)))
            .collect())
    }
}

/// Durable store on sled. Keys are the big-endian doc id followed by the
/// keyword's UTF-8 bytes; values are big-endian u64 counts.
pub struct SledClickStore {
    db: sled::Db,
}

fn click_key(doc: DocId, keyword: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + keyword.len());
    key.extend_from_slice(&doc.to_be_bytes());
    key.extend_from_slice(keyword.as_bytes());
    key
}

fn decode_count(bytes: &[u8]) -> Result<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| SearchError::DataIntegrity(format!("click count has {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(arr))
}

impl SledClickStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self { db: sled::open(path)? })
    }

    pub fn temporary() -> Result<Self> {
        Ok(Self { db: sled::Config::new().temporary(true).open()? })
    }
}

impl ClickStore for SledClickStore {
    fn increment(&self, doc: DocId, keyword: &str) -> Result<u64> {
        let key = click_key(doc, keyword);
        loop {
            let old = self.db.get(&key)?;
            let prev = match &old {
                Some(bytes) => decode_count(bytes)?,
                None => 0,
            };
            let next = prev + 1;
            // Lost race: another writer changed the count, read it again.
            if self.db.compare_and_swap(&key, old, Some(next.to_be_bytes().to_vec()))?.is_ok() {
                return Ok(next);
            }
        }
    }

    fn count(&self, doc: DocId, keyword: &str) -> Result<u64> {
        match self.db.get(click_key(doc, keyword))? {
            Some(bytes) => decode_count(&bytes),
            None => Ok(0),
        }
    }

    fn clicks_for(&self, doc: DocId) -> Result<Vec<(String, u64)>> {
        let mut out = Vec::new();
        for item in self.db.scan_prefix(doc.to_be_bytes()) {
            let (key, value) = item?;
            let keyword = std::str::from_utf8(&key[4..])
                .map_err(|e| SearchError::DataIntegrity(format!("click key for document {doc}: {e}")))?;
            out.push((keyword.to_owned(), decode_count(&value)?));
        }
        Ok(out)
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

pub struct ClickTracker<S> {
    store: S,
}

impl<S: ClickStore> ClickTracker<S> {
    pub fn new(store: S) -> Self { Self { store } }

    pub fn store(&self) -> &S { &self.store }

    /// One click on `doc` for each keyword. All ids are checked first, so an
    /// unknown document or keyword leaves every count untouched.
    pub fn record_click(&self, snapshot: &IndexSnapshot, doc: DocId, keyword_ids: &BTreeSet<KeywordId>) -> Result<()> {
        if !snapshot.corpus.documents.contains(doc) {
            return Err(SearchError::not_found("document", doc));
        }
        let lexicon = &snapshot.corpus.lexicon;
        let keywords = keyword_ids
            .iter()
            .map(|&kw| match lexicon.term(kw) {
                Some(term) if snapshot.keywords.contains(lexicon, kw) => Ok(term),
                _ => Err(SearchError::not_found("keyword", kw)),
            })
            .collect::<Result<Vec<_>>>()?;
        for keyword in keywords {
            let clicks = self.store.increment(doc, keyword)?;
            tracing::debug!(doc_id = doc, keyword, clicks, "click recorded");
        }
        Ok(())
    }

    pub fn get_clicks(
        &self,
        snapshot: &IndexSnapshot,
        doc_ids: &BTreeSet<DocId>,
    ) -> Result<BTreeMap<DocId, BTreeMap<String, u64>>> {
        let mut out = BTreeMap::new();
        for &doc in doc_ids {
            if !snapshot.corpus.documents.contains(doc) {
                return Err(SearchError::not_found("document", doc));
            }
            out.insert(doc, self.store.clicks_for(doc)?.into_iter().collect());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn ClickStore) {
        assert_eq!(store.count(1, "gene").unwrap(), 0);
        assert_eq!(store.increment(1, "gene").unwrap(), 1);
        assert_eq!(store.increment(1, "gene").unwrap(), 2);
        store.increment(1, "alpha").unwrap();
        store.increment(2, "gene").unwrap();
        assert_eq!(store.clicks_for(1).unwrap(), vec![("alpha".to_string(), 1), ("gene".to_string(), 2)]);
        assert_eq!(store.clicks_for(2).unwrap(), vec![("gene".to_string(), 1)]);
        assert!(store.clicks_for(3).unwrap().is_empty());
    }

    #[test]
    fn memory_store_counts() {
        exercise(&MemoryClickStore::new());
    }

    #[test]
    fn memory_store_last_document_id() {
        let store = MemoryClickStore::new();
        store.increment(DocId::MAX, "gene").unwrap();
        assert_eq!(store.clicks_for(DocId::MAX).unwrap(), vec![("gene".to_string(), 1)]);
    }

    #[test]
    fn sled_store_counts() {
        exercise(&SledClickStore::temporary().unwrap());
    }

    #[test]
    fn sled_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledClickStore::open(dir.path()).unwrap();
            store.increment(7, "risk").unwrap();
            store.increment(7, "risk").unwrap();
            store.flush().unwrap();
        }
        let store = SledClickStore::open(dir.path()).unwrap();
        assert_eq!(store.count(7, "risk").unwrap(), 2);
    }

    #[test]
    fn sled_increment_refuses_corrupt_count() {
        let store = SledClickStore::temporary().unwrap();
        store.db.insert(click_key(4, "gene"), &[1u8, 2, 3][..]).unwrap();
        let err = store.increment(4, "gene").unwrap_err();
        assert!(matches!(err, SearchError::DataIntegrity(_)));
        // The bad value is left as it was.
        let stored = store.db.get(click_key(4, "gene")).unwrap().unwrap();
        assert_eq!(&*stored, &[1u8, 2, 3][..]);
    }

    #[test]
    fn keys_group_by_document() {
        assert!(click_key(1, "zeta") < click_key(2, "alpha"));
        assert!(decode_count(&[1, 2, 3]).is_err());
    }
}
