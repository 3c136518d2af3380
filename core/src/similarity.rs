use crate::error::{Result, SearchError};
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One precomputed document pair. Order of `a` and `b` is irrelevant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocSimilarity {
    pub a: DocId,
    pub b: DocId,
    pub similarity: f32,
}

/// Symmetric document-document similarity, loaded rather than computed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTable {
    pairs: BTreeMap<(DocId, DocId), f32>,
}

fn pair_key(a: DocId, b: DocId) -> (DocId, DocId) { (a.min(b), a.max(b)) }

impl SimilarityTable {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, row: DocSimilarity) -> Result<()> {
        if row.a == row.b {
            return Err(SearchError::DataIntegrity(format!("self-similarity for document {}", row.a)));
        }
        if !(0.0..=1.0).contains(&row.similarity) {
            return Err(SearchError::DataIntegrity(format!(
                "similarity {} for ({}, {}) outside [0, 1]",
                row.similarity, row.a, row.b
            )));
        }
        self.pairs.insert(pair_key(row.a, row.b), row.similarity);
        Ok(())
    }

    /// Read JSONL rows `{"a": .., "b": .., "similarity": ..}`. Blank lines are skipped.
    pub fn load_jsonl<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut table = SimilarityTable::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            table.insert(serde_json::from_str(&line)?)?;
        }
        Ok(table)
    }

    pub fn len(&self) -> usize { self.pairs.len() }

    pub fn is_empty(&self) -> bool { self.pairs.is_empty() }

    pub fn similarity(&self, a: DocId, b: DocId) -> Option<f32> { self.pairs.get(&pair_key(a, b)).copied() }

    /// Most similar documents to `doc`, best first, ties by doc id.
    pub fn neighbors(&self, doc: DocId, limit: usize) -> Vec<(DocId, f32)> {
        let mut out: Vec<(DocId, f32)> = self
            .pairs
            .iter()
            .filter_map(|(&(a, b), &s)| match (a == doc, b == doc) {
                (true, _) => Some((b, s)),
                (_, true) => Some((a, s)),
                _ => None,
            })
            .collect();
        out.sort_by(|x, y| y.1.total_cmp(&x.1).then(x.0.cmp(&y.0)));
        out.truncate(limit);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn row(a: DocId, b: DocId, similarity: f32) -> DocSimilarity { DocSimilarity { a, b, similarity } }

    #[test]
    fn symmetric_lookup() {
        let mut t = SimilarityTable::new();
        t.insert(row(2, 1, 0.8)).unwrap();
        assert_eq!(t.similarity(1, 2), Some(0.8));
        assert_eq!(t.similarity(2, 1), Some(0.8));
        assert_eq!(t.similarity(1, 3), None);
    }

    #[test]
    fn rejects_bad_rows() {
        let mut t = SimilarityTable::new();
        assert!(t.insert(row(1, 1, 0.5)).is_err());
        assert!(t.insert(row(1, 2, 1.5)).is_err());
        assert!(t.insert(row(1, 2, f32::NAN)).is_err());
        assert!(t.is_empty());
    }

    #[test]
    fn neighbors_sorted() {
        let mut t = SimilarityTable::new();
        t.insert(row(1, 2, 0.8)).unwrap();
        t.insert(row(1, 3, 0.4)).unwrap();
        t.insert(row(2, 3, 0.5)).unwrap();
        assert_eq!(t.neighbors(3, 10), vec![(2, 0.5), (1, 0.4)]);
        assert_eq!(t.neighbors(1, 1), vec![(2, 0.8)]);
    }

    #[test]
    fn loads_jsonl() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, r#"{{"a": 1, "b": 2, "similarity": 0.8}}"#).unwrap();
        writeln!(f).unwrap();
        writeln!(f, r#"{{"a": 3, "b": 1, "similarity": 0.4}}"#).unwrap();
        let t = SimilarityTable::load_jsonl(f.path()).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.similarity(1, 3), Some(0.4));
    }
}
