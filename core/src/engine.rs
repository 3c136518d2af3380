use crate::bm25::{Bm25Params, ScoredDoc};
use crate::clicks::{ClickStore, ClickTracker, MemoryClickStore};
use crate::config::SearchConfig;
use crate::cooccur::Cooccurrence;
use crate::corpus::{BuildOptions, Document, RawDocument};
use crate::entropy::Quartile;
use crate::error::Result;
use crate::keywords::{DocumentKeyword, KeywordSet};
use crate::similarity::SimilarityTable;
use crate::snapshot::IndexSnapshot;
use crate::{CategoryId, DocId, KeywordId};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub text: String,
    pub dataset: String,
    pub category_id: CategoryId,
    pub quartile: Quartile,
    pub clicks: BTreeMap<String, u64>,
}

pub struct SearchEngine<S: ClickStore = MemoryClickStore> {
    snapshot: RwLock<Arc<IndexSnapshot>>,
    clicks: ClickTracker<S>,
    params: Bm25Params,
    limit: usize,
}

impl SearchEngine<MemoryClickStore> {
    pub fn in_memory(config: &SearchConfig) -> Result<Self> { Self::new(config, MemoryClickStore::new()) }
}

impl<S: ClickStore> SearchEngine<S> {
    pub fn new(config: &SearchConfig, store: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            snapshot: RwLock::new(Arc::new(IndexSnapshot::default())),
            clicks: ClickTracker::new(store),
            params: config.bm25(),
            limit: config.limit,
        })
    }

    pub fn snapshot(&self) -> Arc<IndexSnapshot> { self.snapshot.read().clone() }

    pub fn click_store(&self) -> &S { self.clicks.store() }

    /// Build a new index from raw documents and swap it in. On error the
    /// current index is left untouched. Returns the new generation.
    pub fn build_index(&self, raw: Vec<RawDocument>, opts: &BuildOptions) -> Result<u64> {
        let built = IndexSnapshot::build(raw, opts)?;
        Ok(self.install(built))
    }

    /// Swap in a complete snapshot, carrying over keyword designations (by
    /// term text) and the similarity table when the new snapshot has none.
    pub fn install(&self, mut next: IndexSnapshot) -> u64 {
        let mut current = self.snapshot.write();
        if let KeywordSet::Designated(ids) = &current.keywords {
            if next.keywords == KeywordSet::All {
                let mut carried = BTreeSet::new();
                for &id in ids {
                    let mapped = current.corpus.lexicon.term(id).and_then(|t| next.corpus.lexicon.id(t));
                    match mapped {
                        Some(new_id) => {
                            carried.insert(new_id);
                        }
                        None => tracing::warn!(keyword_id = id, "designated keyword dropped by rebuild"),
                    }
                }
                next.keywords = KeywordSet::Designated(carried);
            }
        }
        if next.similarities.is_empty() {
            next.similarities = current.similarities.clone();
        }
        next.generation = current.generation + 1;
        let generation = next.generation;
        *current = Arc::new(next);
        tracing::info!(generation, "index snapshot swapped in");
        generation
    }

    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut IndexSnapshot) -> Result<()>,
    {
        let mut current = self.snapshot.write();
        let mut next = (**current).clone();
        f(&mut next)?;
        *current = Arc::new(next);
        Ok(())
    }

    /// Restrict clickthrough tracking to the given terms.
    pub fn designate_keywords<T: AsRef<str>>(&self, terms: &[T]) -> Result<()> {
        self.update(|s| {
            s.keywords = KeywordSet::designate(&s.corpus.lexicon, terms)?;
            Ok(())
        })
    }

    /// Make every lexicon term a keyword again.
    pub fn clear_keywords(&self) -> Result<()> {
        self.update(|s| {
            s.keywords = KeywordSet::All;
            Ok(())
        })
    }

    pub fn load_similarities(&self, table: SimilarityTable) -> Result<()> {
        self.update(|s| {
            s.similarities = table;
            Ok(())
        })
    }

    pub fn document(&self, id: DocId) -> Result<Document> { Ok(self.snapshot().document(id)?.clone()) }

    pub fn document_keywords(&self, id: DocId) -> Result<Vec<DocumentKeyword>> {
        let snap = self.snapshot();
        snap.keywords.document_keywords(&snap.corpus, id)
    }

    pub fn rank<I, T>(&self, query_terms: I) -> Result<Vec<ScoredDoc>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.rank_with_limit(query_terms, self.limit)
    }

    pub fn rank_with_limit<I, T>(&self, query_terms: I, limit: usize) -> Result<Vec<ScoredDoc>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.snapshot().rank(query_terms, limit, self.params)
    }

    pub fn classify(&self, doc_ids: &BTreeSet<DocId>) -> Result<BTreeMap<DocId, Quartile>> {
        self.snapshot().classify(doc_ids)
    }

    pub fn cooccur<T: AsRef<str>>(&self, keywords: &[T]) -> Vec<Cooccurrence> { self.snapshot().cooccur(keywords) }

    pub fn resolve_keywords<T: AsRef<str>>(&self, texts: &[T]) -> Result<Vec<KeywordId>> {
        let snap = self.snapshot();
        snap.keywords.resolve(&snap.corpus.lexicon, texts)
    }

    pub fn record_click(&self, doc: DocId, keyword_ids: &BTreeSet<KeywordId>) -> Result<()> {
        self.clicks.record_click(&self.snapshot(), doc, keyword_ids)
    }

    pub fn get_clicks(&self, doc_ids: &BTreeSet<DocId>) -> Result<BTreeMap<DocId, BTreeMap<String, u64>>> {
        self.clicks.get_clicks(&self.snapshot(), doc_ids)
    }

    pub fn similar(&self, doc: DocId, limit: usize) -> Result<Vec<(DocId, f32)>> {
        let snap = self.snapshot();
        snap.document(doc)?;
        Ok(snap.similarities.neighbors(doc, limit))
    }

    /// Rank the accumulated keywords and decorate each hit from one snapshot.
    pub fn search<T: AsRef<str>>(&self, keywords: &[T], quartile: Option<Quartile>) -> Result<Vec<SearchHit>> {
        let snap = self.snapshot();
        let ranked = snap.rank(keywords, self.limit, self.params)?;
        let ids: BTreeSet<DocId> = ranked.iter().map(|r| r.doc_id).collect();
        let quartiles = snap.classify(&ids)?;
        let mut clicks = self.clicks.get_clicks(&snap, &ids)?;

        let mut hits = Vec::with_capacity(ranked.len());
        for r in ranked {
            let q = quartiles.get(&r.doc_id).copied().unwrap_or(Quartile::Unknown);
            if quartile.is_some_and(|want| want != q) {
                continue;
            }
            let doc = snap.document(r.doc_id)?;
            hits.push(SearchHit {
                doc_id: r.doc_id,
                score: r.score,
                text: doc.text.clone(),
                dataset: doc.dataset.clone(),
                category_id: doc.category_id,
                quartile: q,
                clicks: clicks.remove(&r.doc_id).unwrap_or_default(),
            });
        }
        Ok(hits)
    }
}
