use crate::bm25::{self, Bm25Params, ScoredDoc};
use crate::cooccur::{self, Cooccurrence};
use crate::corpus::{BuildOptions, Corpus, Document, RawDocument};
use crate::entropy::{document_entropy, Quartile, QuartileBounds};
use crate::error::{Result, SearchError};
use crate::index::InvertedIndex;
use crate::keywords::KeywordSet;
use crate::similarity::SimilarityTable;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A complete, immutable build of the corpus and everything derived from it.
/// Readers hold one snapshot for the whole of a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub generation: u64,
    pub corpus: Corpus,
    pub index: InvertedIndex,
    /// Reference quartile cut points over the full corpus; `None` when no
    /// document has a defined entropy.
    pub bounds: Option<QuartileBounds>,
    pub keywords: KeywordSet,
    pub similarities: SimilarityTable,
}

impl IndexSnapshot {
    pub fn build(raw: Vec<RawDocument>, opts: &BuildOptions) -> Result<Self> {
        let corpus = Corpus::build(raw, opts)?;
        let index = InvertedIndex::build(&corpus);
        let bounds = QuartileBounds::for_corpus(&corpus, &index);
        tracing::info!(
            num_docs = index.num_docs,
            num_terms = index.num_terms(),
            avgdl = index.avgdl,
            "index built"
        );
        Ok(IndexSnapshot { generation: 0, corpus, index, bounds, keywords: KeywordSet::All, similarities: SimilarityTable::new() })
    }

    pub fn document(&self, id: DocId) -> Result<&Document> {
        self.corpus.documents.get(id).ok_or_else(|| SearchError::not_found("document", id))
    }

    pub fn rank<I, S>(&self, query_terms: I, limit: usize, params: Bm25Params) -> Result<Vec<ScoredDoc>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        bm25::rank(&self.corpus, &self.index, query_terms, limit, params)
    }

    pub fn entropy(&self, id: DocId) -> Result<Option<f64>> {
        self.document(id)?;
        Ok(document_entropy(&self.corpus, &self.index, id))
    }

    pub fn quartile(&self, id: DocId) -> Result<Quartile> {
        let quartile = match (self.entropy(id)?, self.bounds) {
            (Some(h), Some(bounds)) => bounds.quartile(h),
            _ => Quartile::Unknown,
        };
        Ok(quartile)
    }

    pub fn classify(&self, doc_ids: &BTreeSet<DocId>) -> Result<BTreeMap<DocId, Quartile>> {
        doc_ids.iter().map(|&id| self.quartile(id).map(|q| (id, q))).collect()
    }

    pub fn cooccur<S: AsRef<str>>(&self, keywords: &[S]) -> Vec<Cooccurrence> {
        cooccur::cooccur(&self.corpus, &self.index, &self.keywords, keywords)
    }
}
