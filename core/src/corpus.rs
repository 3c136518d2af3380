use crate::error::{Result, SearchError};
use crate::tokenizer::tokenize;
use crate::{CategoryId, DocId, TermId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: DocId,
    pub text: String,
    pub category_id: CategoryId,
    pub dataset: String,
}

impl RawDocument {
    pub fn new(id: DocId, text: impl Into<String>, category_id: CategoryId, dataset: impl Into<String>) -> Self {
        Self { id, text: text.into(), category_id, dataset: dataset.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub text: String,
    pub category_id: CategoryId,
    pub dataset: String,
    pub length: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Keep documents with no tokens (length 0) instead of failing the build.
    pub allow_empty: bool,
}

/// Term text <-> term id. Ids are dense and assigned in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lexicon {
    dictionary: HashMap<String, TermId>,
    terms: Vec<String>,
}

impl Lexicon {
    fn intern(&mut self, term: String) -> TermId {
        if let Some(&id) = self.dictionary.get(&term) {
            return id;
        }
        let id = self.terms.len() as TermId;
        self.terms.push(term.clone());
        self.dictionary.insert(term, id);
        id
    }

    pub fn id(&self, term: &str) -> Option<TermId> { self.dictionary.get(term).copied() }

    pub fn term(&self, id: TermId) -> Option<&str> { self.terms.get(id as usize).map(String::as_str) }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (TermId, &str)> {
        self.terms.iter().enumerate().map(|(i, t)| (i as TermId, t.as_str()))
    }
}

/// Documents plus their term-frequency vectors, keyed by document id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStore {
    docs: BTreeMap<DocId, Document>,
    /// Per document, (term, count) sorted by term id.
    term_freqs: BTreeMap<DocId, Vec<(TermId, u32)>>,
    total_length: u64,
}

impl DocumentStore {
    pub fn get(&self, id: DocId) -> Option<&Document> { self.docs.get(&id) }

    pub fn contains(&self, id: DocId) -> bool { self.docs.contains_key(&id) }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Document> { self.docs.values() }

    pub fn term_frequencies(&self, id: DocId) -> Option<&[(TermId, u32)]> {
        self.term_freqs.get(&id).map(Vec::as_slice)
    }

    /// Term frequency of `term` in `doc`, 0 when absent.
    pub fn term_frequency(&self, doc: DocId, term: TermId) -> u32 {
        self.term_frequencies(doc)
            .and_then(|tf| tf.binary_search_by_key(&term, |&(t, _)| t).ok().map(|i| tf[i].1))
            .unwrap_or(0)
    }

    pub fn total_length(&self) -> u64 { self.total_length }

    pub fn average_length(&self) -> f64 {
        if self.docs.is_empty() {
            return 0.0;
        }
        self.total_length as f64 / self.docs.len() as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    pub lexicon: Lexicon,
    pub documents: DocumentStore,
}

impl Corpus {
    /// Tokenize every document and intern its terms; all-or-nothing.
    pub fn build(raw: Vec<RawDocument>, opts: &BuildOptions) -> Result<Corpus> {
        let mut corpus = Corpus::default();
        for doc in raw {
            if corpus.documents.contains(doc.id) {
                return Err(SearchError::DuplicateKey(doc.id));
            }
            let tokens = tokenize(&doc.text);
            if tokens.is_empty() {
                if !opts.allow_empty {
                    return Err(SearchError::DataIntegrity(format!("document {} has no tokens", doc.id)));
                }
                tracing::warn!(doc_id = doc.id, "keeping empty document with length 0");
            }
            let length = tokens.len() as u32;

            let mut counts: BTreeMap<TermId, u32> = BTreeMap::new();
            for token in tokens {
                let tid = corpus.lexicon.intern(token);
                *counts.entry(tid).or_insert(0) += 1;
            }

            corpus.documents.total_length += length as u64;
            corpus.documents.term_freqs.insert(doc.id, counts.into_iter().collect());
            corpus.documents.docs.insert(
                doc.id,
                Document { id: doc.id, text: doc.text, category_id: doc.category_id, dataset: doc.dataset, length },
            );
        }
        tracing::debug!(num_docs = corpus.documents.len(), num_terms = corpus.lexicon.len(), "corpus tokenized");
        Ok(corpus)
    }
}
