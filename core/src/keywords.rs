use crate::corpus::{Corpus, Lexicon};
use crate::error::{Result, SearchError};
use crate::{DocId, KeywordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which lexicon terms are trackable as keywords for clicks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeywordSet {
    /// Every lexicon term is a keyword.
    #[default]
    All,
    Designated(BTreeSet<KeywordId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentKeyword {
    pub doc_id: DocId,
    pub keyword_id: KeywordId,
    pub term_frequency: u32,
}

impl KeywordSet {
    /// Designate the given terms. Every term must already be in the lexicon.
    pub fn designate<S: AsRef<str>>(lexicon: &Lexicon, terms: &[S]) -> Result<Self> {
        let ids = terms
            .iter()
            .map(|t| {
                let t = t.as_ref().to_lowercase();
                lexicon.id(&t).ok_or_else(|| SearchError::not_found("term", t))
            })
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(KeywordSet::Designated(ids))
    }

    pub fn contains(&self, lexicon: &Lexicon, id: KeywordId) -> bool {
        match self {
            KeywordSet::All => lexicon.term(id).is_some(),
            KeywordSet::Designated(ids) => ids.contains(&id),
        }
    }

    /// Map keyword text to ids, failing on the first one that is not a keyword.
    pub fn resolve<S: AsRef<str>>(&self, lexicon: &Lexicon, texts: &[S]) -> Result<Vec<KeywordId>> {
        texts
            .iter()
            .map(|t| {
                let t = t.as_ref().to_lowercase();
                match lexicon.id(&t) {
                    Some(id) if self.contains(lexicon, id) => Ok(id),
                    _ => Err(SearchError::not_found("keyword", t)),
                }
            })
            .collect()
    }

    pub fn document_keywords(&self, corpus: &Corpus, doc: DocId) -> Result<Vec<DocumentKeyword>> {
        let tfs = corpus.documents.term_frequencies(doc).ok_or_else(|| SearchError::not_found("document", doc))?;
        Ok(tfs
            .iter()
            .filter(|&&(tid, _)| self.contains(&corpus.lexicon, tid))
            .map(|&(keyword_id, term_frequency)| DocumentKeyword { doc_id: doc, keyword_id, term_frequency })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{BuildOptions, RawDocument};

    fn corpus() -> Corpus {
        Corpus::build(
            vec![RawDocument::new(1, "gene gene therapy", 0, "t"), RawDocument::new(2, "covid risk", 0, "t")],
            &BuildOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn all_terms_by_default() {
        let c = corpus();
        let ks = KeywordSet::default();
        assert_eq!(ks.resolve(&c.lexicon, &["Gene", "risk"]).unwrap(), vec![0, 3]);
        let rows = ks.document_keywords(&c, 1).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], DocumentKeyword { doc_id: 1, keyword_id: 0, term_frequency: 2 });
    }

    #[test]
    fn designated_subset_limits_resolution() {
        let c = corpus();
        let ks = KeywordSet::designate(&c.lexicon, &["gene", "covid"]).unwrap();
        assert!(ks.resolve(&c.lexicon, &["gene"]).is_ok());
        let err = ks.resolve(&c.lexicon, &["therapy"]).unwrap_err();
        assert!(matches!(err, SearchError::NotFound { what: "keyword", .. }));
        assert_eq!(ks.document_keywords(&c, 1).unwrap().len(), 1);
    }

    #[test]
    fn designation_of_unknown_term_fails() {
        let c = corpus();
        assert!(KeywordSet::designate(&c.lexicon, &["forest"]).is_err());
        assert!(KeywordSet::default().document_keywords(&c, 9).is_err());
    }
}
