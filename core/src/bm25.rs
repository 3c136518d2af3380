use crate::corpus::Corpus;
use crate::error::{Result, SearchError};
use crate::index::InvertedIndex;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k1: 1.2, b: 0.75 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

pub fn bm25_term(term_freq: u32, doc_len: u32, idf: f64, avgdl: f64, params: Bm25Params) -> f64 {
    if term_freq == 0 {
        return 0.0;
    }
    let tf = term_freq as f64;
    let rel_len = if avgdl > 0.0 { doc_len as f64 / avgdl } else { 0.0 };
    let tf_norm = (tf * (params.k1 + 1.0)) / (tf + params.k1 * (1.0 - params.b + params.b * rel_len));
    idf * tf_norm
}

pub(crate) fn query_term_set<I, S>(query_terms: I) -> Result<BTreeSet<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = BTreeSet::new();
    for term in query_terms {
        let term = term.as_ref();
        if term.is_empty() || term.chars().any(char::is_whitespace) {
            return Err(SearchError::InvalidQuery(format!("{term:?} is not a single token")));
        }
        set.insert(term.to_lowercase());
    }
    Ok(set)
}

/// Rank documents containing at least one query term, best first, ties by
/// ascending doc id, at most `limit` of them. Terms missing from the lexicon
/// contribute nothing; an empty query yields no results.
pub fn rank<I, S>(
    corpus: &Corpus,
    index: &InvertedIndex,
    query_terms: I,
    limit: usize,
    params: Bm25Params,
) -> Result<Vec<ScoredDoc>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if limit == 0 {
        return Err(SearchError::InvalidQuery("limit must be at least 1".into()));
    }
    let terms = query_term_set(query_terms)?;
    if terms.is_empty() || index.num_docs == 0 {
        return Ok(Vec::new());
    }

    let mut scores: HashMap<DocId, f64> = HashMap::new();
    for term in &terms {
        let Some(tid) = corpus.lexicon.id(term) else { continue };
        let Some(idf) = index.idf(tid) else { continue };
        for posting in index.postings(tid) {
            let dl = corpus.documents.get(posting.doc_id).map(|d| d.length).unwrap_or(0);
            *scores.entry(posting.doc_id).or_insert(0.0) +=
                bm25_term(posting.term_frequency, dl, idf, index.avgdl, params);
        }
    }

    let mut ranked: Vec<ScoredDoc> = scores.into_iter().map(|(doc_id, score)| ScoredDoc { doc_id, score }).collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
    ranked.truncate(limit);
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{BuildOptions, RawDocument};

    fn build(texts: &[&str]) -> (Corpus, InvertedIndex) {
        let raw = texts.iter().enumerate().map(|(i, t)| RawDocument::new(i as u32 + 1, *t, 0, "t")).collect();
        let corpus = Corpus::build(raw, &BuildOptions::default()).unwrap();
        let index = InvertedIndex::build(&corpus);
        (corpus, index)
    }

    #[test]
    fn term_score_grows_with_frequency() {
        let p = Bm25Params { k1: 1.5, b: 0.75 };
        let mut prev = 0.0;
        for tf in 1..20 {
            let s = bm25_term(tf, 10, 3.0, 8.0, p);
            assert!(s >= prev);
            prev = s;
        }
        assert_eq!(bm25_term(0, 10, 3.0, 8.0, p), 0.0);
    }

    #[test]
    fn matches_formula_by_hand() {
        let (c, idx) = build(&["gene therapy success", "gene editing risk", "forest fire risk"]);
        let p = Bm25Params { k1: 1.5, b: 0.75 };
        let res = rank(&c, &idx, ["forest"], 10, p).unwrap();
        // idf = 3/1, tf = 1, dl = avgdl = 3 -> tf_norm = 2.5 / 2.5 = 1
        assert_eq!(res, vec![ScoredDoc { doc_id: 3, score: 3.0 }]);
    }

    #[test]
    fn empty_query_and_no_match() {
        let (c, idx) = build(&["rust programming", "python scripting"]);
        let none: [&str; 0] = [];
        assert!(rank(&c, &idx, none, 10, Bm25Params::default()).unwrap().is_empty());
        assert!(rank(&c, &idx, ["java"], 10, Bm25Params::default()).unwrap().is_empty());
    }

    #[test]
    fn ties_break_by_doc_id_and_limit_caps() {
        let (c, idx) = build(&["rust a", "rust b", "rust c"]);
        let res = rank(&c, &idx, ["rust"], 2, Bm25Params::default()).unwrap();
        assert_eq!(res.iter().map(|r| r.doc_id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn query_terms_are_case_folded() {
        let (c, idx) = build(&["rust memory safety"]);
        assert_eq!(rank(&c, &idx, ["RUST"], 5, Bm25Params::default()).unwrap().len(), 1);
    }

    #[test]
    fn malformed_terms_rejected() {
        let (c, idx) = build(&["rust"]);
        let err = rank(&c, &idx, ["two words"], 5, Bm25Params::default()).unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery(_)));
        assert!(rank(&c, &idx, [""], 5, Bm25Params::default()).is_err());
        assert!(rank(&c, &idx, ["rust"], 0, Bm25Params::default()).is_err());
    }
}
