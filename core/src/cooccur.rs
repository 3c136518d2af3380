use crate::corpus::Corpus;
use crate::index::InvertedIndex;
use crate::keywords::KeywordSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Number of documents containing both terms. `term_a < term_b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooccurrence {
    pub term_a: String,
    pub term_b: String,
    pub count: usize,
}

/// Pairwise document co-occurrence among the distinct keywords of an
/// accumulated search history. Repeats are collapsed first, pairs are
/// reported with their terms in lexical order, zero counts are dropped, and
/// the result is sorted by count (descending) then by terms.
pub fn cooccur<S: AsRef<str>>(
    corpus: &Corpus,
    index: &InvertedIndex,
    tracked: &KeywordSet,
    keywords: &[S],
) -> Vec<Cooccurrence> {
    let distinct: BTreeSet<String> = keywords.iter().map(|k| k.as_ref().to_lowercase()).collect();
    if distinct.len() < 2 {
        return Vec::new();
    }
    // Unknown or untracked keywords co-occur with nothing.
    let known: Vec<(&str, u32)> = distinct
        .iter()
        .filter_map(|k| corpus.lexicon.id(k).map(|tid| (k.as_str(), tid)))
        .filter(|&(_, tid)| tracked.contains(&corpus.lexicon, tid))
        .collect();

    let mut out = Vec::new();
    for (i, &(a, ta)) in known.iter().enumerate() {
        for &(b, tb) in &known[i + 1..] {
            let count = index.co_document_count(ta, tb);
            if count > 0 {
                out.push(Cooccurrence { term_a: a.to_owned(), term_b: b.to_owned(), count });
            }
        }
    }
    out.sort_by(|x, y| y.count.cmp(&x.count).then_with(|| (&x.term_a, &x.term_b).cmp(&(&y.term_a, &y.term_b))));
    out
}
