use crate::corpus::Corpus;
use crate::{DocId, TermId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_frequency: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentFrequency {
    pub term_id: TermId,
    pub document_frequency: u32,
    /// `N / document_frequency`. A plain ratio, not the usual smoothed log:
    /// ranking scores depend on this exact value.
    pub idf: f64,
}

/// Term id -> postings, plus per-term document frequency and corpus totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: Vec<Vec<Posting>>,
    df: Vec<DocumentFrequency>,
    pub num_docs: u32,
    pub avgdl: f64,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn build(corpus: &Corpus) -> Self {
        let mut postings: Vec<Vec<Posting>> = vec![Vec::new(); corpus.lexicon.len()];
        // Documents iterate in ascending id order, so every list comes out sorted.
        for doc in corpus.documents.iter() {
            for &(tid, tf) in corpus.documents.term_frequencies(doc.id).unwrap_or(&[]) {
                postings[tid as usize].push(Posting { doc_id: doc.id, term_frequency: tf });
            }
        }

        let num_docs = corpus.documents.len() as u32;
        let df = postings
            .iter()
            .enumerate()
            .map(|(tid, plist)| {
                let document_frequency = plist.len() as u32;
                DocumentFrequency {
                    term_id: tid as TermId,
                    document_frequency,
                    idf: num_docs as f64 / document_frequency as f64,
                }
            })
            .collect();

        InvertedIndex { postings, df, num_docs, avgdl: corpus.documents.average_length() }
    }

    pub fn postings(&self, term: TermId) -> &[Posting] {
        self.postings.get(term as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn document_frequency(&self, term: TermId) -> Option<&DocumentFrequency> {
        self.df.get(term as usize)
    }

    pub fn idf(&self, term: TermId) -> Option<f64> { self.document_frequency(term).map(|d| d.idf) }

    pub fn document_frequencies(&self) -> &[DocumentFrequency] { &self.df }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn co_document_count(&self, a: TermId, b: TermId) -> usize {
        let (xs, ys) = (self.postings(a), self.postings(b));
        let (mut i, mut j, mut n) = (0, 0, 0);
        while i < xs.len() && j < ys.len() {
            match xs[i].doc_id.cmp(&ys[j].doc_id) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    n += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{BuildOptions, RawDocument};

    fn corpus(texts: &[&str]) -> Corpus {
        let raw = texts.iter().enumerate().map(|(i, t)| RawDocument::new(i as u32 + 1, *t, 0, "t")).collect();
        Corpus::build(raw, &BuildOptions::default()).unwrap()
    }

    #[test]
    fn term_frequency_and_df() {
        let c = corpus(&["hello hello hello world", "hello rust"]);
        let idx = InvertedIndex::build(&c);
        let hello = c.lexicon.id("hello").unwrap();
        assert_eq!(
            idx.postings(hello),
            &[Posting { doc_id: 1, term_frequency: 3 }, Posting { doc_id: 2, term_frequency: 1 }]
        );
        let df = idx.document_frequency(hello).unwrap();
        assert_eq!(df.document_frequency, 2);
        assert_eq!(df.idf, 1.0);
        let world = c.lexicon.id("world").unwrap();
        assert_eq!(idx.idf(world), Some(2.0));
        assert_eq!(idx.avgdl, 3.0);
    }

    #[test]
    fn unknown_term_has_no_postings() {
        let idx = InvertedIndex::build(&corpus(&["a b"]));
        assert!(idx.postings(42).is_empty());
        assert!(idx.idf(42).is_none());
    }

    #[test]
    fn co_document_count_intersects() {
        let c = corpus(&["gene therapy", "gene risk", "fire risk", "gene risk again"]);
        let idx = InvertedIndex::build(&c);
        let (gene, risk) = (c.lexicon.id("gene").unwrap(), c.lexicon.id("risk").unwrap());
        assert_eq!(idx.co_document_count(gene, risk), 2);
        assert_eq!(idx.co_document_count(risk, gene), 2);
    }
}
