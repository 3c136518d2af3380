pub mod bm25;
pub mod clicks;
pub mod config;
pub mod cooccur;
pub mod corpus;
pub mod engine;
pub mod entropy;
pub mod error;
pub mod index;
pub mod keywords;
pub mod persist;
pub mod similarity;
pub mod snapshot;
pub mod tokenizer;

pub type TermId = u32;
pub type DocId = u32;
pub type CategoryId = u32;
/// Keywords share their id with the underlying lexicon term.
pub type KeywordId = TermId;

pub use bm25::{Bm25Params, ScoredDoc};
pub use clicks::{ClickStore, ClickTracker, MemoryClickStore, SledClickStore};
pub use config::SearchConfig;
pub use cooccur::Cooccurrence;
pub use corpus::{BuildOptions, Corpus, Document, Lexicon, RawDocument};
pub use engine::{SearchEngine, SearchHit};
pub use entropy::{Quartile, QuartileBounds};
pub use error::{ErrorKind, Result, SearchError};
pub use index::{DocumentFrequency, InvertedIndex, Posting};
pub use keywords::{DocumentKeyword, KeywordSet};
pub use similarity::{DocSimilarity, SimilarityTable};
pub use snapshot::IndexSnapshot;
