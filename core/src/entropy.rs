use crate::corpus::Corpus;
use crate::error::SearchError;
use crate::index::InvertedIndex;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quartile {
    Q1,
    Q2,
    Q3,
    Q4,
    Unknown,
}

impl fmt::Display for Quartile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Quartile::Q1 => "Q1",
            Quartile::Q2 => "Q2",
            Quartile::Q3 => "Q3",
            Quartile::Q4 => "Q4",
            Quartile::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

impl FromStr for Quartile {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "Q1" => Ok(Quartile::Q1),
            "Q2" => Ok(Quartile::Q2),
            "Q3" => Ok(Quartile::Q3),
            "Q4" => Ok(Quartile::Q4),
            "UNKNOWN" => Ok(Quartile::Unknown),
            _ => Err(SearchError::InvalidQuery(format!("unknown quartile {s:?}"))),
        }
    }
}

/// Shannon entropy of a document's normalized TF-IDF distribution, or `None`
/// when the document is unknown or has no weighted terms.
pub fn document_entropy(corpus: &Corpus, index: &InvertedIndex, doc: DocId) -> Option<f64> {
    let tfs = corpus.documents.term_frequencies(doc)?;
    let weights: Vec<f64> =
        tfs.iter().map(|&(tid, tf)| tf as f64 * index.idf(tid).unwrap_or(0.0)).collect();
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || total <= 0.0 {
        return None;
    }
    let h = weights
        .iter()
        .filter(|&&w| w > 0.0)
        .map(|&w| {
            let p = w / total;
            -p * p.ln()
        })
        .sum::<f64>();
    // A lone term gives -1 * ln(1) = -0.0.
    Some(h.max(0.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuartileBounds {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
}

impl QuartileBounds {
    /// Cut points by linear interpolation between closest ranks.
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        Some(QuartileBounds {
            p25: percentile(&values, 0.25),
            p50: percentile(&values, 0.50),
            p75: percentile(&values, 0.75),
        })
    }

    pub fn for_corpus(corpus: &Corpus, index: &InvertedIndex) -> Option<Self> {
        let values = corpus.documents.iter().filter_map(|d| document_entropy(corpus, index, d.id)).collect();
        Self::from_values(values)
    }

    /// Upper bounds are inclusive: a value equal to the median is Q2.
    pub fn quartile(&self, entropy: f64) -> Quartile {
        if entropy <= self.p25 {
            Quartile::Q1
        } else if entropy <= self.p50 {
            Quartile::Q2
        } else if entropy <= self.p75 {
            Quartile::Q3
        } else {
            Quartile::Q4
        }
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
