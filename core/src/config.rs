use crate::bm25::Bm25Params;
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub k1: f64,
    /// BM25 length normalization strength, in `[0, 1]`.
    pub b: f64,
    pub limit: usize,
    pub corpus_path: PathBuf,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75, limit: 10, corpus_path: PathBuf::from("./datasets") }
    }
}

impl SearchConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(path)?;
        let config: SearchConfig = serde_json::from_reader(BufReader::new(f))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(SearchError::InvalidConfig(format!("k1 must be a non-negative number, got {}", self.k1)));
        }
        if !self.b.is_finite() || !(0.0..=1.0).contains(&self.b) {
            return Err(SearchError::InvalidConfig(format!("b must lie in [0, 1], got {}", self.b)));
        }
        if self.limit == 0 {
            return Err(SearchError::InvalidConfig("limit must be at least 1".into()));
        }
        Ok(())
    }

    pub fn bm25(&self) -> Bm25Params {
        Bm25Params { k1: self.k1, b: self.b }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: SearchConfig = serde_json::from_str(r#"{"k1": 1.5}"#).unwrap();
        assert_eq!(cfg.k1, 1.5);
        assert_eq!(cfg.b, 0.75);
        assert_eq!(cfg.limit, 10);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let cfg = SearchConfig { b: 1.5, ..SearchConfig::default() };
        assert!(matches!(cfg.validate(), Err(SearchError::InvalidConfig(_))));
        let cfg = SearchConfig { limit: 0, ..SearchConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = SearchConfig { k1: f64::NAN, ..SearchConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"k1": 2.0, "b": 0.5, "limit": 25, "corpus_path": "/data/abstracts"}}"#).unwrap();
        let cfg = SearchConfig::from_json_file(f.path()).unwrap();
        assert_eq!(cfg.limit, 25);
        assert_eq!(cfg.corpus_path, PathBuf::from("/data/abstracts"));
        assert_eq!(cfg.bm25(), Bm25Params { k1: 2.0, b: 0.5 });
    }
}
