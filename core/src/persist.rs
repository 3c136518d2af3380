use crate::corpus::Corpus;
use crate::entropy::QuartileBounds;
use crate::error::{Result, SearchError};
use crate::index::InvertedIndex;
use crate::keywords::KeywordSet;
use crate::similarity::SimilarityTable;
use crate::snapshot::IndexSnapshot;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub generation: u64,
    pub created_at: String,
    pub version: u32,
    /// Written into every part of the same save.
    pub stamp: String,
}

#[derive(Serialize, Deserialize)]
struct Stamped<T> {
    stamp: String,
    body: T,
}

/// Everything in a snapshot besides the corpus and postings.
#[derive(Serialize, Deserialize)]
struct Extras {
    bounds: Option<QuartileBounds>,
    keywords: KeywordSet,
    similarities: SimilarityTable,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn corpus(&self) -> PathBuf { self.root.join("corpus.bin") }
    fn index(&self) -> PathBuf { self.root.join("index.bin") }
    fn extras(&self) -> PathBuf { self.root.join("extras.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut f = BufWriter::new(File::create(&tmp)?);
        f.write_all(bytes)?;
        f.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn save_part<T: Serialize>(path: &Path, stamp: &str, body: &T) -> Result<()> {
    write_atomic(path, &bincode::serialize(&Stamped { stamp: stamp.to_owned(), body })?)
}

fn load_part<T: DeserializeOwned>(path: &Path, stamp: &str) -> Result<T> {
    let f = File::open(path)?;
    let part: Stamped<T> = bincode::deserialize_from(BufReader::new(f))?;
    if part.stamp != stamp {
        return Err(SearchError::ConcurrentModification(format!(
            "{} belongs to save {}, meta.json to {stamp}",
            path.display(),
            part.stamp
        )));
    }
    Ok(part.body)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    write_atomic(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let f = File::open(paths.meta())?;
    let meta: MetaFile = serde_json::from_reader(BufReader::new(f))?;
    if meta.version != FORMAT_VERSION {
        return Err(SearchError::DataIntegrity(format!(
            "index format version {} (expected {FORMAT_VERSION})",
            meta.version
        )));
    }
    Ok(meta)
}

/// Persist a snapshot. `meta.json` is written last; a reader that sees it
/// change while loading, or finds a part from another save, reports a
/// concurrent modification.
pub fn save_snapshot(paths: &IndexPaths, snapshot: &IndexSnapshot) -> Result<MetaFile> {
    create_dir_all(&paths.root)?;
    let now = time::OffsetDateTime::now_utc();
    let stamp = format!("{}-{}", snapshot.generation, now.unix_timestamp_nanos());
    save_part(&paths.corpus(), &stamp, &snapshot.corpus)?;
    save_part(&paths.index(), &stamp, &snapshot.index)?;
    let extras = Extras {
        bounds: snapshot.bounds,
        keywords: snapshot.keywords.clone(),
        similarities: snapshot.similarities.clone(),
    };
    save_part(&paths.extras(), &stamp, &extras)?;

    let meta = MetaFile {
        num_docs: snapshot.index.num_docs,
        num_terms: snapshot.index.num_terms() as u32,
        generation: snapshot.generation,
        created_at: now.format(&time::format_description::well_known::Rfc3339).unwrap_or_default(),
        version: FORMAT_VERSION,
        stamp,
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), generation = meta.generation, num_docs = meta.num_docs, "snapshot saved");
    Ok(meta)
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<IndexSnapshot> {
    let before = load_meta(paths)?;
    let corpus: Corpus = load_part(&paths.corpus(), &before.stamp)?;
    let index: InvertedIndex = load_part(&paths.index(), &before.stamp)?;
    let extras: Extras = load_part(&paths.extras(), &before.stamp)?;
    let after = load_meta(paths)?;
    if before != after {
        return Err(SearchError::ConcurrentModification(format!(
            "{} rewritten during load (generation {} -> {})",
            paths.root.display(),
            before.generation,
            after.generation
        )));
    }
    if index.num_docs != before.num_docs || index.num_terms() != before.num_terms as usize {
        return Err(SearchError::DataIntegrity(format!(
            "{} holds {} docs / {} terms, meta says {} / {}",
            paths.root.display(),
            index.num_docs,
            index.num_terms(),
            before.num_docs,
            before.num_terms
        )));
    }
    tracing::info!(root = %paths.root.display(), generation = before.generation, num_docs = before.num_docs, "snapshot loaded");
    Ok(IndexSnapshot {
        generation: before.generation,
        corpus,
        index,
        bounds: extras.bounds,
        keywords: extras.keywords,
        similarities: extras.similarities,
    })
}
