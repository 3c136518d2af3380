use anyhow::{bail, Context, Result};
use keysearch_core::{CategoryId, DocId, RawDocument};
use serde::Deserialize;
use walkdir::WalkDir;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One line of a dataset file.
#[derive(Debug, Deserialize)]
struct InputLine {
    sentences: String,
    /// Comma-separated category labels; the first one is the document's category.
    #[serde(default)]
    labels: String,
}

#[derive(Debug, Default)]
pub struct LoadedCorpus {
    pub documents: Vec<RawDocument>,
    pub categories: BTreeMap<String, CategoryId>,
}

/// Dataset files under `input`: the file itself, or every `.jsonl` file
/// below a directory in path order.
fn dataset_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("corpus path {} does not exist", input.display());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("jsonl"))
        .collect();
    files.sort();
    if files.is_empty() {
        bail!("no .jsonl datasets under {}", input.display());
    }
    Ok(files)
}

fn clean_text(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '\'' | '"' | '\\')).collect()
}

/// Read datasets into raw documents with ids assigned from 1 in file order.
/// Category ids follow sorted label order. Stops after `max_docs` documents.
pub fn load_corpus(input: &Path, max_docs: Option<usize>) -> Result<LoadedCorpus> {
    let mut rows: Vec<(String, String, String)> = Vec::new();
    'files: for file in dataset_files(input)? {
        let dataset = file.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
        let reader = BufReader::new(File::open(&file).with_context(|| format!("opening {}", file.display()))?);
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            let parsed: InputLine = serde_json::from_str(&line)
                .with_context(|| format!("{}:{}: malformed dataset line", file.display(), lineno + 1))?;
            let label = parsed.labels.split(',').next().unwrap_or_default().trim().to_string();
            rows.push((clean_text(&parsed.sentences), label, dataset.clone()));
            if max_docs.is_some_and(|m| rows.len() >= m) {
                break 'files;
            }
        }
    }

    let mut categories: BTreeMap<String, CategoryId> = rows.iter().map(|(_, l, _)| (l.clone(), 0)).collect();
    for (i, id) in categories.values_mut().enumerate() {
        *id = i as CategoryId + 1;
    }

    let documents = rows
        .into_iter()
        .enumerate()
        .map(|(i, (text, label, dataset))| RawDocument::new(i as DocId + 1, text, categories[&label], dataset))
        .collect();
    tracing::info!(num_categories = categories.len(), "corpus loaded");
    Ok(LoadedCorpus { documents, categories })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_datasets_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("b_news.jsonl"),
            "{\"sentences\": \"Forest fire risk\", \"labels\": \"env,news\"}\n\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("a_bio.jsonl"),
            concat!(
                "{\"sentences\": \"Gene therapy's success\", \"labels\": \"bio\"}\n",
                "{\"sentences\": \"Gene \\\"editing\\\" risk\", \"labels\": \"bio,risk\"}\n",
            ),
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loaded = load_corpus(dir.path(), None).unwrap();
        assert_eq!(loaded.documents.len(), 3);
        assert_eq!(loaded.documents[0], RawDocument::new(1, "Gene therapys success", 1, "a_bio"));
        assert_eq!(loaded.documents[1].text, "Gene editing risk");
        assert_eq!(loaded.documents[2].dataset, "b_news");
        assert_eq!(loaded.categories["env"], 2);
        assert_eq!(loaded.documents[2].category_id, 2);
    }

    #[test]
    fn caps_document_count() {
        let dir = tempfile::tempdir().unwrap();
        let lines: String = (0..10).map(|i| format!("{{\"sentences\": \"doc {i}\", \"labels\": \"x\"}}\n")).collect();
        fs::write(dir.path().join("d.jsonl"), lines).unwrap();
        assert_eq!(load_corpus(dir.path(), Some(4)).unwrap().documents.len(), 4);
    }

    #[test]
    fn missing_path_fails() {
        assert!(load_corpus(Path::new("/definitely/not/here"), None).is_err());
    }
}
