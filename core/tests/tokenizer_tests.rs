use keysearch_core::tokenizer::{query_keywords, tokenize};

#[test]
fn it_lowercases_without_stemming() {
    let toks = tokenize("Running Runners RUN! The café's menu.");
    assert_eq!(toks, vec!["running", "runners", "run!", "the", "café's", "menu."]);
}

#[test]
fn it_filters_stopwords_from_queries_only() {
    let text = "The quick brown fox and the lazy dog";
    assert!(tokenize(text).contains(&"the".to_string()));
    let words = query_keywords(text);
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert_eq!(words, vec!["quick", "brown", "fox", "lazy", "dog"]);
}
