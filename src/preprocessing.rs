use crate::datareaders::JsonDataReader;
use crate::lexicon::Lexicon;
use crate::structs::{Counts, Document};
use crate::tokenizer::Tokenizer;
use crate::utils::{progress_style, token_hash};
use ahash::RandomState;
use anyhow::{Result, anyhow};
use dashmap::DashMap;
use indicatif::ParallelProgressIterator;
use log::info;
use num_format::{Locale, ToFormattedString};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    pub text_key: String,
    pub counts_key: String,
    /// Count lexicon categories instead of tokens when a lexicon is given.
    pub lexicon_map: bool,
    pub token_hashing: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            text_key: "text".to_owned(),
            counts_key: "terms".to_owned(),
            lexicon_map: true,
            token_hashing: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreprocessSummary {
    pub documents: usize,
    pub unique_terms: usize,
    pub total_terms: usize,
}

pub fn preprocess_text(text: &str, lexicon: Option<&Lexicon>, options: &PreprocessOptions) -> Counts {
    let mut terms = Tokenizer.tokenize(text);
    if let Some(lexicon) = lexicon.filter(|_| options.lexicon_map) {
        terms = lexicon.categories_for_words(&terms);
    }
    if options.token_hashing {
        terms = terms.iter().map(|t| token_hash(t)).collect();
    }
    let mut counts = Counts::new();
    for term in terms {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}

/// Adds term counts to every document and writes them, in input order, as
/// JSON lines to `out_path`.
pub fn preprocess_docs(
    documents: Vec<Document>,
    lexicon: Option<&Lexicon>,
    out_path: &Path,
    options: &PreprocessOptions,
) -> Result<PreprocessSummary> {
    let term_totals: DashMap<String, usize, RandomState> = DashMap::default();

    let processed = documents
        .into_par_iter()
        .progress_with_style(progress_style()?)
        .map(|mut document| -> Result<Document> {
            let text = document
                .get(&options.text_key)
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("document has no text under '{}'", options.text_key))?;
            let counts = preprocess_text(text, lexicon, options);
            for (term, count) in &counts {
                *term_totals.entry(term.clone()).or_insert(0) += count;
            }
            document.insert(options.counts_key.clone(), serde_json::to_value(&counts)?);
            Ok(document)
        })
        .collect::<Result<Vec<_>>>()?;

    JsonDataReader::write(&processed, out_path)?;

    let summary = PreprocessSummary {
        documents: processed.len(),
        unique_terms: term_totals.len(),
        total_terms: term_totals.iter().map(|entry| *entry.value()).sum(),
    };
    info!(
        "Preprocessed {} documents: {} unique terms, {} occurrences",
        summary.documents.to_formatted_string(&Locale::en),
        summary.unique_terms.to_formatted_string(&Locale::en),
        summary.total_terms.to_formatted_string(&Locale::en)
    );
    Ok(summary)
}
