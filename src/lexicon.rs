use crate::stemmer::get_stem;
use crate::structs::Counts;
use ahash::AHashMap;
use anyhow::{Context, Result, anyhow};
use log::debug;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

pub const WORD_KEY: &str = "Word";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LexiconFormat {
    /// Header has a `Word` column; every other non-empty cell puts the
    /// row's word in that column's category.
    #[default]
    WordRows,
    /// Each column is a category and each cell one of its terms.
    CategoryColumns,
}

impl FromStr for LexiconFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rows" => Ok(LexiconFormat::WordRows),
            "columns" => Ok(LexiconFormat::CategoryColumns),
            other => Err(anyhow!(
                "unsupported lexicon format '{other}' (supported: rows, columns)"
            )),
        }
    }
}

/// Entries ending in `*` (or `.*`) match every word sharing their stem;
/// other entries match only the exact word.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    word_to_categories: AHashMap<String, Vec<String>>,
    stem_to_categories: AHashMap<String, Vec<String>>,
}

#[derive(Default)]
struct PrefixStats {
    already_stems: usize,
    restemmed: usize,
}

impl Lexicon {
    pub fn from_path(path: impl AsRef<Path>, format: LexiconFormat) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open lexicon {}", path.display()))?;
        Self::from_reader(file, format)
            .with_context(|| format!("failed to load lexicon {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R, format: LexiconFormat) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = csv.headers()?.clone();
        let mut lexicon = Self::default();
        let mut stats = PrefixStats::default();

        match format {
            LexiconFormat::WordRows => {
                let word_idx = headers
                    .iter()
                    .position(|h| h == WORD_KEY)
                    .ok_or_else(|| anyhow!("lexicon must include a '{WORD_KEY}' column"))?;
                for record in csv.records() {
                    let record = record?;
                    let Some(term) = record.get(word_idx) else {
                        continue;
                    };
                    let categories = headers
                        .iter()
                        .zip(record.iter())
                        .enumerate()
                        .filter(|(i, (_, cell))| *i != word_idx && !cell.trim().is_empty())
                        .map(|(_, (category, _))| category.to_owned())
                        .collect();
                    lexicon.insert(term, categories, &mut stats);
                }
            }
            LexiconFormat::CategoryColumns => {
                for record in csv.records() {
                    let record = record?;
                    for (category, term) in headers.iter().zip(record.iter()) {
                        lexicon.insert(term, vec![category.to_owned()], &mut stats);
                    }
                }
            }
        }

        debug!(
            "Loaded lexicon: {} words, {} stems ({} prefixes were already stems, {} were not)",
            lexicon.word_to_categories.len(),
            lexicon.stem_to_categories.len(),
            stats.already_stems,
            stats.restemmed
        );
        Ok(lexicon)
    }

    fn insert(&mut self, term: &str, categories: Vec<String>, stats: &mut PrefixStats) {
        let term = term.trim().to_lowercase();
        if term.is_empty() || categories.is_empty() {
            return;
        }
        let prefix = term
            .strip_suffix(".*")
            .or_else(|| term.strip_suffix('*'))
            .map(str::to_owned);
        match prefix {
            Some(prefix) => {
                let stem = get_stem(&prefix);
                if stem == prefix {
                    stats.already_stems += 1;
                } else {
                    stats.restemmed += 1;
                }
                self.stem_to_categories
                    .entry(stem)
                    .or_default()
                    .extend(categories);
            }
            None => self
                .word_to_categories
                .entry(term)
                .or_default()
                .extend(categories),
        }
    }

    /// Exact word entries win over stem entries.
    pub fn categories_for_word(&self, word: &str) -> &[String] {
        let word = word.to_lowercase();
        if let Some(categories) = self.word_to_categories.get(&word) {
            return categories;
        }
        self.stem_to_categories
            .get(&get_stem(&word))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn categories_for_words<S: AsRef<str>>(&self, words: &[S]) -> Vec<String> {
        words
            .iter()
            .flat_map(|w| self.categories_for_word(w.as_ref()))
            .cloned()
            .collect()
    }

    pub fn category_counts<S: AsRef<str>>(&self, words: &[S]) -> Counts {
        let mut counts = Counts::new();
        for category in words.iter().flat_map(|w| self.categories_for_word(w.as_ref())) {
            *counts.entry(category.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn is_empty(&self) -> bool {
        self.word_to_categories.is_empty() && self.stem_to_categories.is_empty()
    }
}
