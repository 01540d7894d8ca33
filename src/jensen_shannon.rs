use crate::structs::{DistanceTable, Distribution, Document};
use ahash::AHashMap;
use anyhow::{Result, anyhow};
use log::{debug, info};
use rand::prelude::*;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct DistanceOptions {
    /// Key holding a document's terms: a term → count object or a list.
    pub terms_key: String,
    pub target_group: Option<String>,
    pub vocab_size: usize,
    /// Groups are cut down to exactly this many documents; smaller groups
    /// are dropped.
    pub sample_size: Option<usize>,
    pub min_group_size: usize,
    pub seed: Option<u64>,
}

impl Default for DistanceOptions {
    fn default() -> Self {
        Self {
            terms_key: "terms".to_owned(),
            target_group: None,
            vocab_size: 1000,
            sample_size: None,
            min_group_size: 0,
            seed: None,
        }
    }
}

pub fn counts_to_distribution(counts: impl IntoIterator<Item = (String, usize)>) -> Distribution {
    let counts: Vec<_> = counts.into_iter().collect();
    let total: usize = counts.iter().map(|(_, c)| c).sum();
    if total == 0 {
        return Distribution::new();
    }
    counts
        .into_iter()
        .map(|(term, count)| (term, count as f64 / total as f64))
        .collect()
}

/// Counts, over `documents`, how many carry each term (or how often a term
/// appears in list-shaped terms), keeps the `vocab_size` most frequent and
/// normalizes.
pub fn term_count_distribution(documents: &[&Value], vocab_size: usize) -> Distribution {
    let mut counts: AHashMap<&str, usize> = AHashMap::new();
    for terms in documents {
        match terms {
            Value::Object(map) => {
                for term in map.keys() {
                    *counts.entry(term.as_str()).or_insert(0) += 1;
                }
            }
            Value::Array(items) => {
                for term in items.iter().filter_map(Value::as_str) {
                    *counts.entry(term).or_insert(0) += 1;
                }
            }
            _ => {}
        }
    }
    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(vocab_size);
    counts_to_distribution(ranked.into_iter().map(|(term, count)| (term.to_owned(), count)))
}

/// Square root of the base-2 Jensen-Shannon divergence, in `[0, 1]`.
pub fn jensen_shannon(f: &Distribution, g: &Distribution) -> f64 {
    // ordered so repeated runs sum in the same order
    let vocab: BTreeSet<&String> = f.keys().chain(g.keys()).collect();
    let (mut kl_p, mut kl_q) = (0.0, 0.0);
    for term in vocab {
        let p = f.get(term).copied().unwrap_or(0.0);
        let q = g.get(term).copied().unwrap_or(0.0);
        let m = (p + q) / 2.0;
        kl_p += kl_term(p, m);
        kl_q += kl_term(q, m);
    }
    (0.5 * kl_p + 0.5 * kl_q).max(0.0).sqrt()
}

// log(0) terms contribute nothing
fn kl_term(p: f64, m: f64) -> f64 {
    if p == 0.0 { 0.0 } else { p * (p / m).log2() }
}

fn group_names(value: &Value) -> Vec<String> {
    match value {
        Value::String(name) => vec![name.clone()],
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(name) => name.clone(),
                other => other.to_string(),
            })
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

pub fn measure_js_distances(
    documents: &[Document],
    grouping_key: &str,
    options: &DistanceOptions,
) -> Result<DistanceTable> {
    measure_js_distances_by(
        documents.iter(),
        |document| {
            document
                .get(grouping_key)
                .map(group_names)
                .ok_or_else(|| anyhow!("document has no group under '{grouping_key}'"))
        },
        options,
        |_, _| true,
    )
}

/// `group_of` names the groups a document belongs to; `accept` can veto
/// individual pairs before they are measured.
pub fn measure_js_distances_by<'a, G, A>(
    documents: impl IntoIterator<Item = &'a Document>,
    group_of: G,
    options: &DistanceOptions,
    accept: A,
) -> Result<DistanceTable>
where
    G: Fn(&Document) -> Result<Vec<String>>,
    A: Fn(&str, &str) -> bool + Sync,
{
    let mut groups: BTreeMap<String, Vec<&Value>> = BTreeMap::new();
    for document in documents {
        let terms = document
            .get(&options.terms_key)
            .ok_or_else(|| anyhow!("document has no terms under '{}'", options.terms_key))?;
        for group in group_of(document)? {
            groups.entry(group).or_default().push(terms);
        }
    }

    let min_size = options.min_group_size.max(options.sample_size.unwrap_or(0));
    groups.retain(|group, docs| {
        let keep = docs.len() >= min_size;
        if !keep {
            debug!("Too few documents for {group} ({})", docs.len());
        }
        keep
    });

    if let Some(sample_size) = options.sample_size {
        let mut rng = match options.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_os_rng(),
        };
        for docs in groups.values_mut() {
            *docs = docs.choose_multiple(&mut rng, sample_size).copied().collect();
        }
    }

    let distributions: BTreeMap<&String, Distribution> = groups
        .par_iter()
        .map(|(group, docs)| (group, term_count_distribution(docs, options.vocab_size)))
        .collect();

    let names: Vec<&String> = distributions.keys().copied().collect();
    let pairs: Vec<(&String, &String)> = names
        .iter()
        .enumerate()
        .flat_map(|(i, g1)| names[i + 1..].iter().map(move |g2| (*g1, *g2)))
        .filter(|(g1, g2)| {
            options
                .target_group
                .as_ref()
                .is_none_or(|target| target == *g1 || target == *g2)
        })
        .filter(|(g1, g2)| accept(g1, g2))
        .collect();

    match &options.target_group {
        Some(target) if names.len() > 1 => info!(
            "Measuring distances between \"{target}\" and {} other groups",
            names.len() - 1
        ),
        None if names.len() > 1 => info!("Measuring pairwise distances for {} groups", names.len()),
        _ => {}
    }

    let measured: Vec<_> = pairs
        .par_iter()
        .map(|(g1, g2)| (*g1, *g2, jensen_shannon(&distributions[g1], &distributions[g2])))
        .collect();

    let mut distances = DistanceTable::with_capacity(measured.len() * 2);
    for (g1, g2, distance) in measured {
        distances.insert((g1.clone(), g2.clone()), distance);
        distances.insert((g2.clone(), g1.clone()), distance);
    }
    Ok(distances)
}
