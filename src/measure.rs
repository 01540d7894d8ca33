use crate::jensen_shannon::{DistanceOptions, measure_js_distances, measure_js_distances_by};
use crate::structs::{ComparisonType, DistanceRecord, DistanceTable, Document};
use anyhow::{Context, Result, anyhow, bail};
use log::info;
use rayon::prelude::*;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::Path;

pub const WORLD_GROUP: &str = "world";

fn sender(document: &Document, comparison: ComparisonType) -> Result<&str> {
    match document.get("from") {
        Some(Value::String(from)) => Ok(from.as_str()),
        Some(other) => bail!("'from' must be a string, got {other}"),
        None => Err(anyhow!(
            "documents must have a 'from' key for {comparison:?} comparisons"
        )),
    }
}

fn users_involved<'a>(document: &'a Document, from: &'a str) -> Vec<&'a str> {
    let mut users = vec![from];
    match document.get("to") {
        Some(Value::String(to)) => users.push(to.as_str()),
        Some(Value::Array(to)) => users.extend(to.iter().filter_map(Value::as_str)),
        _ => {}
    }
    users
}

fn senders(documents: &[Document], comparison: ComparisonType) -> Result<BTreeSet<&str>> {
    documents
        .iter()
        .map(|document| sender(document, comparison))
        .collect()
}

/// Runs one distance measurement per sender and merges the results. Later
/// senders (in sorted order) overwrite pairs already measured.
fn measure_per_sender(
    documents: &[Document],
    comparison: ComparisonType,
    options: &DistanceOptions,
) -> Result<DistanceTable> {
    let users = senders(documents, comparison)?;
    info!("Measuring {comparison:?} distances for {} senders", users.len());

    let per_user = users
        .par_iter()
        .map(|&user| -> Result<DistanceTable> {
            let involved = documents.iter().filter(|document| {
                sender(document, comparison)
                    .map(|from| users_involved(document, from).contains(&user))
                    .unwrap_or(false)
            });
            let options = DistanceOptions {
                target_group: Some(user.to_owned()),
                ..options.clone()
            };
            match comparison {
                ComparisonType::IndividualToWorld => measure_js_distances_by(
                    involved,
                    |document| {
                        let from = sender(document, comparison)?;
                        let group = if from == user { user } else { WORLD_GROUP };
                        Ok(vec![group.to_owned()])
                    },
                    &options,
                    |_, _| true,
                ),
                _ => measure_js_distances_by(
                    involved,
                    |document| Ok(vec![sender(document, comparison)?.to_owned()]),
                    &options,
                    |_, _| true,
                ),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let mut distances = DistanceTable::new();
    for table in per_user {
        distances.extend(table);
    }
    Ok(distances)
}

/// Measures Jensen-Shannon distances between the groups `comparison`
/// defines. `group_key` is only used (and required) for group-to-group
/// comparisons.
pub fn measure_distances(
    documents: &[Document],
    comparison: ComparisonType,
    group_key: Option<&str>,
    options: &DistanceOptions,
) -> Result<DistanceTable> {
    match comparison {
        ComparisonType::Dyadic | ComparisonType::IndividualToWorld => {
            measure_per_sender(documents, comparison, options)
        }
        ComparisonType::GroupToGroup => {
            let group_key = group_key
                .filter(|key| !key.is_empty())
                .ok_or_else(|| anyhow!("a group key must be set for group-to-group comparisons"))?;
            measure_js_distances(documents, group_key, options)
        }
    }
}

pub fn write_distances(distances: &DistanceTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    // written by hand so an empty table still gets a header
    writer.write_record(["Group 1", "Group 2", "Distance"])?;

    let mut pairs: Vec<_> = distances.iter().collect();
    pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));
    for ((group_1, group_2), distance) in pairs {
        writer.serialize(DistanceRecord {
            group_1: group_1.clone(),
            group_2: group_2.clone(),
            distance: *distance,
        })?;
    }
    writer.flush()?;
    Ok(())
}
