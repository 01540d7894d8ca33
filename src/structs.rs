use ahash::AHashMap;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type Document = serde_json::Map<String, serde_json::Value>;

pub type Counts = AHashMap<String, usize>;
pub type Distribution = AHashMap<String, f64>;

/// Jensen-Shannon distance per ordered group pair; both orders are present.
pub type DistanceTable = AHashMap<(String, String), f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Eml,
    Csv,
    Json,
}

impl DataFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DataFormat::Eml => "eml",
            DataFormat::Csv => "csv",
            DataFormat::Json => "json",
        }
    }
}

impl FromStr for DataFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "eml" => Ok(DataFormat::Eml),
            "csv" => Ok(DataFormat::Csv),
            "json" => Ok(DataFormat::Json),
            other => Err(anyhow!(
                "unsupported data format '{other}' (supported: eml, csv, json)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonType {
    /// A sender's messages against each interlocutor's messages.
    Dyadic,
    /// Everything a user sent against everything else they were part of.
    IndividualToWorld,
    GroupToGroup,
}

impl FromStr for ComparisonType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dyadic" => Ok(ComparisonType::Dyadic),
            "individual-to-world" => Ok(ComparisonType::IndividualToWorld),
            "group-to-group" => Ok(ComparisonType::GroupToGroup),
            other => Err(anyhow!("unsupported comparison type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistanceRecord {
    #[serde(rename = "Group 1")]
    pub group_1: String,
    #[serde(rename = "Group 2")]
    pub group_2: String,
    #[serde(rename = "Distance")]
    pub distance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        assert_eq!("EML".parse::<DataFormat>().unwrap(), DataFormat::Eml);
        assert_eq!(" json ".parse::<DataFormat>().unwrap(), DataFormat::Json);
        assert_eq!(DataFormat::Csv.extension(), "csv");
        assert!("xml".parse::<DataFormat>().is_err());
    }

    #[test]
    fn test_parse_comparison_types() {
        assert_eq!(
            "individual-to-world".parse::<ComparisonType>().unwrap(),
            ComparisonType::IndividualToWorld
        );
        assert_eq!(
            "group-to-group".parse::<ComparisonType>().unwrap(),
            ComparisonType::GroupToGroup
        );
        assert!("pairwise".parse::<ComparisonType>().is_err());
    }
}
