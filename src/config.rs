use crate::jensen_shannon::DistanceOptions;
use crate::lexicon::LexiconFormat;
use crate::preprocessing::PreprocessOptions;
use crate::structs::{ComparisonType, DataFormat};
use anyhow::{Context, Result, anyhow, bail};
use std::path::PathBuf;
use std::str::FromStr;

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("environment variable {key} must be set"))
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim().parse::<T>().with_context(|| format!("invalid {key}: '{v}'")))
        .transpose()
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<bool> {
    match lookup(key).map(|v| v.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("0") | Some("false") | Some("no") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some(other) => bail!("invalid {key}: '{other}'"),
    }
}

#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub input_format: DataFormat,
    pub lexicon_path: Option<PathBuf>,
    pub lexicon_format: LexiconFormat,
    pub options: PreprocessOptions,
}

impl PreprocessConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `INPUT_PATH`, `OUTPUT_PATH`, `INPUT_FORMAT`, `TEXT_KEY`,
    /// `LEXICON_PATH`, `LEXICON_FORMAT`, `TOKEN_HASHING`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let input_path = PathBuf::from(required(&lookup, "INPUT_PATH")?);
        let output_path = PathBuf::from(required(&lookup, "OUTPUT_PATH")?);
        if output_path.extension().is_none_or(|ext| ext != "json") {
            bail!(
                "OUTPUT_PATH must be a .json file, got {}",
                output_path.display()
            );
        }
        let input_format: DataFormat = required(&lookup, "INPUT_FORMAT")?.parse()?;
        let lexicon_path = lookup("LEXICON_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let lexicon_format: LexiconFormat = lookup("LEXICON_FORMAT")
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();

        let mut options = PreprocessOptions {
            token_hashing: flag(&lookup, "TOKEN_HASHING")?,
            ..Default::default()
        };
        // eml bodies always land under "body"
        if input_format == DataFormat::Eml {
            options.text_key = "body".to_owned();
        } else if let Some(text_key) = lookup("TEXT_KEY").filter(|v| !v.is_empty()) {
            options.text_key = text_key;
        }

        Ok(Self {
            input_path,
            output_path,
            input_format,
            lexicon_path,
            lexicon_format,
            options,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MeasureConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub comparison: ComparisonType,
    pub group_key: Option<String>,
    pub options: DistanceOptions,
}

impl MeasureConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `INPUT_PATH`, `OUTPUT_PATH`, `COMPARISON_TYPE`, `GROUP_KEY`,
    /// `MIN_GROUP_SIZE`, `TERMS_KEY`, `VOCAB_SIZE`, `SAMPLE_SIZE`, `SEED`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let input_path = PathBuf::from(required(&lookup, "INPUT_PATH")?);
        let output_path = PathBuf::from(required(&lookup, "OUTPUT_PATH")?);
        let comparison: ComparisonType = lookup("COMPARISON_TYPE")
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(ComparisonType::Dyadic);
        let group_key = lookup("GROUP_KEY").filter(|v| !v.trim().is_empty());
        if comparison == ComparisonType::GroupToGroup && group_key.is_none() {
            bail!("GROUP_KEY must be set for group-to-group comparisons");
        }

        let defaults = DistanceOptions::default();
        let options = DistanceOptions {
            terms_key: lookup("TERMS_KEY")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.terms_key),
            target_group: None,
            vocab_size: parsed(&lookup, "VOCAB_SIZE")?.unwrap_or(defaults.vocab_size),
            sample_size: parsed(&lookup, "SAMPLE_SIZE")?,
            min_group_size: parsed(&lookup, "MIN_GROUP_SIZE")?.unwrap_or(defaults.min_group_size),
            seed: parsed(&lookup, "SEED")?,
        };

        Ok(Self {
            input_path,
            output_path,
            comparison,
            group_key,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: AHashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_preprocess_config_defaults() {
        let config = PreprocessConfig::from_lookup(env(&[
            ("INPUT_PATH", "data/mail.csv"),
            ("OUTPUT_PATH", "out/mail.json"),
            ("INPUT_FORMAT", "csv"),
        ]))
        .unwrap();
        assert_eq!(config.input_format, DataFormat::Csv);
        assert_eq!(config.options.text_key, "text");
        assert_eq!(config.options.counts_key, "terms");
        assert!(!config.options.token_hashing);
        assert!(config.lexicon_path.is_none());
        assert_eq!(config.lexicon_format, LexiconFormat::WordRows);
    }

    #[test]
    fn test_preprocess_config_eml_uses_body() {
        let config = PreprocessConfig::from_lookup(env(&[
            ("INPUT_PATH", "maildir"),
            ("OUTPUT_PATH", "out.json"),
            ("INPUT_FORMAT", "eml"),
            ("TEXT_KEY", "content"),
            ("LEXICON_PATH", "liwc.csv"),
            ("LEXICON_FORMAT", "columns"),
            ("TOKEN_HASHING", "true"),
        ]))
        .unwrap();
        assert_eq!(config.options.text_key, "body");
        assert!(config.options.token_hashing);
        assert_eq!(config.lexicon_path, Some(PathBuf::from("liwc.csv")));
        assert_eq!(config.lexicon_format, LexiconFormat::CategoryColumns);
    }

    #[test]
    fn test_preprocess_config_rejects_bad_values() {
        let base = [
            ("INPUT_PATH", "in.csv"),
            ("OUTPUT_PATH", "out.json"),
            ("INPUT_FORMAT", "csv"),
        ];
        assert!(PreprocessConfig::from_lookup(env(&base)).is_ok());

        let mut vars = base.to_vec();
        vars[1] = ("OUTPUT_PATH", "out.csv");
        assert!(PreprocessConfig::from_lookup(env(&vars)).is_err());

        let mut vars = base.to_vec();
        vars[2] = ("INPUT_FORMAT", "xml");
        assert!(PreprocessConfig::from_lookup(env(&vars)).is_err());

        let mut vars = base.to_vec();
        vars.push(("TOKEN_HASHING", "maybe"));
        assert!(PreprocessConfig::from_lookup(env(&vars)).is_err());

        assert!(PreprocessConfig::from_lookup(env(&base[1..])).is_err());
    }

    #[test]
    fn test_measure_config_defaults() {
        let config = MeasureConfig::from_lookup(env(&[
            ("INPUT_PATH", "out.json"),
            ("OUTPUT_PATH", "distances.csv"),
        ]))
        .unwrap();
        assert_eq!(config.comparison, ComparisonType::Dyadic);
        assert_eq!(config.options.terms_key, "terms");
        assert_eq!(config.options.vocab_size, 1000);
        assert_eq!(config.options.min_group_size, 0);
        assert_eq!(config.options.sample_size, None);
        assert_eq!(config.options.seed, None);
    }

    #[test]
    fn test_measure_config_group_to_group() {
        let vars = [
            ("INPUT_PATH", "out.json"),
            ("OUTPUT_PATH", "distances.csv"),
            ("COMPARISON_TYPE", "group-to-group"),
        ];
        assert!(MeasureConfig::from_lookup(env(&vars)).is_err());

        let mut vars = vars.to_vec();
        vars.extend([
            ("GROUP_KEY", "unit"),
            ("MIN_GROUP_SIZE", "5"),
            ("SAMPLE_SIZE", "20"),
            ("SEED", "7"),
            ("VOCAB_SIZE", "50"),
        ]);
        let config = MeasureConfig::from_lookup(env(&vars)).unwrap();
        assert_eq!(config.group_key.as_deref(), Some("unit"));
        assert_eq!(config.options.min_group_size, 5);
        assert_eq!(config.options.sample_size, Some(20));
        assert_eq!(config.options.seed, Some(7));
        assert_eq!(config.options.vocab_size, 50);

        vars.push(("VOCAB_SIZE", "lots"));
        assert!(MeasureConfig::from_lookup(env(&vars)).is_err());
    }
}
