mod config;
mod datareaders;
mod jensen_shannon;
mod lexicon;
mod measure;
mod preprocessing;
mod stemmer;
mod structs;
mod tokenizer;
mod utils;
pub use config::{MeasureConfig, PreprocessConfig};
pub use datareaders::{
    CsvDataReader, DataReader, EmlDataReader, JsonDataReader, clean_body, open_reader,
};
pub use jensen_shannon::{
    DistanceOptions, counts_to_distribution, jensen_shannon, measure_js_distances,
    measure_js_distances_by, term_count_distribution,
};
pub use lexicon::{Lexicon, LexiconFormat};
pub use measure::{WORLD_GROUP, measure_distances, write_distances};
pub use preprocessing::{PreprocessOptions, PreprocessSummary, preprocess_docs, preprocess_text};
pub use stemmer::{PorterStemmer, get_stem, measure, stem};
pub use structs::{
    ComparisonType, Counts, DataFormat, DistanceRecord, DistanceTable, Distribution, Document,
};
pub use tokenizer::Tokenizer;
pub use utils::files_with_extension;
