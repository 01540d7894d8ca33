use anyhow::Result;
use lingdistance::{DataReader, Lexicon, PreprocessConfig, open_reader, preprocess_docs};
use log::info;
use num_format::{Locale, ToFormattedString};

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    env_logger::init();
    // parse environment variables `INPUT_PATH`, `OUTPUT_PATH`, `INPUT_FORMAT`, ...
    let config = PreprocessConfig::from_env()?;
    info!("input_path: {}", config.input_path.display());
    info!("output_path: {}", config.output_path.display());

    let lexicon = match &config.lexicon_path {
        Some(path) => {
            info!("lexicon: {}", path.display());
            Some(Lexicon::from_path(path, config.lexicon_format)?)
        }
        None => {
            info!("no lexicon given, counting raw tokens");
            None
        }
    };

    let documents = open_reader(config.input_format, &config.input_path).read_documents()?;
    info!("Read {} documents", documents.len());

    let summary = preprocess_docs(
        documents,
        lexicon.as_ref(),
        &config.output_path,
        &config.options,
    )?;
    println!(
        "Wrote {} documents ({} unique terms) to {}",
        summary.documents.to_formatted_string(&Locale::en),
        summary.unique_terms.to_formatted_string(&Locale::en),
        config.output_path.display()
    );
    Ok(())
}
