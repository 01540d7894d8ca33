use anyhow::Result;
use lingdistance::{DataReader, JsonDataReader, MeasureConfig, measure_distances, write_distances};
use log::info;
use num_format::{Locale, ToFormattedString};

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    env_logger::init();
    let config = MeasureConfig::from_env()?;
    info!("input_path: {}", config.input_path.display());
    info!("output_path: {}", config.output_path.display());
    info!("comparison: {:?}", config.comparison);

    let documents = JsonDataReader::new(&config.input_path).read_documents()?;
    info!("Read {} documents", documents.len());

    let distances = measure_distances(
        &documents,
        config.comparison,
        config.group_key.as_deref(),
        &config.options,
    )?;
    write_distances(&distances, &config.output_path)?;
    println!(
        "Wrote {} distances to {}",
        distances.len().to_formatted_string(&Locale::en),
        config.output_path.display()
    );
    Ok(())
}
