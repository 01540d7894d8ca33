use indicatif::ProgressStyle;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A plain file is returned as is; a directory is searched recursively
/// for files ending in `.{ext}`.
pub fn files_with_extension(path: &Path, ext: &str) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<_> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|found| found == ext))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Hex SHA-1 of a token. Hides tokens from casual reading only: anyone can
/// rebuild the mapping by hashing a word list.
#[inline]
pub(crate) fn token_hash(token: &str) -> String {
    format!("{:x}", Sha1::digest(token.as_bytes()))
}

pub(crate) fn progress_style() -> anyhow::Result<ProgressStyle> {
    Ok(ProgressStyle::default_bar().template("[{elapsed_precise}] [{wide_bar}] {pos}/{len} ({eta})")?)
}
