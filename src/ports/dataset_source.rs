//! Dataset source port: where the workbench fetches CSV files from.

use crate::domain::error::TradestatsError;

pub trait DatasetSource {
    /// Relative paths of every available CSV file, `/`-separated.
    fn list_files(&self) -> Result<Vec<String>, TradestatsError>;

    /// Raw bytes of one file.
    fn fetch(&self, relative_path: &str) -> Result<Vec<u8>, TradestatsError>;
}
