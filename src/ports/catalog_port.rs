//! File catalog port served by the File Access Service.

use crate::domain::error::TradestatsError;

pub trait CatalogPort {
    /// Contents of a regular file under the data root.
    fn get_file(&self, relative_path: &str) -> Result<Vec<u8>, TradestatsError>;

    fn exists(&self, relative_path: &str) -> bool;

    /// Every catalog file under the root, recursively.
    fn list_files(&self) -> Result<Vec<String>, TradestatsError>;

    /// Catalog files directly inside one folder, as bare file names.
    fn list_folder(&self, folder: &str) -> Result<Vec<String>, TradestatsError>;
}
