#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const TOKEN: &str = "test-token";

pub const EXPORTS_CSV: &str = "\
flujo,año,pais_nombre,provincia_nombre,value
E,2021,Francia,Madrid,150
E,2020,Francia,Madrid,100
E,2020,Alemania,Barcelona,80
";

pub const IMPORTS_CSV: &str = "\
flujo,año,pais_nombre,provincia_nombre,value
I,2020,Francia,Madrid,200
I,2021,Francia,Madrid,100
I,2020,Alemania,Barcelona,0
";

/// A temporary directory holding `data/` (the served root) and a
/// `secret.csv` next to it, outside the root.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let fixture = Self { dir };
        fs::create_dir_all(fixture.root().join("provincias")).unwrap();
        fixture.write("exportaciones.csv", EXPORTS_CSV);
        fixture.write("importaciones.csv", IMPORTS_CSV);
        fixture.write(
            "provincias/madrid.csv",
            "año,provincia_nombre,value\n2020,Madrid,10\n2021,Madrid,12\n",
        );
        fixture.write(
            "provincias/barcelona.csv",
            "año,provincia_nombre,value\n2020,Barcelona,7\n",
        );
        fixture.write("notes.txt", "not a dataset\n");
        fs::write(fixture.dir.path().join("secret.csv"), "k\nhidden\n").unwrap();
        fixture
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// INI using the local data root, with optional extra lines.
    pub fn local_ini(&self, extra: &str) -> PathBuf {
        let content = format!(
            "[server]\ndata_folder = {}\napi_token = {TOKEN}\n{extra}",
            self.root().display()
        );
        let path = self.dir.path().join("tradestats.ini");
        fs::write(&path, content).unwrap();
        path
    }

    pub fn out(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

pub fn read(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap()
}

#[cfg(feature = "web")]
pub fn test_app(root: &Path) -> axum::Router {
    use std::sync::Arc;
    use tradestats::adapters::fs_catalog::FsCatalog;
    use tradestats::adapters::web::{AppState, build_router};

    build_router(AppState {
        catalog: Arc::new(FsCatalog::new(root.to_path_buf())),
        api_token: TOKEN.to_string(),
    })
}
