use std::env;
use std::path::{Path, PathBuf};

use wbdict_backend::db::DatabaseHandle;

/// Points the wbdict dir at a scratch directory and keeps the file log quiet.
pub fn test_env_setup(dir: &Path) {
    unsafe {
        env::set_var("WBDICT_DIR", dir);
        env::set_var("DISABLE_LOG", "true");
    }
}

pub fn tei_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/tei")
}

#[allow(dead_code)]
pub fn tei_fixture(name: &str) -> PathBuf {
    tei_data_dir().join(name)
}

#[allow(dead_code)]
pub fn open_test_db(dir: &Path) -> DatabaseHandle {
    DatabaseHandle::open(&dir.join("entries.sqlite3"), true).expect("Can't open test database")
}
