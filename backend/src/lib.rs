pub mod logger;
pub mod encoding;
pub mod xml_tree;
pub mod mixed_content;
pub mod tei_json;
pub mod side_channel;
pub mod tei_entry;
pub mod stats;
pub mod db;

use std::env;
use std::error::Error;
use std::fs::create_dir_all;
use std::path::PathBuf;

use app_dirs::{AppDataType, AppInfo, get_app_root};

pub use mixed_content::TagRules;
pub use tei_entry::{EntryError, TeiEntry, parse_tei_entry, parse_tei_file};
pub use tei_json::document_to_json;
pub use xml_tree::{Document, Element, XmlTreeError};

pub const APP_INFO: AppInfo = AppInfo { name: "wbdict", author: "wbdict" };

/// The wbdict data dir: `WBDICT_DIR` when set, otherwise the platform user data dir.
/// Created if missing.
pub fn get_create_wbdict_dir() -> Result<PathBuf, Box<dyn Error>> {
    let p = match env::var("WBDICT_DIR") {
        Ok(s) if !s.is_empty() => PathBuf::from(s),
        _ => get_app_root(AppDataType::UserData, &APP_INFO)?,
    };
    if !p.exists() {
        create_dir_all(&p)?;
    }
    Ok(p)
}
