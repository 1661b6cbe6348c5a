use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::CoreResult;
use crate::store::memory::StoreState;

const TMP_SUFFIX: &str = "tmp";

/// Serializes the full store state to `path`, writing through a
/// temporary file and renaming so the snapshot is never half-written.
pub fn save_to_path(state: &StoreState, path: &Path) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_from_path(path: &Path) -> CoreResult<StoreState> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    match tmp.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => tmp.set_extension(format!("{ext}.{TMP_SUFFIX}")),
        None => tmp.set_extension(TMP_SUFFIX),
    };
    tmp
}
