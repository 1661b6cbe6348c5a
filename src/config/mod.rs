use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CoreError, CoreResult};

const CONFIG_FILE: &str = "config.json";
const TMP_SUFFIX: &str = "tmp";

/// Operational settings supplied by the host application. Every
/// session-scoped write fails when `default_session` is unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_per_luwang: Option<Decimal>,
    pub default_interest_rate: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_limit: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_session: Option<Uuid>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rate_per_luwang: None,
            default_interest_rate: Decimal::ZERO,
            debt_limit: None,
            default_session: None,
        }
    }
}

impl Settings {
    pub fn require_default_session(&self) -> CoreResult<Uuid> {
        self.default_session
            .ok_or_else(|| CoreError::Configuration("no default session configured".into()))
    }

    pub fn require_rate_per_luwang(&self) -> CoreResult<Decimal> {
        self.rate_per_luwang
            .ok_or_else(|| CoreError::Configuration("rate per luwang is not configured".into()))
    }

    pub fn require_debt_limit(&self) -> CoreResult<Decimal> {
        self.debt_limit
            .ok_or_else(|| CoreError::Configuration("debt limit is not configured".into()))
    }
}

/// Returns the application data directory, defaulting to
/// `~/.kabisilya_core`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = std::env::var_os("KABISILYA_CORE_HOME") {
        return PathBuf::from(custom);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kabisilya_core")
}

/// Loads and saves [`Settings`] as JSON under the app data directory.
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> CoreResult<Self> {
        Self::from_base(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> CoreResult<Self> {
        Self::from_base(base)
    }

    fn from_base(base: PathBuf) -> CoreResult<Self> {
        fs::create_dir_all(&base)?;
        Ok(Self {
            path: base.join(CONFIG_FILE),
        })
    }

    pub fn load(&self) -> CoreResult<Settings> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Settings::default())
        }
    }

    pub fn save(&self, settings: &Settings) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        let tmp = tmp_path(&self.path);
        {
            let mut file = File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    match tmp.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => tmp.set_extension(format!("{ext}.{TMP_SUFFIX}")),
        None => tmp.set_extension(TMP_SUFFIX),
    };
    tmp
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap();
        let settings = manager.load().unwrap();
        assert!(settings.default_session.is_none());
        assert_eq!(settings.default_interest_rate, Decimal::ZERO);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap();
        let session = Uuid::new_v4();
        let settings = Settings {
            rate_per_luwang: Some(dec!(50)),
            default_interest_rate: dec!(12),
            debt_limit: Some(dec!(10000)),
            default_session: Some(session),
        };
        manager.save(&settings).unwrap();

        let loaded = manager.load().unwrap();
        assert_eq!(loaded.rate_per_luwang, Some(dec!(50)));
        assert_eq!(loaded.default_session, Some(session));
    }

    #[test]
    fn require_helpers_surface_configuration_errors() {
        let settings = Settings::default();
        let err = settings.require_default_session().unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
        assert!(format!("{err}").contains("default session"));
    }
}
