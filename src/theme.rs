use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::domain::DashboardError;

/// Key under which the theme is stored in the preference file.
pub const THEME_PREFERENCE_KEY: &str = "dp-theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Forest,
    Ember,
    Violet,
}

pub const THEMES: [Theme; 5] = [
    Theme::Dark,
    Theme::Light,
    Theme::Forest,
    Theme::Ember,
    Theme::Violet,
];

/// Colors of one theme as RGB triples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: [u8; 3],
    pub surface: [u8; 3],
    pub text: [u8; 3],
    pub muted: [u8; 3],
    pub grid: [u8; 3],
    pub series: [[u8; 3]; 8],
}

const SERIES: [[u8; 3]; 8] = [
    [0, 229, 255],
    [255, 79, 216],
    [163, 255, 112],
    [255, 201, 77],
    [100, 130, 255],
    [255, 120, 80],
    [0, 200, 150],
    [220, 80, 180],
];

impl Theme {
    pub fn key(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::Forest => "forest",
            Theme::Ember => "ember",
            Theme::Violet => "violet",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Theme::Dark => "Midnight",
            Theme::Light => "Arctic Light",
            Theme::Forest => "Forest",
            Theme::Ember => "Ember",
            Theme::Violet => "Violet Dusk",
        }
    }

    pub fn from_key(key: &str) -> Option<Theme> {
        THEMES.iter().copied().find(|t| t.key() == key)
    }

    pub fn next(&self) -> Theme {
        let pos = THEMES.iter().position(|t| t == self).unwrap_or(0);
        THEMES[(pos + 1) % THEMES.len()]
    }

    pub fn is_dark(&self) -> bool {
        *self != Theme::Light
    }

    pub fn palette(&self) -> Palette {
        let (background, surface, text) = match self {
            Theme::Dark => ([10, 12, 16], [22, 27, 36], [232, 237, 245]),
            Theme::Light => ([240, 244, 250], [255, 255, 255], [26, 32, 48]),
            Theme::Forest => ([8, 14, 10], [18, 30, 22], [222, 240, 226]),
            Theme::Ember => ([14, 9, 5], [32, 22, 14], [245, 228, 214]),
            Theme::Violet => ([9, 8, 15], [24, 20, 38], [234, 228, 250]),
        };
        let (muted, grid) = if self.is_dark() {
            ([107, 122, 153], [31, 37, 53])
        } else {
            ([85, 96, 128], [221, 227, 239])
        };
        Palette {
            background,
            surface,
            text,
            muted,
            grid,
            series: SERIES,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Preferences {
    #[serde(rename = "dp-theme", default, skip_serializing_if = "Option::is_none")]
    theme: Option<String>,
}

/// File backed store for the persisted theme.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store in the user config directory, or the working directory if there is none.
    pub fn default_location() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("datapulse").join("preferences.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved theme. A missing or unreadable file gives the default theme.
    pub fn load_theme(&self) -> Theme {
        let prefs = match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str::<Preferences>(&content).unwrap_or_else(|e| {
                warn!("Ignoring invalid preference file {:?}: {e}", self.path);
                Preferences::default()
            }),
            Err(_) => Preferences::default(),
        };
        let theme = prefs
            .theme
            .as_deref()
            .and_then(Theme::from_key)
            .unwrap_or_default();
        debug!("Loaded theme {:?} from {:?}", theme, self.path);
        theme
    }

    pub fn save_theme(&self, theme: Theme) -> Result<(), DashboardError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let prefs = Preferences {
            theme: Some(theme.key().to_string()),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&prefs)?)?;
        debug!("Saved theme {:?} to {:?}", theme, self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for theme in THEMES {
            assert_eq!(Theme::from_key(theme.key()), Some(theme));
        }
        assert_eq!(Theme::from_key("neon"), None);
    }

    #[test]
    fn next_wraps_around() {
        assert_eq!(Theme::Dark.next(), Theme::Light);
        assert_eq!(Theme::Violet.next(), Theme::Dark);
    }

    #[test]
    fn missing_preferences_give_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("missing.json"));
        assert_eq!(store.load_theme(), Theme::Dark);
    }

    #[test]
    fn saved_theme_is_restored() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("nested").join("prefs.json"));
        store.save_theme(Theme::Ember).unwrap();
        assert_eq!(store.load_theme(), Theme::Ember);

        let content = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value[THEME_PREFERENCE_KEY], "ember");
    }

    #[test]
    fn invalid_preferences_give_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{\"dp-theme\": \"neon\"}").unwrap();
        assert_eq!(PreferenceStore::new(path.clone()).load_theme(), Theme::Dark);
        fs::write(&path, "not json").unwrap();
        assert_eq!(PreferenceStore::new(path).load_theme(), Theme::Dark);
    }
}
