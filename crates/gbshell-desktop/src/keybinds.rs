use gbshell_core::bridge::InputMapping;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const KEYBINDS_FILE_NAME: &str = "keybinds.toml";

/// Host key name bound to each joypad button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub down: String,
    pub up: String,
    pub left: String,
    pub right: String,
    pub start: String,
    pub select: String,
    pub b: String,
    pub a: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            down: "S".to_string(),
            up: "W".to_string(),
            left: "A".to_string(),
            right: "D".to_string(),
            start: "Return".to_string(),
            select: "Shift".to_string(),
            b: "K".to_string(),
            a: "L".to_string(),
        }
    }
}

impl KeyBindings {
    pub fn load_from_file(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => return Self::default(),
        };

        match toml::from_str::<KeyBindings>(&text) {
            Ok(bindings) => bindings,
            Err(e) => {
                warn!(
                    "Failed to parse keybinds {}: {e}; using defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }

    pub fn save_to_file(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, text)?;
        info!("Saved keybinds to {}", path.display());
        Ok(())
    }

    /// `(button, key)` pairs in joypad order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("down", self.down.as_str()),
            ("up", self.up.as_str()),
            ("left", self.left.as_str()),
            ("right", self.right.as_str()),
            ("start", self.start.as_str()),
            ("select", self.select.as_str()),
            ("b", self.b.as_str()),
            ("a", self.a.as_str()),
        ]
        .into_iter()
    }

    pub fn key_for_button(&self, button: &str) -> Option<&str> {
        let button = button.to_ascii_lowercase();
        self.iter()
            .find(|(name, _)| *name == button)
            .map(|(_, key)| key)
    }

    pub fn mapping(&self) -> InputMapping<String> {
        InputMapping {
            down: self.down.clone(),
            up: self.up.clone(),
            left: self.left.clone(),
            right: self.right.clone(),
            start: self.start.clone(),
            select: self.select.clone(),
            b: self.b.clone(),
            a: self.a.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let bindings = KeyBindings::load_from_file(&dir.path().join(KEYBINDS_FILE_NAME));
        assert_eq!(bindings, KeyBindings::default());
    }

    #[test]
    fn partial_file_overrides_named_buttons_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(KEYBINDS_FILE_NAME);
        std::fs::write(&path, "a = \"Z\"\nstart = \"Enter\"\n").unwrap();

        let bindings = KeyBindings::load_from_file(&path);
        assert_eq!(bindings.a, "Z");
        assert_eq!(bindings.start, "Enter");
        assert_eq!(bindings.b, "K");
    }

    #[test]
    fn invalid_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(KEYBINDS_FILE_NAME);
        std::fs::write(&path, "a = [").unwrap();
        assert_eq!(KeyBindings::load_from_file(&path), KeyBindings::default());
    }

    #[test]
    fn saved_file_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(KEYBINDS_FILE_NAME);
        let bindings = KeyBindings {
            select: "Tab".to_string(),
            ..KeyBindings::default()
        };
        bindings.save_to_file(&path).unwrap();
        assert_eq!(KeyBindings::load_from_file(&path), bindings);
    }

    #[test]
    fn button_lookup_is_case_insensitive() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.key_for_button("Start"), Some("Return"));
        assert_eq!(bindings.key_for_button("b"), Some("K"));
        assert_eq!(bindings.key_for_button("turbo"), None);
    }
}
