//! Durable frontend configuration: directories, recently opened programs and
//! named color schemes, persisted to `config.ini`.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::{ParseError, StorageError};
use crate::ini::{self, Document, Section};
use crate::palette::ColorScheme;

pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Number of `recent_N` slots.
pub const RECENT_CAPACITY: usize = 10;

const PATHS_SECTION: &str = "Paths";
const COLORS_SECTION: &str = "Colors";
const LAST_ROM_DIR_KEY: &str = "last_rom_dir";
const BOOT_ROM_DIR_KEY: &str = "boot_rom_dir";

/// Most-recent-first list of program paths with a fixed capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentList {
    entries: VecDeque<PathBuf>,
}

impl RecentList {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(RECENT_CAPACITY),
        }
    }

    /// Insert at the front, evicting the oldest entry when full. Duplicates
    /// are kept.
    pub fn push_front(&mut self, path: PathBuf) {
        self.entries.push_front(path);
        self.entries.truncate(RECENT_CAPACITY);
    }

    pub fn get(&self, slot: usize) -> Option<&Path> {
        self.entries.get(slot).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub last_rom_dir: PathBuf,
    pub boot_rom_dir: Option<PathBuf>,
    pub recent: RecentList,
}

/// In-memory image of `config.ini`.
///
/// Color schemes are kept in their encoded form so that an entry which fails
/// to decode is still written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    pub paths: Paths,
    pub color_schemes: BTreeMap<String, String>,
}

impl ConfigRecord {
    /// Defaults written on first run.
    pub fn defaults(directory: &Path) -> Self {
        let color_schemes = ColorScheme::BUILT_IN
            .iter()
            .map(|(name, scheme)| (name.to_string(), scheme.encode()))
            .collect();
        Self {
            paths: Paths {
                last_rom_dir: directory.to_path_buf(),
                boot_rom_dir: None,
                recent: RecentList::new(),
            },
            color_schemes,
        }
    }

    fn from_document(doc: &Document, path: &Path) -> Self {
        let empty = Section::default();
        let paths = doc.section(PATHS_SECTION).unwrap_or(&empty);
        let colors = doc.section(COLORS_SECTION).unwrap_or(&empty);

        for section in &doc.sections {
            if section.name != PATHS_SECTION && section.name != COLORS_SECTION {
                warn!(
                    "Ignoring unknown section [{}] in {}",
                    section.name,
                    path.display()
                );
            }
        }
        for (key, _) in &paths.entries {
            if key != LAST_ROM_DIR_KEY && key != BOOT_ROM_DIR_KEY && recent_slot(key).is_none() {
                warn!("Ignoring unknown key '{key}' in [Paths] of {}", path.display());
            }
        }

        let mut slots: Vec<PathBuf> = Vec::with_capacity(RECENT_CAPACITY);
        let mut gap = false;
        for slot in 0..RECENT_CAPACITY {
            match paths.get(&recent_key(slot)).filter(|v| !v.is_empty()) {
                Some(value) => {
                    if gap {
                        warn!(
                            "recent_{slot} follows an empty slot in {}; compacting",
                            path.display()
                        );
                        gap = false;
                    }
                    slots.push(PathBuf::from(value));
                }
                None => gap = true,
            }
        }
        let mut recent = RecentList::new();
        for entry in slots.into_iter().rev() {
            recent.push_front(entry);
        }

        let mut color_schemes = BTreeMap::new();
        for (name, value) in &colors.entries {
            if let Err(e) = ColorScheme::decode(value) {
                warn!(
                    "Color scheme '{name}' in {} is malformed: {e}",
                    path.display()
                );
            }
            if color_schemes.insert(name.clone(), value.clone()).is_some() {
                warn!(
                    "Color scheme '{name}' is defined twice in {}; keeping the last",
                    path.display()
                );
            }
        }

        Self {
            paths: Paths {
                last_rom_dir: PathBuf::from(paths.get(LAST_ROM_DIR_KEY).unwrap_or_default()),
                boot_rom_dir: paths
                    .get(BOOT_ROM_DIR_KEY)
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from),
                recent,
            },
            color_schemes,
        }
    }

    fn to_document(&self) -> Document {
        let mut paths = Section::new(PATHS_SECTION);
        paths.push(LAST_ROM_DIR_KEY, path_value(&self.paths.last_rom_dir));
        paths.push(
            BOOT_ROM_DIR_KEY,
            self.paths
                .boot_rom_dir
                .as_deref()
                .map(path_value)
                .unwrap_or_default(),
        );
        for slot in 0..RECENT_CAPACITY {
            let value = self.paths.recent.get(slot).map(path_value).unwrap_or_default();
            paths.push(recent_key(slot), value);
        }

        let mut colors = Section::new(COLORS_SECTION);
        for (name, value) in &self.color_schemes {
            colors.push(name.clone(), value.clone());
        }

        Document {
            sections: vec![paths, colors],
        }
    }
}

fn recent_key(slot: usize) -> String {
    format!("recent_{slot}")
}

fn recent_slot(key: &str) -> Option<usize> {
    key.strip_prefix("recent_")?
        .parse()
        .ok()
        .filter(|&slot| slot < RECENT_CAPACITY)
}

fn path_value(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn check_path(what: &'static str, path: &Path) -> Result<(), StorageError> {
    let value = path_value(path);
    ini::check_value(&value).map_err(|reason| StorageError::Unrepresentable {
        what,
        value,
        reason,
    })
}

fn check_scheme_name(name: &str) -> Result<(), StorageError> {
    ini::check_key(name).map_err(|reason| StorageError::Unrepresentable {
        what: "color scheme name",
        value: name.to_string(),
        reason,
    })
}

/// Owns the [`ConfigRecord`] and the file it is persisted to. Every mutation
/// is saved before returning.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    record: ConfigRecord,
}

impl ConfigStore {
    /// Read `config.ini` from `directory`, or create it with defaults.
    pub fn load(directory: impl AsRef<Path>) -> Result<Self, StorageError> {
        let directory = directory.as_ref();
        let path = directory.join(CONFIG_FILE_NAME);

        if !path.is_file() {
            info!("No config at {}; writing defaults", path.display());
            let store = Self {
                record: ConfigRecord::defaults(directory),
                path,
            };
            store.save()?;
            return Ok(store);
        }

        let text = std::fs::read_to_string(&path).map_err(|source| StorageError::Read {
            path: path.clone(),
            source,
        })?;
        let doc = Document::parse(&text, &path)?;
        let record = ConfigRecord::from_document(&doc, &path);
        debug!(
            "Loaded {} ({} recent, {} color schemes)",
            path.display(),
            record.paths.recent.len(),
            record.color_schemes.len()
        );
        Ok(Self { path, record })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self) -> &ConfigRecord {
        &self.record
    }

    /// Write the whole record. Readers see either the previous file or the new
    /// one, never a partial write.
    pub fn save(&self) -> Result<(), StorageError> {
        let text = self.record.to_document().render();
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, text).map_err(|source| StorageError::Write {
            path: tmp.clone(),
            source,
        })?;
        if let Err(source) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(StorageError::Rename {
                path: self.path.clone(),
                source,
            });
        }
        debug!("Saved {}", self.path.display());
        Ok(())
    }

    /// Apply `change` and save; on a failed save the in-memory record goes
    /// back to what is still on disk.
    fn commit(&mut self, change: impl FnOnce(&mut ConfigRecord)) -> Result<(), StorageError> {
        let previous = self.record.clone();
        change(&mut self.record);
        if let Err(e) = self.save() {
            self.record = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn recent_paths(&self) -> &RecentList {
        &self.record.paths.recent
    }

    pub fn add_recent_path(&mut self, path: impl Into<PathBuf>) -> Result<(), StorageError> {
        let path = path.into();
        check_path("recent path", &path)?;
        info!("Adding {} to recent programs", path.display());
        self.commit(|record| record.paths.recent.push_front(path))
    }

    pub fn last_rom_dir(&self) -> &Path {
        &self.record.paths.last_rom_dir
    }

    pub fn set_last_rom_dir(&mut self, dir: impl Into<PathBuf>) -> Result<(), StorageError> {
        let dir = dir.into();
        if dir == self.record.paths.last_rom_dir {
            return Ok(());
        }
        check_path("ROM directory", &dir)?;
        self.commit(|record| record.paths.last_rom_dir = dir)
    }

    pub fn boot_rom_dir(&self) -> Option<&Path> {
        self.record.paths.boot_rom_dir.as_deref()
    }

    pub fn set_boot_rom_dir(&mut self, dir: Option<PathBuf>) -> Result<(), StorageError> {
        if let Some(dir) = &dir {
            check_path("boot ROM directory", dir)?;
        }
        self.commit(|record| record.paths.boot_rom_dir = dir)
    }

    /// Decode every stored scheme. Malformed entries are reported per name.
    pub fn color_schemes(&self) -> BTreeMap<String, Result<ColorScheme, ParseError>> {
        self.record
            .color_schemes
            .iter()
            .map(|(name, value)| (name.clone(), ColorScheme::decode(value)))
            .collect()
    }

    pub fn color_scheme(&self, name: &str) -> Option<Result<ColorScheme, ParseError>> {
        self.record
            .color_schemes
            .get(name)
            .map(|value| ColorScheme::decode(value))
    }

    /// Store `scheme` under `name`, replacing any scheme of that name. Names
    /// that would not read back from `config.ini` are rejected.
    pub fn add_color_scheme(
        &mut self,
        name: impl Into<String>,
        scheme: ColorScheme,
    ) -> Result<(), StorageError> {
        let name = name.into();
        check_scheme_name(&name)?;
        info!("Saving color scheme '{name}'");
        self.commit(|record| {
            record.color_schemes.insert(name, scheme.encode());
        })
    }

    /// Remove `name` if present. Absent names are not an error.
    pub fn delete_color_scheme(&mut self, name: &str) -> Result<(), StorageError> {
        if self.record.color_schemes.contains_key(name) {
            info!("Deleting color scheme '{name}'");
        }
        self.commit(|record| {
            record.color_schemes.remove(name);
        })
    }
}
