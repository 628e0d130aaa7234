//! Page content records.
//!
//! Each page is addressed by `(page_id, content_type)` and stored in a JSON
//! file next to the kiosk. A missing file is not an error: the built-in
//! defaults give every signal a titled page.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Content file error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid content file: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a page arranges its parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageLayout {
    #[default]
    TitleOnly,
    TextOnly,
    TextAndMedia,
    MediaOnly,
}

impl PageLayout {
    pub fn shows_text(&self) -> bool {
        matches!(self, PageLayout::TextOnly | PageLayout::TextAndMedia)
    }

    pub fn shows_media(&self) -> bool {
        matches!(self, PageLayout::TextAndMedia | PageLayout::MediaOnly)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageContent {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub layout: PageLayout,
    #[serde(default)]
    pub text_content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaRef>,
}

impl PageContent {
    /// Built-in page for a signal
    pub fn default_for(page_id: u8) -> Self {
        Self {
            title: config::default_signal_name(page_id),
            subtitle: format!("Signal {}", page_id),
            layout: PageLayout::TitleOnly,
            text_content: String::new(),
            media: Vec::new(),
        }
    }
}

/// On-disk record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContentRecord {
    page_id: u8,
    #[serde(default = "default_content_type")]
    content_type: String,
    #[serde(flatten)]
    content: PageContent,
}

fn default_content_type() -> String {
    config::SIGNAL_CONTENT_TYPE.to_string()
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ContentFile {
    #[serde(default)]
    pages: Vec<ContentRecord>,
}

type ContentKey = (u8, String);

/// Keyed page records, optionally backed by a file
#[derive(Debug, Clone)]
pub struct ContentStore {
    path: Option<PathBuf>,
    records: BTreeMap<ContentKey, PageContent>,
}

impl ContentStore {
    /// In-memory store holding the built-in pages
    pub fn defaults() -> Self {
        let records = (config::SIGNAL_MIN..=config::SIGNAL_MAX)
            .map(|id| {
                (
                    (id, config::SIGNAL_CONTENT_TYPE.to_string()),
                    PageContent::default_for(id),
                )
            })
            .collect();
        Self {
            path: None,
            records,
        }
    }

    /// Load records from `path`, layered over the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let path = path.as_ref();
        let mut store = Self::defaults();
        store.path = Some(path.to_path_buf());

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No content file at {}, using built-in pages", path.display());
                return Ok(store);
            }
            Err(e) => return Err(e.into()),
        };

        let file: ContentFile = serde_json::from_str(&text)?;
        let count = file.pages.len();
        for record in file.pages {
            store
                .records
                .insert((record.page_id, record.content_type), record.content);
        }
        log::info!("Loaded {} content records from {}", count, path.display());

        Ok(store)
    }

    /// Load, falling back to the defaults if the file is unreadable
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(store) => store,
            Err(e) => {
                log::error!("Failed to load {}: {}", path.display(), e);
                let mut store = Self::defaults();
                store.path = Some(path.to_path_buf());
                store
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, page_id: u8, content_type: &str) -> Option<&PageContent> {
        self.records.get(&(page_id, content_type.to_string()))
    }

    /// Signal page for `page_id`, never missing
    pub fn page(&self, page_id: u8) -> PageContent {
        self.get(page_id, config::SIGNAL_CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| PageContent::default_for(page_id))
    }

    pub fn put(&mut self, page_id: u8, content_type: &str, content: PageContent) {
        self.records
            .insert((page_id, content_type.to_string()), content);
    }

    /// Titles of the signal pages, indexed by `signal_id - 1`
    pub fn display_names(&self) -> Vec<String> {
        (config::SIGNAL_MIN..=config::SIGNAL_MAX)
            .map(|id| self.page(id).title)
            .collect()
    }

    /// Write back to the file this store was loaded from
    pub fn save(&self) -> Result<(), ContentError> {
        match &self.path {
            Some(path) => self.save_to(path),
            None => Err(ContentError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "content store has no backing file",
            ))),
        }
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ContentError> {
        let file = ContentFile {
            pages: self
                .records
                .iter()
                .map(|((page_id, content_type), content)| ContentRecord {
                    page_id: *page_id,
                    content_type: content_type.clone(),
                    content: content.clone(),
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(path.as_ref(), json)?;
        log::info!("Saved content to {}", path.as_ref().display());
        Ok(())
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "signal-kiosk-{}-{}.json",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn test_defaults_cover_every_signal() {
        let store = ContentStore::defaults();
        for id in 1..=10 {
            let page = store.get(id, "signal").unwrap();
            assert_eq!(page.title, config::default_signal_name(id));
            assert_eq!(page.layout, PageLayout::TitleOnly);
        }
        assert!(store.get(11, "signal").is_none());
        assert!(store.get(1, "banner").is_none());
    }

    #[test]
    fn test_page_never_missing() {
        let store = ContentStore::defaults();
        assert_eq!(store.page(42).title, "Signal 42");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);

        let store = ContentStore::load(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        assert_eq!(store.display_names()[0], "System Start");
    }

    #[test]
    fn test_load_overrides_defaults() {
        let path = temp_path("override");
        fs::write(
            &path,
            r#"{
                "pages": [
                    {
                        "page_id": 3,
                        "title": "Lane Keeping",
                        "subtitle": "Stage 3",
                        "layout": "text_and_media",
                        "text_content": "Hands on the wheel.",
                        "media": [{ "kind": "image", "path": "media/lane.png" }]
                    },
                    { "page_id": 3, "content_type": "banner", "title": "Banner" }
                ]
            }"#,
        )
        .unwrap();

        let store = ContentStore::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        let page = store.page(3);
        assert_eq!(page.title, "Lane Keeping");
        assert_eq!(page.layout, PageLayout::TextAndMedia);
        assert!(page.layout.shows_media());
        assert_eq!(page.media[0].kind, MediaKind::Image);
        assert_eq!(store.get(3, "banner").unwrap().title, "Banner");
        assert_eq!(store.get(3, "banner").unwrap().layout, PageLayout::TitleOnly);
        // Untouched pages keep their defaults
        assert_eq!(store.page(4).title, config::default_signal_name(4));
        assert_eq!(store.display_names()[2], "Lane Keeping");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let path = temp_path("invalid");
        fs::write(&path, "{ not json").unwrap();

        let result = ContentStore::load(&path);
        assert!(matches!(result, Err(ContentError::Json(_))));

        let store = ContentStore::load_or_default(&path);
        fs::remove_file(&path).unwrap();
        assert_eq!(store.page(1).title, "System Start");
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_path("save");
        let mut store = ContentStore::load(&path).unwrap();
        store.put(
            7,
            "signal",
            PageContent {
                title: "Sensors Online".into(),
                subtitle: String::new(),
                layout: PageLayout::MediaOnly,
                text_content: String::new(),
                media: vec![MediaRef {
                    kind: MediaKind::Video,
                    path: PathBuf::from("media/sensors.mp4"),
                }],
            },
        );
        store.save().unwrap();

        let reloaded = ContentStore::load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(reloaded.page(7), store.page(7));
        assert_eq!(reloaded.page(1), store.page(1));
    }

    #[test]
    fn test_save_without_path_fails() {
        assert!(ContentStore::defaults().save().is_err());
    }
}
