//! FileItem entity
//!
//! The normalized representation of one filesystem entry, whichever provider
//! holds it. Adapters construct a `FileItem` when translating a raw back-end
//! record; after that only the local URL hint and the UI loading flag change.
//!
//! ## Persistence
//!
//! `FileItem` serializes to a flat JSON object with camelCase keys. Optional
//! fields decode to `None` when absent and unknown keys are ignored, so older
//! and newer persisted records remain readable.

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{ContentKey, ItemId, ProviderId};

// ============================================================================
// ContentType
// ============================================================================

/// Semantic content type of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Audio,
    Image,
    Document,
    Archive,
    #[serde(other)]
    Other,
}

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "mkv", "avi", "wmv", "flv", "webm", "mpg", "mpeg", "ts", "m2ts", "3gp",
    "ogv", "vob",
];
const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "flac", "wav", "ogg", "oga", "opus", "wma", "aiff", "alac", "ape",
];
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "heic", "heif", "tif", "tiff", "svg",
];
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "txt", "md", "doc", "docx", "rtf", "odt", "xls", "xlsx", "ppt", "pptx", "epub", "srt",
    "vtt", "ass",
];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz", "bz2", "xz"];

impl ContentType {
    /// Classify by file extension (case-insensitive)
    ///
    /// Returns `None` when the name has no extension.
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        let ext = ext.as_str();
        Some(if VIDEO_EXTENSIONS.contains(&ext) {
            ContentType::Video
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            ContentType::Audio
        } else if IMAGE_EXTENSIONS.contains(&ext) {
            ContentType::Image
        } else if DOCUMENT_EXTENSIONS.contains(&ext) {
            ContentType::Document
        } else if ARCHIVE_EXTENSIONS.contains(&ext) {
            ContentType::Archive
        } else {
            ContentType::Other
        })
    }

    /// Classify by MIME type, e.g. `video/mp4`
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        let (top, sub) = mime.split_once('/')?;
        Some(match top {
            "video" => ContentType::Video,
            "audio" => ContentType::Audio,
            "image" => ContentType::Image,
            "text" => ContentType::Document,
            "application" => match sub {
                "pdf" | "rtf" | "epub+zip" | "msword" => ContentType::Document,
                s if s.starts_with("vnd.openxmlformats") || s.starts_with("vnd.oasis") => {
                    ContentType::Document
                }
                "zip" | "gzip" | "x-tar" | "x-7z-compressed" | "vnd.rar" | "x-bzip2" | "x-xz" => {
                    ContentType::Archive
                }
                _ => ContentType::Other,
            },
            _ => ContentType::Other,
        })
    }

    /// Parse the user-facing filter name (`video`, `audio`, ...)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "video" => Some(ContentType::Video),
            "audio" => Some(ContentType::Audio),
            "image" => Some(ContentType::Image),
            "document" => Some(ContentType::Document),
            "archive" => Some(ContentType::Archive),
            "other" => Some(ContentType::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::Audio => "audio",
            ContentType::Image => "image",
            ContentType::Document => "document",
            ContentType::Archive => "archive",
            ContentType::Other => "other",
        }
    }
}

// ============================================================================
// FileItem
// ============================================================================

/// One filesystem entry as seen by the browsing layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    id: ItemId,
    name: String,
    is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<ContentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    modified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<ItemId>,
    provider_id: ProviderId,
    #[serde(default, rename = "localURLHint", skip_serializing_if = "Option::is_none")]
    local_url_hint: Option<PathBuf>,
    /// Transient UI flag, never persisted
    #[serde(skip)]
    is_loading: bool,
}

impl FileItem {
    /// Create a file entry; the content type is guessed from the name
    pub fn file(provider_id: ProviderId, id: ItemId, name: impl Into<String>) -> Self {
        let name = name.into();
        let content_type = ContentType::from_name(&name);
        Self {
            id,
            name,
            is_directory: false,
            size: None,
            content_type,
            created_at: None,
            modified_at: None,
            parent_id: None,
            provider_id,
            local_url_hint: None,
            is_loading: false,
        }
    }

    /// Create a directory entry
    pub fn directory(provider_id: ProviderId, id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_directory: true,
            size: None,
            content_type: None,
            created_at: None,
            modified_at: None,
            parent_id: None,
            provider_id,
            local_url_hint: None,
            is_loading: false,
        }
    }

    /// Set the size; ignored for directories
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        if !self.is_directory {
            self.size = Some(size);
        }
        self
    }

    /// Override the guessed content type; ignored for directories
    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        if !self.is_directory {
            self.content_type = Some(content_type);
        }
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    #[must_use]
    pub fn with_modified_at(mut self, modified_at: DateTime<Utc>) -> Self {
        self.modified_at = Some(modified_at);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: ItemId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    // --- accessors ---

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn content_type(&self) -> Option<ContentType> {
        self.content_type
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn parent_id(&self) -> Option<&ItemId> {
        self.parent_id.as_ref()
    }

    pub fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    pub fn local_url_hint(&self) -> Option<&Path> {
        self.local_url_hint.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    // --- mutable after construction ---

    /// Remember where the content was materialized; ignored for directories
    pub fn set_local_url_hint(&mut self, path: PathBuf) {
        if !self.is_directory {
            self.local_url_hint = Some(path);
        }
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    // --- derived ---

    /// Cache address of this item's bytes
    pub fn key(&self) -> ContentKey {
        ContentKey::new(&self.provider_id, &self.id)
    }

    pub fn is_video(&self) -> bool {
        self.content_type == Some(ContentType::Video)
    }

    pub fn is_audio(&self) -> bool {
        self.content_type == Some(ContentType::Audio)
    }

    pub fn is_image(&self) -> bool {
        self.content_type == Some(ContentType::Image)
    }

    /// True for items a media player can open
    pub fn is_playable(&self) -> bool {
        self.is_video() || self.is_audio()
    }

    /// Human-readable size using binary units; `None` for directories
    pub fn formatted_size(&self) -> Option<String> {
        self.size.map(format_size)
    }

    /// Compares every field a listing consumer can observe
    ///
    /// `==` only compares identity; this is what change detection uses.
    pub fn same_snapshot(&self, other: &FileItem) -> bool {
        self == other
            && self.name == other.name
            && self.is_directory == other.is_directory
            && self.size == other.size
            && self.modified_at == other.modified_at
    }
}

impl PartialEq for FileItem {
    fn eq(&self, other: &Self) -> bool {
        self.provider_id == other.provider_id && self.id == other.id
    }
}

impl Eq for FileItem {}

impl Hash for FileItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.provider_id.hash(state);
        self.id.hash(state);
    }
}

/// Format a byte count, e.g. `10 bytes`, `1.5 KB`, `3.2 GB`
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["KB", "MB", "GB", "TB"];
    if bytes == 1 {
        return "1 byte".to_string();
    }
    if bytes < 1024 {
        return format!("{} bytes", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
