//! Directory listing types
//!
//! Accepts both the camelCase names (`contentRef`, `uploadedAt`, `parentRef`)
//! and the snake_case wire names the file service actually sends (`file`,
//! `uploaded_at`, flat `parent_slug`/`parent_name`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::document::DocumentReference;

/// Child folder of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubfolderRef {
    pub name: String,
    pub slug: String,
}

/// Parent folder of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    #[serde(default)]
    pub name: Option<String>,
    pub slug: String,
}

/// One file in a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(alias = "file", alias = "content_ref", default)]
    pub content_ref: String,
    #[serde(alias = "uploaded_at", default)]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FileEntry {
    /// Reference for opening this file in the viewer.
    ///
    /// Files with an id go through the authenticated proxy; the rest use the
    /// content reference as given.
    pub fn to_reference(&self) -> DocumentReference {
        if self.id.is_empty() {
            DocumentReference::from_url(self.content_ref.clone(), self.name.clone())
        } else {
            DocumentReference::from_entry(self.id.clone(), self.name.clone())
        }
    }
}

/// Contents of one logical folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireListing")]
pub struct DirectoryListing {
    pub name: String,
    pub description: Option<String>,
    pub page_title: Option<String>,
    pub parent_ref: Option<ParentRef>,
    pub subfolders: Vec<SubfolderRef>,
    pub files: Vec<FileEntry>,
}

impl DirectoryListing {
    pub fn file(&self, id: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.id == id)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireListing {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "page_title")]
    page_title: Option<String>,
    #[serde(default, alias = "parent_ref")]
    parent_ref: Option<ParentRef>,
    #[serde(default, alias = "parent_slug")]
    parent_slug: Option<String>,
    #[serde(default, alias = "parent_name")]
    parent_name: Option<String>,
    #[serde(default)]
    subfolders: Vec<SubfolderRef>,
    #[serde(default)]
    files: Vec<FileEntry>,
}

impl From<WireListing> for DirectoryListing {
    fn from(wire: WireListing) -> Self {
        let parent_ref = wire.parent_ref.or_else(|| {
            wire.parent_slug
                .filter(|slug| !slug.is_empty())
                .map(|slug| ParentRef {
                    name: wire.parent_name,
                    slug,
                })
        });

        Self {
            name: wire.name,
            description: wire.description,
            page_title: wire.page_title,
            parent_ref,
            subfolders: wire.subfolders,
            files: wire.files,
        }
    }
}

/// Upload of a new file into a folder
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub description: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(i64),
        Text(String),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Number(n)) => n.to_string(),
        Some(Id::Text(s)) => s,
        None => String::new(),
    })
}
