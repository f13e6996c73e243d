//! Attachment tables related to a feature class.
//!
//! A feature class `detections.geojson` with attachments enabled owns a
//! sibling table `detections__ATTACH.json` and a folder `detections__ATTACH/`
//! holding the attached files.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::prelude::{ToolError, ToolResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    #[serde(rename = "ATTACHMENTID")]
    pub attachment_id: i64,
    #[serde(rename = "REL_OBJECTID")]
    pub rel_object_id: i64,
    #[serde(rename = "CONTENT_TYPE")]
    pub content_type: String,
    #[serde(rename = "ATT_NAME")]
    pub att_name: String,
    #[serde(rename = "DATA_SIZE")]
    pub data_size: u64,
}

#[derive(Debug)]
pub struct AttachmentTable {
    table_path: PathBuf,
    data_dir: PathBuf,
    pub records: Vec<AttachmentRecord>,
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

impl AttachmentTable {
    /// Opens the attachment table of the feature class at `fc_path`, enabling
    /// attachments (an empty table) when none exists yet.
    pub fn enable(fc_path: &Path) -> ToolResult<Self> {
        let stem = fc_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ToolError::InvalidParameter(format!(
                    "'{}' has no file name",
                    fc_path.display()
                ))
            })?;
        let parent = fc_path.parent().unwrap_or_else(|| Path::new(""));
        let table_path = parent.join(format!("{}__ATTACH.json", stem));
        let data_dir = parent.join(format!("{}__ATTACH", stem));

        let records = if table_path.exists() {
            serde_json::from_str(&fs::read_to_string(&table_path)?)?
        } else {
            Vec::new()
        };

        Ok(Self {
            table_path,
            data_dir,
            records,
        })
    }

    pub fn table_path(&self) -> &Path {
        &self.table_path
    }

    pub fn data_path(&self, record: &AttachmentRecord) -> PathBuf {
        self.data_dir
            .join(format!("{}_{}", record.attachment_id, record.att_name))
    }

    fn next_id(&self) -> i64 {
        self.records
            .iter()
            .map(|r| r.attachment_id)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Copies `source` into the attachment folder and records it against
    /// `rel_object_id`.
    pub fn add(&mut self, rel_object_id: i64, source: &Path) -> ToolResult<AttachmentRecord> {
        let att_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ToolError::InvalidParameter(format!("'{}' has no file name", source.display()))
            })?;
        let record = AttachmentRecord {
            attachment_id: self.next_id(),
            rel_object_id,
            content_type: content_type_for(source).to_string(),
            att_name,
            data_size: fs::metadata(source)?.len(),
        };

        fs::create_dir_all(&self.data_dir)?;
        fs::copy(source, self.data_path(&record))?;
        self.records.push(record.clone());
        Ok(record)
    }

    pub fn for_object(&self, oid: i64) -> impl Iterator<Item = &AttachmentRecord> {
        self.records.iter().filter(move |r| r.rel_object_id == oid)
    }

    pub fn save(&self) -> ToolResult<()> {
        fs::write(&self.table_path, serde_json::to_string_pretty(&self.records)?)?;
        Ok(())
    }
}
