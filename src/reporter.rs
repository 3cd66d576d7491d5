use crate::parser::AgingCause;
use crate::Result;
use anyhow::Context;
use std::{fs, path::Path};
use tracing::error;

pub const TABLE_HEADER: &str =
    "| Email Subject Label | Author | Email Date/Time | Cause of Aging # | Brief Causes of Aging Description |\n";
pub const TABLE_SEPARATOR: &str =
    "|-------------------|---------|-----------------|-----------------|-----------------------------------|\n";

pub struct Reporter;

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    /// Markdown table with one row per record. Cell text is inserted as-is.
    pub fn render_markdown(&self, records: &[AgingCause]) -> String {
        let mut md = String::with_capacity(TABLE_HEADER.len() + TABLE_SEPARATOR.len() + records.len() * 128);
        md.push_str(TABLE_HEADER);
        md.push_str(TABLE_SEPARATOR);

        for record in records {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                record.subject, record.author, record.datetime, record.cause_number, record.description
            ));
        }

        md
    }

    /// Overwrites `path` with the rendered table.
    pub fn write_markdown(&self, records: &[AgingCause], path: &Path) -> Result<()> {
        let content = self.render_markdown(records);
        fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))
    }

    /// Like [`Reporter::write_markdown`] but logs failures instead of returning
    /// them. Returns whether the file was written.
    pub fn export_markdown(&self, records: &[AgingCause], path: &Path) -> bool {
        match self.write_markdown(records, path) {
            Ok(()) => true,
            Err(e) => {
                error!("Error writing markdown file: {:#}", e);
                false
            }
        }
    }
}
