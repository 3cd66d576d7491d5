use anyhow::Context;
use std::path::Path;
use tracing::warn;

/// Reads an email thread as UTF-8 text.
///
/// Unreadable files (missing, no permission, not valid UTF-8) are logged and
/// come back as an empty string so the caller can move on to the next thread.
pub fn read_email_thread(path: &Path) -> String {
    match try_read_email_thread(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Error reading file {}: {:#}", path.display(), e);
            String::new()
        }
    }
}

fn try_read_email_thread(path: &Path) -> crate::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))
}
