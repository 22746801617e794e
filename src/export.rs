//! JSON export of harvested discussions.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::models::DiscussionDetail;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write export {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Render the export document: a JSON array, pretty unless `compact`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_export(details: &[DiscussionDetail], compact: bool) -> Result<String, ExportError> {
    let json = if compact {
        serde_json::to_string(details)?
    } else {
        serde_json::to_string_pretty(details)?
    };
    Ok(json)
}

/// Write the export to `path`, creating its directory if needed.
///
/// The document goes to a sibling temp file first and is renamed into place,
/// so a reader never sees a half-written export.
///
/// # Errors
///
/// Returns an error if serialization or any filesystem step fails.
pub async fn write_export(
    path: &Path,
    details: &[DiscussionDetail],
    compact: bool,
) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let json = render_export(details, compact)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    tokio::fs::write(&temp, json.as_bytes()).await.map_err(io_err)?;
    tokio::fs::rename(&temp, path).await.map_err(io_err)?;

    info!(
        path = %path.display(),
        discussions = details.len(),
        bytes = json.len(),
        "Export written"
    );
    Ok(())
}
