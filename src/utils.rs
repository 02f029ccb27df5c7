use crate::sync::SyncError;
use log::info;
use std::error::Error;
use std::io;
use std::path::Path;

/// Makes sure `path` is a directory, creating it (and its parents) when missing.
pub async fn ensure_dir_exists(path: &Path) -> Result<(), SyncError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(SyncError::OutputDirNotADirectory(path.to_path_buf()));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating output directory: {}", path.display());
            tokio::fs::create_dir_all(path)
                .await
                .map_err(|e| SyncError::OutputDirCreation(path.to_path_buf(), e))
        }
        Err(e) => Err(SyncError::OutputDirCreation(path.to_path_buf(), e)),
    }
}

/// Renders an error followed by all of its sources, `outer: inner: root`.
pub fn error_chain(error: &dyn Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
