//! Image uploads through a [`FileStore`].

use touchline_core::media::{object_path, validate_upload_size, MediaKind};
use touchline_core::types::RowId;

use crate::backend::FileStore;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::retry::with_timeout;

/// Validate and store an image, returning its stored path.
///
/// Uploads are foreground writes: bounded by the write timeout and not
/// retried.
pub async fn upload_image(
    store: &dyn FileStore,
    kind: MediaKind,
    owner_id: RowId,
    file_name: &str,
    bytes: Vec<u8>,
    config: &SyncConfig,
) -> Result<String, SyncError> {
    validate_upload_size(bytes.len())?;
    let path = object_path(kind, owner_id, uuid::Uuid::new_v4(), file_name)?;
    let size = bytes.len();

    let stored = with_timeout("upload", config.write_timeout, store.upload(&path, bytes)).await?;
    tracing::info!(bucket = kind.bucket(), path = %stored, size, "Image uploaded");
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use touchline_core::error::CoreError;

    use super::*;
    use crate::memory::MemoryFileStore;

    #[tokio::test]
    async fn stores_under_owner_prefix() {
        let store = MemoryFileStore::new();
        let owner = uuid::Uuid::new_v4();
        let path = upload_image(
            &store,
            MediaKind::ProfilePicture,
            owner,
            "me.JPG",
            vec![0xff; 16],
            &SyncConfig::default(),
        )
        .await
        .unwrap();

        assert!(path.starts_with(&format!("profile-pictures/{owner}/")));
        assert!(path.ends_with(".jpg"));
        assert_eq!(store.get(&path).await.map(|b| b.len()), Some(16));
    }

    #[tokio::test]
    async fn rejects_invalid_files_before_uploading() {
        let store = MemoryFileStore::new();
        let config = SyncConfig::default();
        let owner = uuid::Uuid::new_v4();

        let empty = upload_image(&store, MediaKind::ClubLogo, owner, "logo.png", vec![], &config).await;
        assert_matches!(empty, Err(SyncError::Core(CoreError::Validation(_))));

        let gif = upload_image(&store, MediaKind::ClubLogo, owner, "logo.gif", vec![1], &config).await;
        assert_matches!(gif, Err(SyncError::Core(CoreError::Validation(_))));

        assert_eq!(store.object_count().await, 0);
    }
}
