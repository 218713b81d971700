//! Upload constants and validation for club logos and profile pictures.
//!
//! The file store itself is external; this module only decides whether a
//! file may be uploaded and which object path it is stored under.

use crate::error::CoreError;
use crate::types::RowId;

/// Maximum upload size (5 MiB).
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Accepted image extensions (lowercase).
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// What an uploaded image is used for; decides its storage bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    ClubLogo,
    ProfilePicture,
}

impl MediaKind {
    pub fn bucket(self) -> &'static str {
        match self {
            Self::ClubLogo => "club-logos",
            Self::ProfilePicture => "profile-pictures",
        }
    }
}

/// Lowercased extension of `file_name`, if it is an accepted image type.
pub fn image_extension(file_name: &str) -> Result<String, CoreError> {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or_else(|| {
            CoreError::Validation(format!("File '{file_name}' has no extension"))
        })?;
    if !ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(CoreError::Validation(format!(
            "Unsupported image type '{ext}'. Must be one of: {}",
            ALLOWED_IMAGE_EXTENSIONS.join(", ")
        )));
    }
    Ok(ext)
}

/// Validate an upload's size.
pub fn validate_upload_size(len: usize) -> Result<(), CoreError> {
    if len == 0 {
        return Err(CoreError::Validation("Uploaded file is empty".into()));
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(CoreError::Validation(format!(
            "Uploaded file is {len} bytes, maximum is {MAX_UPLOAD_BYTES}"
        )));
    }
    Ok(())
}

/// Object path for a new upload: `<bucket>/<owner>/<object id>.<ext>`.
pub fn object_path(
    kind: MediaKind,
    owner_id: RowId,
    object_id: RowId,
    file_name: &str,
) -> Result<String, CoreError> {
    let ext = image_extension(file_name)?;
    Ok(format!("{}/{owner_id}/{object_id}.{ext}", kind.bucket()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn accepts_known_extensions_case_insensitively() {
        assert_eq!(image_extension("crest.PNG").unwrap(), "png");
        assert_eq!(image_extension("me.final.jpeg").unwrap(), "jpeg");
    }

    #[test]
    fn rejects_unknown_or_missing_extension() {
        assert!(image_extension("crest.gif").is_err());
        assert!(image_extension("crest").is_err());
    }

    #[test]
    fn size_limits() {
        assert!(validate_upload_size(0).is_err());
        assert!(validate_upload_size(1).is_ok());
        assert!(validate_upload_size(MAX_UPLOAD_BYTES).is_ok());
        assert!(validate_upload_size(MAX_UPLOAD_BYTES + 1).is_err());
    }

    #[test]
    fn object_path_layout() {
        let owner = Uuid::nil();
        let object = Uuid::nil();
        let path = object_path(MediaKind::ClubLogo, owner, object, "Logo.WebP").unwrap();
        assert_eq!(path, format!("club-logos/{owner}/{object}.webp"));
    }
}
