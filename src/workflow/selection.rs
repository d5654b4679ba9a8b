use sanitize_filename::sanitize;

use super::{PendingFile, RawFile, SelectionSource, WorkflowError};

pub const IMAGE_CONTENT_PREFIX: &str = "image/";

const FALLBACK_NAME: &str = "image";

pub fn is_image_content_type(content_type: &str) -> bool {
    content_type.starts_with(IMAGE_CONTENT_PREFIX)
}

/// Keeps the image candidates, in order, and enforces the count limit.
///
/// The limit applies to what survives filtering; exceeding it rejects the
/// whole set rather than truncating it.
pub(super) fn validate(
    candidates: Vec<RawFile>,
    origin: SelectionSource,
    max_images: usize,
) -> Result<Vec<PendingFile>, WorkflowError> {
    let images: Vec<PendingFile> = candidates
        .into_iter()
        .filter(|candidate| is_image_content_type(&candidate.content_type))
        .map(into_pending)
        .collect();

    if images.is_empty() {
        return Err(WorkflowError::NoValidImages { origin });
    }

    if images.len() > max_images {
        return Err(WorkflowError::TooManyImages {
            max: max_images,
            requested: images.len(),
        });
    }

    Ok(images)
}

fn into_pending(raw: RawFile) -> PendingFile {
    let mut name = sanitize(&raw.name);
    if name.is_empty() {
        name = FALLBACK_NAME.to_string();
    }

    PendingFile {
        name,
        mime_type: raw.content_type,
        bytes: raw.bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_prefix_is_required() {
        assert!(is_image_content_type("image/png"));
        assert!(is_image_content_type("image/svg+xml"));
        assert!(!is_image_content_type("text/plain"));
        assert!(!is_image_content_type("application/image"));
        assert!(!is_image_content_type(""));
    }

    #[test]
    fn names_are_sanitized_for_display() {
        let staged = validate(
            vec![
                RawFile::new("../../etc/passwd.png", "image/png", vec![1]),
                RawFile::new("", "image/gif", vec![2]),
            ],
            SelectionSource::Picker,
            5,
        )
        .expect("two images");

        assert!(!staged[0].name().contains('/'));
        assert_eq!(staged[1].name(), "image");
        assert_eq!(staged[1].mime_type(), "image/gif");
    }

    #[test]
    fn single_image_limit() {
        let one = vec![RawFile::new("a.png", "image/png", vec![1])];
        assert!(validate(one, SelectionSource::Drop, 1).is_ok());

        let two = vec![
            RawFile::new("a.png", "image/png", vec![1]),
            RawFile::new("b.png", "image/png", vec![2]),
        ];
        assert_eq!(
            validate(two, SelectionSource::Drop, 1).unwrap_err(),
            WorkflowError::TooManyImages {
                max: 1,
                requested: 2
            }
        );
    }
}
