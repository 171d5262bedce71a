use crate::{
    error::AnnotationError,
    font,
    host::PathPolicy,
    templating::{Template, TemplateContext, TemplateResolver},
};
use image::{
    DynamicImage, ImageError, ImageFormat, ImageReader, Rgba,
    error::{ImageFormatHint, UnsupportedError, UnsupportedErrorKind},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, error};

/// Margin between the image edge and the text bounding box, in pixels.
pub const ANNOTATION_PADDING: u32 = 10;

pub const ANNOTATION_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// What a call to [`Annotator::annotate`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationOutcome {
    /// Text was drawn with its top-left corner at `origin` and the file
    /// rewritten as `format`.
    Annotated {
        origin: (i32, i32),
        format: ImageFormat,
    },
    /// No annotation text was supplied; the file was not opened.
    Skipped,
    /// The resolved path is not allow-listed; the file was not touched.
    AccessDenied,
}

/// Top-left corner for text of `text_size` anchored to the bottom-right
/// corner. Goes negative when the text is larger than the image.
pub fn draw_origin(width: u32, height: u32, text_size: (u32, u32)) -> (i32, i32) {
    let (text_width, text_height) = text_size;
    let x = i64::from(width) - i64::from(text_width) - i64::from(ANNOTATION_PADDING);
    let y = i64::from(height) - i64::from(text_height) - i64::from(ANNOTATION_PADDING);
    (clamp_to_i32(x), clamp_to_i32(y))
}

fn clamp_to_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Draws `text` in the bottom-right corner of `image` and returns the origin used.
pub fn annotate_image(image: &mut DynamicImage, text: &str) -> (i32, i32) {
    let (x, y) = draw_origin(image.width(), image.height(), font::text_size(text));

    font::draw_text_mut(image, ANNOTATION_COLOR, x, y, text);

    (x, y)
}

/// Overlays text on image files in place.
#[derive(Clone)]
pub struct Annotator {
    resolver: Arc<dyn TemplateResolver>,
    context: TemplateContext,
}

impl Annotator {
    pub fn new(resolver: Arc<dyn TemplateResolver>, context: TemplateContext) -> Self {
        Self { resolver, context }
    }

    pub fn annotate(
        &self,
        filename: &Template,
        annotation: Option<&Template>,
        policy: &dyn PathPolicy,
    ) -> Result<AnnotationOutcome, AnnotationError> {
        let path = PathBuf::from(self.resolver.resolve(filename, &self.context)?);

        if !policy.is_allowed_path(&path) {
            error!("Can't write {}, no access to path!", path.display());
            return Ok(AnnotationOutcome::AccessDenied);
        }

        let Some(annotation) = annotation else {
            debug!("No annotation supplied for {}", path.display());
            return Ok(AnnotationOutcome::Skipped);
        };

        let text = self.resolver.resolve(annotation, &self.context)?;

        let (mut image, format) = load_image(&path)?;
        debug!("Annotating snapshot type: {:?} with text: {}", format, text);

        let origin = annotate_image(&mut image, &text);

        image
            .save_with_format(&path, format)
            .map_err(|source| AnnotationError::Save {
                path: path.clone(),
                source,
            })?;

        Ok(AnnotationOutcome::Annotated { origin, format })
    }
}

/// Opens `path`, detecting the format from the file contents.
fn load_image(path: &Path) -> Result<(DynamicImage, ImageFormat), AnnotationError> {
    let decode_error = |source: ImageError| AnnotationError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| decode_error(ImageError::IoError(e)))?;

    let Some(format) = reader.format() else {
        return Err(decode_error(ImageError::Unsupported(
            UnsupportedError::from_format_and_kind(
                ImageFormatHint::Unknown,
                UnsupportedErrorKind::Format(ImageFormatHint::Unknown),
            ),
        )));
    };

    let image = reader.decode().map_err(decode_error)?;
    Ok((image, format))
}
