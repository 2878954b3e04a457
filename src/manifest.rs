//! Document source parsing.
//!
//! A scanned document is described by a sequence of link elements, each
//! carrying the full-resolution source in `href`, the native pixel size
//! in `data-width`/`data-height`, optional crop-fraction bleed bounds in
//! `data-left`/`data-top`/`data-right`/`data-bottom`, and one embedded
//! preview image:
//!
//! ```xml
//! <figure>
//!   <a href="pages/001.jpg" data-width="2480" data-height="3508">
//!     <img src="previews/001.jpg"/>
//!   </a>
//!   ...
//! </figure>
//! ```
//!
//! Unlike navigation input, the document itself must be well-formed;
//! malformed numeric attributes are reported as errors rather than
//! clamped.

use std::path::Path;

use thiserror::Error;

use crate::geometry::FracRect;

/// One page entry of the document source.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSource {
    /// Full-resolution source identifier handed to the slicing service.
    pub href: String,
    /// Native pixel width of the source image.
    pub width: u32,
    /// Native pixel height of the source image.
    pub height: u32,
    /// Crop-fraction bounds describing how much of the source bleeds
    /// outside the nominal page box.
    pub bounds: FracRect,
    /// Preview image reference, rendered immediately at any zoom.
    pub preview: String,
}

/// Errors raised while reading a document source.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read document source: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document source: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("document source lists no pages")]
    Empty,

    #[error("page {index}: missing attribute `{attr}`")]
    MissingAttr { index: usize, attr: &'static str },

    #[error("page {index}: attribute `{attr}` is not a number: `{value}`")]
    BadNumber {
        index: usize,
        attr: &'static str,
        value: String,
    },

    #[error("page {index}: missing preview image")]
    MissingPreview { index: usize },
}

/// Parse a document source from an XML string.
pub fn parse(text: &str) -> Result<Vec<PageSource>, ManifestError> {
    let doc = roxmltree::Document::parse(text)?;
    let mut pages = Vec::new();

    for node in doc.descendants().filter(|n| n.has_tag_name("a")) {
        let index = pages.len();

        let href = node
            .attribute("href")
            .ok_or(ManifestError::MissingAttr { index, attr: "href" })?
            .to_string();
        let width = required_u32(&node, "data-width", index)?;
        let height = required_u32(&node, "data-height", index)?;
        let bounds = FracRect::new(
            optional_f64(&node, "data-left", index, 0.0)?,
            optional_f64(&node, "data-top", index, 0.0)?,
            optional_f64(&node, "data-right", index, 1.0)?,
            optional_f64(&node, "data-bottom", index, 1.0)?,
        );
        let preview = node
            .descendants()
            .find(|n| n.has_tag_name("img"))
            .and_then(|img| img.attribute("src"))
            .ok_or(ManifestError::MissingPreview { index })?
            .to_string();

        pages.push(PageSource {
            href,
            width,
            height,
            bounds,
            preview,
        });
    }

    if pages.is_empty() {
        return Err(ManifestError::Empty);
    }
    Ok(pages)
}

/// Read and parse a document source file.
pub fn parse_file(path: &Path) -> Result<Vec<PageSource>, ManifestError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

fn required_u32(
    node: &roxmltree::Node<'_, '_>,
    attr: &'static str,
    index: usize,
) -> Result<u32, ManifestError> {
    let value = node
        .attribute(attr)
        .ok_or(ManifestError::MissingAttr { index, attr })?;
    value.parse().map_err(|_| ManifestError::BadNumber {
        index,
        attr,
        value: value.to_string(),
    })
}

fn optional_f64(
    node: &roxmltree::Node<'_, '_>,
    attr: &'static str,
    index: usize,
    default: f64,
) -> Result<f64, ManifestError> {
    match node.attribute(attr) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ManifestError::BadNumber {
            index,
            attr,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PAGES: &str = r#"
        <figure>
          <a href="pages/001.jpg" data-width="2480" data-height="3508">
            <img src="previews/001.jpg"/>
          </a>
          <a href="pages/002.jpg" data-width="2480" data-height="3508"
             data-left="0.02" data-top="0" data-right="0.98" data-bottom="1">
            <img src="previews/002.jpg"/>
          </a>
        </figure>
    "#;

    #[test]
    fn parses_pages_with_defaulted_bounds() {
        let pages = parse(TWO_PAGES).unwrap();
        assert_eq!(pages.len(), 2);

        assert_eq!(pages[0].href, "pages/001.jpg");
        assert_eq!(pages[0].width, 2480);
        assert_eq!(pages[0].bounds, FracRect::FULL);
        assert_eq!(pages[0].preview, "previews/001.jpg");

        assert_eq!(pages[1].bounds, FracRect::new(0.02, 0.0, 0.98, 1.0));
    }

    #[test]
    fn missing_size_attribute_is_an_error() {
        let err = parse(r#"<a href="p.jpg" data-width="100"><img src="t.jpg"/></a>"#).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::MissingAttr {
                attr: "data-height",
                ..
            }
        ));
    }

    #[test]
    fn malformed_number_is_an_error() {
        let err = parse(
            r#"<a href="p.jpg" data-width="wide" data-height="200"><img src="t.jpg"/></a>"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ManifestError::BadNumber {
                attr: "data-width",
                ..
            }
        ));
    }

    #[test]
    fn missing_preview_is_an_error() {
        let err = parse(r#"<a href="p.jpg" data-width="100" data-height="200"></a>"#).unwrap_err();
        assert!(matches!(err, ManifestError::MissingPreview { index: 0 }));
    }

    #[test]
    fn empty_document_is_an_error() {
        assert!(matches!(
            parse("<figure></figure>").unwrap_err(),
            ManifestError::Empty
        ));
    }
}
