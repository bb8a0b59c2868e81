//! Fast-path detection of content that cannot be a template.
//!
//! Every template construct starts with `{` (`{{ }}`, `{% %}`, `{# #}`), so
//! content without that byte is certainly literal and can be returned as its
//! own rendering. Anything containing `{` goes to the engine, whether or not
//! it turns out to hold valid syntax.

use std::fs;
use std::io;
use std::path::Path;

/// Byte whose presence marks content as a possible template.
pub const TEMPLATE_MARKER: u8 = b'{';

/// Outcome of inspecting one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Content holds no template syntax; this is the rendered result.
    Literal(String),
    /// Content may contain template syntax and needs the engine.
    MaybeTemplate,
}

/// Returns `true` if `content` might contain template syntax.
pub fn is_maybe_template(content: &[u8]) -> bool {
    content.contains(&TEMPLATE_MARKER)
}

/// Classifies inline template text.
pub fn classify_string(template: &str) -> Classification {
    if is_maybe_template(template.as_bytes()) {
        Classification::MaybeTemplate
    } else {
        Classification::Literal(template.to_string())
    }
}

/// Classifies a template file by reading it fully.
///
/// A literal file is returned byte for byte, without any line-ending or
/// encoding normalization. Files that are not valid UTF-8 and contain no
/// `{` fail with [`io::ErrorKind::InvalidData`].
pub fn classify_file(path: &Path) -> io::Result<Classification> {
    let bytes = fs::read(path)?;
    if is_maybe_template(&bytes) {
        return Ok(Classification::MaybeTemplate);
    }
    String::from_utf8(bytes)
        .map(Classification::Literal)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}
