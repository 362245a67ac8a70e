// Static file preview: show a file's text (usually an SVG diagram) in a page

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum PreviewError {
    Read(PathBuf, io::Error),
    NotText(PathBuf),
}

impl fmt::Display for PreviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewError::Read(path, e) => write!(f, "cannot read {}: {}", path.display(), e),
            PreviewError::NotText(path) => write!(f, "{} is not UTF-8 text", path.display()),
        }
    }
}

impl std::error::Error for PreviewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PreviewError::Read(_, e) => Some(e),
            PreviewError::NotText(_) => None,
        }
    }
}

/// Read a whole file and wrap its contents, unmodified, in an HTML page
pub fn render_preview(path: &Path) -> Result<String, PreviewError> {
    let bytes = std::fs::read(path).map_err(|e| PreviewError::Read(path.to_path_buf(), e))?;
    let content =
        String::from_utf8(bytes).map_err(|_| PreviewError::NotText(path.to_path_buf()))?;
    Ok(html_page("SVG Preview", "", &content))
}

/// Minimal HTML document; `header` and `body` are inserted verbatim
pub fn html_page(title: &str, header: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}<div>\n{}\n</div>\n</body>\n</html>\n",
        title, header, body
    )
}
