//! Unified diff between a project file and its new template version.

use std::path::Path;

use similar::TextDiff;

/// Render a unified diff (`a/` current, `b/` incoming) for `relative`.
///
/// Non-UTF-8 content yields a one-line binary notice instead.
pub fn unified_diff(relative: &Path, current: &[u8], incoming: &[u8]) -> String {
    let (Ok(current), Ok(incoming)) = (std::str::from_utf8(current), std::str::from_utf8(incoming))
    else {
        return format!("Binary files a/{0} and b/{0} differ\n", relative.display());
    };
    let current = normalize_line_endings(current);
    let incoming = normalize_line_endings(incoming);

    let old_header = format!("a/{}", relative.display());
    let new_header = format!("b/{}", relative.display());
    TextDiff::from_lines(&current, &incoming)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string()
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}
