//! Splitting a multi-document manifest and putting it back together
//!
//! A document separator is `---` at the start of a line. Splitting keeps the
//! text before the first separator as segment 0 and each segment excludes the
//! separator itself, so `recompose(&split(text))` reproduces `text` exactly.

/// YAML document separator
pub const SEPARATOR: &str = "---";

/// Split manifest text into raw document segments
pub fn split(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut line_start = 0;

    while line_start < text.len() {
        if is_separator_line(&text[line_start..]) {
            segments.push(&text[start..line_start]);
            start = line_start + SEPARATOR.len();
        }
        line_start = match text[line_start..].find('\n') {
            Some(offset) => line_start + offset + 1,
            None => text.len(),
        };
    }

    segments.push(&text[start..]);
    segments
}

/// `---` at the start of a line, followed by whitespace or the end of input
fn is_separator_line(rest: &str) -> bool {
    rest.strip_prefix(SEPARATOR)
        .is_some_and(|after| after.chars().next().is_none_or(char::is_whitespace))
}

/// Re-join segments, putting the separator back ahead of every segment but
/// the first
pub fn recompose<S: AsRef<str>>(segments: &[S]) -> String {
    let mut out = String::with_capacity(segments.iter().map(|s| s.as_ref().len() + 3).sum());
    for (index, segment) in segments.iter().enumerate() {
        if index > 0 {
            out.push_str(SEPARATOR);
        }
        out.push_str(segment.as_ref());
    }
    out
}

/// Whether a segment looks like a Kubernetes resource
///
/// Segments without an `apiVersion` key are comments or stray separators and
/// are never decoded.
pub fn is_resource(segment: &str) -> bool {
    segment.contains("apiVersion")
}

/// Comment lines at the top of a segment, such as Helm's `# Source:` marker
///
/// Returned with their trailing newlines so they can be prepended verbatim.
pub fn leading_comments(segment: &str) -> &str {
    let body = segment.strip_prefix('\n').unwrap_or(segment);
    let offset = segment.len() - body.len();

    let mut end = 0;
    for line in body.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            end += line.len();
        } else {
            break;
        }
    }
    &segment[offset..offset + end]
}

/// Render a re-encoded document as a segment body
///
/// The segment starts on a fresh line after the separator and keeps the
/// original leading comments.
pub fn render_segment(original: &str, encoded: &str) -> String {
    let comments = leading_comments(original);
    let mut out = String::with_capacity(comments.len() + encoded.len() + 1);
    out.push('\n');
    // comments start at column 0, including one that followed `---`
    for line in comments.split_inclusive('\n') {
        out.push_str(line.trim_start());
        if !line.ends_with('\n') {
            out.push('\n');
        }
    }
    out.push_str(encoded);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_leading_separator() {
        let text = "---\napiVersion: v1\nkind: A\n---\napiVersion: v1\nkind: B\n";
        assert_eq!(
            split(text),
            vec!["", "\napiVersion: v1\nkind: A\n", "\napiVersion: v1\nkind: B\n"]
        );
    }

    #[test]
    fn test_split_without_leading_separator() {
        let text = "apiVersion: v1\nkind: A\n---\nkind: B\n";
        assert_eq!(split(text), vec!["apiVersion: v1\nkind: A\n", "\nkind: B\n"]);
    }

    #[test]
    fn test_split_ignores_dashes_inside_lines() {
        let text = "data:\n  cert: |\n    -----BEGIN CERTIFICATE-----\n  x: a---b\n";
        assert_eq!(split(text), vec![text]);
    }

    #[test]
    fn test_split_requires_bare_separator() {
        assert_eq!(split("----
kind: A
").len(), 1);
        assert_eq!(split("---
kind: A
").len(), 2);
    }

    #[test]
    fn test_split_recompose_lossless() {
        for text in [
            "",
            "---",
            "---\n---\n",
            "---\n# Source: a.yaml\napiVersion: v1\nkind: A\n---\n\n---\napiVersion: v1\nkind: B",
            "no separators at all\n",
            "--- # inline comment\napiVersion: v1\n",
        ] {
            assert_eq!(recompose(&split(text)), text);
        }
    }

    #[test]
    fn test_is_resource() {
        assert!(is_resource("\napiVersion: v1\nkind: A\n"));
        assert!(!is_resource("\n# Source: empty.yaml\n"));
        assert!(!is_resource(""));
    }

    #[test]
    fn test_leading_comments() {
        let segment = "\n# Source: chart/templates/deploy.yaml\n# more\napiVersion: v1\n";
        assert_eq!(
            leading_comments(segment),
            "# Source: chart/templates/deploy.yaml\n# more\n"
        );
        assert_eq!(leading_comments("\napiVersion: v1\n"), "");
    }

    #[test]
    fn test_render_segment() {
        let original = "\n# Source: x.yaml\napiVersion: v1\n";
        assert_eq!(
            render_segment(original, "apiVersion: apps/v1\n"),
            "\n# Source: x.yaml\napiVersion: apps/v1\n"
        );
    }

    #[test]
    fn test_render_segment_with_comment_on_separator_line() {
        let text = "--- # Source: a.yaml\napiVersion: v1\n";
        let segments = split(text);
        assert_eq!(segments[1], " # Source: a.yaml\napiVersion: v1\n");
        assert_eq!(
            render_segment(segments[1], "apiVersion: apps/v1\n"),
            "\n# Source: a.yaml\napiVersion: apps/v1\n"
        );
    }
}
