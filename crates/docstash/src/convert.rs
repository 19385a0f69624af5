//! HTML to markdown conversion
//!
//! Best-effort tag-walking converter. Malformed HTML never panics; at worst
//! the output is plain text with the markup dropped.

/// Capability interface for HTML to markdown conversion
///
/// Implementations return `None` when a document cannot be converted; the
/// caller is expected to skip that page rather than abort the operation.
pub trait Converter: Send + Sync {
    /// Convert one HTML document into one markdown document
    fn to_markdown(&self, html: &str) -> Option<String>;
}

/// Default tag-walking markdown converter
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownConverter;

impl MarkdownConverter {
    /// Create a new converter
    pub fn new() -> Self {
        Self
    }
}

impl Converter for MarkdownConverter {
    fn to_markdown(&self, html: &str) -> Option<String> {
        let md = html_to_markdown(html);
        if md.trim().is_empty() {
            None
        } else {
            Some(md)
        }
    }
}

/// Elements whose content is dropped entirely
const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "svg", "head"];

/// Check if content is HTML based on content type and body
pub fn is_html(content_type: Option<&str>, body: &str) -> bool {
    if let Some(ct) = content_type {
        let ct_lower = ct.to_lowercase();
        if ct_lower.contains("text/html") || ct_lower.contains("application/xhtml") {
            return true;
        }
    }

    let trimmed = body.trim_start();
    trimmed.starts_with("<!DOCTYPE") || trimmed.starts_with("<!doctype") || trimmed.starts_with("<html")
}

/// A parsed HTML tag: lowercase name, closing flag, raw attribute text
struct Tag {
    name: String,
    closing: bool,
    raw: String,
}

/// Consume one tag from the character stream (the `<` has been eaten)
fn read_tag(chars: &mut std::iter::Peekable<std::str::Chars>) -> Tag {
    let mut raw = String::new();
    for c in chars.by_ref() {
        if c == '>' {
            break;
        }
        raw.push(c);
    }

    let lower = raw.to_lowercase();
    let closing = lower.starts_with('/');
    let name = if closing { &lower[1..] } else { &lower[..] }
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_string();

    Tag { name, closing, raw }
}

/// Convert HTML to markdown
pub fn html_to_markdown(html: &str) -> String {
    let mut out = String::new();
    let mut skip_stack: Vec<String> = Vec::new();
    let mut list_depth: usize = 0;
    let mut in_pre = false;
    let mut in_blockquote = false;

    let mut chars = html.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '<' {
            if skip_stack.is_empty() {
                let decoded = decode_entity(c, &mut chars);
                if in_blockquote && decoded == '\n' {
                    out.push_str("\n> ");
                } else {
                    out.push(decoded);
                }
            }
            continue;
        }

        let tag = read_tag(&mut chars);

        if SKIP_TAGS.contains(&tag.name.as_str()) {
            if tag.closing {
                if let Some(pos) = skip_stack.iter().rposition(|t| *t == tag.name) {
                    skip_stack.remove(pos);
                }
            } else if !tag.raw.ends_with('/') {
                skip_stack.push(tag.name.clone());
            }
            continue;
        }

        if !skip_stack.is_empty() {
            continue;
        }

        match tag.name.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                if tag.closing {
                    out.push_str("\n\n");
                } else {
                    let level = tag.name[1..].parse::<usize>().unwrap_or(1);
                    out.push('\n');
                    for _ in 0..level {
                        out.push('#');
                    }
                    out.push(' ');
                }
            }
            "p" | "div" | "section" | "article" | "main" | "nav" | "header" | "footer"
            | "table" | "tr" => {
                if tag.closing {
                    out.push_str("\n\n");
                }
            }
            "br" => out.push('\n'),
            "hr" => out.push_str("\n---\n"),
            "ul" | "ol" => {
                if tag.closing {
                    list_depth = list_depth.saturating_sub(1);
                    if list_depth == 0 {
                        out.push('\n');
                    }
                } else {
                    list_depth += 1;
                }
            }
            "li" => {
                if !tag.closing {
                    out.push('\n');
                    for _ in 0..list_depth.saturating_sub(1) {
                        out.push_str("  ");
                    }
                    out.push_str("- ");
                }
            }
            "strong" | "b" => out.push_str("**"),
            "em" | "i" => out.push('*'),
            "pre" => {
                out.push_str("\n```\n");
                in_pre = !tag.closing;
            }
            "code" => {
                if !in_pre {
                    out.push('`');
                }
            }
            "blockquote" => {
                if tag.closing {
                    in_blockquote = false;
                    out.push('\n');
                } else {
                    in_blockquote = true;
                    out.push_str("\n> ");
                }
            }
            "a" => {
                if !tag.closing {
                    if let Some(href) = extract_attribute(&tag.raw, "href") {
                        out.push('[');
                        out.push_str(&format!("]({})", href));
                    }
                }
            }
            _ => {}
        }
    }

    clean_whitespace(&out)
}

/// Collect every `href` attribute from `a` tags in document order
///
/// Used by the crawler to discover same-site pages. Fragment-only and
/// non-hierarchical links (`mailto:`, `javascript:`) are filtered out.
pub fn extract_links(html: &str) -> Vec<String> {
    let mut links = Vec::new();
    let mut chars = html.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '<' {
            continue;
        }
        let tag = read_tag(&mut chars);
        if tag.name != "a" || tag.closing {
            continue;
        }
        if let Some(href) = extract_attribute(&tag.raw, "href") {
            let href = href.trim();
            if href.is_empty()
                || href.starts_with('#')
                || href.starts_with("mailto:")
                || href.starts_with("javascript:")
            {
                continue;
            }
            links.push(href.to_string());
        }
    }

    links
}

/// Extract an attribute value from raw tag text
fn extract_attribute(tag: &str, attr: &str) -> Option<String> {
    let pattern = format!("{}=", attr);
    let tag_lower = tag.to_lowercase();

    let start = tag_lower.find(&pattern)?;
    let rest = tag[start + pattern.len()..].trim_start();

    if let Some(rest) = rest.strip_prefix('"') {
        rest.find('"').map(|end| rest[..end].to_string())
    } else if let Some(rest) = rest.strip_prefix('\'') {
        rest.find('\'').map(|end| rest[..end].to_string())
    } else {
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '>')
            .unwrap_or(rest.len());
        Some(rest[..end].to_string())
    }
}

/// Decode an HTML entity starting from an ampersand
fn decode_entity(c: char, chars: &mut std::iter::Peekable<std::str::Chars>) -> char {
    if c != '&' {
        return c;
    }

    let mut entity = String::new();
    while let Some(&next) = chars.peek() {
        if next == ';' {
            chars.next();
            break;
        }
        if next.is_whitespace() || entity.len() > 10 {
            return '&';
        }
        entity.push(chars.next().unwrap_or(';'));
    }

    match entity.as_str() {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" | "#39" => '\'',
        "nbsp" => ' ',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "copy" => '\u{00A9}',
        "reg" => '\u{00AE}',
        _ => {
            if let Some(num) = entity.strip_prefix('#') {
                let code = if let Some(hex) = num.strip_prefix('x') {
                    u32::from_str_radix(hex, 16).ok()
                } else {
                    num.parse::<u32>().ok()
                };
                if let Some(ch) = code.and_then(char::from_u32) {
                    return ch;
                }
            }
            '&'
        }
    }
}

/// Clean whitespace: collapse space runs, trim, keep at most 2 newlines
pub fn clean_whitespace(s: &str) -> String {
    let mut result = String::new();
    let mut last_was_space = false;
    let mut newline_count = 0;

    for c in s.chars() {
        if c == '\n' {
            if last_was_space && result.ends_with(' ') {
                result.pop();
            }
            newline_count += 1;
            last_was_space = true;
            if newline_count <= 2 {
                result.push(c);
            }
        } else if c.is_whitespace() {
            newline_count = 0;
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            newline_count = 0;
            last_was_space = false;
            result.push(c);
        }
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_html() {
        assert!(is_html(Some("text/html"), ""));
        assert!(is_html(Some("text/html; charset=utf-8"), ""));
        assert!(is_html(Some("application/xhtml+xml"), ""));
        assert!(is_html(None, "<!DOCTYPE html><html>"));
        assert!(is_html(None, "  <html><body>"));
        assert!(!is_html(Some("text/plain"), "plain text"));
        assert!(!is_html(None, "# Markdown heading"));
    }

    #[test]
    fn test_headers() {
        let md = html_to_markdown("<h1>Title</h1><h2>Sub</h2><h3>Deep</h3>");
        assert!(md.contains("# Title"));
        assert!(md.contains("## Sub"));
        assert!(md.contains("### Deep"));
    }

    #[test]
    fn test_lists_and_emphasis() {
        let md = html_to_markdown(
            "<ul><li>One</li><li><strong>Two</strong></li></ul><p><em>it</em></p>",
        );
        assert!(md.contains("- One"));
        assert!(md.contains("- **Two**"));
        assert!(md.contains("*it*"));
    }

    #[test]
    fn test_pre_and_code() {
        let md = html_to_markdown("<pre>let x = 1;</pre><p><code>inline</code></p>");
        assert!(md.contains("```"));
        assert!(md.contains("let x = 1;"));
        assert!(md.contains("`inline`"));
    }

    #[test]
    fn test_script_and_head_dropped() {
        let md = html_to_markdown(
            "<head><title>nope</title></head><p>Before</p><script>alert('x');</script><p>After</p>",
        );
        assert!(md.contains("Before"));
        assert!(md.contains("After"));
        assert!(!md.contains("alert"));
        assert!(!md.contains("nope"));
    }

    #[test]
    fn test_entities() {
        let md = html_to_markdown("<p>a &amp; b &lt;c&gt; &quot;d&quot; &#65; &#x42;</p>");
        assert!(md.contains("a & b <c> \"d\" A B"));
    }

    #[test]
    fn test_converter_rejects_empty() {
        let conv = MarkdownConverter::new();
        assert!(conv.to_markdown("<script>only code</script>").is_none());
        assert!(conv.to_markdown("<p>text</p>").is_some());
    }

    #[test]
    fn test_extract_links() {
        let html = r##"<a href="/guide">Guide</a>
            <a href='intro.html'>Intro</a>
            <a href="#section">Anchor</a>
            <a href="mailto:x@y.z">Mail</a>
            <a>No href</a>"##;
        let links = extract_links(html);
        assert_eq!(links, vec!["/guide", "intro.html"]);
    }

    #[test]
    fn test_extract_attribute() {
        assert_eq!(
            extract_attribute("a href=\"https://example.com\" class=\"x\"", "href"),
            Some("https://example.com".to_string())
        );
        assert_eq!(
            extract_attribute("a href='rel.html'", "href"),
            Some("rel.html".to_string())
        );
        assert_eq!(
            extract_attribute("a href=bare>", "href"),
            Some("bare".to_string())
        );
        assert_eq!(extract_attribute("a class=\"x\"", "href"), None);
    }

    #[test]
    fn test_clean_whitespace() {
        assert_eq!(
            clean_whitespace("  hello   world  \n\n\n\n  test  "),
            "hello world\n\ntest"
        );
    }
}
