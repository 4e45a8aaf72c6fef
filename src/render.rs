use std::collections::{HashMap, HashSet};
use std::io;
use std::io::ErrorKind;

use ammonia::Builder;
use lazy_static::lazy_static;
use markdown::{CompileOptions, Options, ParseOptions};

lazy_static! {
    static ref CLEANER: Builder<'static> = {
        let mut builder = Builder::default();
        builder
            .tags(HashSet::from([
                "h1", "h2", "h3", "h4", "h5", "h6", "p", "em", "strong", "ul", "ol", "li",
                "table", "thead", "tbody", "tr", "th", "td", "a", "img", "pre", "code",
                "blockquote", "input", "del", "br", "hr",
            ]))
            .generic_attributes(HashSet::from(["class", "title"]))
            .tag_attributes(HashMap::from([
                ("a", HashSet::from(["href"])),
                ("img", HashSet::from(["src", "alt", "width", "height"])),
                ("input", HashSet::from(["type", "checked", "disabled"])),
            ]))
            .link_rel(None);
        builder
    };
}

/// Renders markdown (GitHub flavored) to HTML reduced to the editor's
/// allow-list of tags and attributes. Raw HTML in the input reaches the
/// sanitizer intact, so script-bearing elements are dropped wholesale
/// rather than escaped into visible text.
pub fn render(md_text: &str) -> io::Result<String> {
    let buf = promote_soft_breaks(md_text);

    let options = Options {
        parse: ParseOptions::gfm(),
        compile: CompileOptions {
            allow_dangerous_html: true,
            ..CompileOptions::default()
        },
    };

    let html = match markdown::to_html_with_options(&buf, &options) {
        Ok(html) => html,
        Err(e) => return Err(io::Error::new(ErrorKind::InvalidInput, e.reason.as_str())),
    };

    Ok(CLEANER.clean(&html).to_string())
}

/// Gives every soft line break inside prose the trailing double-space that
/// markdown turns into a hard break. Fenced code blocks are left alone.
fn promote_soft_breaks(md_text: &str) -> String {
    let mut out = String::with_capacity(md_text.len() + md_text.len() / 16);
    let mut in_fence = false;
    let mut lines = md_text.lines().peekable();

    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }

        out.push_str(line);

        let breakable = !in_fence
            && !line.trim().is_empty()
            && !line.ends_with("  ")
            && lines.peek().map_or(false, |next| !next.trim().is_empty());
        if breakable {
            out.push_str("  ");
        }
        if lines.peek().is_some() {
            out.push('\n');
        }
    }

    if md_text.ends_with('\n') {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_heading_and_paragraph() {
        let html = render("# Heading\n\nSome text.\n").unwrap();
        assert!(html.contains("<h1>Heading</h1>"));
        assert!(html.contains("<p>Some text.</p>"));
    }

    #[test]
    fn test_render_strips_scripts_entirely() {
        let html = render("<script>alert(1)</script>\n# Heading\n").unwrap();
        assert!(!html.contains("<script"));
        assert!(!html.contains("alert"));
        assert!(html.contains("<h1>Heading</h1>"));
    }

    #[test]
    fn test_render_strips_event_handlers() {
        let html = render("<img src=\"x.png\" onerror=\"alert(1)\">\n").unwrap();
        assert!(html.contains("src=\"x.png\""));
        assert!(!html.contains("onerror"));
        assert!(!html.contains("alert"));
    }

    #[test]
    fn test_render_links_and_images() {
        let html = render("[T](url)\n\n![Alt](img.png)\n").unwrap();
        assert!(html.contains("href=\"url\""));
        assert!(html.contains(">T</a>"));
        assert!(html.contains("src=\"img.png\""));
        assert!(html.contains("alt=\"Alt\""));
        // Links come back without injected rel attributes
        assert!(!html.contains("rel="));
    }

    #[test]
    fn test_render_gfm_extensions() {
        let md = "| a | b |\n| - | - |\n| 1 | 2 |\n\n- [x] done\n- [ ] todo\n\n~~gone~~\n";
        let html = render(md).unwrap();
        assert!(html.contains("<table>"));
        assert!(html.contains("type=\"checkbox\""));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_render_fenced_code_survives() {
        let html = render("```\nlet x = 1;\nlet y = 2;\n```\n").unwrap();
        assert!(html.contains("<pre>"));
        assert!(html.contains("let x = 1;"));
        assert!(!html.contains("<br"));
    }

    #[test]
    fn test_soft_breaks_become_line_breaks() {
        let html = render("line one\nline two\n").unwrap();
        assert!(html.contains("<br"));
    }

    #[test]
    fn test_promote_soft_breaks_skips_fences() {
        let out = promote_soft_breaks("a\nb\n\n```\ncode one\ncode two\n```\n");
        assert!(out.starts_with("a  \nb\n"));
        assert!(out.contains("code one\ncode two"));
    }
}
