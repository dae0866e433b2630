//! Markdown to HTML rendering for the Markdown to PDF routine.
//!
//! Covers the subset documents actually use: headings, paragraphs, ordered
//! and unordered lists, fenced code, pipe tables and inline emphasis, code
//! and links. Everything else passes through as escaped paragraph text.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static CODE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());
static STRONG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").unwrap());
static ORDERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.)]\s+(.*)$").unwrap());

const STYLESHEET: &str = "\
body { font-family: Arial, sans-serif; margin: 40px; line-height: 1.6; }
code { background: #f4f4f4; padding: 2px 6px; border-radius: 3px; }
pre { background: #f4f4f4; padding: 15px; border-radius: 5px; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ddd; padding: 8px; }";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            Self::Unordered => "ul",
            Self::Ordered => "ol",
        }
    }
}

/// Renders Markdown into an HTML fragment.
pub fn render_markdown(source: &str) -> String {
    let mut html = String::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut list: Option<ListKind> = None;
    let mut lines = source.lines().peekable();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();

        if let Some(info) = trimmed.strip_prefix("```") {
            flush_paragraph(&mut html, &mut paragraph);
            close_list(&mut html, &mut list);
            let mut code = String::new();
            for code_line in lines.by_ref() {
                if code_line.trim_start().starts_with("```") {
                    break;
                }
                code.push_str(code_line);
                code.push('\n');
            }
            let language = info.trim();
            if language.is_empty() {
                html.push_str("<pre><code>");
            } else {
                html.push_str(&format!("<pre><code class=\"language-{}\">", escape_html(language)));
            }
            html.push_str(&escape_html(&code));
            html.push_str("</code></pre>\n");
            continue;
        }

        if trimmed.is_empty() {
            flush_paragraph(&mut html, &mut paragraph);
            close_list(&mut html, &mut list);
            continue;
        }

        if let Some((level, text)) = heading(trimmed) {
            flush_paragraph(&mut html, &mut paragraph);
            close_list(&mut html, &mut list);
            html.push_str(&format!("<h{level}>{}</h{level}>\n", render_inline(text)));
            continue;
        }

        if trimmed.starts_with('|') && lines.peek().is_some_and(|next| is_table_separator(next)) {
            flush_paragraph(&mut html, &mut paragraph);
            close_list(&mut html, &mut list);
            lines.next();
            html.push_str("<table>\n<thead><tr>");
            for cell in split_row(trimmed) {
                html.push_str(&format!("<th>{}</th>", render_inline(cell)));
            }
            html.push_str("</tr></thead>\n<tbody>\n");
            while let Some(row) = lines.next_if(|next| next.trim().starts_with('|')) {
                html.push_str("<tr>");
                for cell in split_row(row.trim()) {
                    html.push_str(&format!("<td>{}</td>", render_inline(cell)));
                }
                html.push_str("</tr>\n");
            }
            html.push_str("</tbody>\n</table>\n");
            continue;
        }

        if let Some((kind, item)) = list_item(trimmed) {
            flush_paragraph(&mut html, &mut paragraph);
            if list != Some(kind) {
                close_list(&mut html, &mut list);
                html.push_str(&format!("<{}>\n", kind.tag()));
                list = Some(kind);
            }
            html.push_str(&format!("<li>{}</li>\n", render_inline(item)));
            continue;
        }

        close_list(&mut html, &mut list);
        paragraph.push(trimmed);
    }

    flush_paragraph(&mut html, &mut paragraph);
    close_list(&mut html, &mut list);
    html
}

/// Wraps a rendered fragment in a complete, styled HTML document.
pub fn styled_document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}\n</style></head>\n<body>\n{}</body></html>\n",
        escape_html(title),
        STYLESHEET,
        body
    )
}

fn flush_paragraph(html: &mut String, paragraph: &mut Vec<&str>) {
    if paragraph.is_empty() {
        return;
    }
    html.push_str("<p>");
    html.push_str(&render_inline(&paragraph.join(" ")));
    html.push_str("</p>\n");
    paragraph.clear();
}

fn close_list(html: &mut String, list: &mut Option<ListKind>) {
    if let Some(kind) = list.take() {
        html.push_str(&format!("</{}>\n", kind.tag()));
    }
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &line[level..];
    if rest.is_empty() {
        return Some((level, ""));
    }
    rest.starts_with(' ')
        .then(|| (level, rest.trim().trim_end_matches('#').trim_end()))
}

fn list_item(line: &str) -> Option<(ListKind, &str)> {
    for marker in ["- ", "* ", "+ "] {
        if let Some(item) = line.strip_prefix(marker) {
            return Some((ListKind::Unordered, item.trim()));
        }
    }
    ORDERED_ITEM
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|item| (ListKind::Ordered, item.as_str()))
}

fn is_table_separator(line: &str) -> bool {
    let cells = split_row(line.trim());
    !cells.is_empty()
        && cells.iter().all(|cell| {
            !cell.is_empty() && cell.contains('-') && cell.chars().all(|c| matches!(c, '-' | ':'))
        })
}

fn split_row(line: &str) -> Vec<&str> {
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(str::trim).collect()
}

/// Renders inline markup. Code spans are literal; emphasis and links are
/// only recognized outside them.
fn render_inline(text: &str) -> String {
    let mut out = String::new();
    let mut last = 0;
    for caps in CODE_SPAN.captures_iter(text) {
        let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&render_emphasis(&text[last..whole.start()]));
        out.push_str("<code>");
        out.push_str(&escape_html(code.as_str()));
        out.push_str("</code>");
        last = whole.end();
    }
    out.push_str(&render_emphasis(&text[last..]));
    out
}

fn render_emphasis(text: &str) -> String {
    let escaped = escape_html(text);
    let linked = LINK.replace_all(&escaped, "<a href=\"$2\">$1</a>");
    let strong = STRONG.replace_all(&linked, "<strong>$1</strong>");
    EMPHASIS.replace_all(&strong, "<em>$1</em>").into_owned()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
