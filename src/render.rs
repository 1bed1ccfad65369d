use crate::collaborators::MarkdownWriter;
use crate::error::{PreviewError, Result};
use crate::file::PreviewUri;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

const DOCUMENT_STYLE: &str = "body{font-family:-apple-system,'Segoe UI',sans-serif;line-height:1.5;margin:0 auto;max-width:60em;padding:1.5em;}pre{overflow:auto;padding:.75em;background:rgba(127,127,127,.12);}table{border-collapse:collapse;}th,td{border:1px solid rgba(127,127,127,.4);padding:.25em .5em;}img{max-width:100%;}@media (prefers-color-scheme: dark){body{background:#1e1e1e;color:#d4d4d4;}a{color:#4fc1ff;}}";
const BLOCKED_SCHEMES: [&str; 3] = ["javascript", "vbscript", "data"];
const CONTENT_SECURITY_POLICY: &str =
    "default-src 'none'; style-src 'unsafe-inline'; img-src file: https: http: data:;";

#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_FOOTNOTES);
        Self { options }
    }
}

impl MarkdownRenderer {
    /// Renders an HTML fragment. Raw HTML in the source is escaped, never passed through.
    pub fn render(&self, markdown: &str) -> String {
        let mut output = String::with_capacity(markdown.len().saturating_mul(2) + 64);
        output.push_str("<article id=\"md-root\">");

        let mut image_titles: Vec<Option<String>> = Vec::new();
        let mut in_table_head = false;

        for event in Parser::new_ext(markdown, self.options) {
            if !image_titles.is_empty() {
                render_image_alt_event(&mut output, &mut image_titles, event);
                continue;
            }

            match event {
                Event::Start(tag) => {
                    render_start_tag(&mut output, tag, &mut image_titles, &mut in_table_head)
                }
                Event::End(tag) => render_end_tag(&mut output, tag, &mut in_table_head),
                Event::Text(text) => escape_into(&mut output, text.as_ref()),
                Event::Code(text) => {
                    output.push_str("<code>");
                    escape_into(&mut output, text.as_ref());
                    output.push_str("</code>");
                }
                Event::Html(raw) | Event::InlineHtml(raw) => {
                    escape_into(&mut output, raw.as_ref())
                }
                Event::FootnoteReference(label) => {
                    output.push_str("<sup>");
                    escape_into(&mut output, label.as_ref());
                    output.push_str("</sup>");
                }
                Event::SoftBreak => output.push('\n'),
                Event::HardBreak => output.push_str("<br />\n"),
                Event::Rule => output.push_str("<hr />"),
                Event::TaskListMarker(checked) => {
                    if checked {
                        output.push_str("<input type=\"checkbox\" checked disabled /> ");
                    } else {
                        output.push_str("<input type=\"checkbox\" disabled /> ");
                    }
                }
                _ => {}
            }
        }

        output.push_str("</article>");
        output
    }

    pub fn render_document(&self, markdown: &str, original: &Path) -> Result<String> {
        let body = self.render(markdown);
        let title = original
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| String::from("markdown"));
        let base = original
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(PreviewUri::from_path)
            .transpose()?;

        let mut html = String::with_capacity(body.len() + 1024);
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\" />\n");
        html.push_str("<meta http-equiv=\"Content-Security-Policy\" content=\"");
        escape_into(&mut html, CONTENT_SECURITY_POLICY);
        html.push_str("\" />\n");
        if let Some(base) = base {
            html.push_str("<base href=\"");
            escape_into(&mut html, base.as_str());
            html.push_str("/\" />\n");
        }
        html.push_str("<title>");
        escape_into(&mut html, &title);
        html.push_str("</title>\n<style>");
        html.push_str(DOCUMENT_STYLE);
        html.push_str("</style>\n</head>\n<body>\n");
        html.push_str(&body);
        html.push_str("\n</body>\n</html>\n");
        Ok(html)
    }
}

/// Writes each rendered document under a fresh name inside the workspace.
#[derive(Debug, Default)]
pub struct HtmlMarkdownWriter {
    renderer: MarkdownRenderer,
    sequence: AtomicU64,
}

impl MarkdownWriter for HtmlMarkdownWriter {
    fn render_to_temp_file(
        &self,
        markdown: &str,
        original: &Path,
        workspace: &Path,
    ) -> Result<PreviewUri> {
        if !workspace.is_dir() {
            return Err(PreviewError::Markdown(format!(
                "workspace {} is not a directory",
                workspace.display()
            )));
        }

        let stem = original
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or("preview");
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let target = workspace.join(format!("{}-{seq}.html", sanitize_file_stem(stem)));

        let html = self.renderer.render_document(markdown, original)?;
        std::fs::write(&target, html)?;

        PreviewUri::from_path(&target)
    }
}

fn render_start_tag(
    out: &mut String,
    tag: Tag<'_>,
    image_titles: &mut Vec<Option<String>>,
    in_table_head: &mut bool,
) {
    match tag {
        Tag::Paragraph => out.push_str("<p>"),
        Tag::Heading { level, .. } => {
            out.push_str("<h");
            out.push_str(&heading_level_number(level).to_string());
            out.push('>');
        }
        Tag::BlockQuote(_) => out.push_str("<blockquote>"),
        Tag::CodeBlock(kind) => {
            out.push_str("<pre><code");
            if let CodeBlockKind::Fenced(lang) = kind {
                let trimmed = lang.trim();
                if !trimmed.is_empty() {
                    out.push_str(" class=\"language-");
                    escape_into(out, trimmed);
                    out.push('"');
                }
            }
            out.push('>');
        }
        Tag::List(Some(start)) => {
            out.push_str("<ol start=\"");
            out.push_str(&start.to_string());
            out.push_str("\">");
        }
        Tag::List(None) => out.push_str("<ul>"),
        Tag::Item => out.push_str("<li>"),
        Tag::Emphasis => out.push_str("<em>"),
        Tag::Strong => out.push_str("<strong>"),
        Tag::Strikethrough => out.push_str("<del>"),
        Tag::Link {
            dest_url, title, ..
        } => {
            out.push_str("<a href=\"");
            escape_into(out, safe_link_target(dest_url.as_ref()));
            out.push('"');
            if !title.is_empty() {
                out.push_str(" title=\"");
                escape_into(out, title.as_ref());
                out.push('"');
            }
            out.push('>');
        }
        Tag::Image {
            dest_url, title, ..
        } => {
            out.push_str("<img src=\"");
            escape_into(out, safe_link_target(dest_url.as_ref()));
            out.push_str("\" alt=\"");
            if title.is_empty() {
                image_titles.push(None);
            } else {
                image_titles.push(Some(title.to_string()));
            }
        }
        Tag::FootnoteDefinition(label) => {
            out.push_str("<section class=\"footnote\" data-footnote=\"");
            escape_into(out, label.as_ref());
            out.push_str("\">");
        }
        Tag::Table(_) => out.push_str("<table>"),
        Tag::TableHead => {
            *in_table_head = true;
            out.push_str("<thead><tr>");
        }
        Tag::TableRow => out.push_str("<tr>"),
        Tag::TableCell => {
            if *in_table_head {
                out.push_str("<th>");
            } else {
                out.push_str("<td>");
            }
        }
        _ => {}
    }
}

fn render_end_tag(out: &mut String, tag: TagEnd, in_table_head: &mut bool) {
    match tag {
        TagEnd::Paragraph => out.push_str("</p>"),
        TagEnd::Heading(level) => {
            out.push_str("</h");
            out.push_str(&heading_level_number(level).to_string());
            out.push('>');
        }
        TagEnd::BlockQuote(_) => out.push_str("</blockquote>"),
        TagEnd::CodeBlock => out.push_str("</code></pre>"),
        TagEnd::List(true) => out.push_str("</ol>"),
        TagEnd::List(false) => out.push_str("</ul>"),
        TagEnd::Item => out.push_str("</li>"),
        TagEnd::Emphasis => out.push_str("</em>"),
        TagEnd::Strong => out.push_str("</strong>"),
        TagEnd::Strikethrough => out.push_str("</del>"),
        TagEnd::Link => out.push_str("</a>"),
        TagEnd::FootnoteDefinition => out.push_str("</section>"),
        TagEnd::Table => out.push_str("</tbody></table>"),
        TagEnd::TableHead => {
            *in_table_head = false;
            out.push_str("</tr></thead><tbody>");
        }
        TagEnd::TableRow => out.push_str("</tr>"),
        TagEnd::TableCell => {
            if *in_table_head {
                out.push_str("</th>");
            } else {
                out.push_str("</td>");
            }
        }
        _ => {}
    }
}

fn render_image_alt_event(
    out: &mut String,
    image_titles: &mut Vec<Option<String>>,
    event: Event<'_>,
) {
    match event {
        Event::End(TagEnd::Image) => {
            out.push('"');
            if let Some(Some(title)) = image_titles.pop() {
                out.push_str(" title=\"");
                escape_into(out, &title);
                out.push('"');
            }
            out.push_str(" />");
        }
        Event::Text(text) | Event::Code(text) | Event::Html(text) | Event::InlineHtml(text) => {
            escape_into(out, text.as_ref());
        }
        Event::SoftBreak | Event::HardBreak => out.push(' '),
        _ => {}
    }
}

/// Script-capable link targets collapse to `#`.
fn safe_link_target(url: &str) -> &str {
    let url = url.trim();
    let scheme = url
        .split_once(':')
        .map(|(scheme, _)| scheme.trim().to_ascii_lowercase());
    match scheme {
        _ if url.is_empty() => "#",
        Some(scheme) if BLOCKED_SCHEMES.contains(&scheme.as_str()) => "#",
        _ => url,
    }
}

fn sanitize_file_stem(stem: &str) -> String {
    stem.chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

fn heading_level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        let entity = match ch {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            '"' => "&quot;",
            '\'' => "&#39;",
            _ => {
                out.push(ch);
                continue;
            }
        };
        out.push_str(entity);
    }
}
