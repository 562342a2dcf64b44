//! Markdown rendering for blog posts.
//!
//! Post bodies are authored as markdown. Raw HTML in the source is escaped
//! rather than passed through, so a post can never inject markup into the
//! page that displays it.

use pulldown_cmark::{Event, Options, Parser, TagEnd};

/// Length of the plain-text excerpt shown in post listings, in characters.
pub const EXCERPT_CHARS: usize = 200;

fn parser_options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts
}

/// Render markdown to HTML with embedded HTML neutralised.
pub fn render_html(source: &str) -> String {
    let parser = Parser::new_ext(source, parser_options()).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut html_out = String::new();
    pulldown_cmark::html::push_html(&mut html_out, parser);
    html_out
}

/// Plain-text preview: markup and embedded HTML tags dropped, whitespace collapsed, cut at
/// [`EXCERPT_CHARS`] with a trailing `...` when longer.
pub fn excerpt(source: &str) -> String {
    let mut text = String::new();
    for event in Parser::new_ext(source, parser_options()) {
        match event {
            Event::Text(t) | Event::Code(t) => push_words(&mut text, &t),
            Event::SoftBreak | Event::HardBreak | Event::End(TagEnd::Paragraph) => {
                push_words(&mut text, " ")
            }
            _ => {}
        }
    }
    let text = text.trim();
    if text.chars().count() > EXCERPT_CHARS {
        let cut: String = text.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut.trim_end())
    } else {
        text.to_string()
    }
}

fn push_words(out: &mut String, chunk: &str) {
    for c in chunk.chars() {
        if c.is_whitespace() {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
}
