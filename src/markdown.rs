//! Converts a post body from Markdown to HTML and collects its table of
//! contents along the way.

use pulldown_cmark::escape::{escape_href, escape_html};
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use serde::Serialize;
use std::io;

/// Only `h1`-`h3` are anchored and listed in the table of contents.
const TOC_MAX_LEVEL: u32 = 3;

/// A heading in the table of contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TocItem {
    /// The `id` attribute written onto the heading, `heading-{n}`.
    pub id: String,

    /// The heading text with any leading section number (`1.2 `) removed.
    pub text: String,

    pub level: u32,
}

/// A rendered post body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub toc: Vec<TocItem>,
}

struct PendingImage<'a> {
    dest: CowStr<'a>,
    title: CowStr<'a>,
    alt: String,
}

impl PendingImage<'_> {
    // Images are lazy-loaded and decoded off the main thread.
    fn to_html(&self) -> io::Result<String> {
        let mut out = String::from("<img src=\"");
        escape_href(&mut out, &self.dest)?;
        out.push_str("\" alt=\"");
        escape_html(&mut out, &self.alt)?;
        out.push('"');
        if !self.title.is_empty() {
            out.push_str(" title=\"");
            escape_html(&mut out, &self.title)?;
            out.push('"');
        }
        out.push_str(" loading=\"lazy\" decoding=\"async\" />");
        Ok(out)
    }
}

/// Renders `markdown` to HTML. Headings up to `h3` receive sequential
/// `heading-{n}` ids and are returned as the table of contents.
pub fn to_html(markdown: &str) -> io::Result<Rendered> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut toc: Vec<TocItem> = Vec::new();
    let mut events: Vec<Event> = Vec::new();
    let mut in_toc_heading = false;
    let mut image: Option<PendingImage> = None;

    for ev in Parser::new_ext(markdown, options) {
        if image.is_some() {
            match ev {
                Event::End(Tag::Image(..)) => {
                    if let Some(pending) = image.take() {
                        events.push(Event::Html(pending.to_html()?.into()));
                    }
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some(pending) = image.as_mut() {
                        pending.alt.push_str(&text);
                    }
                }
                _ => {}
            }
            continue;
        }

        match ev {
            Event::Start(Tag::Heading(level)) if level <= TOC_MAX_LEVEL => {
                let id = format!("heading-{}", toc.len());
                events.push(Event::Html(format!("<h{} id=\"{}\">", level, id).into()));
                toc.push(TocItem {
                    id,
                    text: String::new(),
                    level,
                });
                in_toc_heading = true;
            }
            Event::End(Tag::Heading(level)) if level <= TOC_MAX_LEVEL => {
                events.push(Event::Html(format!("</h{}>\n", level).into()));
                in_toc_heading = false;
            }
            Event::Start(Tag::Image(_, dest, title)) => {
                image = Some(PendingImage {
                    dest,
                    title,
                    alt: String::new(),
                });
            }
            Event::Text(text) if in_toc_heading => {
                push_toc_text(&mut toc, &text);
                events.push(Event::Text(text));
            }
            Event::Code(text) if in_toc_heading => {
                push_toc_text(&mut toc, &text);
                events.push(Event::Code(text));
            }
            ev => events.push(ev),
        }
    }

    for item in toc.iter_mut() {
        item.text = strip_section_number(item.text.trim()).to_owned();
    }

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    Ok(Rendered { html: out, toc })
}

fn push_toc_text(toc: &mut [TocItem], text: &str) {
    if let Some(item) = toc.last_mut() {
        item.text.push_str(text);
    }
}

fn strip_section_number(text: &str) -> &str {
    let rest = text.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.');
    if rest.len() < text.len() && rest.starts_with(char::is_whitespace) {
        rest.trim_start()
    } else {
        text
    }
}
