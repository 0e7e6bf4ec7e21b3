//! Renders structured article text ([`TextBlock`]s) into HTML.
//!
//! Each block becomes one element chosen by its `type` (`paragraph`,
//! `heading1`..`heading6`, `preformatted`, `list-item`, `o-list-item`);
//! runs of list items are wrapped in a single `<ul>` or `<ol>`. Inline
//! [`Span`]s (`strong`, `em`, `hyperlink`, `label`) address the block's text
//! by character offset and may overlap, so the renderer keeps a stack of open
//! spans and closes and reopens them as needed to emit well-nested markup.

use crate::article::{Span, TextBlock};
use pulldown_cmark::escape::{escape_href, escape_html, StrWrite};
use std::io;

/// Renders `blocks` as an HTML fragment.
pub fn as_html(blocks: &[TextBlock]) -> io::Result<String> {
    let mut renderer = HtmlRenderer::default();
    let mut out = String::new();
    for block in blocks {
        renderer.on_block(&mut out, block)?;
    }
    renderer.close_list(&mut out)?;
    Ok(out)
}

#[derive(Clone, Copy, PartialEq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

#[derive(Default)]
struct HtmlRenderer {
    /// The list that the previous block opened, if any.
    open_list: Option<ListKind>,
}

impl HtmlRenderer {
    fn on_block<W: StrWrite>(&mut self, w: &mut W, block: &TextBlock) -> io::Result<()> {
        let kind = block.kind.as_deref().unwrap_or("paragraph");
        let list = match kind {
            "list-item" => Some(ListKind::Unordered),
            "o-list-item" => Some(ListKind::Ordered),
            _ => None,
        };

        if self.open_list != list {
            self.close_list(w)?;
            if let Some(list) = list {
                write!(w, "<{}>", list.tag())?;
                self.open_list = Some(list);
            }
        }

        match kind {
            "image" => return on_image(w, block),
            "embed" => return on_embed(w, block),
            _ => {}
        }

        let tag = match kind {
            "heading1" => "h1",
            "heading2" => "h2",
            "heading3" => "h3",
            "heading4" => "h4",
            "heading5" => "h5",
            "heading6" => "h6",
            "preformatted" => "pre",
            "list-item" | "o-list-item" => "li",
            _ => "p",
        };
        write!(w, "<{}>", tag)?;
        on_text(w, &block.text, &block.spans)?;
        write!(w, "</{}>", tag)
    }

    fn close_list<W: StrWrite>(&mut self, w: &mut W) -> io::Result<()> {
        match self.open_list.take() {
            Some(list) => write!(w, "</{}>", list.tag()),
            None => Ok(()),
        }
    }
}

/// Writes `text` with `spans` applied.
fn on_text<W: StrWrite>(w: &mut W, text: &str, spans: &[Span]) -> io::Result<()> {
    let chars: Vec<char> = text.chars().collect();
    let mut spans: Vec<&Span> = spans
        .iter()
        .filter(|s| is_supported(s) && s.start < s.end.min(chars.len()))
        .collect();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut open: Vec<&Span> = Vec::new();
    let mut next = spans.iter().peekable();
    let mut run = String::new();

    for (pos, c) in chars.iter().chain(std::iter::once(&'\0')).enumerate() {
        let closing = open.iter().any(|s| s.end <= pos);
        let opening = next.peek().map_or(false, |s| s.start == pos);
        if closing || opening {
            on_run(w, &run)?;
            run.clear();
        }

        if closing {
            // Unwind down to the deepest span that ends here, then reopen the
            // ones above it that are still running.
            let deepest = open.iter().position(|s| s.end <= pos).unwrap_or(0);
            let unwound = open.split_off(deepest);
            for span in unwound.iter().rev() {
                on_span_end(w, span)?;
            }
            for span in unwound.into_iter().filter(|s| s.end > pos) {
                on_span_start(w, span)?;
                open.push(span);
            }
        }

        while let Some(span) = next.next_if(|s| s.start == pos) {
            on_span_start(w, span)?;
            open.push(*span);
        }

        if pos < chars.len() {
            run.push(*c);
        }
    }

    // Spans that run past the end of the text close here.
    on_run(w, &run)?;
    for span in open.iter().rev() {
        on_span_end(w, span)?;
    }
    Ok(())
}

fn on_image<W: StrWrite>(w: &mut W, block: &TextBlock) -> io::Result<()> {
    let src = match block.url.as_deref() {
        Some(src) => src,
        None => return Ok(()),
    };
    w.write_str(r#"<p class="block-img"><img src=""#)?;
    escape_href(&mut *w, src)?;
    w.write_str(r#"" alt=""#)?;
    escape_html(&mut *w, block.alt.as_deref().unwrap_or(""))?;
    w.write_str(r#"" /></p>"#)
}

// The provider's HTML is written as-is.
fn on_embed<W: StrWrite>(w: &mut W, block: &TextBlock) -> io::Result<()> {
    let embed = match &block.oembed {
        Some(embed) => embed,
        None => return Ok(()),
    };
    w.write_str(r#"<div data-oembed=""#)?;
    escape_href(&mut *w, embed.embed_url.as_deref().unwrap_or(""))?;
    w.write_str(r#"" data-oembed-type=""#)?;
    escape_html(&mut *w, embed.kind.as_deref().unwrap_or(""))?;
    w.write_str(r#"" data-oembed-provider=""#)?;
    escape_html(&mut *w, embed.provider_name.as_deref().unwrap_or(""))?;
    w.write_str(r#"">"#)?;
    w.write_str(embed.html.as_deref().unwrap_or(""))?;
    w.write_str("</div>")
}

fn is_supported(span: &Span) -> bool {
    matches!(span.kind.as_str(), "strong" | "em" | "hyperlink" | "label")
}

/// Escapes a run of plain text, turning newlines into line breaks.
fn on_run<W: StrWrite>(w: &mut W, run: &str) -> io::Result<()> {
    for (i, line) in run.split('\n').enumerate() {
        if i > 0 {
            w.write_str("<br />")?;
        }
        escape_html(&mut *w, line)?;
    }
    Ok(())
}

fn on_span_start<W: StrWrite>(w: &mut W, span: &Span) -> io::Result<()> {
    let data = span.data.as_ref();
    match span.kind.as_str() {
        "strong" => w.write_str("<strong>"),
        "em" => w.write_str("<em>"),
        "hyperlink" => {
            w.write_str(r#"<a href=""#)?;
            escape_href(&mut *w, data.and_then(|d| d.url.as_deref()).unwrap_or(""))?;
            match data.and_then(|d| d.target.as_deref()) {
                Some(target) => {
                    w.write_str(r#"" target=""#)?;
                    escape_html(&mut *w, target)?;
                    w.write_str(r#"" rel="noopener">"#)
                }
                None => w.write_str(r#"">"#),
            }
        }
        _ => {
            w.write_str(r#"<span class=""#)?;
            escape_html(&mut *w, data.and_then(|d| d.label.as_deref()).unwrap_or(""))?;
            w.write_str(r#"">"#)
        }
    }
}

fn on_span_end<W: StrWrite>(w: &mut W, span: &Span) -> io::Result<()> {
    w.write_str(match span.kind.as_str() {
        "strong" => "</strong>",
        "em" => "</em>",
        "hyperlink" => "</a>",
        _ => "</span>",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{Embed, SpanData};

    fn block(kind: &str, text: &str, spans: Vec<Span>) -> TextBlock {
        TextBlock {
            text: text.to_owned(),
            kind: Some(kind.to_owned()),
            spans,
            ..TextBlock::default()
        }
    }

    fn span(kind: &str, start: usize, end: usize) -> Span {
        Span {
            start,
            end,
            kind: kind.to_owned(),
            data: None,
        }
    }

    fn fixture(wanted: &str, blocks: &[TextBlock]) -> io::Result<()> {
        assert_eq!(wanted, as_html(blocks)?);
        Ok(())
    }

    #[test]
    fn test_paragraphs_and_headings() -> io::Result<()> {
        fixture(
            "<h2>Title</h2><p>Body</p><p>Untyped</p>",
            &[
                block("heading2", "Title", vec![]),
                block("paragraph", "Body", vec![]),
                TextBlock::plain("Untyped"),
            ],
        )
    }

    #[test]
    fn test_escapes_text() -> io::Result<()> {
        fixture(
            "<p>a &lt;b&gt; &amp; &quot;c&quot;</p>",
            &[TextBlock::plain(r#"a <b> & "c""#)],
        )
    }

    #[test]
    fn test_newlines() -> io::Result<()> {
        fixture(
            "<pre>line one<br />line two</pre>",
            &[block("preformatted", "line one\nline two", vec![])],
        )
    }

    #[test]
    fn test_groups_list_items() -> io::Result<()> {
        fixture(
            "<ul><li>a</li><li>b</li></ul><ol><li>1</li></ol><p>end</p><ul><li>c</li></ul>",
            &[
                block("list-item", "a", vec![]),
                block("list-item", "b", vec![]),
                block("o-list-item", "1", vec![]),
                block("paragraph", "end", vec![]),
                block("list-item", "c", vec![]),
            ],
        )
    }

    #[test]
    fn test_nested_spans() -> io::Result<()> {
        fixture(
            "<p><strong>bold <em>both</em></strong> plain</p>",
            &[block(
                "paragraph",
                "bold both plain",
                vec![span("em", 5, 9), span("strong", 0, 9)],
            )],
        )
    }

    #[test]
    fn test_overlapping_spans() -> io::Result<()> {
        fixture(
            "<p><strong>ab<em>cd</em></strong><em>ef</em></p>",
            &[block(
                "paragraph",
                "abcdef",
                vec![span("strong", 0, 4), span("em", 2, 6)],
            )],
        )
    }

    #[test]
    fn test_hyperlink() -> io::Result<()> {
        let mut link = span("hyperlink", 4, 8);
        link.data = Some(SpanData {
            url: Some("https://example.org/?a=1&b=2".to_owned()),
            target: Some("_blank".to_owned()),
            label: None,
        });
        fixture(
            r#"<p>see <a href="https://example.org/?a=1&amp;b=2" target="_blank" rel="noopener">docs</a>.</p>"#,
            &[block("paragraph", "see docs.", vec![link])],
        )
    }

    #[test]
    fn test_spans_count_characters() -> io::Result<()> {
        fixture(
            "<p>ação <em>é</em></p>",
            &[block("paragraph", "ação é", vec![span("em", 5, 6)])],
        )
    }

    #[test]
    fn test_ignores_invalid_spans() -> io::Result<()> {
        fixture(
            "<p>short</p>",
            &[block(
                "paragraph",
                "short",
                vec![span("strong", 3, 3), span("em", 9, 12), span("unknown", 0, 2)],
            )],
        )
    }

    #[test]
    fn test_image_and_embed_blocks() -> io::Result<()> {
        let image = TextBlock {
            kind: Some("image".to_owned()),
            url: Some("https://images.prismic.io/a.png?w=2&h=1".to_owned()),
            alt: Some("A \"hook\"".to_owned()),
            ..TextBlock::default()
        };
        let embed = TextBlock {
            kind: Some("embed".to_owned()),
            oembed: Some(Embed {
                html: Some("<iframe src=\"https://www.youtube.com/embed/x\"></iframe>".to_owned()),
                embed_url: Some("https://youtu.be/x".to_owned()),
                kind: Some("video".to_owned()),
                provider_name: Some("YouTube".to_owned()),
            }),
            ..TextBlock::default()
        };
        let broken = TextBlock {
            kind: Some("image".to_owned()),
            ..TextBlock::default()
        };
        fixture(
            concat!(
                r#"<ul><li>a</li></ul>"#,
                r#"<p class="block-img"><img src="https://images.prismic.io/a.png?w=2&amp;h=1" alt="A &quot;hook&quot;" /></p>"#,
                r#"<div data-oembed="https://youtu.be/x" data-oembed-type="video" data-oembed-provider="YouTube">"#,
                r#"<iframe src="https://www.youtube.com/embed/x"></iframe></div>"#,
            ),
            &[block("list-item", "a", vec![]), image, broken, embed],
        )
    }
}
