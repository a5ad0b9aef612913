//! Token stream -> annotated buffer.
//!
//! Consumes tokenizer events in document order and builds the buffer text
//! plus its span store. Recognized inline tags push pending markers closed
//! LIFO-by-kind; block tags keep their own stack with nesting levels;
//! `div`/`span` go through the hidden-container machinery with global
//! open/close ordinals; everything else is accumulated verbatim into an
//! opaque raw span. Malformed input never fails: a close with no matching
//! open is a no-op, and whatever is still open at the end of input is
//! closed implicitly.

use super::CURSOR_TAG;
use super::tokenizer::{self, Token};
use crate::constants::{NEWLINE, OBJECT_CHAR, ZWJ};
use crate::editing::Document;
use crate::handlers;
use crate::spans::{Attributes, GrowthPolicy, Span, SpanId, SpanKind, SpanStore};

/// Parses an HTML string into a fresh document. Total: unsupported or
/// broken markup degrades to preserved raw spans, never an error.
pub(crate) fn parse_document(html: &str) -> Document {
    let mut parser = TagParser::new();
    for token in tokenizer::tokenize(html) {
        parser.token(token);
    }
    parser.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineKind {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    Link,
}

struct PendingInline {
    kind: InlineKind,
    tag: String,
    attributes: Attributes,
    start: usize,
}

struct PendingBlock {
    kind: SpanKind,
    attributes: Attributes,
    nesting: usize,
    start: usize,
    last_item: Option<SpanId>,
}

struct PendingHidden {
    tag: String,
    attributes: Attributes,
    start: usize,
    open_order: usize,
}

struct TagParser {
    text: String,
    spans: SpanStore,
    inline_pending: Vec<PendingInline>,
    block_stack: Vec<PendingBlock>,
    hidden_pending: Vec<PendingHidden>,
    hidden_order: usize,
    unknown_depth: usize,
    unknown_raw: String,
    cursor: Option<usize>,
    cursor_in_unknown: bool,
}

impl TagParser {
    fn new() -> Self {
        Self {
            text: String::new(),
            spans: SpanStore::new(),
            inline_pending: Vec::new(),
            block_stack: Vec::new(),
            hidden_pending: Vec::new(),
            hidden_order: 0,
            unknown_depth: 0,
            unknown_raw: String::new(),
            cursor: None,
            cursor_in_unknown: false,
        }
    }

    fn token(&mut self, token: Token) {
        match token {
            Token::Text(text) => {
                if self.unknown_depth > 0 {
                    push_reescaped(&mut self.unknown_raw, &text);
                } else {
                    self.append_collapsed(&text);
                }
            }
            Token::RawText(raw) => {
                if self.unknown_depth > 0 {
                    self.unknown_raw.push_str(&raw);
                } else {
                    self.append_collapsed(&raw);
                }
            }
            Token::Comment(body) => {
                if self.unknown_depth > 0 {
                    self.unknown_raw.push_str("<!--");
                    self.unknown_raw.push_str(&body);
                    self.unknown_raw.push_str("-->");
                } else {
                    let start = self.text.len();
                    self.text.push(OBJECT_CHAR);
                    self.spans.insert(Span::new(
                        SpanKind::Comment { text: body },
                        Attributes::new(),
                        0,
                        start,
                        self.text.len(),
                        GrowthPolicy::ExclusiveExclusive,
                    ));
                }
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let attrs = Attributes::from_pairs(attributes);
                self.open(&name, attrs, self_closing);
            }
            Token::EndTag { name } => self.close(&name),
        }
    }

    fn open(&mut self, name: &str, attrs: Attributes, self_closing: bool) {
        if self.unknown_depth > 0 {
            if name == CURSOR_TAG {
                self.cursor_in_unknown = true;
                return;
            }
            push_raw_open(&mut self.unknown_raw, name, &attrs);
            if !self_closing {
                self.unknown_depth += 1;
            }
            return;
        }

        match name {
            "html" | "body" => {}
            CURSOR_TAG => self.cursor = Some(self.text.len()),
            "br" => self.text.push(NEWLINE),
            "b" | "strong" => self.push_inline(InlineKind::Bold, name, attrs),
            "i" | "em" | "cite" | "dfn" => self.push_inline(InlineKind::Italic, name, attrs),
            "u" => self.push_inline(InlineKind::Underline, name, attrs),
            "s" | "strike" | "del" => self.push_inline(InlineKind::Strikethrough, name, attrs),
            "code" => self.push_inline(InlineKind::Code, name, attrs),
            "a" => self.push_inline(InlineKind::Link, name, attrs),
            "img" => {
                let start = self.text.len();
                self.text.push(OBJECT_CHAR);
                self.spans.insert(Span::new(
                    SpanKind::Image,
                    attrs,
                    0,
                    start,
                    self.text.len(),
                    GrowthPolicy::ExclusiveExclusive,
                ));
            }
            "div" | "span" => {
                let order = self.hidden_order;
                self.hidden_order += 1;
                self.hidden_pending.push(PendingHidden {
                    tag: name.to_string(),
                    attributes: attrs,
                    start: self.text.len(),
                    open_order: order,
                });
                if self_closing {
                    self.close_hidden();
                }
                return;
            }
            "ul" => self.open_block(SpanKind::UnorderedList, attrs),
            "ol" => self.open_block(SpanKind::OrderedList, attrs),
            "li" => self.open_block(SpanKind::ListItem, attrs),
            "blockquote" => self.open_block(SpanKind::Quote, attrs),
            "p" => self.open_block(SpanKind::Paragraph, attrs),
            "pre" => self.open_block(SpanKind::Preformat, attrs),
            _ => {
                if let Some(level) = heading_level(name) {
                    self.open_block(SpanKind::Heading { level }, attrs);
                } else {
                    self.unknown_raw.clear();
                    push_raw_open(&mut self.unknown_raw, name, &attrs);
                    if self_closing {
                        self.finish_unknown();
                    } else {
                        self.unknown_depth = 1;
                    }
                    return;
                }
            }
        }

        if self_closing && is_recognized_container(name) {
            self.close(name);
        }
    }

    fn close(&mut self, name: &str) {
        if self.unknown_depth > 0 {
            if name == CURSOR_TAG {
                return;
            }
            self.unknown_raw.push_str("</");
            self.unknown_raw.push_str(name);
            self.unknown_raw.push('>');
            self.unknown_depth -= 1;
            if self.unknown_depth == 0 {
                self.finish_unknown();
            }
            return;
        }

        match name {
            "html" | "body" | "br" | "img" | CURSOR_TAG => {}
            "b" | "strong" => self.close_inline(InlineKind::Bold),
            "i" | "em" | "cite" | "dfn" => self.close_inline(InlineKind::Italic),
            "u" => self.close_inline(InlineKind::Underline),
            "s" | "strike" | "del" => self.close_inline(InlineKind::Strikethrough),
            "code" => self.close_inline(InlineKind::Code),
            "a" => self.close_inline(InlineKind::Link),
            "div" | "span" => self.close_hidden(),
            "ul" => self.close_block(|k| matches!(k, SpanKind::UnorderedList)),
            "ol" => self.close_block(|k| matches!(k, SpanKind::OrderedList)),
            "li" => self.close_block(|k| matches!(k, SpanKind::ListItem)),
            "blockquote" => self.close_block(|k| matches!(k, SpanKind::Quote)),
            "p" => self.close_block(|k| matches!(k, SpanKind::Paragraph)),
            "pre" => self.close_block(|k| matches!(k, SpanKind::Preformat)),
            _ => {
                if heading_level(name).is_some() {
                    self.close_block(|k| matches!(k, SpanKind::Heading { .. }));
                }
                // a stray close of anything else is tolerated silently
            }
        }
    }

    // ---- text ----

    /// Appends character data, collapsing whitespace runs the way the host
    /// tokenizer's consumers expect: spaces and newlines following other
    /// whitespace are dropped, a run boils down to one space. Non-breaking
    /// spaces survive the collapse and then become plain spaces in the
    /// buffer.
    fn append_collapsed(&mut self, chunk: &str) {
        let mut sb = String::new();
        for c in chunk.chars() {
            if c == ' ' || c == '\n' || c == '\t' || c == '\r' {
                let pred = sb
                    .chars()
                    .next_back()
                    .or_else(|| self.text.chars().next_back())
                    .unwrap_or('\n');
                if pred != ' ' && pred != '\n' {
                    sb.push(' ');
                }
            } else {
                sb.push(c);
            }
        }
        if sb.contains('\u{A0}') {
            sb = sb.replace('\u{A0}', " ");
        }
        self.text.push_str(&sb);
    }

    // ---- inline ----

    fn push_inline(&mut self, kind: InlineKind, tag: &str, attributes: Attributes) {
        self.inline_pending.push(PendingInline {
            kind,
            tag: tag.to_string(),
            attributes,
            start: self.text.len(),
        });
    }

    fn close_inline(&mut self, kind: InlineKind) {
        let Some(idx) = self.inline_pending.iter().rposition(|p| p.kind == kind) else {
            return;
        };
        let pending = self.inline_pending.remove(idx);
        let end = self.text.len();
        if pending.start == end {
            // empty inline elements carry nothing; drop them
            return;
        }
        let span_kind = match pending.kind {
            InlineKind::Bold => SpanKind::Bold { tag: pending.tag },
            InlineKind::Italic => SpanKind::Italic { tag: pending.tag },
            InlineKind::Underline => SpanKind::Underline,
            InlineKind::Strikethrough => SpanKind::Strikethrough { tag: pending.tag },
            InlineKind::Code => SpanKind::Code,
            InlineKind::Link => SpanKind::Link,
        };
        self.spans.insert(Span::new(
            span_kind,
            pending.attributes,
            0,
            pending.start,
            end,
            GrowthPolicy::ExclusiveExclusive,
        ));
    }

    // ---- hidden containers ----

    /// Closes the most recently opened still-open hidden container,
    /// whichever tag it carries. Genuine overlap is resolved at
    /// serialization through the order indices.
    fn close_hidden(&mut self) {
        let Some(pending) = self.hidden_pending.pop() else {
            return;
        };
        let end = self.text.len();
        let policy = if pending.start == end {
            GrowthPolicy::InclusiveExclusive
        } else {
            GrowthPolicy::ExclusiveExclusive
        };
        let mut span = Span::new(
            SpanKind::Hidden { tag: pending.tag },
            pending.attributes,
            0,
            pending.start,
            end,
            policy,
        );
        span.open_order = Some(pending.open_order);
        span.close_order = Some(self.hidden_order);
        self.hidden_order += 1;
        self.spans.insert(span);
    }

    // ---- blocks ----

    fn open_block(&mut self, kind: SpanKind, attributes: Attributes) {
        if block_needs_leading_separator(&self.text) {
            self.text.push(NEWLINE);
        }
        let nesting = self.block_stack.len() + 1;
        self.block_stack.push(PendingBlock {
            kind,
            attributes,
            nesting,
            start: self.text.len(),
            last_item: None,
        });
    }

    fn close_block(&mut self, matches: impl Fn(&SpanKind) -> bool) {
        let Some(idx) = self.block_stack.iter().rposition(|b| matches(&b.kind)) else {
            return;
        };
        // anything still open above the target closes implicitly first
        let mut tail = self.block_stack.split_off(idx);
        while let Some(pending) = tail.pop() {
            let is_item = matches!(pending.kind, SpanKind::ListItem);
            let id = self.finish_block(pending);
            if is_item {
                self.register_item(&mut tail, id);
            }
        }
    }

    fn finish_block(&mut self, pending: PendingBlock) -> SpanId {
        if self.text.len() == pending.start {
            // an empty block still needs a character to render
            self.text.push(ZWJ);
        }
        if !self.text.ends_with(NEWLINE) {
            self.text.push(NEWLINE);
        }
        let end = match pending.kind {
            // items end before their line's newline; other blocks own it
            SpanKind::ListItem => self.text.len() - NEWLINE.len_utf8(),
            _ => self.text.len(),
        };
        let mut span = Span::new(
            pending.kind,
            pending.attributes,
            pending.nesting,
            pending.start,
            end,
            GrowthPolicy::InclusiveInclusive,
        );
        span.last_item = pending.last_item;
        self.spans.insert(span)
    }

    /// Records a just-closed item on its innermost enclosing open list.
    fn register_item(&mut self, closing: &mut [PendingBlock], id: SpanId) {
        if let Some(list) = closing.iter_mut().rev().find(|b| b.kind.is_list()) {
            list.last_item = Some(id);
            return;
        }
        if let Some(list) = self.block_stack.iter_mut().rev().find(|b| b.kind.is_list()) {
            list.last_item = Some(id);
        }
    }

    // ---- unknown markup ----

    fn finish_unknown(&mut self) {
        let raw = std::mem::take(&mut self.unknown_raw);
        let start = self.text.len();
        self.text.push(OBJECT_CHAR);
        self.spans.insert(Span::new(
            SpanKind::Unknown { raw },
            Attributes::new(),
            self.block_stack.len() + 1,
            start,
            self.text.len(),
            GrowthPolicy::ExclusiveExclusive,
        ));
        if self.cursor_in_unknown {
            self.cursor = Some(start);
            self.cursor_in_unknown = false;
        }
    }

    fn finish(mut self) -> Document {
        if self.unknown_depth > 0 {
            // input ended inside unparsed markup; keep what we have
            self.unknown_depth = 0;
            self.finish_unknown();
        }
        let mut tail = std::mem::take(&mut self.block_stack);
        while let Some(pending) = tail.pop() {
            let is_item = matches!(pending.kind, SpanKind::ListItem);
            let id = self.finish_block(pending);
            if is_item {
                self.register_item(&mut tail, id);
            }
        }
        let mut doc = Document::from_parts(self.text, self.spans, self.cursor);
        handlers::end_marker::ensure(&mut doc, false);
        doc
    }
}

/// Whether opening a block element needs a separating newline first.
///
/// The full decision table over (previous block event, next kind) collapses
/// to buffer state: a block open only lacks its line boundary when ordinary
/// text precedes it, because every block close restores the boundary and a
/// child opening flush with its just-opened parent inherits the parent's.
/// The one case the original system special-cases — a list item immediately
/// followed by a nested list — falls out the same way.
fn block_needs_leading_separator(text: &str) -> bool {
    !text.is_empty() && !text.ends_with(NEWLINE)
}

fn heading_level(name: &str) -> Option<u8> {
    let bytes = name.as_bytes();
    if bytes.len() == 2 && bytes[0] == b'h' && (b'1'..=b'6').contains(&bytes[1]) {
        Some(bytes[1] - b'0')
    } else {
        None
    }
}

fn is_recognized_container(name: &str) -> bool {
    matches!(
        name,
        "b" | "strong"
            | "i"
            | "em"
            | "cite"
            | "dfn"
            | "u"
            | "s"
            | "strike"
            | "del"
            | "code"
            | "a"
            | "ul"
            | "ol"
            | "li"
            | "blockquote"
            | "p"
            | "pre"
    ) || heading_level(name).is_some()
}

fn push_raw_open(raw: &mut String, name: &str, attrs: &Attributes) {
    raw.push('<');
    raw.push_str(name);
    raw.push_str(&attrs.html());
    raw.push('>');
}

/// Text swallowed into a raw span gets its markup metacharacters
/// re-escaped, so re-emitting the raw text cannot spawn new tags.
fn push_reescaped(raw: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '<' => raw.push_str("&lt;"),
            '>' => raw.push_str("&gt;"),
            '&' => raw.push_str("&amp;"),
            c => raw.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::END_OF_BUFFER_MARKER;

    fn marker() -> String {
        END_OF_BUFFER_MARKER.to_string()
    }

    #[test]
    fn plain_text() {
        let doc = parse_document("hello world");
        assert_eq!(doc.text(), "hello world");
        assert!(doc.spans().is_empty());
    }

    #[test]
    fn bold_keeps_source_tag() {
        let doc = parse_document("a <strong>big</strong> deal");
        assert_eq!(doc.text(), "a big deal");
        let (_, span) = doc.spans().iter().next().unwrap();
        assert_eq!(span.kind, SpanKind::Bold { tag: "strong".into() });
        assert_eq!(span.range(), 2..5);
    }

    #[test]
    fn unmatched_close_is_a_noop() {
        let doc = parse_document("abc</b>def");
        assert_eq!(doc.text(), "abcdef");
        assert!(doc.spans().is_empty());
    }

    #[test]
    fn empty_inline_element_is_dropped() {
        let doc = parse_document("a<b></b>c");
        assert_eq!(doc.text(), "ac");
        assert!(doc.spans().is_empty());
    }

    #[test]
    fn whitespace_collapses() {
        let doc = parse_document("a  \n  b");
        assert_eq!(doc.text(), "a b");
    }

    #[test]
    fn leading_whitespace_is_dropped() {
        let doc = parse_document("  a");
        assert_eq!(doc.text(), "a");
    }

    #[test]
    fn nbsp_defeats_collapsing_and_becomes_space() {
        let doc = parse_document("a&nbsp; b");
        assert_eq!(doc.text(), "a  b");
    }

    #[test]
    fn br_becomes_newline() {
        let doc = parse_document("a<br>b");
        assert_eq!(doc.text(), "a\nb");
    }

    #[test]
    fn list_builds_items_and_marker_item() {
        let doc = parse_document("<ul><li>a</li><li>b</li></ul>");
        assert_eq!(doc.text(), format!("a\nb\n{}", marker()));

        let spans = doc.spans();
        let list = spans
            .iter()
            .find(|(_, s)| s.kind == SpanKind::UnorderedList)
            .map(|(id, s)| (id, s.clone()))
            .expect("list span");
        // the list grew over the trailing anchor
        assert_eq!(list.1.range(), 0..7);

        let mut items: Vec<&Span> = spans
            .iter()
            .filter(|(_, s)| s.kind == SpanKind::ListItem)
            .map(|(_, s)| s)
            .collect();
        items.sort_by_key(|s| s.start);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].range(), 0..1);
        assert_eq!(items[1].range(), 2..3);
        // trailing anchor item wraps the end-of-buffer marker
        assert_eq!(items[2].range(), 4..7);
        assert_eq!(items[0].nesting, 2);

        let last = list.1.last_item.expect("last item tracked");
        assert_eq!(spans.get(last).unwrap().range(), 4..7);
    }

    #[test]
    fn empty_list_item_gets_placeholder() {
        let doc = parse_document("<ul><li>a</li><li></li></ul>");
        assert_eq!(doc.text(), format!("a\n{ZWJ}\n{}", marker()));
    }

    #[test]
    fn heading_does_not_cover_trailing_anchor() {
        let doc = parse_document("<h1>AB</h1>");
        assert_eq!(doc.text(), format!("AB\n{}", marker()));
        let heading = doc
            .spans()
            .iter()
            .find(|(_, s)| matches!(s.kind, SpanKind::Heading { .. }))
            .map(|(_, s)| s.clone())
            .unwrap();
        // the marker event pushed the heading back off the anchor
        assert_eq!(heading.range(), 0..3);
    }

    #[test]
    fn heading_then_text_keeps_text_outside() {
        let doc = parse_document("<h1>A</h1>\nB");
        assert_eq!(doc.text(), "A\nB");
        let heading = doc
            .spans()
            .iter()
            .find(|(_, s)| matches!(s.kind, SpanKind::Heading { .. }))
            .map(|(_, s)| s.clone())
            .unwrap();
        assert_eq!(heading.range(), 0..2);
    }

    #[test]
    fn quote_in_list_nesting() {
        let doc = parse_document("<blockquote><ul><li>x</li></ul></blockquote>");
        assert_eq!(doc.text(), format!("x\n{}", marker()));
        let quote = doc
            .spans()
            .iter()
            .find(|(_, s)| s.kind == SpanKind::Quote)
            .map(|(_, s)| s.clone())
            .unwrap();
        let list = doc
            .spans()
            .iter()
            .find(|(_, s)| s.kind == SpanKind::UnorderedList)
            .map(|(_, s)| s.clone())
            .unwrap();
        assert_eq!(quote.nesting, 1);
        assert_eq!(list.nesting, 2);
        assert!(quote.end >= list.end);
    }

    #[test]
    fn text_before_block_gets_separator() {
        let doc = parse_document("intro<p>x</p>");
        assert_eq!(doc.text(), format!("intro\nx\n{}", marker()));
        let para = doc
            .spans()
            .iter()
            .find(|(_, s)| s.kind == SpanKind::Paragraph)
            .map(|(_, s)| s.clone())
            .unwrap();
        // the paragraph starts on its own line and engulfs the trailing
        // anchor
        assert_eq!(para.range(), 6..11);
    }

    #[test]
    fn unknown_markup_preserved_verbatim() {
        let doc = parse_document("<foo data-x=\"1\">bar</foo>");
        assert_eq!(doc.text(), OBJECT_CHAR.to_string());
        let (_, span) = doc.spans().iter().next().unwrap();
        assert_eq!(
            span.kind,
            SpanKind::Unknown {
                raw: "<foo data-x=\"1\">bar</foo>".into()
            }
        );
    }

    #[test]
    fn unknown_nested_tags_swallowed_whole() {
        let doc = parse_document("<foo><b>x</b></foo>");
        let (_, span) = doc.spans().iter().next().unwrap();
        assert_eq!(
            span.kind,
            SpanKind::Unknown {
                raw: "<foo><b>x</b></foo>".into()
            }
        );
    }

    #[test]
    fn unknown_reescapes_entity_text() {
        let doc = parse_document("<foo>a &lt;b&gt;</foo>");
        let (_, span) = doc.spans().iter().next().unwrap();
        assert_eq!(
            span.kind,
            SpanKind::Unknown {
                raw: "<foo>a &lt;b&gt;</foo>".into()
            }
        );
    }

    #[test]
    fn comment_preserved() {
        let doc = parse_document("a<!--more-->b");
        assert_eq!(doc.text(), format!("a{OBJECT_CHAR}b"));
        let comment = doc
            .spans()
            .iter()
            .find(|(_, s)| matches!(s.kind, SpanKind::Comment { .. }))
            .map(|(_, s)| s.clone())
            .unwrap();
        assert_eq!(comment.kind, SpanKind::Comment { text: "more".into() });
    }

    #[test]
    fn image_placeholder_and_attrs() {
        let doc = parse_document("<img src=\"x.png\" alt=\"pic\">");
        assert_eq!(doc.text(), OBJECT_CHAR.to_string());
        let (_, span) = doc.spans().iter().next().unwrap();
        assert_eq!(span.kind, SpanKind::Image);
        assert_eq!(span.attributes.get("src"), Some("x.png"));
        assert_eq!(span.attributes.get("alt"), Some("pic"));
    }

    #[test]
    fn hidden_containers_record_order() {
        let doc = parse_document("<div class=\"wp\"><span>x</span></div>");
        assert_eq!(doc.text(), "x");
        let mut hiddens: Vec<&Span> = doc
            .spans()
            .iter()
            .filter(|(_, s)| matches!(s.kind, SpanKind::Hidden { .. }))
            .map(|(_, s)| s)
            .collect();
        hiddens.sort_by_key(|s| s.open_order);
        assert_eq!(hiddens.len(), 2);
        assert_eq!(hiddens[0].open_order, Some(0));
        assert_eq!(hiddens[0].kind, SpanKind::Hidden { tag: "div".into() });
        assert_eq!(hiddens[1].open_order, Some(1));
        // span closed first, div second
        assert!(hiddens[1].close_order < hiddens[0].close_order);
    }

    #[test]
    fn cursor_element_sets_selection() {
        let doc = parse_document("ab<vellum_cursor></vellum_cursor>cd");
        assert_eq!(doc.text(), "abcd");
        assert_eq!(doc.selection(), 2..2);
    }

    #[test]
    fn unclosed_blocks_close_implicitly() {
        let doc = parse_document("<ul><li>a");
        assert_eq!(doc.text(), format!("a\n{}", marker()));
        assert!(
            doc.spans()
                .iter()
                .any(|(_, s)| s.kind == SpanKind::UnorderedList)
        );
    }

    #[test]
    fn interleaved_close_closes_children_first() {
        // the stray </ul> closes the still-open item implicitly
        let doc = parse_document("<ul><li>a</ul>");
        let items: Vec<&Span> = doc
            .spans()
            .iter()
            .filter(|(_, s)| s.kind == SpanKind::ListItem)
            .map(|(_, s)| s)
            .collect();
        assert!(!items.is_empty());
    }

    #[test]
    fn empty_quote_gets_placeholder() {
        let doc = parse_document("<blockquote></blockquote>");
        assert_eq!(doc.text(), format!("{ZWJ}\n{}", marker()));
    }
}
