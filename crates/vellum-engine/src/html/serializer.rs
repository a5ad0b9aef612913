//! Document -> HTML.
//!
//! A recursive descent over the span store in document order. At each
//! position the outermost block span decides the shape: lists split into
//! physical lines (recursing into nested blocks inside the open item),
//! quotes wrap their inner walk, headings re-emit their tag per line,
//! paragraphs and preformatted blocks wrap inline content, and preserved
//! raw spans are replayed verbatim. Inline spans are emitted with stack
//! discipline; hidden containers replay through their recorded open/close
//! ordinals, which is what lets genuinely overlapping `div`/`span` ranges
//! reconstruct.
//!
//! The result then passes through an escaping-aware tidy step that strips
//! the `<br>` runs block-closing tags imply on their own.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use super::CURSOR_TAG;
use super::escape;
use crate::constants::{END_OF_BUFFER_MARKER, MARKER_LEN, NEWLINE, is_filler};
use crate::editing::Document;
use crate::handlers::nesting_level_at;
use crate::spans::{Span, SpanId, SpanKind, SpanStore};

pub(crate) fn serialize_document(doc: &Document, cursor: Option<usize>) -> String {
    let mut ser = Serializer::new(doc, cursor);
    let end = ser.text.len();
    ser.within_blocks(0..end, 0);
    ser.finish()
}

struct Serializer {
    text: String,
    spans: SpanStore,
    out: String,
    cursor: Option<usize>,
    hidden_open: BTreeMap<usize, SpanId>,
    hidden_close: BTreeMap<usize, SpanId>,
    hidden_index: usize,
    hidden_opened: HashSet<SpanId>,
    hidden_emitted: HashSet<SpanId>,
}

impl Serializer {
    fn new(doc: &Document, cursor: Option<usize>) -> Self {
        let mut text = doc.text();
        let mut spans = doc.spans().clone();
        let base_len = text.len();

        // a scratch end marker keeps the final line visible to the nested
        // walkers; spans with an inclusive end ride over it
        let ids: Vec<SpanId> = spans.iter().map(|(id, _)| id).collect();
        for id in ids {
            if let Some(span) = spans.get_mut(id)
                && span.end == base_len
                && span.policy.grows_at_end()
            {
                span.end += MARKER_LEN;
            }
        }
        text.push(END_OF_BUFFER_MARKER);

        let mut hidden_open = BTreeMap::new();
        let mut hidden_close = BTreeMap::new();
        for (id, span) in spans.iter() {
            if matches!(span.kind, SpanKind::Hidden { .. }) {
                if let Some(o) = span.open_order {
                    hidden_open.insert(o, id);
                }
                if let Some(c) = span.close_order {
                    hidden_close.insert(c, id);
                }
            }
        }

        Self {
            text,
            spans,
            out: String::new(),
            cursor: cursor.map(|c| c.min(base_len)),
            hidden_open,
            hidden_close,
            hidden_index: 0,
            hidden_opened: HashSet::new(),
            hidden_emitted: HashSet::new(),
        }
    }

    fn finish(mut self) -> String {
        if self.cursor.is_some() {
            self.push_cursor_marker();
        }
        tidy(&self.out)
    }

    // ---- block walk ----

    fn within_blocks(&mut self, range: std::ops::Range<usize>, min_nesting: usize) {
        let mut i = range.start;
        while i < range.end {
            match self.outermost_block_at(i, min_nesting) {
                Some(id) => {
                    let Some(span) = self.spans.get(id).cloned() else {
                        i += 1;
                        continue;
                    };
                    let r = i..span.end.min(range.end).max(i + 1);
                    self.dispatch_block(id, &span, r.clone(), min_nesting);
                    i = r.end;
                }
                None => {
                    let next = self.next_block_start_after(i, range.end, min_nesting);
                    self.within_content(i..next);
                    i = next;
                }
            }
        }
    }

    fn outermost_block_at(&self, pos: usize, min_nesting: usize) -> Option<SpanId> {
        self.spans
            .iter()
            .filter(|(_, s)| s.kind.is_block_level() && s.nesting > min_nesting)
            .filter(|(_, s)| s.contains(pos))
            .min_by_key(|(id, s)| (s.nesting, s.start, *id))
            .map(|(id, _)| id)
    }

    fn next_block_start_after(&self, pos: usize, limit: usize, min_nesting: usize) -> usize {
        self.spans
            .iter()
            .filter(|(_, s)| s.kind.is_block_level() && s.nesting > min_nesting)
            .map(|(_, s)| s.start)
            .filter(|&start| start > pos && start < limit)
            .min()
            .unwrap_or(limit)
    }

    fn dispatch_block(
        &mut self,
        id: SpanId,
        span: &Span,
        r: std::ops::Range<usize>,
        _min_nesting: usize,
    ) {
        match &span.kind {
            SpanKind::UnorderedList | SpanKind::OrderedList => self.within_list(r, id),
            SpanKind::Quote => {
                self.out.push_str("<blockquote");
                self.out.push_str(&span.attributes.html());
                self.out.push('>');
                self.within_blocks(r, span.nesting);
                self.out.push_str("</blockquote>");
            }
            SpanKind::Heading { level } => self.within_heading(r, *level, span),
            SpanKind::Paragraph => {
                self.out.push_str("<p");
                self.out.push_str(&span.attributes.html());
                self.out.push('>');
                self.within_content(r);
                self.out.push_str("</p>");
            }
            SpanKind::Preformat => {
                self.out.push_str("<pre");
                self.out.push_str(&span.attributes.html());
                self.out.push('>');
                self.within_content(r);
                self.out.push_str("</pre>");
            }
            SpanKind::Unknown { raw } => {
                // stored markup goes out verbatim; the placeholder character
                // underneath is not content
                self.out.push_str(raw);
            }
            _ => self.within_content(r),
        }
    }

    // ---- lists ----

    fn within_list(&mut self, r: std::ops::Range<usize>, list_id: SpanId) {
        let Some(list) = self.spans.get(list_id).cloned() else {
            return;
        };
        let tag = match list.kind {
            SpanKind::OrderedList => "ol",
            _ => "ul",
        };
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push_str(&list.attributes.html());
        self.out.push('>');

        let mut li_open = false;
        let mut emitted_items = 0usize;
        let mut pos = r.start;
        while pos < r.end {
            let (line_end, next) = self.line_bounds(pos, r.end);

            if line_end > pos && self.nesting_at(pos) > list.nesting + 1 {
                // deeper-nested lines live inside the currently open item
                let mut run_end = next;
                while run_end < r.end {
                    let (le, nx) = self.line_bounds(run_end, r.end);
                    if le > run_end && self.nesting_at(run_end) > list.nesting + 1 {
                        run_end = nx;
                    } else {
                        break;
                    }
                }
                if !li_open {
                    self.open_item(pos, &list);
                    li_open = true;
                }
                self.within_blocks(pos..run_end, list.nesting + 1);
                pos = run_end;
                continue;
            }

            // the anchor line is chrome, not content, unless it is all the
            // list has
            if pos >= line_end
                || (self.line_is_trailing_anchor(pos, line_end) && (li_open || emitted_items > 0))
            {
                pos = next;
                continue;
            }

            if li_open {
                self.out.push_str("</li>");
            }
            self.open_item(pos, &list);
            li_open = true;
            emitted_items += 1;
            self.within_inline(pos..line_end);
            pos = next;
        }
        if li_open {
            self.out.push_str("</li>");
        }
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
    }

    fn open_item(&mut self, pos: usize, list: &Span) {
        let attrs = self
            .spans
            .iter()
            .filter(|(_, s)| {
                matches!(s.kind, SpanKind::ListItem)
                    && s.nesting == list.nesting + 1
                    && s.contains(pos)
            })
            .map(|(_, s)| s.attributes.clone())
            .next()
            .unwrap_or_default();
        self.out.push_str("<li");
        self.out.push_str(&attrs.html());
        self.out.push('>');
    }

    // ---- headings ----

    fn within_heading(&mut self, r: std::ops::Range<usize>, level: u8, span: &Span) {
        let mut pos = r.start;
        while pos < r.end {
            let (line_end, next) = self.line_bounds(pos, r.end);
            if pos < line_end && !self.line_is_trailing_anchor(pos, line_end) {
                self.out.push_str(&format!("<h{level}"));
                self.out.push_str(&span.attributes.html());
                self.out.push('>');
                self.within_inline(pos..line_end);
                self.out.push_str(&format!("</h{level}>"));
            }
            pos = next;
        }
    }

    // ---- plain content ----

    /// Lines with explicit `<br>` separators, the shape used inside
    /// quotes, paragraphs and outside any block.
    fn within_content(&mut self, r: std::ops::Range<usize>) {
        let mut i = r.start;
        while i < r.end {
            let (line_end, mut next) = self.line_bounds(i, r.end);
            let mut breaks = if line_end < next { 1 } else { 0 };
            while next < r.end && self.text[next..].starts_with(NEWLINE) {
                next += NEWLINE.len_utf8();
                breaks += 1;
            }
            self.within_inline(i..line_end);
            for _ in 0..breaks {
                self.out.push_str("<br>");
            }
            i = next;
        }
    }

    // ---- inline ----

    fn within_inline(&mut self, range: std::ops::Range<usize>) {
        // transition points: every clamped boundary of an inline, hidden or
        // raw span inside the range
        let mut points: std::collections::BTreeSet<usize> = std::collections::BTreeSet::new();
        points.insert(range.end);
        let mut wrapping: Vec<(SpanId, usize, usize)> = Vec::new();
        let mut contained: Vec<(SpanId, usize, usize)> = Vec::new();

        for (id, s) in self.spans.iter() {
            let hidden = matches!(s.kind, SpanKind::Hidden { .. });
            let self_contained = matches!(
                s.kind,
                SpanKind::Image | SpanKind::Comment { .. } | SpanKind::Unknown { .. }
            );
            if !s.kind.is_inline() && !hidden && !self_contained {
                continue;
            }
            let cs = s.start.max(range.start);
            let ce = s.end.min(range.end);
            if cs > ce || (cs == ce && !hidden) {
                continue;
            }
            points.insert(cs);
            points.insert(ce);
            if self_contained {
                contained.push((id, cs, ce));
            } else if !hidden && cs < ce {
                wrapping.push((id, cs, ce));
            }
        }

        let mut stack: Vec<(SpanId, usize)> = Vec::new();
        let mut skip_until = range.start;
        let mut prev = range.start;

        for p in points.into_iter().filter(|&p| p >= range.start) {
            self.emit_text(prev.max(skip_until), p);

            // close spans ending here; anything deeper closes too and
            // reopens right after (that is how a partial overlap flattens
            // into tags)
            if stack.iter().any(|(_, e)| *e == p) {
                let mut reopen: Vec<(SpanId, usize)> = Vec::new();
                while stack.iter().any(|(_, e)| *e == p) {
                    let (id, e) = stack.pop().expect("stack non-empty");
                    self.emit_close_tag(id);
                    if e != p {
                        reopen.push((id, e));
                    }
                }
                for (id, e) in reopen.into_iter().rev() {
                    self.emit_open_tag(id);
                    stack.push((id, e));
                }
            }

            self.replay_hidden(p);

            for &(id, cs, ce) in &contained {
                if cs == p {
                    self.emit_self_contained(id);
                    skip_until = skip_until.max(ce);
                }
            }

            let mut opening: Vec<(SpanId, usize)> = wrapping
                .iter()
                .filter(|(_, cs, _)| *cs == p)
                .map(|&(id, _, ce)| (id, ce))
                .collect();
            // longest span opens first so shorter ones nest inside it
            opening.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            for (id, e) in opening {
                if e > p {
                    self.emit_open_tag(id);
                    stack.push((id, e));
                }
            }

            prev = p;
        }
    }

    fn emit_text(&mut self, start: usize, end: usize) {
        if let Some(c) = self.cursor
            && c <= start
        {
            self.push_cursor_marker();
        }
        if start >= end {
            return;
        }
        let Some(slice) = self.text.get(start..end) else {
            return;
        };
        if let Some(c) = self.cursor
            && c > start
            && c <= end
        {
            let (before, after) = slice.split_at(c - start);
            let after = after.to_string();
            escape::append_escaped(&mut self.out, before);
            self.push_cursor_marker();
            escape::append_escaped(&mut self.out, &after);
            return;
        }
        escape::append_escaped(&mut self.out, slice);
    }

    fn push_cursor_marker(&mut self) {
        // emitted between tags and text, never inside a tag, so no output
        // position needs nudging past a closing '>'
        self.out.push('<');
        self.out.push_str(CURSOR_TAG);
        self.out.push_str("></");
        self.out.push_str(CURSOR_TAG);
        self.out.push('>');
        self.cursor = None;
    }

    fn emit_open_tag(&mut self, id: SpanId) {
        let Some(span) = self.spans.get(id) else {
            return;
        };
        let attrs = span.attributes.html();
        let tag = match &span.kind {
            SpanKind::Bold { tag }
            | SpanKind::Italic { tag }
            | SpanKind::Strikethrough { tag } => tag.clone(),
            SpanKind::Underline => "u".to_string(),
            SpanKind::Code => "code".to_string(),
            SpanKind::Link => "a".to_string(),
            _ => return,
        };
        self.out.push('<');
        self.out.push_str(&tag);
        self.out.push_str(&attrs);
        self.out.push('>');
    }

    fn emit_close_tag(&mut self, id: SpanId) {
        let Some(span) = self.spans.get(id) else {
            return;
        };
        let tag = match &span.kind {
            SpanKind::Bold { tag }
            | SpanKind::Italic { tag }
            | SpanKind::Strikethrough { tag } => tag.clone(),
            SpanKind::Underline => "u".to_string(),
            SpanKind::Code => "code".to_string(),
            SpanKind::Link => "a".to_string(),
            _ => return,
        };
        self.out.push_str("</");
        self.out.push_str(&tag);
        self.out.push('>');
    }

    fn emit_self_contained(&mut self, id: SpanId) {
        let Some(span) = self.spans.get(id) else {
            return;
        };
        match &span.kind {
            SpanKind::Image => {
                self.out.push_str("<img");
                self.out.push_str(&span.attributes.html());
                self.out.push('>');
            }
            SpanKind::Comment { text } => {
                self.out.push_str("<!--");
                self.out.push_str(text);
                self.out.push_str("-->");
            }
            SpanKind::Unknown { raw } => self.out.push_str(raw),
            _ => {}
        }
    }

    /// Replays hidden-container tags in their recorded global order. The
    /// index only advances when the span whose turn it is has a boundary
    /// here, which reconstructs overlapping open/close sequences a plain
    /// stack cannot express.
    fn replay_hidden(&mut self, pos: usize) {
        loop {
            let before = self.hidden_index;
            if let Some(&id) = self.hidden_open.get(&self.hidden_index)
                && !self.hidden_opened.contains(&id)
                && let Some(span) = self.spans.get(id)
                && span.start == pos
            {
                let attrs = span.attributes.html();
                if let SpanKind::Hidden { tag } = &span.kind {
                    let tag = tag.clone();
                    self.out.push('<');
                    self.out.push_str(&tag);
                    self.out.push_str(&attrs);
                    self.out.push('>');
                }
                self.hidden_opened.insert(id);
                self.hidden_index += 1;
            }
            if let Some(&id) = self.hidden_close.get(&self.hidden_index)
                && !self.hidden_emitted.contains(&id)
                && let Some(span) = self.spans.get(id)
                && span.end == pos
            {
                if let SpanKind::Hidden { tag } = &span.kind {
                    let tag = tag.clone();
                    self.out.push_str("</");
                    self.out.push_str(&tag);
                    self.out.push('>');
                }
                self.hidden_emitted.insert(id);
                self.hidden_index += 1;
            }
            if before == self.hidden_index {
                break;
            }
        }
    }

    // ---- helpers ----

    fn line_bounds(&self, pos: usize, limit: usize) -> (usize, usize) {
        match self.text.get(pos..limit).and_then(|s| s.find(NEWLINE)) {
            Some(off) => (pos + off, pos + off + NEWLINE.len_utf8()),
            None => (limit, limit),
        }
    }

    fn nesting_at(&self, pos: usize) -> usize {
        nesting_level_at(&self.text, &self.spans, pos, pos)
    }

    /// The buffer's final line when it holds nothing but the end-of-buffer
    /// anchor; it renders no content.
    fn line_is_trailing_anchor(&self, start: usize, end: usize) -> bool {
        if end != self.text.len() {
            return false;
        }
        match self.text.get(start..end) {
            Some(line) => line.chars().all(is_filler),
            None => false,
        }
    }
}

fn tidy(html: &str) -> String {
    static BR_BEFORE_CLOSE: OnceLock<Regex> = OnceLock::new();
    static BR_BEFORE_OPEN: OnceLock<Regex> = OnceLock::new();
    static BR_AT_LIST_EDGE: OnceLock<Regex> = OnceLock::new();
    let br_before_close = BR_BEFORE_CLOSE.get_or_init(|| {
        Regex::new(r"(?:<br>)+(</(?:blockquote|p|li|pre)>)").expect("valid tidy regex")
    });
    // a block tag implies its own line break; one explicit break right
    // before it would double the gap on reparse
    let br_before_open = BR_BEFORE_OPEN.get_or_init(|| {
        Regex::new(r"<br>(<(?:ul|ol|blockquote|pre|p|h[1-6])(?: [^>]*)?>)")
            .expect("valid tidy regex")
    });
    let br_at_list_edge = BR_AT_LIST_EDGE.get_or_init(|| {
        Regex::new(r"(</?(?:ul|ol)(?: [^>]*)?>)<br>").expect("valid tidy regex")
    });
    let out = br_before_close.replace_all(html, "$1");
    let out = br_before_open.replace_all(&out, "$1");
    let out = br_at_list_edge.replace_all(&out, "$1");
    out.replace("&#8203;", "")
}

#[cfg(test)]
mod tests {
    use crate::html::parse;
    use pretty_assertions::assert_eq;

    fn roundtrip(html: &str) -> String {
        parse(html).to_html()
    }

    #[test]
    fn plain_text() {
        assert_eq!(roundtrip("hello world"), "hello world");
    }

    #[test]
    fn inline_styles() {
        assert_eq!(roundtrip("<b>bold</b>"), "<b>bold</b>");
        assert_eq!(roundtrip("a <strong>big</strong> deal"), "a <strong>big</strong> deal");
        assert_eq!(roundtrip("<del>gone</del>"), "<del>gone</del>");
        assert_eq!(roundtrip("<u>under</u> and <code>mono</code>"), "<u>under</u> and <code>mono</code>");
    }

    #[test]
    fn nested_inline_styles() {
        assert_eq!(roundtrip("<b>ab<i>c</i></b>"), "<b>ab<i>c</i></b>");
    }

    #[test]
    fn link_preserves_attributes() {
        assert_eq!(
            roundtrip("<a href=\"http://x\" rel=\"nofollow\">t</a>"),
            "<a href=\"http://x\" rel=\"nofollow\">t</a>"
        );
    }

    #[test]
    fn image_is_self_contained() {
        assert_eq!(
            roundtrip("a<img src=\"x.png\">b"),
            "a<img src=\"x.png\">b"
        );
    }

    #[test]
    fn line_break() {
        assert_eq!(roundtrip("a<br>b"), "a<br>b");
    }

    #[test]
    fn simple_list() {
        assert_eq!(
            roundtrip("<ul><li>a</li><li>b</li></ul>"),
            "<ul><li>a</li><li>b</li></ul>"
        );
        assert_eq!(
            roundtrip("<ol><li>one</li></ol>"),
            "<ol><li>one</li></ol>"
        );
    }

    #[test]
    fn empty_list_item_roundtrips() {
        assert_eq!(
            roundtrip("<ul><li>a</li><li></li></ul>"),
            "<ul><li>a</li><li></li></ul>"
        );
    }

    #[test]
    fn list_item_attributes() {
        assert_eq!(
            roundtrip("<ul><li style=\"x\">a</li></ul>"),
            "<ul><li style=\"x\">a</li></ul>"
        );
    }

    #[test]
    fn nested_list_inside_item() {
        assert_eq!(
            roundtrip("<ul><li>a<ul><li>b</li></ul></li></ul>"),
            "<ul><li>a<ul><li>b</li></ul></li></ul>"
        );
    }

    #[test]
    fn quote() {
        assert_eq!(roundtrip("<blockquote>q</blockquote>"), "<blockquote>q</blockquote>");
    }

    #[test]
    fn quote_with_inner_break() {
        assert_eq!(
            roundtrip("<blockquote>q1<br>q2</blockquote>"),
            "<blockquote>q1<br>q2</blockquote>"
        );
    }

    #[test]
    fn list_inside_quote() {
        assert_eq!(
            roundtrip("<blockquote><ul><li>x</li></ul></blockquote>"),
            "<blockquote><ul><li>x</li></ul></blockquote>"
        );
    }

    #[test]
    fn quote_inside_list() {
        assert_eq!(
            roundtrip("<ul><li><blockquote>x</blockquote></li></ul>"),
            "<ul><li><blockquote>x</blockquote></li></ul>"
        );
    }

    #[test]
    fn headings() {
        assert_eq!(roundtrip("<h1>title</h1>"), "<h1>title</h1>");
        assert_eq!(roundtrip("<h3>sub</h3>after"), "<h3>sub</h3>after");
    }

    #[test]
    fn paragraphs() {
        assert_eq!(roundtrip("<p>x</p><p>y</p>"), "<p>x</p><p>y</p>");
    }

    #[test]
    fn preformat() {
        assert_eq!(roundtrip("<pre>code here</pre>"), "<pre>code here</pre>");
    }

    #[test]
    fn unknown_markup_verbatim() {
        assert_eq!(
            roundtrip("<foo data-x=\"1\">bar</foo>"),
            "<foo data-x=\"1\">bar</foo>"
        );
    }

    #[test]
    fn comment_verbatim() {
        assert_eq!(roundtrip("a<!--more-->b"), "a<!--more-->b");
    }

    #[test]
    fn hidden_containers() {
        assert_eq!(
            roundtrip("<div class=\"wp\"><b>x</b></div>"),
            "<div class=\"wp\"><b>x</b></div>"
        );
        assert_eq!(
            roundtrip("<div><span>a</span>b</div>"),
            "<div><span>a</span>b</div>"
        );
    }

    #[test]
    fn escaping() {
        assert_eq!(roundtrip("1 &lt; 2 &amp; 3"), "1 &lt; 2 &amp; 3");
    }

    #[test]
    fn empty_block_renders() {
        assert_eq!(roundtrip("<blockquote></blockquote>"), "<blockquote></blockquote>");
        assert_eq!(roundtrip("<p></p>"), "<p></p>");
    }

    #[test]
    fn cursor_marker_lands_at_offset() {
        let doc = parse("abcd");
        let html = doc.to_html_with_cursor(2);
        assert_eq!(html, "ab<vellum_cursor></vellum_cursor>cd");
    }

    #[test]
    fn cursor_marker_at_end() {
        let doc = parse("ab");
        assert_eq!(
            doc.to_html_with_cursor(2),
            "ab<vellum_cursor></vellum_cursor>"
        );
    }

    #[test]
    fn cursor_roundtrips_through_parse() {
        let doc = parse("abcd");
        let html = doc.to_html_with_cursor(2);
        let doc2 = parse(&html);
        assert_eq!(doc2.selection(), 2..2);
        assert_eq!(doc2.text(), "abcd");
    }
}
