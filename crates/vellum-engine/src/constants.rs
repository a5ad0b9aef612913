//! Sentinel characters used inside the text buffer.
//!
//! These characters are engine bookkeeping, not user content. The serializer
//! knows to drop them and the structural maintainers know to treat them as
//! "not real text".

/// Line separator. Every block element aligns itself to these.
pub const NEWLINE: char = '\n';

/// Zero-width space. Placeholder for a visually-empty styled line, so an
/// empty block element still has a character to span.
pub const ZWJ: char = '\u{200B}';

/// Trailing anchor appended when the buffer ends in a newline while a block
/// element is still open across it. Shares the ZWJ code point.
pub const END_OF_BUFFER_MARKER: char = ZWJ;

/// Stand-in for embedded content (images, preserved raw markup, comments)
/// so the covering span has a character to attach to.
pub const OBJECT_CHAR: char = '\u{FFFC}';

/// Reserved filler used by horizontal-rule style elements.
pub const MAGIC_CHAR: char = '\u{FEFF}';

/// UTF-8 width of [`END_OF_BUFFER_MARKER`] / [`ZWJ`].
pub const MARKER_LEN: usize = 3;

/// UTF-8 width of [`OBJECT_CHAR`].
pub const OBJECT_CHAR_LEN: usize = 3;

/// Characters that carry no visible content of their own.
pub fn is_filler(c: char) -> bool {
    c == ZWJ || c == MAGIC_CHAR
}
