use xi_rope::delta::Builder;
use xi_rope::{Delta, Rope, RopeInfo};

use super::document::Document;

/// An edit against the buffer. All collaborator mutations arrive as one of
/// these three shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    Insert {
        at: usize,
        text: String,
    },
    Delete {
        range: std::ops::Range<usize>,
    },
    Replace {
        range: std::ops::Range<usize>,
        text: String,
    },
}

impl Cmd {
    /// The edit as `(start, removed_bytes, inserted_bytes)`.
    pub(crate) fn shape(&self) -> (usize, usize, usize) {
        match self {
            Cmd::Insert { at, text } => (*at, 0, text.len()),
            Cmd::Delete { range } => (range.start, range.len(), 0),
            Cmd::Replace { range, text } => (range.start, range.len(), text.len()),
        }
    }
}

/// Compiles a command into a rope delta against the document's buffer.
pub(crate) fn compile_command(doc: &Document, cmd: &Cmd) -> Delta<RopeInfo> {
    let mut builder = Builder::new(doc.buffer.len());
    match cmd {
        Cmd::Insert { at, text } => builder.replace(*at..*at, Rope::from(text.as_str())),
        Cmd::Delete { range } => builder.delete(range.clone()),
        Cmd::Replace { range, text } => builder.replace(range.clone(), Rope::from(text.as_str())),
    }
    builder.build()
}

/// Maps a position through an edit. Positions inside a removed region
/// collapse to the end of the inserted replacement.
pub(crate) fn transform_pos(pos: usize, start: usize, removed: usize, inserted: usize) -> usize {
    if pos <= start {
        pos
    } else if pos >= start + removed {
        pos - removed + inserted
    } else {
        start + inserted
    }
}

pub(crate) fn transform_range(
    range: &std::ops::Range<usize>,
    start: usize,
    removed: usize,
    inserted: usize,
) -> std::ops::Range<usize> {
    let a = transform_pos(range.start, start, removed, inserted);
    let b = transform_pos(range.end, start, removed, inserted).max(a);
    a..b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_of_each_command() {
        assert_eq!(
            Cmd::Insert {
                at: 3,
                text: "ab".into()
            }
            .shape(),
            (3, 0, 2)
        );
        assert_eq!(Cmd::Delete { range: 1..4 }.shape(), (1, 3, 0));
        assert_eq!(
            Cmd::Replace {
                range: 1..4,
                text: "x".into()
            }
            .shape(),
            (1, 3, 1)
        );
    }

    #[test]
    fn position_transform_through_insert() {
        assert_eq!(transform_pos(2, 5, 0, 3), 2);
        assert_eq!(transform_pos(5, 5, 0, 3), 5);
        assert_eq!(transform_pos(6, 5, 0, 3), 9);
    }

    #[test]
    fn position_transform_through_delete() {
        assert_eq!(transform_pos(2, 3, 4, 0), 2);
        assert_eq!(transform_pos(5, 3, 4, 0), 3);
        assert_eq!(transform_pos(9, 3, 4, 0), 5);
    }

    #[test]
    fn range_transform_keeps_order() {
        assert_eq!(transform_range(&(4..6), 3, 4, 0), 3..3);
    }
}
