//! Streaming HTML tokenizer.
//!
//! A small, non-correcting tokenizer: it reports what the source says and
//! leaves tag balancing to the consumer. Scanning is byte-wise; slices are
//! only cut at ASCII structural bytes, so every slice endpoint stays on a
//! UTF-8 character boundary. It never fails — bytes that do not form a tag
//! are reported as text.

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    /// Character data with entity references decoded.
    Text(String),
    /// Raw character data from `<script>`/`<style>` contents, undecoded.
    RawText(String),
    Comment(String),
}

fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn decode(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

pub fn tokenize(input: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        if bytes[i] != b'<' {
            let start = i;
            while i < len && bytes[i] != b'<' {
                i += 1;
            }
            out.push(Token::Text(decode(&input[start..i])));
            continue;
        }

        if input[i..].starts_with(COMMENT_START) {
            let body_start = i + COMMENT_START.len();
            match input[body_start..].find(COMMENT_END) {
                Some(rel) => {
                    out.push(Token::Comment(input[body_start..body_start + rel].to_string()));
                    i = body_start + rel + COMMENT_END.len();
                }
                None => {
                    // unterminated comment swallows the rest of the input
                    out.push(Token::Comment(input[body_start..].to_string()));
                    i = len;
                }
            }
            continue;
        }

        if i + 1 < len && (bytes[i + 1] == b'!' || bytes[i + 1] == b'?') {
            // doctype or processing instruction; skip to '>'
            match input[i..].find('>') {
                Some(rel) => i += rel + 1,
                None => i = len,
            }
            continue;
        }

        if i + 1 < len && bytes[i + 1] == b'/' {
            let start = i + 2;
            let mut j = start;
            while j < len && is_name_byte(bytes[j]) {
                j += 1;
            }
            if j == start {
                // "</" with no name: literal text
                out.push(Token::Text("</".to_string()));
                i = start;
                continue;
            }
            let name = input[start..j].to_ascii_lowercase();
            while j < len && bytes[j] != b'>' {
                j += 1;
            }
            if j < len {
                j += 1;
            }
            out.push(Token::EndTag { name });
            i = j;
            continue;
        }

        let start = i + 1;
        let mut j = start;
        while j < len && is_name_byte(bytes[j]) {
            j += 1;
        }
        if j == start {
            // lone '<' that opens no tag
            out.push(Token::Text("<".to_string()));
            i = start;
            continue;
        }
        let name = input[start..j].to_ascii_lowercase();
        let (attributes, self_closing, after) = scan_attributes(input, j);
        let self_closing = self_closing || is_void_element(&name);
        out.push(Token::StartTag {
            name: name.clone(),
            attributes,
            self_closing,
        });
        i = after;

        if (name == "script" || name == "style") && !self_closing {
            let close = format!("</{name}>");
            match find_ignore_ascii_case(&input[i..], &close) {
                Some(rel) => {
                    if rel > 0 {
                        out.push(Token::RawText(input[i..i + rel].to_string()));
                    }
                    out.push(Token::EndTag { name });
                    i += rel + close.len();
                }
                None => {
                    if i < len {
                        out.push(Token::RawText(input[i..].to_string()));
                    }
                    out.push(Token::EndTag { name });
                    i = len;
                }
            }
        }
    }

    out
}

/// Scans the attribute list of a start tag beginning right after the tag
/// name. Returns the attributes, whether the tag self-closed, and the byte
/// offset just past the closing `>`.
fn scan_attributes(input: &str, mut k: usize) -> (Vec<(String, String)>, bool, usize) {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut attributes = Vec::new();
    let mut self_closing = false;

    loop {
        while k < len && bytes[k].is_ascii_whitespace() {
            k += 1;
        }
        if k >= len {
            break;
        }
        if bytes[k] == b'>' {
            k += 1;
            break;
        }
        if bytes[k] == b'/' {
            if k + 1 < len && bytes[k + 1] == b'>' {
                self_closing = true;
                k += 2;
                break;
            }
            k += 1;
            continue;
        }

        let name_start = k;
        while k < len && is_name_byte(bytes[k]) {
            k += 1;
        }
        if name_start == k {
            k += 1;
            continue;
        }
        let name = input[name_start..k].to_ascii_lowercase();

        while k < len && bytes[k].is_ascii_whitespace() {
            k += 1;
        }
        let value = if k < len && bytes[k] == b'=' {
            k += 1;
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                let quote = bytes[k];
                k += 1;
                let vstart = k;
                while k < len && bytes[k] != quote {
                    k += 1;
                }
                let raw = &input[vstart..k];
                if k < len {
                    k += 1;
                }
                decode(raw)
            } else {
                let vstart = k;
                while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                    if bytes[k] == b'/' && k + 1 < len && bytes[k + 1] == b'>' {
                        break;
                    }
                    k += 1;
                }
                input[vstart..k].to_string()
            }
        } else {
            String::new()
        };
        attributes.push((name, value));
    }

    (attributes, self_closing, k)
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let ndl = needle.as_bytes();
    if ndl.is_empty() || hay.len() < ndl.len() {
        return None;
    }
    (0..=hay.len() - ndl.len()).find(|&i| hay[i..i + ndl.len()].eq_ignore_ascii_case(ndl))
}
