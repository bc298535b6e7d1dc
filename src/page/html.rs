//! Tolerant HTML scanning.
//!
//! Builds a flat table of elements with their source ranges and parent links,
//! which is enough for attribute lookups, `closest()` walks and text content.
//! Chart pages are large and not always well-formed, so unmatched end tags
//! are ignored and unclosed elements end where their parent ends.

/// Elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is raw text up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Debug, Clone)]
pub struct Element {
    pub name: String,
    attrs: Vec<(String, String)>,
    /// Offset of the `<` of the start tag.
    pub start: usize,
    /// Offset just past the start tag.
    pub content_start: usize,
    /// Offset of the end tag, or where the element was implicitly closed.
    pub content_end: usize,
    pub parent: Option<usize>,
}

impl Element {
    /// Attribute value with character references decoded.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    elements: Vec<Element>,
}

impl Document {
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let elements = Parser::new(&source).run();
        Self { source, elements }
    }

    pub fn element(&self, index: usize) -> &Element {
        &self.elements[index]
    }

    /// Indices of all elements matching `pred`, in document order.
    pub fn find_all(&self, pred: impl Fn(&Element) -> bool) -> Vec<usize> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, el)| pred(el))
            .map(|(i, _)| i)
            .collect()
    }

    /// Nearest element, starting with `index` itself, that matches `pred`.
    pub fn closest(&self, index: usize, pred: impl Fn(&Element) -> bool) -> Option<usize> {
        let mut current = Some(index);
        while let Some(i) = current {
            if pred(&self.elements[i]) {
                return Some(i);
            }
            current = self.elements[i].parent;
        }
        None
    }

    /// First descendant of `index`, in document order, that matches `pred`.
    pub fn find_descendant(&self, index: usize, pred: impl Fn(&Element) -> bool) -> Option<usize> {
        (index + 1..self.elements.len())
            .take_while(|&i| self.elements[i].start < self.elements[index].content_end)
            .find(|&i| self.is_descendant(i, index) && pred(&self.elements[i]))
    }

    fn is_descendant(&self, index: usize, ancestor: usize) -> bool {
        let mut current = self.elements[index].parent;
        while let Some(i) = current {
            if i == ancestor {
                return true;
            }
            current = self.elements[i].parent;
        }
        false
    }

    /// Text content with tags removed and references decoded, trimmed at
    /// both ends. Inner whitespace is kept as written.
    pub fn text(&self, index: usize) -> String {
        let el = &self.elements[index];
        let inner = &self.source[el.content_start..el.content_end];
        decode_entities(&strip_tags(inner)).trim().to_string()
    }
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    elements: Vec<Element>,
    open: Vec<usize>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            elements: Vec::new(),
            open: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Element> {
        while let Some(offset) = self.src[self.pos..].find('<') {
            let lt = self.pos + offset;
            let rest = &self.src[lt..];
            if rest.starts_with("<!--") {
                self.pos = rest[4..]
                    .find("-->")
                    .map_or(self.src.len(), |end| lt + 4 + end + 3);
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.pos = self.skip_past_gt(lt + 2);
            } else if rest.starts_with("</") {
                self.end_tag(lt);
            } else if self.bytes.get(lt + 1).is_some_and(u8::is_ascii_alphabetic) {
                self.start_tag(lt);
            } else {
                self.pos = lt + 1;
            }
        }

        let len = self.src.len();
        for i in self.open.drain(..) {
            self.elements[i].content_end = len;
        }
        self.elements
    }

    fn skip_past_gt(&self, from: usize) -> usize {
        self.src[from..]
            .find('>')
            .map_or(self.src.len(), |end| from + end + 1)
    }

    fn read_name(&self, from: usize) -> (String, usize) {
        let mut end = from;
        while end < self.bytes.len()
            && (self.bytes[end].is_ascii_alphanumeric()
                || matches!(self.bytes[end], b'-' | b':' | b'_'))
        {
            end += 1;
        }
        (self.src[from..end].to_ascii_lowercase(), end)
    }

    fn end_tag(&mut self, lt: usize) {
        let (name, after_name) = self.read_name(lt + 2);
        self.pos = self.skip_past_gt(after_name);

        let Some(depth) = self
            .open
            .iter()
            .rposition(|&i| self.elements[i].name == name)
        else {
            return;
        };
        for i in self.open.drain(depth..) {
            self.elements[i].content_end = lt;
        }
    }

    fn start_tag(&mut self, lt: usize) {
        let (name, mut i) = self.read_name(lt + 1);
        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            while i < self.bytes.len() && self.bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match self.bytes.get(i) {
                None => break,
                Some(b'>') => {
                    i += 1;
                    break;
                }
                Some(b'/') => {
                    if self.bytes.get(i + 1) == Some(&b'>') {
                        self_closing = true;
                        i += 2;
                        break;
                    }
                    i += 1;
                    continue;
                }
                _ => {}
            }

            let name_start = i;
            while i < self.bytes.len()
                && !self.bytes[i].is_ascii_whitespace()
                && !matches!(self.bytes[i], b'=' | b'>' | b'/')
            {
                i += 1;
            }
            if i == name_start {
                i += 1;
                continue;
            }
            let attr_name = self.src[name_start..i].to_ascii_lowercase();

            let mut j = i;
            while j < self.bytes.len() && self.bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if self.bytes.get(j) != Some(&b'=') {
                attrs.push((attr_name, String::new()));
                continue;
            }
            j += 1;
            while j < self.bytes.len() && self.bytes[j].is_ascii_whitespace() {
                j += 1;
            }

            let (raw, next) = match self.bytes.get(j).copied() {
                Some(quote @ (b'"' | b'\'')) => {
                    let value_start = j + 1;
                    let value_end = self.src[value_start..]
                        .find(quote as char)
                        .map_or(self.src.len(), |end| value_start + end);
                    (&self.src[value_start..value_end], (value_end + 1).min(self.src.len()))
                }
                _ => {
                    let value_start = j;
                    let mut value_end = j;
                    while value_end < self.bytes.len()
                        && !self.bytes[value_end].is_ascii_whitespace()
                        && self.bytes[value_end] != b'>'
                    {
                        value_end += 1;
                    }
                    (&self.src[value_start..value_end], value_end)
                }
            };
            attrs.push((attr_name, decode_entities(raw)));
            i = next;
        }

        let index = self.elements.len();
        self.elements.push(Element {
            name: name.clone(),
            attrs,
            start: lt,
            content_start: i,
            content_end: i,
            parent: self.open.last().copied(),
        });
        self.pos = i;

        if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
            return;
        }
        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            let close = format!("</{name}");
            let content_end = find_ascii_case_insensitive(&self.src[i..], &close)
                .map_or(self.src.len(), |end| i + end);
            self.elements[index].content_end = content_end;
            self.pos = self.skip_past_gt(content_end.min(self.src.len()));
            return;
        }
        self.open.push(index);
    }
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

/// Removes tags and comments, keeping only text.
pub fn strip_tags(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut rest = fragment;
    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        let tail = &rest[lt..];
        let skip = if tail.starts_with("<!--") {
            tail.find("-->").map(|end| end + 3)
        } else {
            tail.find('>').map(|end| end + 1)
        };
        match skip {
            Some(skip) => rest = &tail[skip..],
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decodes named (`&amp;`, `&quot;`, ...) and numeric character references.
///
/// Unknown references are kept verbatim.
pub fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .char_indices()
            .take(12)
            .find(|&(_, c)| c == ';')
            .and_then(|(semi, _)| decode_entity(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
