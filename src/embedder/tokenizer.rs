//! Character-class tokenizer feeding the feature hasher.

/// Splits `text` into lower-cased tokens.
///
/// A token is a maximal run of ASCII word characters (`[a-z0-9_]` after
/// lower-casing) or a maximal run of Kana / CJK ideographs. Everything else
/// separates tokens and is dropped. Order and duplicates are preserved.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    Tokens::new(&lowered).map(str::to_owned).collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CharClass {
    Word,
    Cjk,
}

impl CharClass {
    fn of(ch: char) -> Option<Self> {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            Some(Self::Word)
        } else if matches!(ch, '\u{3040}'..='\u{30FF}' | '\u{4E00}'..='\u{9FFF}') {
            Some(Self::Cjk)
        } else {
            None
        }
    }
}

/// Borrowing iterator over the token runs of an already lower-cased string.
struct Tokens<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.text[self.pos..];
        let mut start = None;
        for (offset, ch) in rest.char_indices() {
            let class = CharClass::of(ch);
            match (start, class) {
                (None, Some(class)) => start = Some((offset, class)),
                (Some((begin, current)), class) if class != Some(current) => {
                    self.pos += offset;
                    return Some(&rest[begin..offset]);
                }
                _ => {}
            }
        }
        self.pos = self.text.len();
        start.map(|(begin, _)| &rest[begin..])
    }
}
