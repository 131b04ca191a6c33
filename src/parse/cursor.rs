/// A significant (non-blank, non-comment) line of rule text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SourceLine<'i> {
    /// 1-based line number in the rule text.
    pub number: usize,
    pub text: &'i str,
}

impl<'i> SourceLine<'i> {
    /// Leading whitespace of the line.
    pub fn indent(&self) -> &'i str {
        let body = self.text.trim_start();
        &self.text[..self.text.len() - body.len()]
    }

    /// The line with indentation and trailing whitespace removed.
    pub fn body(&self) -> &'i str {
        self.text.trim()
    }
}

/// Rewindable cursor over the significant lines of rule text.
///
/// Blank lines and lines whose first non-space character is `#` are dropped
/// up front, so the parser only ever sees lines that carry meaning. Peeking
/// never consumes, which lets a block parser look at the line that ends its
/// block and hand it back to the enclosing block untouched.
#[derive(Debug)]
pub(crate) struct LineCursor<'i> {
    lines: Vec<SourceLine<'i>>,
    pos: usize,
}

impl<'i> LineCursor<'i> {
    pub fn new(input: &'i str) -> Self {
        let lines = input
            .lines()
            .enumerate()
            .map(|(i, text)| SourceLine { number: i + 1, text })
            .filter(|line| {
                let body = line.body();
                !body.is_empty() && !body.starts_with('#')
            })
            .collect();
        Self { lines, pos: 0 }
    }

    pub fn peek(&self) -> Option<SourceLine<'i>> {
        self.lines.get(self.pos).copied()
    }

    pub fn advance(&mut self) -> Option<SourceLine<'i>> {
        let line = self.peek()?;
        self.pos += 1;
        Some(line)
    }
}
