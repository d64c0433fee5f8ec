//! # Source Regions
//!
//! Every parsed value remembers the span of source text it came from, so that any
//! failure (even one discovered much later, at render time) can point back at the
//! offending characters.
//!
//! ## Types
//! - [`SourceFile`] - a named collection of lines (from disk or from a string)
//! - [`SourceLine`] - one line of text with its file name and 1-based line number
//! - [`SourceRegion`] - a byte span within a single line
//! - [`Located`] - a parsed value paired with its region
//!
//! Regions share their line through an `Arc`, so cloning a region is cheap and a
//! compiled song can be moved across threads.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use regex::{Captures, Match, Regex};

/// A file (or in-memory string) to compile
#[derive(Debug, Clone)]
pub struct SourceFile {
    name: Arc<str>,
    text: String,
}

impl SourceFile {
    /// Wrap an in-memory string, using `name` in diagnostics
    pub fn from_string(name: impl Into<String>, text: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            text: text.into(),
        }
    }

    /// Read a song file from disk
    pub fn read(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Ok(Self::from_string(path.display().to_string(), text))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Iterate over the file's lines as whole-line regions (line numbers start at 1)
    pub fn lines(&self) -> impl Iterator<Item = SourceRegion> + '_ {
        self.text.split('\n').enumerate().map(move |(i, text)| {
            let text = text.strip_suffix('\r').unwrap_or(text);
            SourceRegion::whole_line(SourceLine::new(self.name.clone(), i + 1, text))
        })
    }
}

/// One line of source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    file_name: Arc<str>,
    line_number: usize,
    text: String,
}

impl SourceLine {
    pub fn new(file_name: impl Into<Arc<str>>, line_number: usize, text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            file_name: file_name.into(),
            line_number,
            text: text.into(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A span of one source line, in byte columns
#[derive(Clone, PartialEq, Eq)]
pub struct SourceRegion {
    line: Arc<SourceLine>,
    start: usize,
    end: usize,
}

impl SourceRegion {
    /// A region covering the whole of `line`
    pub fn whole_line(line: Arc<SourceLine>) -> Self {
        let end = line.text.len();
        Self {
            line,
            start: 0,
            end,
        }
    }

    /// A region covering `text` as line 1 of a file called `file_name`
    pub fn from_text(file_name: &str, text: &str) -> Self {
        Self::whole_line(SourceLine::new(file_name, 1, text))
    }

    pub fn line(&self) -> &SourceLine {
        &self.line
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// The text covered by this region
    pub fn value(&self) -> &str {
        &self.line.text[self.start..self.end]
    }

    /// The line text from the start of this region to the end of the line
    pub fn rest_of_line(&self) -> &str {
        &self.line.text[self.start..]
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// A sub-region given by byte offsets relative to the start of this region
    pub fn slice(&self, start: usize, end: usize) -> SourceRegion {
        debug_assert!(start <= end && self.start + end <= self.end);
        SourceRegion {
            line: self.line.clone(),
            start: self.start + start,
            end: self.start + end,
        }
    }

    /// The part of this region after `offset` bytes
    pub fn remaining(&self, offset: usize) -> SourceRegion {
        self.slice(offset, self.end - self.start)
    }

    /// This region with leading and trailing whitespace removed
    pub fn trimmed(&self) -> SourceRegion {
        let value = self.value();
        let leading = value.len() - value.trim_start().len();
        self.slice(leading, leading + value.trim().len())
    }

    /// Sub-region for a regex match made against `self.value()`
    pub fn of_match(&self, m: Match<'_>) -> SourceRegion {
        self.slice(m.start(), m.end())
    }

    /// Sub-region for a named capture group, if it participated in the match
    pub fn group(&self, captures: &Captures<'_>, name: &str) -> Option<SourceRegion> {
        captures.name(name).map(|m| self.of_match(m))
    }

    /// Sub-regions for every non-whitespace run in this region
    pub fn words(&self) -> Vec<SourceRegion> {
        let mut words = Vec::new();
        let mut word_start = None;
        for (i, c) in self.value().char_indices() {
            match (c.is_whitespace(), word_start) {
                (true, Some(start)) => {
                    words.push(self.slice(start, i));
                    word_start = None;
                }
                (false, None) => word_start = Some(i),
                _ => {}
            }
        }
        if let Some(start) = word_start {
            words.push(self.slice(start, self.end - self.start));
        }
        words
    }

    /// Match `regex` against the start of this region.
    ///
    /// Returns the captures plus the leftover region when the match does not cover
    /// the whole region. The regex is expected to be anchored with `^`.
    pub fn match_prefix<'r>(&'r self, regex: &Regex) -> Option<(Captures<'r>, Option<SourceRegion>)> {
        let captures = regex.captures(self.value())?;
        let matched_end = captures.get(0).map_or(0, |m| m.end());
        let leftover = if matched_end < self.value().len() {
            Some(self.remaining(matched_end))
        } else {
            None
        };
        Some((captures, leftover))
    }

    /// Character column of the region start (used for caret placement)
    pub fn column(&self) -> usize {
        self.line.text[..self.start].chars().count()
    }
}

impl fmt::Debug for SourceRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}..{} {:?}",
            self.line.file_name,
            self.line.line_number,
            self.start,
            self.end,
            self.value()
        )
    }
}

/// A parsed value together with the source region it was parsed from
#[derive(Debug, Clone, PartialEq)]
pub struct Located<T> {
    pub value: T,
    pub source: SourceRegion,
}

impl<T> Located<T> {
    pub fn new(value: T, source: SourceRegion) -> Self {
        Self { value, source }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Located<U> {
        Located {
            value: f(self.value),
            source: self.source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A region surrounded by junk, so that offsets are exercised
    fn padded(text: &str) -> SourceRegion {
        let line = SourceLine::new("name", 1, format!("************{}###############", text));
        SourceRegion::whole_line(line).slice(12, 12 + text.len())
    }

    #[test]
    fn test_value_and_rest_of_line() {
        let region = padded("c e g");
        assert_eq!(region.value(), "c e g");
        assert_eq!(region.rest_of_line(), "c e g###############");
        assert_eq!(region.column(), 12);
    }

    #[test]
    fn test_words() {
        let region = padded(" [C] c e e c | [G] ");
        let words: Vec<_> = region.words().iter().map(|w| w.value().to_string()).collect();
        assert_eq!(words, vec!["[C]", "c", "e", "e", "c", "|", "[G]"]);
        assert_eq!(region.words()[1].start(), 17);
    }

    #[test]
    fn test_match_prefix_reports_leftover() {
        let regex = Regex::new(r"^[a-z]+").unwrap();
        let region = padded("This is a line");
        assert!(region.match_prefix(&regex).is_none());

        let region = padded("abc123");
        let (captures, leftover) = region.match_prefix(&regex).unwrap();
        assert_eq!(&captures[0], "abc");
        assert_eq!(leftover.unwrap().value(), "123");
    }

    #[test]
    fn test_trimmed() {
        let region = padded("  tempo_bpm = 80 ");
        assert_eq!(region.trimmed().value(), "tempo_bpm = 80");
    }

    #[test]
    fn test_trimmed_blank() {
        let region = padded("   ");
        assert!(region.trimmed().is_empty());
    }

    #[test]
    fn test_source_file_lines() {
        let file = SourceFile::from_string("song", "c d\r\n\n| e");
        let lines: Vec<_> = file.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].value(), "c d");
        assert_eq!(lines[2].line().line_number(), 3);
        assert_eq!(lines[2].line().file_name(), "song");
    }
}
