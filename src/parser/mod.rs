//! # Parser Module
//!
//! This module turns lines of song text into [`Located`] song items.
//!
//! ## Purpose
//! Parsing is interleaved with resolution: [`crate::Song::parse`] feeds each line through
//! [`parse_line`] and hands the resulting items to the song one at a time, so the first
//! error (grammatical or musical) stops compilation at the right place.
//!
//! ## Lines
//! - A line whose first non-blank character is `*` is a command (see [`command`])
//! - Any other line is split on whitespace, and each word is one song item
//!
//! ## Song Items
//! The first characters of a word decide what it must be:
//!
//! | Starts with        | Item                          | Examples                  |
//! |--------------------|-------------------------------|---------------------------|
//! | `[`                | chord                         | `[C]` `[Am7/G]` `[:CEG]` `[]` |
//! | `\|`               | bar line                      | `\|`                      |
//! | `~a`..`~g`, `~r`, `a`..`g`, `r` | note or rest     | `c` `e+'3q` `~b~` `r2`    |
//! | `~`                | tie                           | `~`                       |
//! | `!`                | cut                           | `!`                       |
//!
//! A token must be matched completely. Trailing text is reported as extra data, with the
//! error located at the leftover characters:
//!
//! ```text
//! Invalid note: 'a+'3qmexico' (extra data 'mexico')
//! ```
//!
//! ## Example
//! ```rust
//! use melody_script::parser::parse_line;
//! use melody_script::SourceRegion;
//!
//! let line = SourceRegion::from_text("song", " [C] c e | [Am] ");
//! let items = parse_line(&line).unwrap();
//! assert_eq!(items.len(), 5);
//! assert_eq!(items[3].source.value(), "|");
//! ```

pub mod command;

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::ast::{
    adjustment_from_marker, degree_from_letter, Chord, ChordDescriptor, Duration, Note, Rest,
    ScaleNote, SongItem,
};
use crate::error::SongError;
use crate::region::{Located, SourceRegion};

const NOTE_PATTERN: &str = concat!(
    r"^(?P<continued>~)?",
    r"(?:(?P<rest>r)|(?P<letter>[a-g])(?P<accidental>[+-])?(?:(?P<ups>'+)|(?P<downs>,+))?)",
    r"(?P<beats>[1-9][0-9]*)?(?P<hqs>[hq]+)?(?P<triplet>t)?(?P<dot>\.)?",
    r"(?P<to_continue>~)?",
);

const CHORD_PATTERN: &str = concat!(
    r"^\[(?:",
    r"(?::(?P<notes>(?:[A-G][+-]?)+)|(?P<root>[A-G][+-]?)(?P<descriptor>maj7|m7|m|7)?)",
    r"(?:/(?P<bass>[A-G][+-]?))?",
    r")?\]",
);

const SONG_ITEM_PATTERN: &str =
    r"^(?:(?P<chord>\[)|(?P<bar_line>\|)|(?P<note>~?[a-gr])|(?P<tie>~)|(?P<cut>!))";

const SCALE_NOTE_PATTERN: &str = r"^(?P<letter>[a-g])(?P<accidental>[+-])?(?P<octave>[0-9])?$";

static NOTE_REGEX: OnceLock<Regex> = OnceLock::new();
static CHORD_REGEX: OnceLock<Regex> = OnceLock::new();
static SONG_ITEM_REGEX: OnceLock<Regex> = OnceLock::new();
static SCALE_NOTE_REGEX: OnceLock<Regex> = OnceLock::new();
static BAR_LINE_REGEX: OnceLock<Regex> = OnceLock::new();
static TIE_REGEX: OnceLock<Regex> = OnceLock::new();
static CUT_REGEX: OnceLock<Regex> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("invalid regex pattern"))
}

pub(crate) fn invalid(kind: &str, region: &SourceRegion) -> SongError {
    SongError::grammar(format!("Invalid {}: '{}'", kind, region.value())).at(region)
}

/// Match `regex` against the whole of `region`, reporting leftover text as extra data
pub(crate) fn match_token<'r>(
    region: &'r SourceRegion,
    regex: &Regex,
    kind: &str,
) -> Result<Captures<'r>, SongError> {
    match region.match_prefix(regex) {
        Some((captures, None)) => Ok(captures),
        Some((_, Some(leftover))) => Err(SongError::grammar(format!(
            "Invalid {}: '{}' (extra data '{}')",
            kind,
            region.value(),
            leftover.value()
        ))
        .at(&leftover)),
        None => Err(invalid(kind, region)),
    }
}

/// Parse a single letter plus optional accidental, e.g. `B-` or `f+`
fn scale_note_from_str(text: &str) -> Option<ScaleNote> {
    let mut chars = text.chars();
    let degree = degree_from_letter(chars.next()?)?;
    let accidental = chars.as_str();
    Some(ScaleNote::new(degree, adjustment_from_marker(Some(accidental))))
}

/// Split a run like `C+EG-` into notes
fn scale_notes_from_str(text: &str) -> Vec<ScaleNote> {
    let mut notes: Vec<ScaleNote> = Vec::new();
    for c in text.chars() {
        match (c, notes.last_mut()) {
            ('+', Some(last)) => last.adjustment = 1,
            ('-', Some(last)) => last.adjustment = -1,
            _ => notes.extend(degree_from_letter(c).map(|degree| ScaleNote::new(degree, 0))),
        }
    }
    notes
}

fn parse_duration(captures: &Captures<'_>, region: &SourceRegion) -> Result<Option<Duration>, SongError> {
    let beats = captures.name("beats");
    let hqs = captures.name("hqs");
    let triplet = captures.name("triplet").is_some();
    let dot = captures.name("dot").is_some();
    if beats.is_none() && hqs.is_none() && !triplet && !dot {
        return Ok(None);
    }
    let too_long = || SongError::range(format!("Invalid duration: '{}'", region.value())).at(region);

    let mut x: u32 = match beats {
        Some(m) => m.as_str().parse().map_err(|_| too_long())?,
        None => 1,
    };
    let mut y: u32 = 1;
    for c in hqs.map_or("", |m| m.as_str()).chars() {
        let factor = if c == 'h' { 2 } else { 4 };
        y = y.checked_mul(factor).ok_or_else(too_long)?;
    }
    if triplet {
        y = y.checked_mul(3).ok_or_else(too_long)?;
    }
    if dot {
        x = x.checked_mul(3).ok_or_else(too_long)?;
        y = y.checked_mul(2).ok_or_else(too_long)?;
    }
    Ok(Some(Duration::new(x, y)))
}

/// Parse a note (`~e+'3q~`) or a rest (`r2`)
pub fn parse_note_or_rest(region: &SourceRegion) -> Result<Located<SongItem>, SongError> {
    let captures = match_token(region, compiled(&NOTE_REGEX, NOTE_PATTERN), "note")?;
    let duration = parse_duration(&captures, region)?;
    let continued = captures.name("continued").is_some();
    let to_continue = captures.name("to_continue").is_some();

    // A leading `~` is accepted on a rest and ignored; resolution rejects a rest that
    // would have to pick up a tie.
    if captures.name("rest").is_some() {
        if to_continue {
            return Err(SongError::grammar("Rest cannot be tied").at(region));
        }
        let duration = duration.ok_or_else(|| SongError::grammar("Rest must specify duration").at(region))?;
        return Ok(Located::new(SongItem::Rest(Rest::new(duration)), region.clone()));
    }

    let letter = captures.name("letter").map_or("", |m| m.as_str());
    let note = scale_note_from_str(letter).ok_or_else(|| invalid("note", region))?;
    let ups = captures.name("ups").map_or(0, |m| m.as_str().len() as i32)
        - captures.name("downs").map_or(0, |m| m.as_str().len() as i32);
    let note = Note {
        degree: note.degree,
        adjustment: adjustment_from_marker(captures.name("accidental").map(|m| m.as_str())),
        ups,
        duration,
        to_continue,
        continued,
    };
    Ok(Located::new(SongItem::Note(note), region.clone()))
}

/// Parse a chord: `[]`, `[C]`, `[F+m7]`, `[:CEG]`, `[Dm/C]`
pub fn parse_chord(region: &SourceRegion) -> Result<Located<Chord>, SongError> {
    let captures = match_token(region, compiled(&CHORD_REGEX, CHORD_PATTERN), "chord")?;

    let mut chord = if let Some(notes) = captures.name("notes") {
        Chord::explicit(scale_notes_from_str(notes.as_str()))
    } else if let Some(root) = captures.name("root") {
        let root = scale_note_from_str(root.as_str()).ok_or_else(|| invalid("chord", region))?;
        let descriptor = captures.name("descriptor").map_or("", |m| m.as_str());
        let descriptor = ChordDescriptor::from_str(descriptor).ok_or_else(|| invalid("chord", region))?;
        Chord::with_descriptor(root, descriptor)
    } else {
        Chord::empty()
    };
    if let Some(bass) = captures.name("bass") {
        let bass = scale_note_from_str(bass.as_str()).ok_or_else(|| invalid("chord", region))?;
        chord = chord.with_bass(bass);
    }
    Ok(Located::new(chord, region.clone()))
}

fn parse_marker(
    region: &SourceRegion,
    cell: &'static OnceLock<Regex>,
    pattern: &str,
    kind: &str,
    item: SongItem,
) -> Result<Located<SongItem>, SongError> {
    match_token(region, compiled(cell, pattern), kind)?;
    Ok(Located::new(item, region.clone()))
}

pub fn parse_bar_line(region: &SourceRegion) -> Result<Located<SongItem>, SongError> {
    parse_marker(region, &BAR_LINE_REGEX, r"^\|", "bar line", SongItem::BarLine)
}

pub fn parse_tie(region: &SourceRegion) -> Result<Located<SongItem>, SongError> {
    parse_marker(region, &TIE_REGEX, r"^~", "tie", SongItem::Tie)
}

pub fn parse_cut(region: &SourceRegion) -> Result<Located<SongItem>, SongError> {
    parse_marker(region, &CUT_REGEX, r"^!", "cut", SongItem::Cut)
}

/// Parse one whitespace-free song item, choosing the token type from its first characters
pub fn parse_song_item(region: &SourceRegion) -> Result<Located<SongItem>, SongError> {
    let regex = compiled(&SONG_ITEM_REGEX, SONG_ITEM_PATTERN);
    let captures = regex
        .captures(region.value())
        .ok_or_else(|| invalid("song item", region))?;

    if captures.name("chord").is_some() {
        Ok(parse_chord(region)?.map(SongItem::Chord))
    } else if captures.name("bar_line").is_some() {
        parse_bar_line(region)
    } else if captures.name("note").is_some() {
        parse_note_or_rest(region)
    } else if captures.name("tie").is_some() {
        parse_tie(region)
    } else {
        parse_cut(region)
    }
}

/// Parse a scale root such as `c4` or `b-3`
pub fn parse_scale_note(region: &SourceRegion) -> Result<ScaleNote, SongError> {
    let regex = compiled(&SCALE_NOTE_REGEX, SCALE_NOTE_PATTERN);
    let captures = regex
        .captures(region.value())
        .ok_or_else(|| invalid("scale note with octave", region))?;
    let letter = captures.name("letter").map_or("", |m| m.as_str());
    let note = scale_note_from_str(letter).ok_or_else(|| invalid("scale note with octave", region))?;
    let note = ScaleNote::new(
        note.degree,
        adjustment_from_marker(captures.name("accidental").map(|m| m.as_str())),
    );
    Ok(match captures.name("octave") {
        Some(octave) => note.with_octave(octave.as_str().parse().map_err(|_| invalid("octave", region))?),
        None => note,
    })
}

/// Parse a whole line: either one command, or any number of song items
pub fn parse_line(line: &SourceRegion) -> Result<Vec<Located<SongItem>>, SongError> {
    let trimmed = line.trimmed();
    if trimmed.value().starts_with('*') {
        let command = command::parse_command(&trimmed)?;
        return Ok(vec![command.map(SongItem::Command)]);
    }
    trimmed.words().iter().map(parse_song_item).collect()
}
