//! # Song Item Types
//!
//! This module defines the typed values produced by the grammar.
//!
//! ## Type Hierarchy
//! ```text
//! SongItem (enum)
//!   ├── Note      letter, accidental, octave shifts, optional duration, tie flags
//!   ├── Rest      duration
//!   ├── Chord     []  |  [C7/G]  |  [:CEG]
//!   ├── BarLine   |
//!   ├── Tie       ~
//!   ├── Cut       !
//!   └── Command
//!         ├── Song   *song: tempo_bpm=120, time_signature=3/4, ...
//!         ├── Track  *track.melody: octave=4, instrument=73, ...
//!         └── Groove *groove: 0 3 0 -2
//! ```
//!
//! ## Durations
//! Durations are rational numbers of crotchets, written as a beat count followed by
//! subdivision markers:
//! - `h` halves, `q` quarters, `t` thirds (triplet), `.` dotted (x 3/2)
//! - `c2` = 2, `ch` = 1/2, `c3q` = 3/4, `cht` = 1/6, `ch.` = 3/4
//! - A note without any duration marker inherits the current default duration
//!
//! ## Pitches
//! Notes carry only a pitch class and a signed count of octave shifts (`'` up, `,` down);
//! the absolute pitch is decided during resolution, relative to the previous note.
//!
//! Every type has an `unparse` method producing canonical notation, such that
//! parsing the output again yields the same value.

use crate::error::SongError;
use crate::pitch::pitch_in_octave;
use crate::region::Located;
use crate::scale::Scale;
use crate::track::TrackId;

/// Semitone offsets from C of the seven diatonic degrees C D E F G A B
pub const DIATONIC_OFFSETS: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

pub const NOTE_NAMES_LOWER_CASE: [char; 7] = ['c', 'd', 'e', 'f', 'g', 'a', 'b'];

pub const NOTE_NAMES_UPPER_CASE: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];

/// Diatonic degree (C=0 .. B=6) of a note letter, in either case
pub fn degree_from_letter(letter: char) -> Option<u8> {
    let lower = letter.to_ascii_lowercase();
    NOTE_NAMES_LOWER_CASE
        .iter()
        .position(|&c| c == lower)
        .map(|i| i as u8)
}

/// Accidental adjustment for a `+` (sharp) or `-` (flat) marker
pub fn adjustment_from_marker(marker: Option<&str>) -> i8 {
    match marker {
        Some("+") => 1,
        Some("-") => -1,
        _ => 0,
    }
}

fn accidental_string(adjustment: i8) -> String {
    if adjustment > 0 {
        "+".repeat(adjustment as usize)
    } else {
        "-".repeat(adjustment.unsigned_abs() as usize)
    }
}

/// A pitch class with an optional octave (chord notes, scale roots)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScaleNote {
    pub degree: u8,
    pub adjustment: i8,
    pub octave: Option<i32>,
}

impl ScaleNote {
    pub fn new(degree: u8, adjustment: i8) -> Self {
        Self {
            degree,
            adjustment,
            octave: None,
        }
    }

    pub fn with_octave(self, octave: i32) -> Self {
        Self {
            octave: Some(octave),
            ..self
        }
    }

    /// Semitones above C (may be -1 for C flat or 12 for B sharp)
    pub fn semitone_offset(&self) -> i32 {
        DIATONIC_OFFSETS[self.degree as usize] + self.adjustment as i32
    }

    /// Absolute pitch, when the note carries an octave
    pub fn midi_note(&self) -> Result<Option<u8>, SongError> {
        self.octave
            .map(|octave| pitch_in_octave(octave, self.semitone_offset()))
            .transpose()
    }

    /// Chord spelling: upper-case letter plus accidental
    pub fn chord_name(&self) -> String {
        format!(
            "{}{}",
            NOTE_NAMES_UPPER_CASE[self.degree as usize],
            accidental_string(self.adjustment)
        )
    }

    /// Scale-root spelling: lower-case letter, accidental, octave digit
    pub fn unparse(&self) -> String {
        let mut result = format!(
            "{}{}",
            NOTE_NAMES_LOWER_CASE[self.degree as usize],
            accidental_string(self.adjustment)
        );
        if let Some(octave) = self.octave {
            result.push_str(&octave.to_string());
        }
        result
    }
}

/// A rational number of crotchets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    pub beats: u32,
    pub divisor: u32,
}

impl Duration {
    /// The song-wide default duration, one crotchet
    pub const UNIT: Duration = Duration { beats: 1, divisor: 1 };

    pub fn new(beats: u32, divisor: u32) -> Self {
        Self { beats, divisor }
    }

    /// Canonical duration suffix: `2`, `h`, `3q`, `qht`, `1` for an explicit crotchet
    pub fn unparse(&self) -> String {
        let mut result = if self.beats == 1 && self.divisor > 1 {
            String::new()
        } else {
            self.beats.to_string()
        };
        let mut divisor = self.divisor;
        let triplet = divisor % 3 == 0;
        if triplet {
            divisor /= 3;
        }
        while divisor % 4 == 0 {
            result.push('q');
            divisor /= 4;
        }
        if divisor % 2 == 0 {
            result.push('h');
        }
        if triplet {
            result.push('t');
        }
        result
    }
}

/// A melody note as written
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Note {
    pub degree: u8,
    pub adjustment: i8,
    /// Octave shifts relative to the nearest pitch (`'` = +1, `,` = -1)
    pub ups: i32,
    /// `None` means "use the current default duration"
    pub duration: Option<Duration>,
    /// Trailing `~`: the next note continues this one
    pub to_continue: bool,
    /// Leading `~`: this note continues the previous one
    pub continued: bool,
}

impl Note {
    pub fn new(degree: u8) -> Self {
        Self {
            degree,
            ..Self::default()
        }
    }

    pub fn semitone_offset(&self) -> i32 {
        DIATONIC_OFFSETS[self.degree as usize] + self.adjustment as i32
    }

    pub fn unparse(&self) -> String {
        let ups = if self.ups > 0 {
            "'".repeat(self.ups as usize)
        } else {
            ",".repeat(self.ups.unsigned_abs() as usize)
        };
        format!(
            "{}{}{}{}{}{}",
            if self.continued { "~" } else { "" },
            NOTE_NAMES_LOWER_CASE[self.degree as usize],
            accidental_string(self.adjustment),
            ups,
            self.duration.map(|d| d.unparse()).unwrap_or_default(),
            if self.to_continue { "~" } else { "" },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rest {
    pub duration: Duration,
}

impl Rest {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn unparse(&self) -> String {
        format!("r{}", self.duration.unparse())
    }
}

/// The five fixed chord shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordDescriptor {
    Major,        // ""
    Seventh,      // 7
    Minor,        // m
    MinorSeventh, // m7
    MajorSeventh, // maj7
}

impl ChordDescriptor {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "" => Some(ChordDescriptor::Major),
            "7" => Some(ChordDescriptor::Seventh),
            "m" => Some(ChordDescriptor::Minor),
            "m7" => Some(ChordDescriptor::MinorSeventh),
            "maj7" => Some(ChordDescriptor::MajorSeventh),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChordDescriptor::Major => "",
            ChordDescriptor::Seventh => "7",
            ChordDescriptor::Minor => "m",
            ChordDescriptor::MinorSeventh => "m7",
            ChordDescriptor::MajorSeventh => "maj7",
        }
    }

    /// Semitone offsets of the chord tones above the root
    pub fn offsets(&self) -> &'static [i32] {
        match self {
            ChordDescriptor::Major => &[0, 4, 7],
            ChordDescriptor::Seventh => &[0, 4, 7, 10],
            ChordDescriptor::Minor => &[0, 3, 7],
            ChordDescriptor::MinorSeventh => &[0, 3, 7, 10],
            ChordDescriptor::MajorSeventh => &[0, 4, 7, 11],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChordForm {
    /// `[]` - silence on the chord and bass tracks
    Empty,
    /// `[Am7]` - a root plus one of the fixed shapes
    Descriptor {
        root: ScaleNote,
        descriptor: ChordDescriptor,
    },
    /// `[:CEG]` - explicit notes, each stacked upwards from the one before (never empty)
    Explicit(Vec<ScaleNote>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    pub form: ChordForm,
    /// `/G` bass override; defaults to the root
    pub bass: Option<ScaleNote>,
}

impl Chord {
    pub fn empty() -> Self {
        Self {
            form: ChordForm::Empty,
            bass: None,
        }
    }

    pub fn with_descriptor(root: ScaleNote, descriptor: ChordDescriptor) -> Self {
        Self {
            form: ChordForm::Descriptor { root, descriptor },
            bass: None,
        }
    }

    pub fn explicit(notes: Vec<ScaleNote>) -> Self {
        Self {
            form: ChordForm::Explicit(notes),
            bass: None,
        }
    }

    pub fn with_bass(self, bass: ScaleNote) -> Self {
        Self {
            bass: Some(bass),
            ..self
        }
    }

    pub fn root(&self) -> Option<&ScaleNote> {
        match &self.form {
            ChordForm::Empty => None,
            ChordForm::Descriptor { root, .. } => Some(root),
            ChordForm::Explicit(notes) => notes.first(),
        }
    }

    pub fn unparse(&self) -> String {
        let body = match &self.form {
            ChordForm::Empty => String::new(),
            ChordForm::Descriptor { root, descriptor } => {
                format!("{}{}", root.chord_name(), descriptor.as_str())
            }
            ChordForm::Explicit(notes) => {
                let names: String = notes.iter().map(|n| n.chord_name()).collect();
                format!(":{}", names)
            }
        };
        let bass = self
            .bass
            .map(|b| format!("/{}", b.chord_name()))
            .unwrap_or_default();
        format!("[{}{}]", body, bass)
    }
}

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub beats: u32,
    pub beat_type: u32,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            beats: 4,
            beat_type: 4,
        }
    }
}

impl TimeSignature {
    pub const BEAT_TYPES: [u32; 5] = [2, 4, 8, 16, 32];
}

/// One `key=value` of a `*song:` command
#[derive(Debug, Clone, PartialEq)]
pub enum SongSetting {
    TempoBpm(u32),
    TimeSignature(TimeSignature),
    TicksPerBeat(u32),
    SubticksPerTick(u32),
    Transpose(i32),
    Scale(Scale),
}

impl SongSetting {
    pub fn key(&self) -> &'static str {
        match self {
            SongSetting::TempoBpm(_) => "tempo_bpm",
            SongSetting::TimeSignature(_) => "time_signature",
            SongSetting::TicksPerBeat(_) => "ticks_per_beat",
            SongSetting::SubticksPerTick(_) => "subticks_per_tick",
            SongSetting::Transpose(_) => "transpose",
            SongSetting::Scale(_) => "scale",
        }
    }

    pub fn unparse(&self) -> String {
        let value = match self {
            SongSetting::TempoBpm(v) | SongSetting::TicksPerBeat(v) | SongSetting::SubticksPerTick(v) => {
                v.to_string()
            }
            SongSetting::TimeSignature(ts) => format!("{}/{}", ts.beats, ts.beat_type),
            SongSetting::Transpose(v) => v.to_string(),
            SongSetting::Scale(scale) => scale.unparse(),
        };
        format!("{}={}", self.key(), value)
    }
}

/// One `key=value` of a `*track.<name>:` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSetting {
    Instrument(u8),
    Volume(u8),
    Octave(i32),
}

impl TrackSetting {
    pub fn key(&self) -> &'static str {
        match self {
            TrackSetting::Instrument(_) => "instrument",
            TrackSetting::Volume(_) => "volume",
            TrackSetting::Octave(_) => "octave",
        }
    }

    pub fn unparse(&self) -> String {
        let value = match self {
            TrackSetting::Instrument(v) | TrackSetting::Volume(v) => v.to_string(),
            TrackSetting::Octave(v) => v.to_string(),
        };
        format!("{}={}", self.key(), value)
    }
}

/// A `*`-prefixed configuration line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Song(Vec<Located<SongSetting>>),
    Track {
        track: TrackId,
        settings: Vec<Located<TrackSetting>>,
    },
    Groove(Vec<i32>),
}

impl Command {
    pub fn unparse(&self) -> String {
        match self {
            Command::Song(settings) => {
                let values: Vec<String> = settings.iter().map(|s| s.value.unparse()).collect();
                format!("*song: {}", values.join(", "))
            }
            Command::Track { track, settings } => {
                let values: Vec<String> = settings.iter().map(|s| s.value.unparse()).collect();
                format!("*track.{}: {}", track.name(), values.join(", "))
            }
            Command::Groove(delays) => {
                let values: Vec<String> = delays.iter().map(|d| d.to_string()).collect();
                format!("*groove: {}", values.join(" "))
            }
        }
    }
}

/// Anything that can appear in a song, in source order
#[derive(Debug, Clone, PartialEq)]
pub enum SongItem {
    Note(Note),
    Rest(Rest),
    Chord(Chord),
    BarLine,
    Tie,
    Cut,
    Command(Command),
}

impl SongItem {
    /// Items discarded by a cut: everything musical, but not configuration
    pub fn is_cuttable(&self) -> bool {
        !matches!(self, SongItem::Command(_))
    }

    pub fn unparse(&self) -> String {
        match self {
            SongItem::Note(note) => note.unparse(),
            SongItem::Rest(rest) => rest.unparse(),
            SongItem::Chord(chord) => chord.unparse(),
            SongItem::BarLine => "|".to_string(),
            SongItem::Tie => "~".to_string(),
            SongItem::Cut => "!".to_string(),
            SongItem::Command(command) => command.unparse(),
        }
    }
}
