//! # Tracks
//!
//! A song has exactly three tracks, one per [`TrackId`]. Each track carries its own
//! configuration (octave, instrument, volume) and the list of events resolved onto it:
//!
//! - melody: [`ResolvedNote`]s, including continued notes of a tie chain, which stay in
//!   the list (so that `continuation_start` indices remain stable) but never sound, and
//!   [`ResolvedRest`]s
//! - chord: [`ResolvedChord`]s, whose durations are filled in when the next chord starts
//!   or the song finishes
//! - bass: [`BassNote`]s, synthesized from finished chords

use serde::Serialize;

use crate::region::SourceRegion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackId {
    Melody,
    Chord,
    Bass,
}

impl TrackId {
    /// Render order, which is also the MIDI channel order
    pub const ALL: [TrackId; 3] = [TrackId::Melody, TrackId::Chord, TrackId::Bass];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "melody" => Some(TrackId::Melody),
            "chord" => Some(TrackId::Chord),
            "bass" => Some(TrackId::Bass),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TrackId::Melody => "melody",
            TrackId::Chord => "chord",
            TrackId::Bass => "bass",
        }
    }

    pub fn channel(&self) -> u8 {
        match self {
            TrackId::Melody => 0,
            TrackId::Chord => 1,
            TrackId::Bass => 2,
        }
    }

    fn default_octave(&self) -> i32 {
        match self {
            TrackId::Melody => 3,
            TrackId::Chord => 1,
            TrackId::Bass => 0,
        }
    }
}

/// A melody note with its absolute pitch and timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNote {
    pub pitch: u8,
    pub tick: u32,
    /// For the first note of a tie chain, the length of the whole chain
    pub duration_ticks: u32,
    pub to_continue: bool,
    pub continued: bool,
    /// Index (in the melody track) of the note that starts this note's tie chain
    pub continuation_start: usize,
    pub source: SourceRegion,
}

/// A rest on the melody track; silent, but keeps its position in the song
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRest {
    pub tick: u32,
    pub duration_ticks: u32,
    pub source: SourceRegion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChord {
    /// Empty for the `[]` placeholder chord
    pub pitches: Vec<u8>,
    pub bass_pitch: Option<u8>,
    pub tick: u32,
    /// `None` until the chord is finished
    pub duration_ticks: Option<u32>,
    pub source: SourceRegion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BassNote {
    pub pitch: u8,
    pub tick: u32,
    pub duration_ticks: u32,
    /// The chord this bass note was derived from
    pub source: SourceRegion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEvent {
    Note(ResolvedNote),
    Rest(ResolvedRest),
    Chord(ResolvedChord),
    Bass(BassNote),
}

impl TrackEvent {
    pub fn tick(&self) -> u32 {
        match self {
            TrackEvent::Note(note) => note.tick,
            TrackEvent::Rest(rest) => rest.tick,
            TrackEvent::Chord(chord) => chord.tick,
            TrackEvent::Bass(bass) => bass.tick,
        }
    }

    pub fn source(&self) -> &SourceRegion {
        match self {
            TrackEvent::Note(note) => &note.source,
            TrackEvent::Rest(rest) => &rest.source,
            TrackEvent::Chord(chord) => &chord.source,
            TrackEvent::Bass(bass) => &bass.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    id: TrackId,
    pub octave: i32,
    pub instrument: u8,
    pub volume: u8,
    events: Vec<TrackEvent>,
}

impl Track {
    pub const DEFAULT_VOLUME: u8 = 100;

    pub fn new(id: TrackId) -> Self {
        Self {
            id,
            octave: id.default_octave(),
            instrument: 0,
            volume: Self::DEFAULT_VOLUME,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn events(&self) -> &[TrackEvent] {
        &self.events
    }

    pub(crate) fn events_mut(&mut self) -> &mut [TrackEvent] {
        &mut self.events
    }

    /// Append an event, returning its index
    pub(crate) fn add(&mut self, event: TrackEvent) -> usize {
        self.events.push(event);
        self.events.len() - 1
    }

    pub(crate) fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Melody notes, including continued ones
    pub fn notes(&self) -> impl Iterator<Item = &ResolvedNote> {
        self.events.iter().filter_map(|event| match event {
            TrackEvent::Note(note) => Some(note),
            _ => None,
        })
    }

    pub fn rests(&self) -> impl Iterator<Item = &ResolvedRest> {
        self.events.iter().filter_map(|event| match event {
            TrackEvent::Rest(rest) => Some(rest),
            _ => None,
        })
    }

    pub fn chords(&self) -> impl Iterator<Item = &ResolvedChord> {
        self.events.iter().filter_map(|event| match event {
            TrackEvent::Chord(chord) => Some(chord),
            _ => None,
        })
    }

    pub fn bass_notes(&self) -> impl Iterator<Item = &BassNote> {
        self.events.iter().filter_map(|event| match event {
            TrackEvent::Bass(bass) => Some(bass),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_defaults() {
        let melody = Track::new(TrackId::Melody);
        assert_eq!(melody.octave, 3);
        assert_eq!(melody.volume, 100);
        assert_eq!(melody.instrument, 0);
        assert_eq!(Track::new(TrackId::Chord).octave, 1);
        assert_eq!(Track::new(TrackId::Bass).octave, 0);
    }

    #[test]
    fn test_track_names() {
        for id in TrackId::ALL {
            assert_eq!(TrackId::from_name(id.name()), Some(id));
        }
        assert_eq!(TrackId::from_name("drums"), None);
        assert_eq!(TrackId::Bass.channel(), 2);
    }

    #[test]
    fn test_add_and_clear() {
        let source = SourceRegion::from_text("song", "c");
        let mut track = Track::new(TrackId::Bass);
        let index = track.add(TrackEvent::Bass(BassNote {
            pitch: 36,
            tick: 0,
            duration_ticks: 4,
            source,
        }));
        assert_eq!(index, 0);
        assert_eq!(track.bass_notes().count(), 1);
        assert_eq!(track.events()[0].tick(), 0);
        track.clear_events();
        assert!(track.events().is_empty());
    }
}
