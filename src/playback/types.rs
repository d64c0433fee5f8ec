//! Render option and recording type definitions
//!
//! A [`Recording`] is what the command line prints: every event sent to every track
//! sink, serialized with camelCase keys.

use serde::Serialize;

use crate::track::TrackId;

/// Options for rendering a finished song
///
/// # Fields
/// - `initial_delay_seconds`: silence before the first tick, converted to subticks at the
///   song's tempo (some players drop events at time zero)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderOptions {
    pub initial_delay_seconds: f64,
}

impl RenderOptions {
    pub fn with_initial_delay(seconds: f64) -> Self {
        Self {
            initial_delay_seconds: seconds,
        }
    }
}

/// One call made on a [`super::TrackSink`]
///
/// Times are in subticks from the start of the song, including any groove delay and
/// the initial delay.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RecordedEvent {
    Tempo { time: i64, bpm: u32 },
    Instrument { time: i64, program: u8 },
    NoteOn { pitch: u8, time: i64, velocity: u8 },
    NoteOff { pitch: u8, time: i64 },
}

impl RecordedEvent {
    pub fn time(&self) -> i64 {
        match self {
            RecordedEvent::Tempo { time, .. }
            | RecordedEvent::Instrument { time, .. }
            | RecordedEvent::NoteOn { time, .. }
            | RecordedEvent::NoteOff { time, .. } => *time,
        }
    }
}

/// Events for one track, in time order
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordedTrack {
    pub track: TrackId,
    pub channel: u8,
    pub events: Vec<RecordedEvent>,
}

/// A fully rendered song
///
/// # Fields
/// - `resolution`: subticks per beat of the time signature (the time division of a
///   sequencer file, whose tempo events count the same beats)
/// - `subticks_per_second`: for converting event times to seconds
/// - `ticks`: song length in ticks
/// - `tracks`: melody, chord and bass, in that order
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub resolution: u32,
    pub subticks_per_second: f64,
    pub ticks: u32,
    pub tracks: Vec<RecordedTrack>,
}

impl Recording {
    pub fn track(&self, id: TrackId) -> Option<&RecordedTrack> {
        self.tracks.iter().find(|track| track.track == id)
    }
}
