//! The interface between the renderer and whatever writes the events out.

use super::types::{RecordedEvent, RecordedTrack};
use crate::track::TrackId;

/// Receives the rendered events of one track.
///
/// Times are in subticks. A sequencer file writer would use a time division of
/// [`super::Recording::resolution`] subticks per beat. Tempo is in beats per minute, where
/// a beat is the time signature's `1/D` note, so both count the same unit.
pub trait TrackSink {
    fn set_tempo(&mut self, time: i64, bpm: u32);

    fn set_instrument(&mut self, time: i64, program: u8);

    fn note_on(&mut self, pitch: u8, time: i64, velocity: u8);

    fn note_off(&mut self, pitch: u8, time: i64);
}

/// A sink that keeps every event in memory
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecorder {
    track: TrackId,
    channel: u8,
    events: Vec<RecordedEvent>,
}

impl EventRecorder {
    pub fn new(track: TrackId, channel: u8) -> Self {
        Self {
            track,
            channel,
            events: Vec::new(),
        }
    }

    /// Events in the order they were received
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// The recorded track, with events stably sorted by time
    pub fn into_track(mut self) -> RecordedTrack {
        self.events.sort_by_key(RecordedEvent::time);
        RecordedTrack {
            track: self.track,
            channel: self.channel,
            events: self.events,
        }
    }
}

impl TrackSink for EventRecorder {
    fn set_tempo(&mut self, time: i64, bpm: u32) {
        self.events.push(RecordedEvent::Tempo { time, bpm });
    }

    fn set_instrument(&mut self, time: i64, program: u8) {
        self.events.push(RecordedEvent::Instrument { time, program });
    }

    fn note_on(&mut self, pitch: u8, time: i64, velocity: u8) {
        self.events.push(RecordedEvent::NoteOn { pitch, time, velocity });
    }

    fn note_off(&mut self, pitch: u8, time: i64) {
        self.events.push(RecordedEvent::NoteOff { pitch, time });
    }
}
