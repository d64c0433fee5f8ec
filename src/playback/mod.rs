//! # Playback Module
//!
//! Render a finished [`crate::Song`] as timed MIDI-style events.
//!
//! ## Purpose
//! Resolution leaves every track with a list of events in ticks. Rendering is a second,
//! read-only pass that converts them into the calls a sequencer file writer or a live
//! synthesizer needs:
//! 1. **Tempo and instrument** at time 0 on every track
//! 2. **Note on / note off** pairs for every sounding note, chord and bass note
//!
//! ## Sub-modules
//! - `types` - RenderOptions, Recording and RecordedEvent definitions
//! - `sink` - the TrackSink trait, and EventRecorder which keeps events in memory
//! - `engine` - the render walk itself
//!
//! ## Timing
//! Event times are in subticks: `tick * subticks_per_tick + groove delay + initial delay`.
//! Transposition is applied here, not during resolution, so a song can resolve
//! cleanly and still fail to render when the transposed pitch leaves 0..=127.
//!
//! ## Example
//! ```rust
//! use melody_script::playback::{record, RecordedEvent, RenderOptions};
//! use melody_script::{compile, SourceFile, TrackId};
//!
//! let song = compile(&SourceFile::from_string("song", "c d")).unwrap();
//! let recording = record(&song, &RenderOptions::default()).unwrap();
//!
//! let melody = recording.track(TrackId::Melody).unwrap();
//! assert_eq!(melody.events[2], RecordedEvent::NoteOn { pitch: 48, time: 0, velocity: 100 });
//! ```
//!
//! ## Channels
//! - melody: channel 0
//! - chord: channel 1
//! - bass: channel 2

mod engine;
mod sink;
mod types;


pub use engine::{initial_delay_subticks, record, render};
pub use sink::{EventRecorder, TrackSink};
pub use types::{RecordedEvent, RecordedTrack, Recording, RenderOptions};
