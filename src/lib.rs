//! # melody-script
//!
//! A compiler for a small line-oriented music notation. A song script describes one
//! melody with chord symbols above it:
//!
//! ```text
//! *song:         tempo_bpm=100, time_signature=3/4
//! *track.chord:  instrument=24, volume=80
//!
//! | [C] c e g | [G7] f d b, | [C] c2. |
//! ```
//!
//! Compiling resolves every item to an absolute pitch and tick on one of three tracks
//! (melody, chord and bass), checking bar lengths, ties and pitch ranges on the way.
//! The [`playback`] module then turns the tracks into timed note events.
//!
//! ## Modules
//! - [`region`] - source text spans carried by every parsed value
//! - [`ast`] / [`parser`] - notation items, commands and their grammar
//! - [`song`] - the resolution engine, with [`pitch`], [`groove`] and [`track`]
//! - [`scale`] - key analysis of resolved pitches
//! - [`playback`] - rendering a finished song onto track sinks
//! - [`error`] - the error type and its diagnostic format
//!
//! ## Example
//! ```rust
//! use melody_script::{compile, SourceFile, TrackId};
//!
//! let song = compile(&SourceFile::from_string("song", "[C] c e g c'"))?;
//! let chord = song.track(TrackId::Chord).chords().next().unwrap();
//! assert_eq!(chord.pitches, vec![24, 28, 31]);
//! # Ok::<(), melody_script::SongError>(())
//! ```

pub mod api;
pub mod ast;
pub mod error;
pub mod groove;
pub mod parser;
pub mod pitch;
pub mod playback;
pub mod region;
pub mod scale;
pub mod song;
pub mod track;

pub use api::{compile, compile_and_render, compile_file};
pub use ast::*;
pub use error::*;
pub use groove::Groove;
pub use parser::parse_line;
pub use region::{Located, SourceFile, SourceLine, SourceRegion};
pub use scale::{RelativeScale, Scale};
pub use song::{Song, SongSettings, SongState};
pub use track::{BassNote, ResolvedChord, ResolvedNote, ResolvedRest, Track, TrackEvent, TrackId};
