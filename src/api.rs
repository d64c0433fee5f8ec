//! # Public API
//!
//! The entry points most callers need. Each one runs the whole pipeline and stops at the
//! first error.
//!
//! ## Compilation Functions
//!
//! - [`compile()`] - parse and resolve a [`SourceFile`] into a finished [`Song`]
//! - [`compile_file()`] - read a song file from disk, then [`compile()`] it
//! - [`compile_and_render()`] - compile, then render every track into a [`Recording`]
//!
//! ## Typical Usage
//!
//! ```rust
//! use melody_script::{compile, SourceFile, TrackId};
//!
//! let source = "*song: tempo_bpm=90\n\
//!               [C] c d e f | [G] g2 g2 | [C] c1";
//! let song = compile(&SourceFile::from_string("tune.song", source))?;
//!
//! let pitches: Vec<u8> = song.track(TrackId::Melody).notes().map(|n| n.pitch).collect();
//! assert_eq!(pitches, vec![48, 50, 52, 53, 55, 55, 60]);
//! # Ok::<(), melody_script::SongError>(())
//! ```
//!
//! ## Rendering
//!
//! ```rust
//! use melody_script::playback::RenderOptions;
//! use melody_script::{compile_and_render, SourceFile};
//!
//! let file = SourceFile::from_string("tune.song", "c d e f");
//! let recording = compile_and_render(&file, &RenderOptions::default())?;
//! assert_eq!(recording.ticks, 16);
//! # Ok::<(), melody_script::SongError>(())
//! ```

use std::path::Path;

use tracing::info;

use crate::error::{CompileError, SongError};
use crate::playback::{record, Recording, RenderOptions};
use crate::region::SourceFile;
use crate::song::Song;

/// Compile a song script into a finished [`Song`].
///
/// # Pipeline
/// 1. Split the file into lines, and each line into items or a command
/// 2. Resolve every item against the song as it is parsed
/// 3. Finish the song (closing the last chord, checking the last bar)
///
/// # Errors
/// Returns [`SongError`] located at the item, command or setting that failed.
pub fn compile(file: &SourceFile) -> Result<Song, SongError> {
    let song = Song::parse(file)?;
    info!(
        file = file.name(),
        items = song.items().len(),
        ticks = song.tick(),
        "compiled song"
    );
    Ok(song)
}

/// Read and compile a song file
pub fn compile_file(path: impl AsRef<Path>) -> Result<Song, CompileError> {
    let path = path.as_ref();
    let file = SourceFile::read(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(compile(&file)?)
}

/// Compile a song script and render all of its tracks into memory
pub fn compile_and_render(file: &SourceFile, options: &RenderOptions) -> Result<Recording, SongError> {
    let song = compile(file)?;
    record(&song, options)
}
