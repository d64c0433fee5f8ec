//! MIDI pitch arithmetic.
//!
//! Melody notes are written as pitch classes plus octave shifts; their absolute pitch
//! comes from the previous note via [`find_next_note`]. Explicit chord notes are stacked
//! upwards with [`upward_from`].

use crate::error::SongError;

pub const MAX_MIDI_NOTE: i32 = 127;

/// Check that a computed pitch is a valid MIDI note number
pub fn valid_midi_note(note: i32) -> Result<u8, SongError> {
    if note > MAX_MIDI_NOTE {
        Err(SongError::range(format!("Note number {} > {}", note, MAX_MIDI_NOTE)))
    } else if note < 0 {
        Err(SongError::range(format!("Note number {} < 0", note)))
    } else {
        Ok(note as u8)
    }
}

/// Pitch of a note in a given octave: `12 + 12 * octave + offset`
pub fn pitch_in_octave(octave: i32, semitone_offset: i32) -> Result<u8, SongError> {
    valid_midi_note(12 + 12 * octave + semitone_offset)
}

/// Resolve the pitch of the next melody note.
///
/// `offset` is the semitone offset of the target pitch class (C = 0). With no octave
/// shifts the nearest occurrence of the pitch class wins; an exact tritone is ambiguous.
/// Positive `ups` count from the next occurrence above `last`, negative `ups` from the
/// next occurrence below it. The same pitch class moves by whole octaves.
pub fn find_next_note(last: u8, offset: i32, ups: i32) -> Result<i32, SongError> {
    let last = last as i32;
    let last_offset = last % 12;
    let offset = offset.rem_euclid(12);
    if last_offset == offset {
        return Ok(last + 12 * ups);
    }
    let jump = (offset - last_offset).rem_euclid(12);
    let above = last + jump;
    match ups {
        0 if jump < 6 => Ok(above),
        0 if jump > 6 => Ok(above - 12),
        0 => Err(SongError::grammar(
            "Can't decide next nearest note (6 semitones either way)",
        )),
        ups if ups > 0 => Ok(above + (ups - 1) * 12),
        ups => Ok(above + ups * 12),
    }
}

/// The lowest pitch with the given semitone offset at or above `previous`
pub fn upward_from(previous: u8, semitone_offset: i32) -> Result<u8, SongError> {
    let semitones_up = (semitone_offset - previous as i32).rem_euclid(12);
    valid_midi_note(previous as i32 + semitones_up)
}
