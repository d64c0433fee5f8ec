//! Scales anchored at a root pitch, used to describe melody pitches as scale degrees.

use crate::ast::ScaleNote;
use crate::error::SongError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeScale {
    Major,
    Minor,
}

impl RelativeScale {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "major" => Some(RelativeScale::Major),
            "minor" => Some(RelativeScale::Minor),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RelativeScale::Major => "major",
            RelativeScale::Minor => "minor",
        }
    }

    /// Semitones above the root of each of the seven degrees
    pub fn offsets(&self) -> [i32; 7] {
        match self {
            RelativeScale::Major => [0, 2, 4, 5, 7, 9, 11],
            RelativeScale::Minor => [0, 2, 3, 5, 7, 8, 10],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    root: ScaleNote,
    root_pitch: u8,
    kind: RelativeScale,
}

impl Scale {
    /// The root must carry an octave, e.g. `c4`
    pub fn new(root: ScaleNote, kind: RelativeScale) -> Result<Self, SongError> {
        let root_pitch = root.midi_note()?.ok_or_else(|| {
            SongError::grammar(format!("Scale root '{}' must specify an octave", root.unparse()))
        })?;
        Ok(Self {
            root,
            root_pitch,
            kind,
        })
    }

    pub fn root_pitch(&self) -> u8 {
        self.root_pitch
    }

    /// Scale degree of `pitch` counted from the root (root = 0, an octave up = 7),
    /// or `None` when the pitch is not in the scale
    pub fn position(&self, pitch: u8) -> Option<i32> {
        let difference = pitch as i32 - self.root_pitch as i32;
        let octave = difference.div_euclid(12);
        let semitone = difference.rem_euclid(12);
        self.kind
            .offsets()
            .iter()
            .position(|&offset| offset == semitone)
            .map(|index| octave * 7 + index as i32)
    }

    pub fn unparse(&self) -> String {
        format!("{} {}", self.root.unparse(), self.kind.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c4_major() -> Scale {
        Scale::new(ScaleNote::new(0, 0).with_octave(4), RelativeScale::Major).unwrap()
    }

    #[test]
    fn test_major_positions() {
        let scale = c4_major();
        assert_eq!(scale.root_pitch(), 60);
        assert_eq!(scale.position(60), Some(0));
        assert_eq!(scale.position(62), Some(1));
        assert_eq!(scale.position(71), Some(6));
        assert_eq!(scale.position(72), Some(7));
        assert_eq!(scale.position(59), Some(-1));
        assert_eq!(scale.position(48), Some(-7));
        assert_eq!(scale.position(61), None);
    }

    #[test]
    fn test_minor_positions() {
        let scale = Scale::new(ScaleNote::new(5, 0).with_octave(3), RelativeScale::Minor).unwrap();
        assert_eq!(scale.root_pitch(), 57);
        assert_eq!(scale.position(60), Some(2));
        assert_eq!(scale.position(65), Some(5));
        assert_eq!(scale.position(66), None);
    }

    #[test]
    fn test_root_requires_octave() {
        let err = Scale::new(ScaleNote::new(0, 0), RelativeScale::Major).unwrap_err();
        assert_eq!(err.to_string(), "Scale root 'c' must specify an octave");
    }

    #[test]
    fn test_unparse() {
        let scale = Scale::new(ScaleNote::new(1, -1).with_octave(2), RelativeScale::Minor).unwrap();
        assert_eq!(scale.unparse(), "d-2 minor");
    }
}
