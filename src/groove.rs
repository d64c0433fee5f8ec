//! # Groove
//!
//! A groove shifts notes off the tick grid by a fixed pattern of subtick delays that
//! repeats every bar (or every fraction of a bar). For example, with 2 ticks per beat
//! and 10 subticks per tick, delays `[0, 3]` play every off-beat 3 subticks late,
//! giving a gentle swing.
//!
//! The delay for tick `t` is `delays[t % delays.len()]`, so the number of delays must
//! divide the number of ticks in a bar for the pattern to line up with the bar lines.

use crate::error::SongError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Groove {
    beats_per_bar: u32,
    ticks_per_beat: u32,
    subticks_per_tick: u32,
    delays: Vec<i32>,
}

impl Groove {
    pub fn new(
        beats_per_bar: u32,
        ticks_per_beat: u32,
        subticks_per_tick: u32,
        delays: Vec<i32>,
    ) -> Result<Self, SongError> {
        if delays.is_empty() {
            return Err(SongError::timing("Groove must have at least one delay"));
        }
        let ticks_per_bar = beats_per_bar * ticks_per_beat;
        if ticks_per_bar as usize % delays.len() != 0 {
            return Err(SongError::timing(format!(
                "Groove has {} delays, which does not divide {} ticks per bar",
                delays.len(),
                ticks_per_bar
            )));
        }
        Ok(Self {
            beats_per_bar,
            ticks_per_beat,
            subticks_per_tick,
            delays,
        })
    }

    /// No delays at all
    pub fn straight(beats_per_bar: u32, ticks_per_beat: u32, subticks_per_tick: u32) -> Self {
        Self {
            beats_per_bar,
            ticks_per_beat,
            subticks_per_tick,
            delays: vec![0],
        }
    }

    pub fn ticks_per_bar(&self) -> u32 {
        self.beats_per_bar * self.ticks_per_beat
    }

    pub fn delays(&self) -> &[i32] {
        &self.delays
    }

    /// Time in subticks at which tick `tick` is played
    pub fn get_subticks(&self, tick: u32) -> i64 {
        let delay = self.delays[tick as usize % self.delays.len()];
        tick as i64 * self.subticks_per_tick as i64 + delay as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_subticks() {
        let groove = Groove::new(3, 2, 10, vec![0, 3]).unwrap();
        assert_eq!(groove.get_subticks(23), 233);
        assert_eq!(groove.get_subticks(22), 220);
        assert_eq!(groove.get_subticks(0), 0);
    }

    #[test]
    fn test_negative_delay() {
        let groove = Groove::new(4, 1, 10, vec![0, -2]).unwrap();
        assert_eq!(groove.get_subticks(1), 8);
        assert_eq!(groove.get_subticks(4), 40);
    }

    #[test]
    fn test_straight_groove() {
        let groove = Groove::straight(4, 4, 5);
        assert_eq!(groove.ticks_per_bar(), 16);
        assert_eq!(groove.get_subticks(7), 35);
    }

    #[test]
    fn test_groove_errors() {
        let err = Groove::new(4, 4, 1, vec![]).unwrap_err();
        assert_eq!(err.to_string(), "Groove must have at least one delay");

        let err = Groove::new(3, 2, 10, vec![0, 1, 2, 3]).unwrap_err();
        assert_eq!(err.to_string(), "Groove has 4 delays, which does not divide 6 ticks per bar");
    }
}
