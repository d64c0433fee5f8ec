//! # Song Resolution
//!
//! [`Song`] turns the stream of parsed items into absolute pitches and tick positions.
//! Items are resolved one at a time, in source order, as they are parsed.
//!
//! ## States
//! ```text
//! Idle ──(note, rest, chord, bar line, tie)──> Playing ──(finish)──> Finished
//! ```
//! Commands are only accepted while the song is `Idle`. A cut (`!`) throws away all
//! musical items parsed so far, but keeps the configuration and the current state.
//!
//! ## Cursor
//! Resolution threads a cursor through the items:
//! - the current tick
//! - the last melody note and the last (still open) chord
//! - the tick of the last bar line, and all bar line ticks so far
//! - whether a standalone tie is waiting for the next note
//! - the current default duration, carried from note to note and reset at each bar line
//!
//! ## Timing
//! Durations are counted in crotchets. The number of ticks in a crotchet depends on the
//! time signature: with `ticks_per_beat = 4`, a crotchet is 4 ticks in 3/4, 8 ticks
//! in 6/8 and 2 ticks in 2/2.
//!
//! ## Ties
//! `b~ ~b` and `b ~ b` both tie two notes together. The first note of a tie chain
//! absorbs the duration of every continued note; continued notes stay on the melody
//! track but are never played.

use tracing::{debug, trace};

use crate::ast::{
    ChordForm, Chord, Command, Duration, Note, Rest, SongItem, SongSetting, TimeSignature,
    TrackSetting,
};
use crate::error::SongError;
use crate::groove::Groove;
use crate::parser::parse_line;
use crate::pitch::{find_next_note, pitch_in_octave, upward_from, valid_midi_note};
use crate::region::{Located, SourceFile, SourceRegion};
use crate::scale::Scale;
use crate::track::{BassNote, ResolvedChord, ResolvedNote, ResolvedRest, Track, TrackEvent, TrackId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongState {
    /// Accepting commands; nothing musical has happened yet
    Idle,
    Playing,
    Finished,
}

/// Song-wide settings, changed by `*song:` commands
#[derive(Debug, Clone, PartialEq)]
pub struct SongSettings {
    pub tempo_bpm: u32,
    pub time_signature: TimeSignature,
    pub ticks_per_beat: u32,
    pub subticks_per_tick: u32,
    /// Semitones added to every pitch when rendering
    pub transpose: i32,
    pub scale: Option<Scale>,
}

impl Default for SongSettings {
    fn default() -> Self {
        Self {
            tempo_bpm: 120,
            time_signature: TimeSignature::default(),
            ticks_per_beat: 4,
            subticks_per_tick: 1,
            transpose: 0,
            scale: None,
        }
    }
}

impl SongSettings {
    pub fn ticks_per_bar(&self) -> u32 {
        self.time_signature.beats * self.ticks_per_beat
    }

    /// Ticks in one crotchet, given that a beat is one `1/D` note of an `N/D` time signature
    pub fn ticks_per_crotchet(&self) -> Result<u32, SongError> {
        let TimeSignature { beats, beat_type } = self.time_signature;
        if beat_type >= 4 {
            return Ok(self.ticks_per_beat * beat_type / 4);
        }
        let beats_per_crotchet = 4 / beat_type;
        if self.ticks_per_beat % beats_per_crotchet != 0 {
            return Err(SongError::timing(format!(
                "Ticks per beat {} is not compatible with time signature {}/{}",
                self.ticks_per_beat, beats, beat_type
            )));
        }
        Ok(self.ticks_per_beat / beats_per_crotchet)
    }

    pub fn subticks_per_beat(&self) -> u32 {
        self.ticks_per_beat * self.subticks_per_tick
    }

    pub fn subticks_per_second(&self) -> f64 {
        (self.tempo_bpm * self.subticks_per_beat()) as f64 / 60.0
    }
}

/// Resolution position within the song
#[derive(Debug, Clone, PartialEq)]
struct Cursor {
    tick: u32,
    /// Index of the last note in the melody track
    last_note: Option<usize>,
    /// Index of the open chord in the chord track
    last_chord: Option<usize>,
    last_bar_tick: Option<u32>,
    tie_pending: bool,
    current_duration: Duration,
    bar_ticks: Vec<u32>,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            tick: 0,
            last_note: None,
            last_chord: None,
            last_bar_tick: None,
            tie_pending: false,
            current_duration: Duration::UNIT,
            bar_ticks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    items: Vec<Located<SongItem>>,
    tracks: [Track; 3],
    settings: SongSettings,
    delays: Vec<i32>,
    groove: Groove,
    cursor: Cursor,
    state: SongState,
}

impl Default for Song {
    fn default() -> Self {
        Self::new()
    }
}

impl Song {
    pub fn new() -> Self {
        let settings = SongSettings::default();
        let groove = Groove::straight(
            settings.time_signature.beats,
            settings.ticks_per_beat,
            settings.subticks_per_tick,
        );
        Self {
            items: Vec::new(),
            tracks: TrackId::ALL.map(Track::new),
            settings,
            delays: groove.delays().to_vec(),
            groove,
            cursor: Cursor::default(),
            state: SongState::Idle,
        }
    }

    /// Parse and resolve a whole file, then finish the song
    pub fn parse(file: &SourceFile) -> Result<Song, SongError> {
        let mut song = Song::new();
        for line in file.lines() {
            for item in parse_line(&line)? {
                song.add(item)?;
            }
        }
        song.finish()?;
        Ok(song)
    }

    pub fn state(&self) -> SongState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == SongState::Finished
    }

    /// The current tick, which is the song length once finished
    pub fn tick(&self) -> u32 {
        self.cursor.tick
    }

    /// Items that have been resolved and not cut
    pub fn items(&self) -> &[Located<SongItem>] {
        &self.items
    }

    pub fn settings(&self) -> &SongSettings {
        &self.settings
    }

    pub fn groove(&self) -> &Groove {
        &self.groove
    }

    pub fn track(&self, id: TrackId) -> &Track {
        &self.tracks[id.channel() as usize]
    }

    fn track_mut(&mut self, id: TrackId) -> &mut Track {
        &mut self.tracks[id.channel() as usize]
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn ticks_per_bar(&self) -> u32 {
        self.settings.ticks_per_bar()
    }

    /// Ticks at which each bar line occurred
    pub fn bar_ticks(&self) -> &[u32] {
        &self.cursor.bar_ticks
    }

    /// Scale degree of every sounding melody note, when a scale is set
    pub fn scale_positions(&self) -> Option<Vec<Option<i32>>> {
        let scale = self.settings.scale.as_ref()?;
        Some(
            self.track(TrackId::Melody)
                .notes()
                .filter(|note| !note.continued)
                .map(|note| scale.position(note.pitch))
                .collect(),
        )
    }

    /// Resolve one item. Errors are located at the item unless they carry a more
    /// precise location already.
    pub fn add(&mut self, item: Located<SongItem>) -> Result<(), SongError> {
        if self.state == SongState::Finished {
            return Err(SongError::state("Song is already finished").at(&item.source));
        }
        let source = &item.source;
        let resolved = match &item.value {
            SongItem::Cut => {
                self.cut();
                return Ok(());
            }
            SongItem::Command(command) => self.apply_command(command),
            SongItem::Note(note) => self.resolve_note(note, source),
            SongItem::Rest(rest) => self.resolve_rest(rest, source),
            SongItem::Chord(chord) => self.resolve_chord(chord, source),
            SongItem::BarLine => self.resolve_bar_line(),
            SongItem::Tie => self.resolve_tie(),
        };
        resolved.map_err(|e| e.or_at(source))?;
        trace!(item = %item.value.unparse(), tick = self.cursor.tick, "resolved item");
        self.items.push(item);
        Ok(())
    }

    /// Run the end-of-input checks and close the last chord
    pub fn finish(&mut self) -> Result<(), SongError> {
        if self.state == SongState::Finished {
            return Err(SongError::state("Song is already finished"));
        }
        let end = self.items.last().map(|item| item.source.clone());
        let at_end = |e: SongError| match &end {
            Some(region) => e.or_at(region),
            None => e,
        };

        if let Some(note) = self.last_note() {
            if note.to_continue || self.cursor.tie_pending {
                let source = note.source.clone();
                return Err(SongError::continuation("Song ends with a note marked to continue").at(&source));
            }
        }
        let part_bar_ticks = self.cursor.tick - self.cursor.last_bar_tick.unwrap_or(0);
        if part_bar_ticks > self.ticks_per_bar() {
            return Err(at_end(SongError::timing(format!(
                "Last part bar has {} ticks > {} ticks per bar",
                part_bar_ticks,
                self.ticks_per_bar()
            ))));
        }
        self.finish_chord();
        self.state = SongState::Finished;
        debug!(
            ticks = self.cursor.tick,
            bars = self.cursor.bar_ticks.len(),
            notes = self.track(TrackId::Melody).notes().count(),
            chords = self.track(TrackId::Chord).events().len(),
            "song finished"
        );
        Ok(())
    }

    fn start_playing(&mut self) {
        if self.state == SongState::Idle {
            debug!(tick = self.cursor.tick, "song starts playing");
            self.state = SongState::Playing;
        }
    }

    fn check_unplayed(&self) -> Result<(), SongError> {
        if self.state == SongState::Idle {
            Ok(())
        } else {
            Err(SongError::state("Cannot perform operation once song is playing"))
        }
    }

    fn cut(&mut self) {
        let before = self.items.len();
        self.items.retain(|item| !item.value.is_cuttable());
        self.cursor = Cursor::default();
        for track in self.tracks.iter_mut() {
            track.clear_events();
        }
        debug!(discarded = before - self.items.len(), "cut");
    }

    // Configuration

    fn apply_command(&mut self, command: &Command) -> Result<(), SongError> {
        self.check_unplayed()?;
        match command {
            Command::Song(settings) => {
                for setting in settings {
                    self.apply_song_setting(&setting.value)
                        .map_err(|e| e.or_at(&setting.source))?;
                }
            }
            Command::Track { track, settings } => {
                for setting in settings {
                    self.apply_track_setting(*track, setting.value);
                }
            }
            Command::Groove(delays) => {
                self.delays = delays.clone();
                self.rebuild_groove()?;
            }
        }
        Ok(())
    }

    fn apply_song_setting(&mut self, setting: &SongSetting) -> Result<(), SongError> {
        match setting {
            SongSetting::TempoBpm(bpm) => self.settings.tempo_bpm = *bpm,
            SongSetting::TimeSignature(time_signature) => {
                self.settings.time_signature = *time_signature;
                self.settings.ticks_per_crotchet()?;
                self.rebuild_groove()?;
            }
            SongSetting::TicksPerBeat(ticks) => {
                self.settings.ticks_per_beat = *ticks;
                self.settings.ticks_per_crotchet()?;
                self.rebuild_groove()?;
            }
            SongSetting::SubticksPerTick(subticks) => {
                self.settings.subticks_per_tick = *subticks;
                self.rebuild_groove()?;
            }
            SongSetting::Transpose(semitones) => self.settings.transpose = *semitones,
            SongSetting::Scale(scale) => self.settings.scale = Some(scale.clone()),
        }
        Ok(())
    }

    fn apply_track_setting(&mut self, id: TrackId, setting: TrackSetting) {
        let track = self.track_mut(id);
        match setting {
            TrackSetting::Instrument(instrument) => track.instrument = instrument,
            TrackSetting::Volume(volume) => track.volume = volume,
            TrackSetting::Octave(octave) => track.octave = octave,
        }
    }

    fn rebuild_groove(&mut self) -> Result<(), SongError> {
        self.groove = Groove::new(
            self.settings.time_signature.beats,
            self.settings.ticks_per_beat,
            self.settings.subticks_per_tick,
            self.delays.clone(),
        )?;
        Ok(())
    }

    // Timing

    fn duration_ticks(&self, duration: Duration) -> Result<u32, SongError> {
        let ticks_per_crotchet = self.settings.ticks_per_crotchet()?;
        if ticks_per_crotchet % duration.divisor != 0 {
            return Err(SongError::timing(format!(
                "Duration {}/{} is not compatible with ticks per crotchet of {}",
                duration.beats, duration.divisor, ticks_per_crotchet
            )));
        }
        duration
            .beats
            .checked_mul(ticks_per_crotchet / duration.divisor)
            .ok_or_else(|| SongError::timing(format!("Duration {}/{} is too long", duration.beats, duration.divisor)))
    }

    fn advance(&mut self, ticks: u32) -> Result<u32, SongError> {
        let start = self.cursor.tick;
        self.cursor.tick = start
            .checked_add(ticks)
            .ok_or_else(|| SongError::timing("Song is too long"))?;
        Ok(start)
    }

    // Melody

    fn melody_note(&self, index: usize) -> Option<&ResolvedNote> {
        match self.track(TrackId::Melody).events().get(index) {
            Some(TrackEvent::Note(note)) => Some(note),
            _ => None,
        }
    }

    fn melody_note_mut(&mut self, index: usize) -> Option<&mut ResolvedNote> {
        match self.track_mut(TrackId::Melody).events_mut().get_mut(index) {
            Some(TrackEvent::Note(note)) => Some(note),
            _ => None,
        }
    }

    fn last_note(&self) -> Option<&ResolvedNote> {
        self.cursor.last_note.and_then(|index| self.melody_note(index))
    }

    fn resolve_note(&mut self, note: &Note, source: &SourceRegion) -> Result<(), SongError> {
        self.start_playing();
        let duration = note.duration.unwrap_or(self.cursor.current_duration);
        let last = self
            .last_note()
            .map(|last| (last.pitch, last.to_continue, last.continuation_start));

        let pitch = match last {
            Some((last_pitch, _, _)) => {
                valid_midi_note(find_next_note(last_pitch, note.semitone_offset(), note.ups)?)?
            }
            None => pitch_in_octave(self.track(TrackId::Melody).octave, note.semitone_offset())?,
        };
        let duration_ticks = self.duration_ticks(duration)?;
        let tick = self.advance(duration_ticks)?;
        self.cursor.current_duration = duration;

        let mut continued = note.continued;
        if self.cursor.tie_pending {
            if continued {
                return Err(SongError::continuation(
                    "Note unnecessarily marked to continue after preceding tie",
                ));
            }
            continued = true;
            self.cursor.tie_pending = false;
        }

        let index = self.track(TrackId::Melody).events().len();
        let mut continuation_start = index;
        match last {
            Some((last_pitch, to_continue, start)) if continued => {
                if !to_continue {
                    return Err(SongError::continuation(
                        "Note marked as continued, but previous note not marked as to continue",
                    ));
                }
                if last_pitch != pitch {
                    return Err(SongError::continuation(
                        "Continued note is not the same pitch as previous note",
                    ));
                }
                continuation_start = start;
                if let Some(first) = self.melody_note_mut(start) {
                    first.duration_ticks += duration_ticks;
                }
            }
            None if continued => {
                return Err(SongError::continuation(
                    "Note marked as continued, but there is no previous note",
                ));
            }
            Some((_, true, _)) => {
                return Err(SongError::continuation(
                    "Previous note marked to continue, but this note is not marked as continued",
                ));
            }
            _ => {}
        }

        self.track_mut(TrackId::Melody).add(TrackEvent::Note(ResolvedNote {
            pitch,
            tick,
            duration_ticks,
            to_continue: note.to_continue,
            continued,
            continuation_start,
            source: source.clone(),
        }));
        self.cursor.last_note = Some(index);
        Ok(())
    }

    fn resolve_rest(&mut self, rest: &Rest, source: &SourceRegion) -> Result<(), SongError> {
        self.start_playing();
        let awaiting_continuation = self.cursor.tie_pending || self.last_note().is_some_and(|note| note.to_continue);
        if awaiting_continuation {
            return Err(SongError::continuation(
                "Rest cannot follow a note that is marked to continue",
            ));
        }
        let duration_ticks = self.duration_ticks(rest.duration)?;
        let tick = self.advance(duration_ticks)?;
        self.cursor.current_duration = rest.duration;
        self.track_mut(TrackId::Melody).add(TrackEvent::Rest(ResolvedRest {
            tick,
            duration_ticks,
            source: source.clone(),
        }));
        Ok(())
    }

    fn resolve_tie(&mut self) -> Result<(), SongError> {
        self.start_playing();
        if self.cursor.tie_pending {
            return Err(SongError::continuation("Tie appears after previous tie"));
        }
        let index = self
            .cursor
            .last_note
            .ok_or_else(|| SongError::continuation("Tie appears, but there is no previous note"))?;
        let note = self
            .melody_note_mut(index)
            .ok_or_else(|| SongError::continuation("Tie appears, but there is no previous note"))?;
        if note.to_continue {
            return Err(SongError::continuation(
                "Tie appears, but last note already marked to continue",
            ));
        }
        note.to_continue = true;
        self.cursor.tie_pending = true;
        Ok(())
    }

    fn resolve_bar_line(&mut self) -> Result<(), SongError> {
        self.start_playing();
        let ticks_per_bar = self.ticks_per_bar();
        match self.cursor.last_bar_tick {
            None if self.cursor.tick > ticks_per_bar => {
                return Err(SongError::timing(format!(
                    "First partial bar is {} ticks long > {} ticks per bar",
                    self.cursor.tick, ticks_per_bar
                )));
            }
            Some(last_bar_tick) if self.cursor.tick - last_bar_tick != ticks_per_bar => {
                return Err(SongError::timing(format!(
                    "Completed bar is {} ticks long, but expected {} ticks",
                    self.cursor.tick - last_bar_tick,
                    ticks_per_bar
                )));
            }
            _ => {}
        }
        self.cursor.last_bar_tick = Some(self.cursor.tick);
        self.cursor.bar_ticks.push(self.cursor.tick);
        self.cursor.current_duration = Duration::UNIT;
        Ok(())
    }

    // Chords

    fn resolve_chord(&mut self, chord: &Chord, source: &SourceRegion) -> Result<(), SongError> {
        self.start_playing();
        self.finish_chord();

        let chord_octave = self.track(TrackId::Chord).octave;
        let pitches = match &chord.form {
            ChordForm::Empty => Vec::new(),
            ChordForm::Descriptor { root, descriptor } => {
                let root_pitch = pitch_in_octave(chord_octave, root.semitone_offset())? as i32;
                descriptor
                    .offsets()
                    .iter()
                    .map(|offset| valid_midi_note(root_pitch + offset))
                    .collect::<Result<Vec<u8>, SongError>>()?
            }
            ChordForm::Explicit(notes) => {
                let mut pitches: Vec<u8> = Vec::with_capacity(notes.len());
                for note in notes {
                    let pitch = match pitches.last() {
                        Some(&previous) => upward_from(previous, note.semitone_offset())?,
                        None => pitch_in_octave(chord_octave, note.semitone_offset())?,
                    };
                    pitches.push(pitch);
                }
                pitches
            }
        };
        let bass_octave = self.track(TrackId::Bass).octave;
        let bass_pitch = chord
            .bass
            .as_ref()
            .or_else(|| chord.root())
            .map(|bass| pitch_in_octave(bass_octave, bass.semitone_offset()))
            .transpose()?;

        let tick = self.cursor.tick;
        let index = self.track_mut(TrackId::Chord).add(TrackEvent::Chord(ResolvedChord {
            pitches,
            bass_pitch,
            tick,
            duration_ticks: None,
            source: source.clone(),
        }));
        self.cursor.last_chord = Some(index);
        Ok(())
    }

    /// Fix the duration of the open chord, and give it a bass note
    fn finish_chord(&mut self) {
        let Some(index) = self.cursor.last_chord.take() else {
            return;
        };
        let tick = self.cursor.tick;
        let bass = match self.track_mut(TrackId::Chord).events_mut().get_mut(index) {
            Some(TrackEvent::Chord(chord)) => {
                let duration_ticks = tick - chord.tick;
                chord.duration_ticks = Some(duration_ticks);
                chord.bass_pitch.map(|pitch| BassNote {
                    pitch,
                    tick: chord.tick,
                    duration_ticks,
                    source: chord.source.clone(),
                })
            }
            _ => None,
        };
        if let Some(bass) = bass {
            self.track_mut(TrackId::Bass).add(TrackEvent::Bass(bass));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ScaleNote;
    use crate::scale::RelativeScale;

    fn parse(text: &str) -> Result<Song, SongError> {
        Song::parse(&SourceFile::from_string("test_string", text))
    }

    fn continuation_song(body: &str) -> Result<Song, SongError> {
        parse(&format!("*song: ticks_per_beat=1, time_signature=4/4\n{}", body))
    }

    /// Durations of the notes that sound, i.e. excluding continued notes
    fn sounding_durations(body: &str) -> Vec<u32> {
        continuation_song(body)
            .unwrap()
            .track(TrackId::Melody)
            .notes()
            .filter(|note| !note.continued)
            .map(|note| note.duration_ticks)
            .collect()
    }

    fn assert_error(result: Result<Song, SongError>, message: &str, rest_of_line: &str) {
        let err = result.unwrap_err();
        assert_eq!(err.message(), message);
        assert_eq!(err.location().expect("error has a location").rest_of_line(), rest_of_line);
    }

    fn melody_pitches(song: &Song) -> Vec<u8> {
        song.track(TrackId::Melody).notes().map(|note| note.pitch).collect()
    }

    #[test]
    fn test_defaults() {
        let song = Song::new();
        assert_eq!(song.state(), SongState::Idle);
        assert_eq!(song.ticks_per_bar(), 16);
        assert_eq!(song.settings().tempo_bpm, 120);
        assert_eq!(song.settings().ticks_per_crotchet().unwrap(), 4);
        assert_eq!(song.groove().delays(), &[0]);
    }

    #[test]
    fn test_ticks_per_crotchet() {
        let settings = |beats, beat_type, ticks_per_beat| SongSettings {
            time_signature: TimeSignature { beats, beat_type },
            ticks_per_beat,
            ..SongSettings::default()
        };
        assert_eq!(settings(6, 8, 2).ticks_per_crotchet().unwrap(), 4);
        assert_eq!(settings(3, 4, 4).ticks_per_crotchet().unwrap(), 4);
        assert_eq!(settings(2, 2, 4).ticks_per_crotchet().unwrap(), 2);
        assert_eq!(
            settings(2, 2, 3).ticks_per_crotchet().unwrap_err().to_string(),
            "Ticks per beat 3 is not compatible with time signature 2/2"
        );
    }

    #[test]
    fn test_parse_song() {
        let song = parse(
            "\n\
             *song:         tempo_bpm=120, ticks_per_beat=4\n\
             *track.chord:  octave = 2, instrument=40\n\
             *track.bass:   octave = 1, volume=90\n\
             \n\
             [C] c e [:FAC] e ch ch | [G] g r2\n",
        )
        .unwrap();
        assert!(song.is_finished());
        assert_eq!(song.items().len(), 14);

        let chord_track = song.track(TrackId::Chord);
        assert_eq!(chord_track.instrument, 40);
        assert_eq!(song.track(TrackId::Bass).volume, 90);

        let chords: Vec<&ResolvedChord> = chord_track.chords().collect();
        assert_eq!(chords.len(), 3);
        assert_eq!(chords[0].pitches, vec![36, 40, 43]);
        assert_eq!(chords[1].bass_pitch, Some(29));
        assert_eq!(chords[0].duration_ticks, Some(8));
        assert_eq!(chords[1].duration_ticks, Some(8));
        assert_eq!(chords[2].duration_ticks, Some(12));

        assert_eq!(song.track(TrackId::Melody).notes().count(), 6);
        assert_eq!(song.track(TrackId::Bass).bass_notes().count(), 3);
        assert_eq!(song.tick(), 28);
        assert_eq!(song.bar_ticks(), &[16]);
    }

    #[test]
    fn test_melody_pitches() {
        let song = parse("c e g c' | b,, d'").unwrap();
        assert_eq!(melody_pitches(&song), vec![48, 52, 55, 60, 47, 50]);
    }

    #[test]
    fn test_melody_octave_seeds_first_note() {
        let song = parse("*track.melody: octave=5\na").unwrap();
        assert_eq!(melody_pitches(&song), vec![81]);
    }

    #[test]
    fn test_note_out_of_range() {
        let result = parse("*track.melody: octave=9\nc a'");
        assert_error(result, "Note number 129 > 127", "a'");
    }

    #[test]
    fn test_ambiguous_next_note() {
        assert_error(
            parse("f b"),
            "Can't decide next nearest note (6 semitones either way)",
            "b",
        );
    }

    #[test]
    fn test_chord_pitches() {
        let song = parse("[:CEG] [:C+EG+] [B] [B-] [:DFA] [:DFA/C] []").unwrap();
        let chords: Vec<&ResolvedChord> = song.track(TrackId::Chord).chords().collect();
        assert_eq!(chords[0].pitches, vec![24, 28, 31]);
        assert_eq!(chords[1].pitches, vec![25, 28, 32]);
        assert_eq!(chords[2].pitches, vec![35, 39, 42]);
        assert_eq!(chords[3].pitches, vec![34, 38, 41]);
        assert_eq!(chords[4].bass_pitch, Some(14));
        assert_eq!(chords[5].bass_pitch, Some(12));
        assert!(chords[6].pitches.is_empty());
        assert_eq!(chords[6].bass_pitch, None);
        // the empty chord has no bass note
        assert_eq!(song.track(TrackId::Bass).bass_notes().count(), 6);
    }

    #[test]
    fn test_chord_descriptors() {
        let song = parse("[C7] [Cm] [Cm7] [Cmaj7]").unwrap();
        let pitches: Vec<Vec<u8>> = song.track(TrackId::Chord).chords().map(|c| c.pitches.clone()).collect();
        assert_eq!(
            pitches,
            vec![vec![24, 28, 31, 34], vec![24, 27, 31], vec![24, 27, 31, 34], vec![24, 28, 31, 35]]
        );
    }

    #[test]
    fn test_bass_midi_note_zero() {
        let song = parse("*track.bass: octave=-1\n[C] c").unwrap();
        let bass: Vec<&BassNote> = song.track(TrackId::Bass).bass_notes().collect();
        assert_eq!(bass.len(), 1);
        assert_eq!(bass[0].pitch, 0);
        assert_eq!(bass[0].duration_ticks, 4);
    }

    #[test]
    fn test_cut() {
        let song = parse(
            "*song:         tempo_bpm=120, ticks_per_beat=4\n\
             | [C] c e\n\
             [:FAC] e\n\
             ! c | [G] r2\n",
        )
        .unwrap();
        let items: Vec<String> = song.items().iter().map(|item| item.value.unparse()).collect();
        assert_eq!(items, vec!["*song: tempo_bpm=120, ticks_per_beat=4", "c", "|", "[G]", "r2"]);
        assert_eq!(song.state(), SongState::Finished);
        assert_eq!(melody_pitches(&song), vec![48]);
        assert_eq!(song.track(TrackId::Chord).chords().count(), 1);
        assert_eq!(song.bar_ticks(), &[4]);
    }

    #[test]
    fn test_cut_resets_default_duration() {
        let song = parse("c2 ! d").unwrap();
        let durations: Vec<u32> = song.track(TrackId::Melody).notes().map(|note| note.duration_ticks).collect();
        assert_eq!(durations, vec![4]);
    }

    #[test]
    fn test_cut_drops_pending_tie() {
        let song = parse("c ~ ! c d").unwrap();
        let continued: Vec<bool> = song.track(TrackId::Melody).notes().map(|note| note.continued).collect();
        assert_eq!(continued, vec![false, false]);
        assert!(song.track(TrackId::Melody).notes().all(|note| !note.to_continue));
        assert_eq!(song.tick(), 8);
    }

    #[test]
    fn test_commands_after_playing() {
        assert_error(
            parse("c d\n*song: tempo_bpm=80"),
            "Cannot perform operation once song is playing",
            "*song: tempo_bpm=80",
        );
        // a cut does not make the song idle again
        assert_error(
            parse("c d !\n*track.melody: octave=4"),
            "Cannot perform operation once song is playing",
            "*track.melody: octave=4",
        );
    }

    #[test]
    fn test_no_continuations() {
        assert_eq!(sounding_durations("| a b b c | d e2 e1 |"), vec![1, 1, 1, 1, 1, 2, 1]);
    }

    #[test]
    fn test_valid_continuations() {
        assert_eq!(sounding_durations("| b ~ b b c | c e2 e1 |"), vec![2, 1, 1, 1, 2, 1]);
        assert_eq!(sounding_durations("| b~ ~b b c | c e2 e1 |"), vec![2, 1, 1, 1, 2, 1]);
        assert_eq!(sounding_durations("| b~ ~b ~ b c | c e2 e1 |"), vec![3, 1, 1, 2, 1]);
        assert_eq!(sounding_durations("| b~ ~b~ ~b c | c e2 e1 |"), vec![3, 1, 1, 2, 1]);
        assert_eq!(sounding_durations("| b b b c~ | ~c e2 e1 |"), vec![1, 1, 1, 2, 2, 1]);
        assert_eq!(sounding_durations("| b ~ b b c | c e2 ~ e1 |"), vec![2, 1, 1, 1, 3]);
        assert_eq!(sounding_durations("| b ~ b b c | ~ c e2~ ~e1 |"), vec![2, 1, 2, 3]);
    }

    #[test]
    fn test_continuation_chain_start() {
        let song = continuation_song("b~ ~b~ ~b c").unwrap();
        let starts: Vec<usize> = song
            .track(TrackId::Melody)
            .notes()
            .map(|note| note.continuation_start)
            .collect();
        assert_eq!(starts, vec![0, 0, 0, 3]);
    }

    #[test]
    fn test_invalid_continuations() {
        assert_error(
            continuation_song("| a b b c | d e2 ~ ~ e1 |"),
            "Tie appears after previous tie",
            "~ e1 |",
        );
        assert_error(
            continuation_song("| a b b c | d e2 ~ ~e1 |"),
            "Note unnecessarily marked to continue after preceding tie",
            "~e1 |",
        );
        assert_error(
            continuation_song("~ | a b b c | d e2 e1 |"),
            "Tie appears, but there is no previous note",
            "~ | a b b c | d e2 e1 |",
        );
        assert_error(
            continuation_song("| a ~b b c | d e2 e1 |"),
            "Note marked as continued, but previous note not marked as to continue",
            "~b b c | d e2 e1 |",
        );
        assert_error(
            continuation_song("| ~a b b c | d e2 e1 |"),
            "Note marked as continued, but there is no previous note",
            "~a b b c | d e2 e1 |",
        );
        assert_error(
            continuation_song("| b~ ~b~ b c | d e2 e1 |"),
            "Previous note marked to continue, but this note is not marked as continued",
            "b c | d e2 e1 |",
        );
        assert_error(
            continuation_song("| a~ ~b b c | d e2 e1 |"),
            "Continued note is not the same pitch as previous note",
            "~b b c | d e2 e1 |",
        );
        assert_error(
            continuation_song("| a ~ b b c | d e2 e1 |"),
            "Continued note is not the same pitch as previous note",
            "b b c | d e2 e1 |",
        );
        assert_error(
            continuation_song("| a b b c~ | ~d e2 e1 |"),
            "Continued note is not the same pitch as previous note",
            "~d e2 e1 |",
        );
        assert_error(
            continuation_song("| a b~ ~b~ ~ c |"),
            "Tie appears, but last note already marked to continue",
            "~ c |",
        );
    }

    #[test]
    fn test_continuation_into_rest_or_end() {
        assert_error(
            continuation_song("| a b c~ r1 |"),
            "Rest cannot follow a note that is marked to continue",
            "r1 |",
        );
        assert_error(
            continuation_song("| a b c d~"),
            "Song ends with a note marked to continue",
            "d~",
        );
        assert_error(
            continuation_song("| a b c d ~"),
            "Song ends with a note marked to continue",
            "d ~",
        );
    }

    #[test]
    fn test_rest_with_leading_tie_marker() {
        let song = parse("c ~r2 d1").unwrap();
        assert_eq!(melody_pitches(&song), vec![48, 50]);
        assert_eq!(song.tick(), 16);
        assert_error(
            continuation_song("| a b c~ ~r1 |"),
            "Rest cannot follow a note that is marked to continue",
            "~r1 |",
        );
    }

    #[test]
    fn test_rests_keep_their_ticks() {
        let song = parse("c r2 d1 | rh e rh").unwrap();
        let rests: Vec<(u32, u32)> = song
            .track(TrackId::Melody)
            .rests()
            .map(|rest| (rest.tick, rest.duration_ticks))
            .collect();
        assert_eq!(rests, vec![(4, 8), (16, 2), (20, 2)]);
        assert_eq!(melody_pitches(&song), vec![48, 50, 52]);
    }

    #[test]
    fn test_bar_lengths() {
        assert_error(
            continuation_song("a b c d e | f g a b |"),
            "First partial bar is 5 ticks long > 4 ticks per bar",
            "| f g a b |",
        );
        assert_error(
            continuation_song("| a b c | d e f g |"),
            "Completed bar is 3 ticks long, but expected 4 ticks",
            "| d e f g |",
        );
        assert_error(
            continuation_song("| a b c d | e f g a b"),
            "Last part bar has 5 ticks > 4 ticks per bar",
            "b",
        );
        assert!(continuation_song("c d | e f g a | b").is_ok());
    }

    #[test]
    fn test_default_duration() {
        let song = parse("| a2 b | c rh d c2 | f").unwrap();
        let durations: Vec<u32> = song
            .track(TrackId::Melody)
            .notes()
            .map(|note| note.duration_ticks)
            .collect();
        // carried from note to note and from rests, reset at bar lines
        assert_eq!(durations, vec![8, 8, 4, 2, 8, 4]);
    }

    #[test]
    fn test_incompatible_duration() {
        assert_error(
            continuation_song("| a b ch ch c |"),
            "Duration 1/2 is not compatible with ticks per crotchet of 1",
            "ch ch c |",
        );
    }

    #[test]
    fn test_time_signatures() {
        let song = parse("*song: time_signature=3/4\n| c d e | f g a |").unwrap();
        assert_eq!(song.ticks_per_bar(), 12);
        assert_eq!(song.bar_ticks(), &[0, 12, 24]);

        // a crotchet is two quavers in 6/8
        let song = parse("*song: time_signature=6/8, ticks_per_beat=1\n| c d e | f g a |").unwrap();
        assert_eq!(song.ticks_per_bar(), 6);

        let song = parse("*song: time_signature=6/8, ticks_per_beat=1\n| c. d. | eh fh gh c. |");
        assert!(song.is_ok());

        assert_error(
            parse("*song: time_signature=2/2, ticks_per_beat=3"),
            "Ticks per beat 3 is not compatible with time signature 2/2",
            "ticks_per_beat=3",
        );
    }

    #[test]
    fn test_groove_validation() {
        let song = parse("*song: ticks_per_beat=2, subticks_per_tick=10, time_signature=3/4\n*groove: 0 3\nc").unwrap();
        assert_eq!(song.groove().get_subticks(23), 233);

        assert_error(
            parse("*groove: 0 1 2\nc"),
            "Groove has 3 delays, which does not divide 16 ticks per bar",
            "*groove: 0 1 2",
        );
        assert_error(
            parse("*groove: 0 1 2 3 4 5 6 7\n*song: ticks_per_beat=3"),
            "Groove has 8 delays, which does not divide 12 ticks per bar",
            "ticks_per_beat=3",
        );
    }

    #[test]
    fn test_scale_positions() {
        let song = parse("*song: scale=c3 major\nc d e f+ | g2 ~ g2 |").unwrap();
        assert_eq!(song.scale_positions(), Some(vec![Some(0), Some(1), Some(2), None, Some(4)]));
        assert_eq!(
            song.settings().scale,
            Some(Scale::new(ScaleNote::new(0, 0).with_octave(3), RelativeScale::Major).unwrap())
        );
        assert_eq!(parse("c d").unwrap().scale_positions(), None);
    }

    #[test]
    fn test_add_after_finish() {
        let mut song = parse("c d").unwrap();
        let item = Located::new(SongItem::BarLine, SourceRegion::from_text("more", "|"));
        let err = song.add(item).unwrap_err();
        assert_eq!(err.message(), "Song is already finished");
        assert!(song.finish().is_err());
    }

    #[test]
    fn test_empty_song() {
        let song = parse("\n\n").unwrap();
        assert!(song.is_finished());
        assert_eq!(song.tick(), 0);
        assert!(song.items().is_empty());
    }
}
