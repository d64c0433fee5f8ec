//! Render engine
//!
//! Walks the resolved events of each track and turns them into note-on/note-off
//! calls at subtick times, applying the groove, the initial delay and the song's
//! transposition.

use tracing::info;

use super::sink::{EventRecorder, TrackSink};
use super::types::{RenderOptions, Recording};
use crate::error::SongError;
use crate::groove::Groove;
use crate::pitch::valid_midi_note;
use crate::song::Song;
use crate::track::{Track, TrackEvent, TrackId};

/// Adapts one track's events onto a sink
struct TrackRenderer<'a, S: TrackSink> {
    sink: &'a mut S,
    groove: &'a Groove,
    initial_delay: i64,
    transpose: i32,
    velocity: u8,
}

impl<S: TrackSink> TrackRenderer<'_, S> {
    fn time(&self, tick: u32) -> i64 {
        self.groove.get_subticks(tick) + self.initial_delay
    }

    fn add_note(&mut self, pitch: u8, tick: u32, duration_ticks: u32) -> Result<(), SongError> {
        self.add_notes(&[pitch], tick, duration_ticks)
    }

    /// All pitches start and stop together
    fn add_notes(&mut self, pitches: &[u8], tick: u32, duration_ticks: u32) -> Result<(), SongError> {
        let pitches = pitches
            .iter()
            .map(|&pitch| valid_midi_note(pitch as i32 + self.transpose))
            .collect::<Result<Vec<u8>, SongError>>()?;
        let on = self.time(tick);
        let off = self.time(tick + duration_ticks);
        for &pitch in &pitches {
            self.sink.note_on(pitch, on, self.velocity);
        }
        for &pitch in &pitches {
            self.sink.note_off(pitch, off);
        }
        Ok(())
    }

    fn add_event(&mut self, event: &TrackEvent) -> Result<(), SongError> {
        match event {
            TrackEvent::Note(note) if note.continued => Ok(()),
            TrackEvent::Rest(_) => Ok(()),
            TrackEvent::Note(note) => self.add_note(note.pitch, note.tick, note.duration_ticks),
            TrackEvent::Chord(chord) => {
                let duration_ticks = chord
                    .duration_ticks
                    .ok_or_else(|| SongError::state("Chord has not been finished"))?;
                self.add_notes(&chord.pitches, chord.tick, duration_ticks)
            }
            TrackEvent::Bass(bass) => self.add_note(bass.pitch, bass.tick, bass.duration_ticks),
        }
    }
}

fn render_track<S: TrackSink>(
    song: &Song,
    track: &Track,
    initial_delay: i64,
    sink: &mut S,
) -> Result<(), SongError> {
    sink.set_tempo(0, song.settings().tempo_bpm);
    sink.set_instrument(0, track.instrument);
    let mut renderer = TrackRenderer {
        sink,
        groove: song.groove(),
        initial_delay,
        transpose: song.settings().transpose,
        velocity: track.volume,
    };
    for event in track.events() {
        renderer
            .add_event(event)
            .map_err(|e| e.or_at(event.source()))?;
    }
    Ok(())
}

/// Initial delay in subticks, at the song's tempo
pub fn initial_delay_subticks(song: &Song, options: &RenderOptions) -> i64 {
    (options.initial_delay_seconds * song.settings().subticks_per_second()).round() as i64
}

/// Render a finished song, one sink per track.
///
/// `new_sink` is called with each track id and its channel, in the order melody,
/// chord, bass. Fails if the song is not finished, or if transposing takes a pitch
/// out of range (located at the item that produced the pitch).
pub fn render<S, F>(song: &Song, options: &RenderOptions, mut new_sink: F) -> Result<Vec<S>, SongError>
where
    S: TrackSink,
    F: FnMut(TrackId, u8) -> S,
{
    if !song.is_finished() {
        return Err(SongError::state("Song must be finished before it is rendered"));
    }
    let initial_delay = initial_delay_subticks(song, options);
    song.tracks()
        .map(|track| {
            let mut sink = new_sink(track.id(), track.id().channel());
            render_track(song, track, initial_delay, &mut sink)?;
            Ok(sink)
        })
        .collect()
}

/// Render a finished song into memory
pub fn record(song: &Song, options: &RenderOptions) -> Result<Recording, SongError> {
    let recorders = render(song, options, EventRecorder::new)?;
    let tracks: Vec<_> = recorders.into_iter().map(EventRecorder::into_track).collect();
    let resolution = song.settings().subticks_per_beat();
    info!(
        tracks = tracks.len(),
        events = tracks.iter().map(|track| track.events.len()).sum::<usize>(),
        resolution,
        "rendered song"
    );
    Ok(Recording {
        resolution,
        subticks_per_second: song.settings().subticks_per_second(),
        ticks: song.tick(),
        tracks,
    })
}
