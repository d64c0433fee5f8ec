//! # Command Grammar
//!
//! Commands configure the song before it starts playing. A command takes a whole line:
//!
//! ```text
//! *song:         tempo_bpm=120, ticks_per_beat=4, time_signature=3/4
//! *track.chord:  octave = 2, instrument=40
//! *groove:       0 3 0 -2
//! ```
//!
//! ## Song Settings
//! | Key                 | Value                                  |
//! |---------------------|----------------------------------------|
//! | `tempo_bpm`         | 1 to 1000                              |
//! | `time_signature`    | `N/D`, N from 1 to 32, D in 2 4 8 16 32 |
//! | `ticks_per_beat`    | 1 to 2000                              |
//! | `subticks_per_tick` | 1 to 100                               |
//! | `transpose`         | -127 to 127                            |
//! | `scale`             | root with octave, then `major` or `minor` |
//!
//! ## Track Settings
//! | Key          | Value      |
//! |--------------|------------|
//! | `instrument` | 0 to 127   |
//! | `volume`     | 0 to 127   |
//! | `octave`     | -1 to 10   |

use std::sync::OnceLock;

use regex::Regex;

use super::{compiled, invalid, match_token, parse_scale_note};
use crate::ast::{Command, SongSetting, TimeSignature, TrackSetting};
use crate::error::SongError;
use crate::region::{Located, SourceRegion};
use crate::scale::{RelativeScale, Scale};
use crate::track::TrackId;

const COMMAND_PATTERN: &str =
    r"^\*(?P<name>[A-Za-z_]+)(?:\.(?P<qualifier>[A-Za-z_]*))?\s*:(?P<body>.*)$";

const VALUE_SETTING_PATTERN: &str = r"^(?P<key>[^=\s]+)\s*=\s*(?P<value>.*)$";

const COMMA_RUN_PATTERN: &str = r",(?:\s*,)*";

const TIME_SIGNATURE_PATTERN: &str = r"^(?P<beats>[0-9]+)/(?P<beat_type>[0-9]+)$";

const SCALE_PATTERN: &str = r"^(?P<root>\S+)\s+(?P<kind>\S+)$";

static COMMAND_REGEX: OnceLock<Regex> = OnceLock::new();
static VALUE_SETTING_REGEX: OnceLock<Regex> = OnceLock::new();
static COMMA_RUN_REGEX: OnceLock<Regex> = OnceLock::new();
static TIME_SIGNATURE_REGEX: OnceLock<Regex> = OnceLock::new();
static SCALE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Inclusive integer bounds for a setting value
#[derive(Debug, Clone, Copy)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
}

impl IntRange {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    fn invalid(&self, key: &str, shown: String, region: &SourceRegion) -> SongError {
        SongError::range(format!(
            "Invalid value for {}: {} - must be an integer from {} to {}",
            key, shown, self.min, self.max
        ))
        .at(region)
    }

    /// Parse and bounds-check `region` as the value of `key`
    pub fn parse(&self, key: &str, region: &SourceRegion) -> Result<i64, SongError> {
        let text = region.value();
        let value: i64 = text
            .parse()
            .map_err(|_| self.invalid(key, format!("'{}'", text), region))?;
        if value < self.min || value > self.max {
            return Err(self.invalid(key, value.to_string(), region));
        }
        Ok(value)
    }
}

pub const TEMPO_BPM_RANGE: IntRange = IntRange::new(1, 1000);
pub const TICKS_PER_BEAT_RANGE: IntRange = IntRange::new(1, 2000);
pub const SUBTICKS_PER_TICK_RANGE: IntRange = IntRange::new(1, 100);
pub const TRANSPOSE_RANGE: IntRange = IntRange::new(-127, 127);
pub const INSTRUMENT_RANGE: IntRange = IntRange::new(0, 127);
pub const VOLUME_RANGE: IntRange = IntRange::new(0, 127);
pub const OCTAVE_RANGE: IntRange = IntRange::new(-1, 10);
pub const TIME_SIGNATURE_BEATS_RANGE: IntRange = IntRange::new(1, 32);

fn parse_time_signature(region: &SourceRegion) -> Result<TimeSignature, SongError> {
    let invalid_value = || {
        SongError::range(format!(
            "Invalid value for time_signature: '{}' - must be N/D with N from {} to {} and D one of 2, 4, 8, 16, 32",
            region.value(),
            TIME_SIGNATURE_BEATS_RANGE.min,
            TIME_SIGNATURE_BEATS_RANGE.max
        ))
        .at(region)
    };
    let regex = compiled(&TIME_SIGNATURE_REGEX, TIME_SIGNATURE_PATTERN);
    let captures = regex.captures(region.value()).ok_or_else(invalid_value)?;
    let beats: u32 = captures["beats"].parse().map_err(|_| invalid_value())?;
    let beat_type: u32 = captures["beat_type"].parse().map_err(|_| invalid_value())?;
    let beats_in_range = (TIME_SIGNATURE_BEATS_RANGE.min..=TIME_SIGNATURE_BEATS_RANGE.max).contains(&(beats as i64));
    if !beats_in_range || !TimeSignature::BEAT_TYPES.contains(&beat_type) {
        return Err(invalid_value());
    }
    Ok(TimeSignature { beats, beat_type })
}

fn parse_scale(region: &SourceRegion) -> Result<Scale, SongError> {
    let invalid_value = || {
        SongError::grammar(format!(
            "Invalid value for scale: '{}' - must be a root note with octave followed by major or minor",
            region.value()
        ))
        .at(region)
    };
    let regex = compiled(&SCALE_REGEX, SCALE_PATTERN);
    let captures = regex.captures(region.value()).ok_or_else(invalid_value)?;
    let root = region.group(&captures, "root").ok_or_else(invalid_value)?;
    let kind = RelativeScale::from_name(&captures["kind"]).ok_or_else(invalid_value)?;
    let root = parse_scale_note(&root)?;
    Scale::new(root, kind).map_err(|e| e.or_at(region))
}

/// Parse the value of one song setting
pub fn parse_song_setting(key: &SourceRegion, value: &SourceRegion) -> Result<SongSetting, SongError> {
    let name = key.value();
    let setting = match name {
        "tempo_bpm" => SongSetting::TempoBpm(TEMPO_BPM_RANGE.parse(name, value)? as u32),
        "time_signature" => SongSetting::TimeSignature(parse_time_signature(value)?),
        "ticks_per_beat" => SongSetting::TicksPerBeat(TICKS_PER_BEAT_RANGE.parse(name, value)? as u32),
        "subticks_per_tick" => {
            SongSetting::SubticksPerTick(SUBTICKS_PER_TICK_RANGE.parse(name, value)? as u32)
        }
        "transpose" => SongSetting::Transpose(TRANSPOSE_RANGE.parse(name, value)? as i32),
        "scale" => SongSetting::Scale(parse_scale(value)?),
        _ => {
            return Err(SongError::state(format!("Invalid value key for song: '{}'", name)).at(key));
        }
    };
    Ok(setting)
}

/// Parse the value of one track setting
pub fn parse_track_setting(key: &SourceRegion, value: &SourceRegion) -> Result<TrackSetting, SongError> {
    let name = key.value();
    let setting = match name {
        "instrument" => TrackSetting::Instrument(INSTRUMENT_RANGE.parse(name, value)? as u8),
        "volume" => TrackSetting::Volume(VOLUME_RANGE.parse(name, value)? as u8),
        "octave" => TrackSetting::Octave(OCTAVE_RANGE.parse(name, value)? as i32),
        _ => {
            return Err(SongError::state(format!("Invalid value key for track: '{}'", name)).at(key));
        }
    };
    Ok(setting)
}

/// Parse one `key = value` region with the given per-key value parser
pub fn parse_value_setting<T>(
    region: &SourceRegion,
    parse_value: impl Fn(&SourceRegion, &SourceRegion) -> Result<T, SongError>,
) -> Result<Located<T>, SongError> {
    let captures = match_token(
        region,
        compiled(&VALUE_SETTING_REGEX, VALUE_SETTING_PATTERN),
        "value setting",
    )?;
    let key = region
        .group(&captures, "key")
        .ok_or_else(|| invalid("value setting", region))?;
    let value = region
        .group(&captures, "value")
        .ok_or_else(|| invalid("value setting", region))?
        .trimmed();
    let setting = parse_value(&key, &value)?;
    Ok(Located::new(setting, region.clone()))
}

/// Parse a comma-separated list of `key=value` settings. A blank body is an empty list.
pub fn parse_value_settings<T>(
    body: &SourceRegion,
    parse_value: impl Fn(&SourceRegion, &SourceRegion) -> Result<T, SongError>,
) -> Result<Vec<Located<T>>, SongError> {
    let empty_setting = |run: &SourceRegion| SongError::grammar("Empty value setting").at(run);
    let regex = compiled(&COMMA_RUN_REGEX, COMMA_RUN_PATTERN);

    let mut settings = Vec::new();
    let mut segment_start = 0;
    let mut last_run = None;
    for m in regex.find_iter(body.value()) {
        let run = body.of_match(m);
        let segment = body.slice(segment_start, m.start()).trimmed();
        if segment.is_empty() || m.as_str().matches(',').count() > 1 {
            return Err(empty_setting(&run));
        }
        settings.push(parse_value_setting(&segment, &parse_value)?);
        segment_start = m.end();
        last_run = Some(run);
    }

    let segment = body.remaining(segment_start).trimmed();
    match (segment.is_empty(), last_run) {
        (true, Some(run)) => Err(empty_setting(&run)),
        (true, None) => Ok(settings),
        (false, _) => {
            settings.push(parse_value_setting(&segment, &parse_value)?);
            Ok(settings)
        }
    }
}

/// Parse the delays of a `*groove:` command
pub fn parse_groove_delays(body: &SourceRegion) -> Result<Vec<i32>, SongError> {
    let words = body.words();
    if words.is_empty() {
        return Err(SongError::timing("Groove must have at least one delay").at(body));
    }
    words
        .iter()
        .map(|word| {
            word.value()
                .parse::<i32>()
                .map_err(|_| SongError::grammar(format!("Invalid groove delay: '{}'", word.value())).at(word))
        })
        .collect()
}

fn reject_qualifier(name: &str, qualifier: Option<SourceRegion>) -> Result<(), SongError> {
    match qualifier {
        Some(qualifier) => Err(SongError::grammar(format!(
            "Command {} does not take a qualifier: '{}'",
            name,
            qualifier.value()
        ))
        .at(&qualifier)),
        None => Ok(()),
    }
}

/// Parse a command line, starting at its `*`
pub fn parse_command(region: &SourceRegion) -> Result<Located<Command>, SongError> {
    let captures = match_token(region, compiled(&COMMAND_REGEX, COMMAND_PATTERN), "command")?;
    let name = region
        .group(&captures, "name")
        .ok_or_else(|| invalid("command", region))?;
    let qualifier = region.group(&captures, "qualifier");
    let body = region
        .group(&captures, "body")
        .ok_or_else(|| invalid("command", region))?;

    let command = match name.value() {
        "song" => {
            reject_qualifier("song", qualifier)?;
            Command::Song(parse_value_settings(&body, parse_song_setting)?)
        }
        "track" => {
            let qualifier = qualifier
                .ok_or_else(|| SongError::state("Command track requires a track qualifier").at(&name))?;
            let track = TrackId::from_name(qualifier.value()).ok_or_else(|| {
                SongError::state(format!("Unknown track: '{}'", qualifier.value())).at(&qualifier)
            })?;
            Command::Track {
                track,
                settings: parse_value_settings(&body, parse_track_setting)?,
            }
        }
        "groove" => {
            reject_qualifier("groove", qualifier)?;
            Command::Groove(parse_groove_delays(&body)?)
        }
        other => {
            return Err(SongError::state(format!("Unknown command: '{}'", other)).at(&name));
        }
    };
    Ok(Located::new(command, region.clone()))
}
