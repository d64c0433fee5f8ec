//! melody-script CLI - compile a song script and print its rendered events

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, Level};

use melody_script::playback::{record, Recording, RenderOptions};
use melody_script::compile_file;

/// Compile a song script into timed melody, chord and bass events
#[derive(Parser)]
#[command(name = "melody-script")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Song script to compile
    song_file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Write the output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Silence before the first note, in seconds
    #[arg(long, default_value_t = 0.0)]
    initial_delay: f64,

    /// Log more (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

fn serialize(recording: &Recording, format: Format) -> Result<String> {
    let text = match format {
        Format::Json => serde_json::to_string_pretty(recording).context("Failed to write JSON")?,
        Format::Yaml => serde_yaml::to_string(recording).context("Failed to write YAML")?,
    };
    Ok(text)
}

fn run(cli: &Cli) -> Result<()> {
    // song errors carry their own multi-line report
    let song = compile_file(&cli.song_file).map_err(|e| anyhow!("{}", e.report()))?;
    let options = RenderOptions::with_initial_delay(cli.initial_delay);
    let recording = record(&song, &options).map_err(|e| anyhow!("{}", e.diagnostic()))?;
    let text = serialize(&recording, cli.format)?;

    match &cli.output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Error writing to '{}'", path.display()))?;
            debug!(path = %path.display(), "wrote recording");
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(song_file: PathBuf, format: Format, output: Option<PathBuf>) -> Cli {
        Cli {
            song_file,
            format,
            output,
            initial_delay: 0.0,
            verbose: 0,
        }
    }

    #[test]
    fn test_run_writes_output_file() {
        let dir = TempDir::new().unwrap();
        let song_file = dir.path().join("tune.song");
        let output = dir.path().join("tune.yaml");
        fs::write(&song_file, "c d e f").unwrap();

        run(&cli(song_file, Format::Yaml, Some(output.clone()))).unwrap();
        let text = fs::read_to_string(output).unwrap();
        assert!(text.contains("resolution: 4"));
        assert!(text.contains("type: noteOn"));
    }

    #[test]
    fn test_run_reports_song_diagnostic() {
        let dir = TempDir::new().unwrap();
        let song_file = dir.path().join("bad.song");
        fs::write(&song_file, "c d e f g |").unwrap();

        let err = run(&cli(song_file.clone(), Format::Json, None)).unwrap_err();
        let message = "First partial bar is 20 ticks long > 16 ticks per bar";
        let expected = format!(
            "{}:1:{}\n\nc d e f g |\n          ^\n          {}",
            song_file.display(),
            message,
            message
        );
        assert_eq!(format!("{:#}", err), expected);
    }

    #[test]
    fn test_run_reports_write_failure() {
        let dir = TempDir::new().unwrap();
        let song_file = dir.path().join("tune.song");
        fs::write(&song_file, "c").unwrap();
        let output = dir.path().join("missing").join("tune.json");

        let err = run(&cli(song_file, Format::Json, Some(output.clone()))).unwrap_err();
        let report = format!("{:#}", err);
        assert!(report.starts_with(&format!("Error writing to '{}': ", output.display())));
    }
}
