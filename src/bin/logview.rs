use chrono::{DateTime, Utc};
use clap::Parser;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use structured_logger::{ConsoleTransport, ErrorInfo, LogContext, LogEntry, LogLevel};

#[derive(Parser)]
#[command(name = "logview")]
#[command(about = "Render and filter JSON-lines log files", long_about = None)]
struct Cli {
    /// Minimum level to show (debug, info, warn, error)
    #[arg(short, long, default_value = "debug")]
    level: LogLevel,

    /// Only show entries whose raw line contains this text
    #[arg(short, long)]
    grep: Option<String>,

    /// Print matching lines as stored instead of rendering them
    #[arg(long)]
    json: bool,

    #[arg(long)]
    no_color: bool,

    /// Hide timestamps in rendered output
    #[arg(long)]
    no_timestamp: bool,

    /// Log files; standard input when omitted
    files: Vec<PathBuf>,
}

/// Parse a file-transport record (`{timestamp, level, message, data}`) or a
/// serialized `LogEntry` (console JSON output, remote batches)
fn parse_line(line: &str) -> Option<LogEntry> {
    let value: Value = serde_json::from_str(line).ok()?;
    let object = value.as_object()?;

    if !object.contains_key("data") {
        return serde_json::from_value(value).ok();
    }

    let level: LogLevel = object.get("level")?.as_str()?.parse().ok()?;
    let message = object.get("message").and_then(Value::as_str).unwrap_or_default();
    let timestamp = object
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc))?;

    let mut data = object
        .get("data")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_else(Map::new);
    let error = data
        .remove("error")
        .and_then(|e| serde_json::from_value::<ErrorInfo>(e).ok());
    let duration = data.remove("duration").and_then(|d| d.as_f64());
    let labels = data
        .remove("labels")
        .and_then(|l| serde_json::from_value(l).ok())
        .unwrap_or_default();

    let context: LogContext = data.into_iter().collect();
    let mut entry = LogEntry::new(level, message)
        .with_timestamp(timestamp)
        .with_context(context)
        .with_labels(labels);
    if let Some(error) = error {
        entry = entry.with_error(error);
    }
    if let Some(duration) = duration {
        entry = entry.with_duration(duration);
    }
    Some(entry)
}

struct Stats {
    shown: usize,
    unparsed: usize,
}

fn view<R: BufRead, W: Write>(
    cli: &Cli,
    console: &ConsoleTransport,
    reader: R,
    out: &mut W,
    stats: &mut Stats,
) -> Result<(), Box<dyn std::error::Error>> {
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let Some(entry) = parse_line(&line) else {
            stats.unparsed += 1;
            continue;
        };

        if entry.level() < cli.level {
            continue;
        }
        if let Some(needle) = &cli.grep {
            if !line.contains(needle.as_str()) {
                continue;
            }
        }

        if cli.json {
            writeln!(out, "{}", line)?;
        } else {
            writeln!(out, "{}", console.format(&entry)?)?;
        }
        stats.shown += 1;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let console = ConsoleTransport::new()
        .with_colors(!cli.no_color)
        .with_timestamp(!cli.no_timestamp);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut stats = Stats { shown: 0, unparsed: 0 };

    if cli.files.is_empty() {
        view(&cli, &console, io::stdin().lock(), &mut out, &mut stats)?;
    } else {
        for path in &cli.files {
            let file = File::open(path)
                .map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
            view(&cli, &console, BufReader::new(file), &mut out, &mut stats)?;
        }
    }

    if stats.unparsed > 0 {
        eprintln!("logview: skipped {} lines that are not log records", stats.unparsed);
    }
    if stats.shown == 0 {
        eprintln!("logview: no matching entries");
    }
    Ok(())
}
