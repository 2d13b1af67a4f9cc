//! Insync status via its command-line client

use chrono::{DateTime, Utc};
use std::path::Path;
use std::process::Command;
use thiserror::Error;

use crate::config::{InsyncConfig, Palette};
use crate::format::{self, FormatValue, Lookup};
use crate::response::ModuleResponse;

#[derive(Debug, Error)]
pub enum InsyncError {
    #[error("Failed to run {binary}: {source}")]
    SpawnError {
        binary: String,
        source: std::io::Error,
    },
    #[error("{binary} {subcommand} exited with {status}")]
    ExitError {
        binary: String,
        subcommand: &'static str,
        status: std::process::ExitStatus,
    },
}

const STATUS_SUBCOMMAND: &str = "get_status";
const PROGRESS_SUBCOMMAND: &str = "get_sync_progress";

/// Status reported while Insync is idle and in sync
const SHARE_STATUS: &str = "SHARE";
const SHARE_DISPLAY: &str = "INSYNC";
const OFFLINE_STATUS: &str = "OFFLINE";

/// Run one insync subcommand and return its stdout
fn run_insync(binary: &Path, subcommand: &'static str) -> Result<String, InsyncError> {
    let output = Command::new(binary)
        .arg(subcommand)
        .output()
        .map_err(|source| InsyncError::SpawnError {
            binary: binary.display().to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(InsyncError::ExitError {
            binary: binary.display().to_string(),
            subcommand,
            status: output.status,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Map `get_status` output to the displayed status and its colour
pub fn parse_status(stdout: &str, palette: &Palette) -> (String, String) {
    let status = stdout.trim();
    match status {
        OFFLINE_STATUS => (status.to_string(), palette.bad.clone()),
        SHARE_STATUS => (SHARE_DISPLAY.to_string(), palette.good.clone()),
        _ => (status.to_string(), palette.degraded.clone()),
    }
}

/// Extract the queued file count from `get_sync_progress` output
///
/// The count is the first word of the last line, when that line mentions
/// `queued`. Anything else yields an empty string.
pub fn parse_queued(stdout: &str) -> String {
    let pieces: Vec<&str> = stdout.split('\n').collect();
    if pieces.len() <= 2 {
        return String::new();
    }

    let line = pieces[pieces.len() - 2];
    if !line.contains("queued") {
        return String::new();
    }

    line.split(' ').next().unwrap_or_default().to_string()
}

/// Render the status line from raw command outputs
pub fn render(
    status_out: &str,
    progress_out: &str,
    config: &InsyncConfig,
    palette: &Palette,
    now: DateTime<Utc>,
) -> ModuleResponse {
    let (status, color) = parse_status(status_out, palette);
    let queued = parse_queued(progress_out);

    let full_text = format::render(&config.format, |name| match name {
        "status" => Lookup::Value(FormatValue::Text(status.clone())),
        "queued" => Lookup::Value(FormatValue::Text(queued.clone())),
        _ => Lookup::Unknown,
    });

    ModuleResponse::new(full_text, color, now, config.cache_timeout)
}

fn query(config: &InsyncConfig) -> Result<(String, String), InsyncError> {
    let status = run_insync(&config.binary, STATUS_SUBCOMMAND)?;
    let progress = run_insync(&config.binary, PROGRESS_SUBCOMMAND)?;
    Ok((status, progress))
}

/// Poll Insync and build the host response
pub fn check_insync(config: &InsyncConfig, palette: &Palette, now: DateTime<Utc>) -> ModuleResponse {
    match query(config) {
        Ok((status, progress)) => render(&status, &progress, config, palette, now),
        Err(e) => {
            tracing::warn!(error = %e, "insync query failed");
            ModuleResponse::new(
                config.format_down.clone(),
                palette.bad.clone(),
                now,
                config.cache_timeout_down,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_parse_status_colors() {
        let palette = Palette::default();

        assert_eq!(
            parse_status("SHARE\n", &palette),
            ("INSYNC".to_string(), palette.good.clone())
        );
        assert_eq!(
            parse_status("OFFLINE\n", &palette),
            ("OFFLINE".to_string(), palette.bad.clone())
        );
        assert_eq!(
            parse_status("SYNCING\n", &palette),
            ("SYNCING".to_string(), palette.degraded.clone())
        );
    }

    #[test]
    fn test_parse_queued_takes_count_from_last_line() {
        let out = "Syncing report.pdf\n12 queued\n";
        assert_eq!(parse_queued(out), "12");
    }

    #[test]
    fn test_parse_queued_needs_queued_line() {
        assert_eq!(parse_queued("Syncing a\nSyncing b\n"), "");
        assert_eq!(parse_queued("3 queued\n"), "");
        assert_eq!(parse_queued(""), "");
    }

    #[test]
    fn test_render_default_format() {
        let config = InsyncConfig::default();
        let palette = Palette::default();
        let resp = render("SHARE\n", "a\n4 queued\n", &config, &palette, now());

        assert_eq!(resp.full_text, "INSYNC 4");
        assert_eq!(resp.color, palette.good);
        assert_eq!(resp.cached_until.timestamp(), 1_700_000_001);
    }

    #[test]
    fn test_missing_binary_renders_down() {
        let config = InsyncConfig {
            binary: "/nonexistent/insync".into(),
            ..InsyncConfig::default()
        };
        let palette = Palette::default();
        let resp = check_insync(&config, &palette, now());

        assert_eq!(resp.full_text, "Insync: down");
        assert_eq!(resp.color, palette.bad);
        assert_eq!(resp.cached_until.timestamp(), 1_700_000_005);
    }

    #[cfg(unix)]
    #[test]
    fn test_check_insync_passes_subcommand() {
        // echo prints the subcommand back, standing in for the client
        let config = InsyncConfig {
            binary: "/bin/echo".into(),
            ..InsyncConfig::default()
        };
        let palette = Palette::default();
        let resp = check_insync(&config, &palette, now());

        assert_eq!(resp.full_text, "get_status ");
        assert_eq!(resp.color, palette.degraded);
        assert_eq!(resp.cached_until.timestamp(), 1_700_000_001);
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_subcommand_renders_down() {
        let config = InsyncConfig {
            binary: "/bin/false".into(),
            format_down: "down".to_string(),
            ..InsyncConfig::default()
        };
        let resp = check_insync(&config, &Palette::default(), now());

        assert_eq!(resp.full_text, "down");
    }
}
