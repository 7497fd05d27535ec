//! Report rendering for matched releases

use std::fmt::Display;

use chrono::{Local, TimeZone};

use crate::version::types::Release;

/// How matched releases are reported on standard output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputStyle {
    /// One line per release
    #[default]
    Default,
    /// One line per release, plus a log line per poll attempt and command
    Verbose,
    /// Nothing
    None,
    /// The release records as a JSON array
    Json,
}

/// Render the report, or None when nothing should be printed
pub fn render(style: OutputStyle, releases: &[Release]) -> Result<Option<String>, serde_json::Error> {
    render_in(style, releases, &Local)
}

fn render_in<Tz>(
    style: OutputStyle,
    releases: &[Release],
    tz: &Tz,
) -> Result<Option<String>, serde_json::Error>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match style {
        OutputStyle::None => Ok(None),
        OutputStyle::Json => serde_json::to_string_pretty(releases).map(Some),
        OutputStyle::Default | OutputStyle::Verbose => {
            if releases.is_empty() {
                return Ok(None);
            }
            let lines: Vec<String> = releases
                .iter()
                .map(|release| release_line(release, tz))
                .collect();
            Ok(Some(lines.join("\n")))
        }
    }
}

/// `- name@version (released <time in tz>)`
fn release_line<Tz>(release: &Release, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "- {}@{} (released {})",
        release.name,
        release.version,
        release
            .time
            .with_timezone(tz)
            .format("%Y-%m-%d %H:%M:%S %:z")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::types::Manifest;
    use chrono::{FixedOffset, Utc};
    use serde_json::{Value, json};

    fn releases() -> Vec<Release> {
        let manifest: Manifest =
            serde_json::from_value(json!({ "description": "first package" })).unwrap();
        vec![
            Release::new(
                "foo",
                "1.0.0",
                Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
                Some(&manifest),
                &[],
            ),
            Release::new(
                "@scope/bar",
                "2.0.0",
                Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 5).unwrap(),
                None,
                &[],
            ),
        ]
    }

    #[test]
    fn render_default_prints_one_line_per_release() {
        let output = render_in(OutputStyle::Default, &releases(), &Utc).unwrap();

        assert_eq!(
            output.as_deref(),
            Some(
                "- foo@1.0.0 (released 2024-03-01 12:30:00 +00:00)\n\
                 - @scope/bar@2.0.0 (released 2024-03-02 08:00:05 +00:00)"
            )
        );
    }

    #[test]
    fn render_default_uses_given_timezone() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let output = render_in(OutputStyle::Verbose, &releases()[..1], &tz).unwrap();

        assert_eq!(
            output.as_deref(),
            Some("- foo@1.0.0 (released 2024-03-01 14:30:00 +02:00)")
        );
    }

    #[test]
    fn render_none_prints_nothing() {
        assert_eq!(render(OutputStyle::None, &releases()).unwrap(), None);
    }

    #[test]
    fn render_json_prints_release_records() {
        let output = render(OutputStyle::Json, &releases()).unwrap().unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(
            parsed,
            json!([
                {
                    "name": "foo",
                    "version": "1.0.0",
                    "time": "2024-03-01T12:30:00Z",
                    "spec": "foo@1.0.0",
                    "description": "first package"
                },
                {
                    "name": "@scope/bar",
                    "version": "2.0.0",
                    "time": "2024-03-02T08:00:05Z",
                    "spec": "@scope/bar@2.0.0"
                }
            ])
        );
    }
}
