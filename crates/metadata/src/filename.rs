//! Naming template: `<series>[ Vol.<volume>] #<issue> (<year>)<extension>`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::record::MetadataRecord;

/// Characters that are not allowed in a filename on at least one supported
/// platform.
const ILLEGAL_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Remove filesystem-illegal characters, then trim surrounding whitespace.
pub fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// A filename derived from a [`MetadataRecord`].  Never contains a directory
/// component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetFilename(String);

impl TargetFilename {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TargetFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TargetFilename {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Compose the target filename.  `extension` includes its leading dot.
///
/// The volume segment, leading space included, is left out entirely when the
/// record has no volume.
pub fn build_target(record: &MetadataRecord, extension: &str) -> TargetFilename {
    let mut name = sanitize_component(&record.series);

    if let Some(volume) = record
        .volume
        .as_deref()
        .map(sanitize_component)
        .filter(|volume| !volume.is_empty())
    {
        name.push_str(" Vol.");
        name.push_str(&volume);
    }

    name.push_str(" #");
    name.push_str(&sanitize_component(&record.issue));
    name.push_str(" (");
    name.push_str(&sanitize_component(&record.year));
    name.push(')');
    name.push_str(extension);

    TargetFilename(name)
}

/// Fields recovered from a name produced by [`build_target`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameParts {
    pub series: String,
    pub volume: Option<String>,
    pub issue: String,
    pub year: String,
    pub extension: String,
}

impl FilenameParts {
    /// Inverse of [`build_target`].  Returns `None` for names that do not
    /// follow the template.
    pub fn parse(name: &str) -> Option<Self> {
        let re = template_regex()?;
        let caps = re.captures(name)?;
        Some(Self {
            series: caps.name("series")?.as_str().to_string(),
            volume: caps.name("volume").map(|m| m.as_str().to_string()),
            issue: caps.name("issue")?.as_str().to_string(),
            year: caps.name("year")?.as_str().to_string(),
            extension: caps
                .name("ext")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        })
    }
}

fn template_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<series>.+?)(?: Vol\.(?P<volume>[^ ]+))? #(?P<issue>[^#]+?) \((?P<year>[^()]*)\)(?P<ext>\.[^.]+)?$",
        )
        .ok()
    })
    .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(series: &str, volume: Option<&str>, issue: &str, year: &str) -> MetadataRecord {
        MetadataRecord {
            series: series.to_string(),
            volume: volume.map(str::to_string),
            issue: issue.to_string(),
            year: year.to_string(),
        }
    }

    #[test]
    fn template_with_volume() {
        let target = build_target(&record("Saga", Some("2"), "1", "2013"), ".cbz");
        assert_eq!(target.as_str(), "Saga Vol.2 #1 (2013).cbz");
    }

    #[test]
    fn template_without_volume_has_no_placeholder() {
        let target = build_target(&record("Saga", None, "54", "2018"), ".cbz");
        assert_eq!(target.to_string(), "Saga #54 (2018).cbz");
    }

    #[test]
    fn blank_volume_is_omitted() {
        let target = build_target(&record("Saga", Some("  "), "1", "2013"), ".cbr");
        assert_eq!(target.as_str(), "Saga #1 (2013).cbr");
    }

    #[test]
    fn components_are_sanitized() {
        let target = build_target(&record("What If?", Some("1/2"), "1:A", "20*20"), ".cbz");
        assert_eq!(target.as_str(), "What If Vol.12 #1A (2020).cbz");
    }

    #[test]
    fn sanitize_strips_every_illegal_char() {
        assert_eq!(sanitize_component(r#" a\b/c:d*e?f"g<h>i|j "#), "abcdefghij");
        assert_eq!(sanitize_component("???"), "");
    }

    #[test]
    fn same_record_same_name() {
        let r = record("Monstress", Some("1"), "5", "2016");
        assert_eq!(build_target(&r, ".cbz"), build_target(&r, ".cbz"));
    }

    #[test]
    fn round_trip_recovers_fields() {
        let samples = [
            record("Saga", Some("2"), "1", "2013"),
            record("The Walking Dead", None, "193", "2019"),
            record("Agent #9", None, "12.5", "2001"),
            record("Hellboy (Dark Horse)", Some("1994"), "1 AU", "1994"),
        ];
        for r in samples {
            let target = build_target(&r, ".cbz");
            let parts = FilenameParts::parse(target.as_str())
                .unwrap_or_else(|| panic!("unparseable: {target}"));
            assert_eq!(parts.series, r.series, "{target}");
            assert_eq!(parts.volume, r.volume, "{target}");
            assert_eq!(parts.issue, r.issue, "{target}");
            assert_eq!(parts.year, r.year, "{target}");
            assert_eq!(parts.extension, ".cbz");
        }
    }

    #[test]
    fn parse_rejects_untemplated_names() {
        assert!(FilenameParts::parse("scan_0001.cbz").is_none());
        assert!(FilenameParts::parse("Saga 001 [untagged].cbz").is_none());
    }
}
