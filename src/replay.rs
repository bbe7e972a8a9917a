use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::accessory::AccessoryKind;
use crate::geometry::DisplayGeometry;
use crate::landmark::LandmarkSet;

/// 記録された1フレーム分の検出結果
///
/// One JSON object per line:
/// `{"timestamp_ms": 0, "geometry": {...}, "face": [...], "pose": [...], "hand": [...]}`.
/// Missing detector fields mean that detector found nothing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayFrame {
    pub timestamp_ms: f64,
    pub geometry: DisplayGeometry,
    #[serde(default)]
    pub face: Option<LandmarkSet>,
    #[serde(default)]
    pub pose: Option<LandmarkSet>,
    #[serde(default)]
    pub hand: Option<LandmarkSet>,
}

impl ReplayFrame {
    pub fn landmarks_for(&self, kind: AccessoryKind) -> Option<&LandmarkSet> {
        match kind {
            AccessoryKind::Crown => self.face.as_ref(),
            AccessoryKind::Medal => self.pose.as_ref(),
            AccessoryKind::Trophy => self.hand.as_ref(),
        }
    }
}

pub fn read_recording<P: AsRef<Path>>(path: P) -> Result<Vec<ReplayFrame>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("failed to open recording {}", path.display()))?;
    parse_recording(BufReader::new(file))
        .with_context(|| format!("failed to read recording {}", path.display()))
}

/// Parses JSON lines, skipping blank lines.
pub fn parse_recording<R: BufRead>(reader: R) -> Result<Vec<ReplayFrame>> {
    let mut frames = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let frame: ReplayFrame = serde_json::from_str(line)
            .with_context(|| format!("line {}", i + 1))?;
        frames.push(frame);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEOMETRY: &str =
        r#""geometry": {"display_width": 640, "display_height": 480, "video_width": 640, "video_height": 480}"#;

    #[test]
    fn test_parse_lines() {
        let text = format!(
            "{{\"timestamp_ms\": 0, {g}, \"face\": [{{\"x\": 0.4, \"y\": 0.4}}]}}\n\n{{\"timestamp_ms\": 33.3, {g}}}\n",
            g = GEOMETRY
        );
        let frames = parse_recording(text.as_bytes()).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].landmarks_for(AccessoryKind::Crown).unwrap().len(), 1);
        assert!(frames[0].landmarks_for(AccessoryKind::Medal).is_none());
        assert!(frames[1].face.is_none());
        assert_eq!(frames[1].geometry.video_width, 640.0);
    }

    #[test]
    fn test_visibility_is_optional() {
        let text = format!(
            "{{\"timestamp_ms\": 0, {g}, \"pose\": [{{\"x\": 0.1, \"y\": 0.2, \"visibility\": 0.3}}]}}",
            g = GEOMETRY
        );
        let frames = parse_recording(text.as_bytes()).unwrap();
        let pose = frames[0].pose.as_ref().unwrap();
        assert_eq!(pose.get(0).unwrap().visibility, Some(0.3));
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let text = format!("{{\"timestamp_ms\": 0, {g}}}\nnot json\n", g = GEOMETRY);
        let err = parse_recording(text.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_missing_file() {
        assert!(read_recording("does/not/exist.jsonl").is_err());
    }
}
