//! IGC flight recorder logs. Only position fixes (B records) and named header fields
//! (H records with a `:`) are read.

use geo_types::{Coord, LineString};

use super::DecodeError;
use crate::geometry::{Feature, Geometry};

/// `B` + time (6) + latitude (7 + hemisphere) + longitude (8 + hemisphere) + validity + altitudes.
const MIN_B_RECORD_LEN: usize = 35;

pub(super) fn read_features(text: &str) -> Result<Vec<Feature>, DecodeError> {
    let mut track = vec![];
    let mut headers = vec![];

    for line in text.lines().map(str::trim_end) {
        if line.starts_with('B') {
            if let Some(point) = read_fix(line) {
                track.push(point);
            }
        } else if line.starts_with('H') {
            if let Some(header) = read_header(line) {
                headers.push(header);
            }
        }
    }

    if track.is_empty() {
        return Ok(vec![]);
    }

    let mut feature = Feature::new(Geometry::LineString(LineString(track)));
    for (key, value) in headers {
        feature = feature.with_property(key, value);
    }
    Ok(vec![feature])
}

fn read_fix(line: &str) -> Option<Coord<f64>> {
    if line.len() < MIN_B_RECORD_LEN || !line.is_ascii() {
        return None;
    }

    let lat = angle(&line[7..9], &line[9..14], &line[14..15], 'S')?;
    let lon = angle(&line[15..18], &line[18..23], &line[23..24], 'W')?;
    Some(Coord {
        x: lon,
        y: lat,
    })
}

/// Degrees and thousandths of minutes, negated for the southern/western hemisphere.
fn angle(degrees: &str, milli_minutes: &str, hemisphere: &str, negative: char) -> Option<f64> {
    let degrees = degrees.parse::<u32>().ok()? as f64;
    let minutes = milli_minutes.parse::<u32>().ok()? as f64 / 1000.0;
    let value = degrees + minutes / 60.0;
    match hemisphere.starts_with(negative) {
        true => Some(-value),
        false => Some(value),
    }
}

/// `HFPLTPILOTINCHARGE:Jane Doe` -> `("PLT", "Jane Doe")`.
fn read_header(line: &str) -> Option<(&str, &str)> {
    let (field, value) = line.split_once(':')?;
    let key = field.get(2..5)?;
    match key.chars().all(|c| c.is_ascii_uppercase()) {
        true => Some((key, value.trim())),
        false => None,
    }
}
