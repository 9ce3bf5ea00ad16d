use std::fmt;

use log::{debug, info, trace};
use thiserror::Error;

use crate::geometry::Feature;

mod geojson;
mod gpx;
mod igc;
mod kml;
mod topojson;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid JSON. cause: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid GeoJSON. cause: {0}")]
    GeoJson(#[from] ::geojson::Error),
    #[error("Invalid XML. cause: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("Unexpected structure. reason: {0}")]
    Structure(String),
    #[error("No candidate format produced features. tried: {0:?}")]
    NoCandidateMatched(Vec<VectorFormat>),
}

impl DecodeError {
    pub(crate) fn structure(reason: impl Into<String>) -> Self {
        DecodeError::Structure(reason.into())
    }
}

/// Vector file formats that can be loaded as a layer. Decoded coordinates are lon/lat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    GeoJson,
    TopoJson,
    Gpx,
    Kml,
    Igc,
}

/// Tried in this order when the extension gives no hint.
pub const ALL_FORMATS: [VectorFormat; 5] = [
    VectorFormat::GeoJson,
    VectorFormat::Gpx,
    VectorFormat::Igc,
    VectorFormat::Kml,
    VectorFormat::TopoJson,
];

impl VectorFormat {
    pub fn read_features(&self, text: &str) -> Result<Vec<Feature>, DecodeError> {
        match self {
            VectorFormat::GeoJson => geojson::read_features(text),
            VectorFormat::TopoJson => topojson::read_features(text),
            VectorFormat::Gpx => gpx::read_features(text),
            VectorFormat::Kml => kml::read_features(text),
            VectorFormat::Igc => igc::read_features(text),
        }
    }

    /// Candidate formats for a file extension (case-insensitive, without the dot), most likely first.
    pub fn candidates_for_extension(extension: &str) -> Vec<VectorFormat> {
        match extension
            .to_ascii_lowercase()
            .as_str()
        {
            "gpx" => vec![VectorFormat::Gpx],
            "kml" => vec![VectorFormat::Kml],
            "json" => vec![VectorFormat::GeoJson, VectorFormat::TopoJson],
            _ => ALL_FORMATS.to_vec(),
        }
    }

    /// Candidates for a file name, using the text after the last dot as the extension.
    pub fn candidates_for_file_name(file_name: &str) -> Vec<VectorFormat> {
        let extension = file_name
            .rsplit('.')
            .next()
            .unwrap_or_default();
        Self::candidates_for_extension(extension)
    }
}

impl fmt::Display for VectorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VectorFormat::GeoJson => "GeoJSON",
            VectorFormat::TopoJson => "TopoJSON",
            VectorFormat::Gpx => "GPX",
            VectorFormat::Kml => "KML",
            VectorFormat::Igc => "IGC",
        };
        f.write_str(name)
    }
}

/// Tries each candidate once, in order. A decoder error or an empty result moves on to the next
/// candidate; the first non-empty result wins.
#[profiling::function]
pub fn decode_with_fallback(
    text: &str,
    candidates: &[VectorFormat],
) -> Result<(VectorFormat, Vec<Feature>), DecodeError> {
    for format in candidates {
        match format.read_features(text) {
            Ok(features) if features.is_empty() => {
                debug!("Decoder produced no features. format: {}", format);
            }
            Ok(features) => {
                info!("Decoded features. format: {}, count: {}", format, features.len());
                return Ok((*format, features));
            }
            Err(e) => {
                debug!("Decoder failed. format: {}, cause: {}", format, e);
            }
        }
        trace!("Trying next candidate format");
    }

    Err(DecodeError::NoCandidateMatched(candidates.to_vec()))
}

#[cfg(test)]
mod format_tests {
    use rstest::rstest;

    use super::*;

    const TOPOJSON: &str = r#"{
        "type": "Topology",
        "objects": {
            "places": {
                "type": "GeometryCollection",
                "geometries": [
                    { "type": "Point", "coordinates": [138.73, 35.36], "properties": { "name": "Fuji" } }
                ]
            }
        },
        "arcs": []
    }"#;

    #[rstest]
    #[case("gpx", vec![VectorFormat::Gpx])]
    #[case("KML", vec![VectorFormat::Kml])]
    #[case("json", vec![VectorFormat::GeoJson, VectorFormat::TopoJson])]
    #[case("geojson", ALL_FORMATS.to_vec())]
    #[case("", ALL_FORMATS.to_vec())]
    fn candidates_by_extension(#[case] extension: &str, #[case] expected: Vec<VectorFormat>) {
        assert_eq!(VectorFormat::candidates_for_extension(extension), expected);
    }

    #[rstest]
    #[case("track.2015.GPX", vec![VectorFormat::Gpx])]
    #[case("README", ALL_FORMATS.to_vec())]
    fn candidates_by_file_name(#[case] file_name: &str, #[case] expected: Vec<VectorFormat>) {
        assert_eq!(VectorFormat::candidates_for_file_name(file_name), expected);
    }

    #[test]
    fn topojson_in_json_file_falls_back_to_second_candidate() {
        // given
        let candidates = VectorFormat::candidates_for_file_name("places.json");

        // when
        let (format, features) = decode_with_fallback(TOPOJSON, &candidates).unwrap();

        // then
        assert_eq!(format, VectorFormat::TopoJson);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].name(), Some("Fuji"));
    }

    #[test]
    fn empty_result_counts_as_failure() {
        // given
        // valid GeoJSON, but nothing in it
        let text = r#"{ "type": "FeatureCollection", "features": [] }"#;

        // when
        let result = decode_with_fallback(text, &[VectorFormat::GeoJson, VectorFormat::Igc]);

        // then
        match result {
            Err(DecodeError::NoCandidateMatched(tried)) => {
                assert_eq!(tried, vec![VectorFormat::GeoJson, VectorFormat::Igc])
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unknown_extension_tries_every_format() {
        let text = "<kml><Placemark><Point><coordinates>1,2</coordinates></Point></Placemark></kml>";

        let (format, features) = decode_with_fallback(text, &VectorFormat::candidates_for_extension("txt")).unwrap();

        assert_eq!(format, VectorFormat::Kml);
        assert_eq!(features.len(), 1);
    }
}
