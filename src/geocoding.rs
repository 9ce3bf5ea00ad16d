use log::debug;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Geocoding service unavailable. cause: {0}")]
    Unavailable(String),
    #[error("Invalid geocoding response. cause: {0}")]
    InvalidResponse(#[from] serde_json::Error),
    #[error("Invalid coordinate in geocoding response. value: '{0}'")]
    InvalidCoordinate(String),
}

/// The top match of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub display_name: String,
    pub lon: f64,
    pub lat: f64,
    pub licence: Option<String>,
}

impl Place {
    pub fn confirmation_prompt(&self) -> String {
        format!(
            "Jump to {} ({}, {}) ?\n  Search result provided by Nominatim.",
            self.display_name, self.lon, self.lat
        )
    }
}

/// Resolves free text to a single place. `Ok(None)` means no results.
pub trait Geocoder {
    fn search(&self, query: &str) -> Result<Option<Place>, GeocodeError>;
}

/// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: String,
    lon: String,
    lat: String,
    licence: Option<String>,
}

/// Parses a Nominatim `format=json` search response, keeping the first result only.
pub fn parse_nominatim_response(body: &str) -> Result<Option<Place>, GeocodeError> {
    let places: Vec<NominatimPlace> = serde_json::from_str(body)?;
    debug!("Nominatim response. results: {}", places.len());

    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };

    let coordinate = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|_| GeocodeError::InvalidCoordinate(value.to_string()))
    };

    Ok(Some(Place {
        lon: coordinate(&place.lon)?,
        lat: coordinate(&place.lat)?,
        display_name: place.display_name,
        licence: place.licence,
    }))
}

#[cfg(feature = "nominatim")]
pub use nominatim::NominatimGeocoder;

#[cfg(feature = "nominatim")]
mod nominatim {
    use log::info;
    use reqwest::blocking::Client;
    use url::Url;

    use super::{parse_nominatim_response, GeocodeError, Geocoder, Place};
    use crate::viewer::ViewerConfiguration;

    /// Blocking client for the Nominatim search API.
    ///
    /// Requests are single-shot, there is no retry.
    pub struct NominatimGeocoder {
        client: Client,
        endpoint: Url,
    }

    impl NominatimGeocoder {
        pub fn new(endpoint: &str) -> Result<Self, GeocodeError> {
            let endpoint = Url::parse(endpoint).map_err(|e| GeocodeError::Unavailable(e.to_string()))?;
            let client = Client::builder()
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| GeocodeError::Unavailable(e.to_string()))?;

            Ok(Self {
                client,
                endpoint,
            })
        }

        /// Uses the configuration's `geocoder_endpoint`.
        pub fn from_configuration(configuration: &ViewerConfiguration) -> Result<Self, GeocodeError> {
            Self::new(&configuration.geocoder_endpoint)
        }

        pub fn search_url(&self, query: &str) -> Url {
            let mut url = self.endpoint.clone();
            url.query_pairs_mut()
                .append_pair("format", "json")
                .append_pair("limit", "1")
                .append_pair("q", query);
            url
        }
    }

    impl Geocoder for NominatimGeocoder {
        fn search(&self, query: &str) -> Result<Option<Place>, GeocodeError> {
            let url = self.search_url(query);
            info!("Searching. url: {}", url);

            let body = self
                .client
                .get(url)
                .send()
                .and_then(|response| response.error_for_status())
                .and_then(|response| response.text())
                .map_err(|e| GeocodeError::Unavailable(e.to_string()))?;

            parse_nominatim_response(&body)
        }
    }

    #[cfg(test)]
    mod nominatim_tests {
        use super::*;

        #[test]
        fn query_is_encoded() {
            let geocoder = NominatimGeocoder::new("https://nominatim.openstreetmap.org/search").unwrap();

            let url = geocoder.search_url("Mt. Fuji & lakes");

            assert_eq!(
                url.as_str(),
                "https://nominatim.openstreetmap.org/search?format=json&limit=1&q=Mt.+Fuji+%26+lakes"
            );
        }

        #[test]
        fn configured_endpoint_is_used() {
            // given
            let configuration = ViewerConfiguration {
                geocoder_endpoint: "http://localhost:8080/search".to_string(),
                ..ViewerConfiguration::default()
            };

            // when
            let geocoder = NominatimGeocoder::from_configuration(&configuration).unwrap();

            // then
            assert_eq!(
                geocoder.search_url("Hakone").as_str(),
                "http://localhost:8080/search?format=json&limit=1&q=Hakone"
            );
        }

        #[test]
        fn bad_configured_endpoint_is_unavailable() {
            let configuration = ViewerConfiguration {
                geocoder_endpoint: "not a url".to_string(),
                ..ViewerConfiguration::default()
            };

            assert!(matches!(
                NominatimGeocoder::from_configuration(&configuration),
                Err(GeocodeError::Unavailable(_))
            ));
        }
    }
}
