use std::collections::BTreeMap;

use geo::Point;
use itertools::Itertools;
use serde::{Deserialize, Deserializer};
use serde_with::{serde_as, NoneAsEmptyString};
use tracing::info;
use ureq::Agent;

use crate::{http::get_json, Error, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FeedType {
    SystemInformation,
    StationInformation,
}

impl FeedType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SystemInformation => "system_information",
            Self::StationInformation => "station_information",
        }
    }
}

// gbfs.json
#[derive(Debug, Deserialize)]
pub struct GbfsIndex {
    #[serde(skip)]
    url: String,
    data: BTreeMap<String, FeedList>,
}

#[derive(Debug, Deserialize)]
struct FeedList {
    feeds: Vec<Feed>,
}

#[derive(Debug, Deserialize)]
pub struct Feed {
    pub name: String,
    pub url: String,
}

impl GbfsIndex {
    pub fn feed_url(&self, language: &str, feed: FeedType) -> Result<&str> {
        let feeds = self.data.get(language).ok_or_else(|| {
            Error::data_shape(
                &self.url,
                format!(
                    "no feeds for language {language:?} (available: {})",
                    self.data.keys().join(", ")
                ),
            )
        })?;

        feeds
            .feeds
            .iter()
            .find(|x| x.name == feed.name())
            .map(|x| x.url.as_str())
            .ok_or_else(|| Error::data_shape(&self.url, format!("no {} feed", feed.name())))
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    last_updated: Option<u64>,
    data: T,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct SystemInformation {
    pub system_id: String,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub operator: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize)]
struct StationList {
    stations: Vec<Station>,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Station {
    #[serde(deserialize_with = "text_or_number")]
    pub station_id: String,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub short_name: Option<String>,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub capacity: Option<u32>,
}

impl Station {
    pub fn point(&self) -> Point {
        Point::new(self.lon, self.lat)
    }

    pub fn display_name(&self) -> String {
        self.name.split_whitespace().join(" ")
    }

    // some systems (like bixi) rotate station_id and keep the real number in short_name
    pub fn reference(&self, use_short_name: bool) -> Result<&str> {
        if !use_short_name {
            return Ok(&self.station_id);
        }
        self.short_name
            .as_deref()
            .ok_or_else(|| Error::MissingStationField {
                station: self.station_id.clone(),
                field: "short_name",
            })
    }
}

fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(x) => x,
        Raw::Number(x) => x.to_string(),
    })
}

pub fn fetch_index(agent: &Agent, url: &str) -> Result<GbfsIndex> {
    info!("Fetching GBFS information at {url}");
    let mut index: GbfsIndex = get_json(agent, url)?;
    index.url = url.to_string();
    Ok(index)
}

pub fn fetch_system_information(agent: &Agent, url: &str) -> Result<SystemInformation> {
    info!("Fetching system information at {url}");
    let envelope: Envelope<SystemInformation> = get_json(agent, url)?;
    Ok(envelope.data)
}

pub fn fetch_stations(agent: &Agent, url: &str) -> Result<Vec<Station>> {
    info!("Fetching station information at {url}");
    let envelope: Envelope<StationList> = get_json(agent, url)?;
    let stations = envelope.data.stations;
    match envelope.last_updated {
        Some(x) => info!("{} stations, last updated at {x}", stations.len()),
        None => info!("{} stations", stations.len()),
    }
    Ok(stations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> GbfsIndex {
        let mut index: GbfsIndex = serde_json::from_str(
            r#"{
                "last_updated": 1700000000,
                "ttl": 5,
                "data": {
                    "en": {
                        "feeds": [
                            {"name": "system_information", "url": "https://example.com/en/system_information.json"},
                            {"name": "station_information", "url": "https://example.com/en/station_information.json"}
                        ]
                    },
                    "fr": {
                        "feeds": [
                            {"name": "system_information", "url": "https://example.com/fr/system_information.json"}
                        ]
                    }
                }
            }"#,
        )
        .unwrap();
        index.url = "https://example.com/gbfs.json".to_string();
        index
    }

    #[test]
    fn feed_url() {
        let index = index();
        assert_eq!(
            index
                .feed_url("en", FeedType::StationInformation)
                .unwrap(),
            "https://example.com/en/station_information.json"
        );
        assert_eq!(
            index.feed_url("fr", FeedType::SystemInformation).unwrap(),
            "https://example.com/fr/system_information.json"
        );
    }

    #[test]
    fn feed_url_missing() {
        let index = index();
        assert!(matches!(
            index.feed_url("fr", FeedType::StationInformation),
            Err(Error::DataShape { .. })
        ));
        match index.feed_url("de", FeedType::SystemInformation) {
            Err(Error::DataShape { url, reason }) => {
                assert_eq!(url, "https://example.com/gbfs.json");
                assert!(reason.contains("en, fr"));
            }
            _ => panic!("expected a data shape error"),
        }
    }

    #[test]
    fn system_information_empty_strings() {
        let envelope: Envelope<SystemInformation> = serde_json::from_str(
            r#"{"last_updated": 1, "data": {
                "system_id": "bixi_MTL",
                "name": "BIXI",
                "operator": "",
                "phone_number": "1-514-789-2494"
            }}"#,
        )
        .unwrap();
        let info = envelope.data;
        assert_eq!(info.system_id, "bixi_MTL");
        assert_eq!(info.operator, None);
        assert_eq!(info.phone_number.as_deref(), Some("1-514-789-2494"));
        assert_eq!(info.url, None);
    }

    #[test]
    fn station_fields() {
        let list: StationList = serde_json::from_str(
            r#"{"stations": [
                {"station_id": 7, "name": " Main  St ", "lat": 45.5, "lon": -73.6, "capacity": 15},
                {"station_id": "a1", "short_name": "6001", "name": "Berri", "lat": 45.0, "lon": -73.0}
            ]}"#,
        )
        .unwrap();
        let [first, second] = &list.stations[..] else {
            panic!("expected two stations");
        };

        assert_eq!(first.station_id, "7");
        assert_eq!(first.display_name(), "Main St");
        assert_eq!(first.capacity, Some(15));
        assert_eq!(first.point(), Point::new(-73.6, 45.5));
        match first.reference(true) {
            Err(e @ Error::MissingStationField { .. }) => {
                assert_eq!(e.to_string(), "station 7 has no short_name");
            }
            x => panic!("expected a missing field error, got {x:?}"),
        }
        assert_eq!(first.reference(false).unwrap(), "7");

        assert_eq!(second.capacity, None);
        assert_eq!(second.reference(true).unwrap(), "6001");
        assert_eq!(second.reference(false).unwrap(), "a1");
    }
}
