use std::collections::BTreeMap;

use geo::Point;
use serde::Deserialize;
use tracing::debug;
use ureq::Agent;

use crate::{http::post_form_json, Error, Result};

pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

#[derive(Clone, Debug, PartialEq)]
pub struct ExistingNode {
    pub id: i64,
    pub point: Point,
    pub version: Option<u64>,
    pub tags: BTreeMap<String, String>,
}

pub trait NodeSource {
    // radius in metres
    fn nearby(&self, point: Point, radius: f64, amenity: &str) -> Result<Vec<ExistingNode>>;
}

pub struct Overpass {
    agent: Agent,
    endpoint: String,
}

impl Overpass {
    pub fn new(agent: Agent, endpoint: impl Into<String>) -> Self {
        Self {
            agent,
            endpoint: endpoint.into(),
        }
    }

    pub fn query(&self, q: &str) -> Result<Vec<ExistingNode>> {
        let payload = format!("[out:json][timeout:25]; {q}");
        let response: OverpassResponse =
            post_form_json(&self.agent, &self.endpoint, &[("data", payload.as_str())])?;
        response.refine(&self.endpoint)
    }
}

impl NodeSource for Overpass {
    fn nearby(&self, point: Point, radius: f64, amenity: &str) -> Result<Vec<ExistingNode>> {
        let nodes = self.query(&around_query(point, radius, amenity))?;
        debug!(lat = point.y(), lon = point.x(), "{} nodes nearby", nodes.len());
        Ok(nodes)
    }
}

// `out meta` so the version comes back with each node
fn around_query(point: Point, radius: f64, amenity: &str) -> String {
    format!(
        r#"node(around:{radius},{},{})["amenity"="{amenity}"]; out meta;"#,
        point.y(),
        point.x()
    )
}

#[derive(Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<RawElement>,
    remark: Option<String>,
}

impl OverpassResponse {
    // timeouts and out-of-memory come back as 200 with a remark and missing elements
    fn refine(self, endpoint: &str) -> Result<Vec<ExistingNode>> {
        if let Some(remark) = self.remark.filter(|x| x.contains("runtime error")) {
            return Err(Error::Transport {
                url: endpoint.to_string(),
                message: remark,
            });
        }

        Ok(self
            .elements
            .into_iter()
            .filter_map(|x| x.refine())
            .collect())
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum RawElement {
    Node {
        id: i64,
        #[serde(flatten)]
        position: RawPosition,
        version: Option<u64>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    #[serde(other)]
    Other,
}

impl RawElement {
    fn refine(self) -> Option<ExistingNode> {
        match self {
            Self::Node {
                id,
                position,
                version,
                tags,
            } => Some(ExistingNode {
                id,
                point: position.refine(),
                version,
                tags,
            }),
            Self::Other => None,
        }
    }
}

#[derive(Deserialize)]
struct RawPosition {
    lat: f64,
    lon: f64,
}

impl RawPosition {
    fn refine(self) -> Point {
        Point::new(self.lon, self.lat)
    }
}
