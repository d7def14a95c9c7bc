use geo::Point;
use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::{
    gbfs::{Station, SystemInformation},
    matcher::select_closest,
    overpass::{ExistingNode, NodeSource},
    tags::{merge, AuthoritativeFields, OverwritePolicy, TagKey, Tags},
    Error, Result,
};

pub const AMENITY: &str = "bicycle_rental";

// metres
pub const DEFAULT_RADIUS: f64 = 20.0;

#[derive(Clone, Debug)]
pub struct Settings {
    pub operator: Option<String>,
    pub network: Option<String>,
    pub network_wikidata: Option<String>,
    pub operator_wikidata: Option<String>,
    pub overwrite: OverwritePolicy,
    pub use_short_name: bool,
    pub radius: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            operator: None,
            network: None,
            network_wikidata: None,
            operator_wikidata: None,
            overwrite: OverwritePolicy::default(),
            use_short_name: false,
            radius: DEFAULT_RADIUS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemProfile {
    pub system_id: String,
    pub network: String,
    pub operator: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub network_wikidata: Option<String>,
    pub operator_wikidata: Option<String>,
}

impl SystemProfile {
    pub fn resolve(settings: &Settings, system: &SystemInformation) -> Result<Self> {
        let network = match non_empty(&settings.network) {
            Some(x) => x,
            None => {
                warn!(
                    "No network name provided, using system_id: {} as network name.",
                    system.system_id
                );
                system.system_id.clone()
            }
        };

        let operator = non_empty(&settings.operator)
            .or_else(|| non_empty(&system.operator))
            .ok_or_else(|| {
                Error::Configuration(
                    "no operator name provided and the GBFS feed does not provide one, \
                     pass --operator"
                        .to_string(),
                )
            })?;

        Ok(Self {
            system_id: system.system_id.clone(),
            network,
            operator,
            phone: non_empty(&system.phone_number),
            website: non_empty(&system.url),
            network_wikidata: non_empty(&settings.network_wikidata),
            operator_wikidata: non_empty(&settings.operator_wikidata),
        })
    }
}

fn non_empty(x: &Option<String>) -> Option<String> {
    x.as_deref()
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(str::to_string)
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeEditRecord {
    // negative for new nodes
    pub id: i64,
    pub point: Point,
    pub version: u64,
    pub tags: Tags,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub matched: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiMatch {
    pub station: String,
    pub count: usize,
    pub chosen: i64,
}

#[derive(Debug, Default)]
pub struct Outcome {
    pub records: Vec<NodeEditRecord>,
    pub summary: Summary,
    pub multi_matches: Vec<MultiMatch>,
}

pub fn reconcile(
    stations: &[Station],
    profile: &SystemProfile,
    settings: &Settings,
    source: &impl NodeSource,
    pb: &ProgressBar,
) -> Result<Outcome> {
    let mut outcome = Outcome::default();

    for (i, station) in stations.iter().enumerate() {
        let name = station.display_name();
        pb.set_message(name.clone());

        let candidates = source.nearby(station.point(), settings.radius, AMENITY)?;
        let existing = select_closest(station.point(), &candidates);
        if let Some(node) = existing {
            outcome.summary.matched += 1;
            if candidates.len() > 1 {
                pb.suspend(|| {
                    warn!(
                        "{} nodes already in OpenStreetMap found near {name} ({}, {}). Using \
                         node with ID {} because it's the closest. However, a cleanup should \
                         be performed to remove duplicates before running this tool.",
                        candidates.len(),
                        station.lat,
                        station.lon,
                        node.id
                    )
                });
                outcome.multi_matches.push(MultiMatch {
                    station: name,
                    count: candidates.len(),
                    chosen: node.id,
                });
            }
        }

        let fields = authoritative_fields(station, profile, settings.use_short_name)?;
        let tags = merge(seed(existing), &fields, &settings.overwrite);
        outcome.records.push(edit_record(i, station, existing, tags));
        outcome.summary.total += 1;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        "Found {} existing nodes in OpenStreetMap out of {} stations. Only adding tags to \
         those nodes, overwriting only: {}",
        outcome.summary.matched, outcome.summary.total, settings.overwrite
    );
    Ok(outcome)
}

pub fn authoritative_fields(
    station: &Station,
    profile: &SystemProfile,
    use_short_name: bool,
) -> Result<AuthoritativeFields> {
    let reference = format!(
        "{}:{}",
        profile.system_id,
        station.reference(use_short_name)?
    );

    Ok([
        (TagKey::BicycleRental, Some("docking_station".to_string())),
        (TagKey::Amenity, Some(AMENITY.to_string())),
        (TagKey::Name, Some(station.display_name())),
        (TagKey::RefGbfs, Some(reference)),
        (TagKey::Network, Some(profile.network.clone())),
        (TagKey::Operator, Some(profile.operator.clone())),
        (TagKey::Brand, Some(profile.operator.clone())),
        (TagKey::OperatorPhone, profile.phone.clone()),
        (TagKey::OperatorWebsite, profile.website.clone()),
        (TagKey::NetworkWikidata, profile.network_wikidata.clone()),
        (TagKey::OperatorWikidata, profile.operator_wikidata.clone()),
        (TagKey::Capacity, station.capacity.map(|x| x.to_string())),
    ]
    .into_iter()
    .collect())
}

// capacity always comes from the feed, whatever the policy says
fn seed(existing: Option<&ExistingNode>) -> Tags {
    let mut tags = existing.map(|x| x.tags.clone()).unwrap_or_default();
    tags.remove(TagKey::Capacity.as_str());
    tags
}

fn edit_record(
    index: usize,
    station: &Station,
    existing: Option<&ExistingNode>,
    tags: Tags,
) -> NodeEditRecord {
    match existing {
        Some(node) => NodeEditRecord {
            id: node.id,
            point: node.point,
            version: node.version.map_or(1, |x| x + 1),
            tags,
        },
        None => NodeEditRecord {
            id: -(index as i64) - 1,
            point: station.point(),
            version: 1,
            tags,
        },
    }
}
