use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, Level};

use gbfs2osm::{
    gbfs::{self, FeedType},
    http, osm_xml,
    overpass::{self, Overpass},
    reconcile::{self, Settings, SystemProfile, DEFAULT_RADIUS},
    tags::{OverwritePolicy, TagKey},
    utils::progress_bar,
};

/// A tool to convert GBFS feeds to OSM data.
#[derive(Debug, Parser)]
#[command(name = "gbfs2osm", version, about)]
struct Cli {
    /// The human-readable name of the organization that operates the bikeshare.
    /// Falls back to the operator given by the feed
    #[arg(long)]
    operator: Option<String>,

    /// The name of the bikeshare network, see
    /// https://wiki.openstreetmap.org/wiki/Tag:amenity%3Dbicycle_rental.
    /// Falls back to the feed's system_id
    #[arg(long)]
    network: Option<String>,

    /// Link to the GBFS endpoint
    #[arg(long, default_value = "https://gbfs.velobixi.com/gbfs/2-2/gbfs.json")]
    gbfs_feed_url: String,

    /// Path to the output OSM file
    #[arg(long, default_value = "output.osm")]
    output_file: PathBuf,

    /// Use the station's short_name in the ref:gbfs tag. Some bikeshare
    /// systems (like Bixi) change station_id and keep the real station ID in
    /// short_name
    #[arg(long)]
    use_short_name_for_station_id: bool,

    /// Tag whose value on existing nodes is replaced by the feed's (repeatable).
    /// Defaults to ref:gbfs and capacity
    #[arg(long, value_enum)]
    overwrite: Vec<TagKey>,

    /// Wikidata item of the network, e.g. Q386
    #[arg(long)]
    network_wikidata: Option<String>,

    /// Wikidata item of the operator
    #[arg(long)]
    operator_wikidata: Option<String>,

    /// Feed language to read from gbfs.json
    #[arg(long, default_value = "en")]
    language: String,

    #[arg(long, default_value = overpass::DEFAULT_ENDPOINT)]
    overpass_url: String,

    /// Search radius around each station, in metres
    #[arg(long, default_value_t = DEFAULT_RADIUS)]
    radius: f64,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        let overwrite = if self.overwrite.is_empty() {
            OverwritePolicy::default()
        } else {
            OverwritePolicy::new(self.overwrite.iter().copied())
        };

        Settings {
            operator: self.operator.clone(),
            network: self.network.clone(),
            network_wikidata: self.network_wikidata.clone(),
            operator_wikidata: self.operator_wikidata.clone(),
            overwrite,
            use_short_name: self.use_short_name_for_station_id,
            radius: self.radius,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let result = run(&cli);
    if let Err(e) = &result {
        error!("{e:#}");
    }
    result
}

fn run(cli: &Cli) -> Result<()> {
    let settings = cli.settings();
    let agent = http::agent();

    let index = gbfs::fetch_index(&agent, &cli.gbfs_feed_url)?;
    let system_url = index.feed_url(&cli.language, FeedType::SystemInformation)?;
    let station_url = index.feed_url(&cli.language, FeedType::StationInformation)?;

    let system = gbfs::fetch_system_information(&agent, system_url)?;
    let profile = SystemProfile::resolve(&settings, &system)?;
    let stations = gbfs::fetch_stations(&agent, station_url)?;

    let overpass = Overpass::new(agent, cli.overpass_url.as_str());
    let pb = progress_bar(stations.len() as u64);
    let outcome = reconcile::reconcile(&stations, &profile, &settings, &overpass, &pb)?;
    if !outcome.multi_matches.is_empty() {
        info!(
            "{} stations have duplicate nodes nearby",
            outcome.multi_matches.len()
        );
    }

    info!("Writing {}...", cli.output_file.display());
    osm_xml::write_file(&cli.output_file, &outcome.records)
        .with_context(|| format!("failed to write {}", cli.output_file.display()))?;

    info!("Conversion complete!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn default_overwrite_policy() {
        let cli = Cli::parse_from(["gbfs2osm", "--operator", "BIXI"]);
        let settings = cli.settings();
        assert_eq!(settings.overwrite, OverwritePolicy::default());
        assert_eq!(settings.radius, DEFAULT_RADIUS);
        assert!(!settings.use_short_name);
    }

    #[test]
    fn overwrite_flags() {
        let cli = Cli::parse_from([
            "gbfs2osm",
            "--overwrite",
            "name",
            "--overwrite",
            "operator:phone",
            "--use-short-name-for-station-id",
        ]);
        let settings = cli.settings();
        assert_eq!(
            settings.overwrite,
            OverwritePolicy::new([TagKey::Name, TagKey::OperatorPhone])
        );
        assert!(settings.use_short_name);
    }
}
