mod error;

pub mod gbfs;
pub mod http;
pub mod matcher;
pub mod osm_xml;
pub mod overpass;
pub mod reconcile;
pub mod tags;
pub mod utils;

pub use error::{Error, Result};
