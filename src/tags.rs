use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use clap::ValueEnum;
use itertools::Itertools;

pub type Tags = BTreeMap<String, String>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum TagKey {
    #[value(name = "bicycle_rental")]
    BicycleRental,
    #[value(name = "amenity")]
    Amenity,
    #[value(name = "name")]
    Name,
    #[value(name = "ref:gbfs")]
    RefGbfs,
    #[value(name = "network")]
    Network,
    #[value(name = "operator")]
    Operator,
    #[value(name = "brand")]
    Brand,
    #[value(name = "operator:phone")]
    OperatorPhone,
    #[value(name = "operator:website")]
    OperatorWebsite,
    #[value(name = "network:wikidata")]
    NetworkWikidata,
    #[value(name = "operator:wikidata")]
    OperatorWikidata,
    #[value(name = "capacity")]
    Capacity,
}

impl TagKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BicycleRental => "bicycle_rental",
            Self::Amenity => "amenity",
            Self::Name => "name",
            Self::RefGbfs => "ref:gbfs",
            Self::Network => "network",
            Self::Operator => "operator",
            Self::Brand => "brand",
            Self::OperatorPhone => "operator:phone",
            Self::OperatorWebsite => "operator:website",
            Self::NetworkWikidata => "network:wikidata",
            Self::OperatorWikidata => "operator:wikidata",
            Self::Capacity => "capacity",
        }
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// everything else is write-once
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverwritePolicy(BTreeSet<TagKey>);

impl OverwritePolicy {
    pub fn new(keys: impl IntoIterator<Item = TagKey>) -> Self {
        Self(keys.into_iter().collect())
    }

    pub fn contains(&self, key: TagKey) -> bool {
        self.0.contains(&key)
    }
}

impl Default for OverwritePolicy {
    fn default() -> Self {
        Self::new([TagKey::Capacity, TagKey::RefGbfs])
    }
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(", "))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthoritativeFields(Vec<(TagKey, Option<String>)>);

impl AuthoritativeFields {
    pub fn get(&self, key: TagKey) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (TagKey, Option<&str>)> {
        self.0.iter().map(|(k, v)| (*k, v.as_deref()))
    }
}

impl FromIterator<(TagKey, Option<String>)> for AuthoritativeFields {
    fn from_iter<I: IntoIterator<Item = (TagKey, Option<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub fn merge(mut tags: Tags, fields: &AuthoritativeFields, policy: &OverwritePolicy) -> Tags {
    for (key, value) in fields.iter() {
        // absent leaves the key alone, whatever the policy
        let Some(value) = value.filter(|x| !x.is_empty()) else {
            continue;
        };

        if policy.contains(key) {
            tags.insert(key.as_str().to_string(), value.to_string());
        } else {
            tags.entry(key.as_str().to_string())
                .or_insert_with(|| value.to_string());
        }
    }
    tags
}
