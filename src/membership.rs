//! Group registry: group id → ordered member countries.
//!
//! Group files follow the cache layout of the dashboard this crate feeds:
//! one JSON document per group, e.g. `groups/lldcs.json`:
//!
//! ```json
//! { "gid": "lldcs", "acronym": "LLDCs", "name": "Landlocked Developing Countries",
//!   "countries": [ { "name": "Bolivia", "ISO": "BO", "ISO3": "BOL" } ] }
//! ```
//!
//! Empty groups and duplicate members are configuration errors reported when
//! the registry is built, never during aggregation.

use crate::error::{Entity, Error, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// One member country of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// ISO3 code, upper case.
    pub code: String,
    pub name: String,
}

impl Member {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into().trim().to_ascii_uppercase(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub acronym: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub classifier: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub members: Vec<Member>,
}

impl Group {
    pub fn new(id: impl Into<String>, members: Vec<Member>) -> Self {
        Self {
            id: id.into(),
            acronym: None,
            name: None,
            classifier: None,
            description: None,
            members,
        }
    }

    pub fn contains(&self, country_code: &str) -> bool {
        self.members
            .iter()
            .any(|m| m.code.eq_ignore_ascii_case(country_code.trim()))
    }

    /// Label for display: acronym, else the id.
    pub fn label(&self) -> &str {
        self.acronym.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Deserialize)]
struct GroupFile {
    #[serde(default)]
    gid: Option<String>,
    #[serde(default)]
    acronym: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    classifier: Option<String>,
    #[serde(default)]
    description: Option<String>,
    countries: Vec<CountryEntry>,
}

#[derive(Debug, Deserialize)]
struct CountryEntry {
    name: String,
    #[serde(rename = "ISO3")]
    iso3: String,
}

impl GroupFile {
    fn into_group(self, fallback_id: &str) -> Group {
        let id = self
            .gid
            .filter(|g| !g.trim().is_empty())
            .unwrap_or_else(|| fallback_id.to_string());
        Group {
            id,
            acronym: self.acronym,
            name: self.name,
            classifier: self.classifier,
            description: self.description,
            members: self
                .countries
                .into_iter()
                .map(|c| Member::new(c.iso3, c.name))
                .collect(),
        }
    }
}

/// Read-only mapping from group id to members. Ids are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct GroupMembership {
    groups: BTreeMap<String, Group>,
}

impl GroupMembership {
    /// Validate and index groups. Ids are normalized to lower case.
    pub fn from_groups(groups: impl IntoIterator<Item = Group>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for mut group in groups {
            group.id = normalize_id(&group.id);
            validate(&group)?;
            if map.contains_key(&group.id) {
                return Err(Error::InvalidGroup {
                    group: group.id,
                    reason: "defined more than once".into(),
                });
            }
            map.insert(group.id.clone(), group);
        }
        Ok(Self { groups: map })
    }

    /// Load every `*.json` group file in `dir`.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in
            std::fs::read_dir(dir).with_context(|| format!("read groups dir {}", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut groups = Vec::with_capacity(paths.len());
        for path in paths {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("read group file {}", path.display()))?;
            let file: GroupFile = serde_json::from_str(&text)
                .with_context(|| format!("parse group file {}", path.display()))?;
            groups.push(file.into_group(&stem));
        }
        log::debug!("loaded {} group files from {}", groups.len(), dir.display());
        Ok(Self::from_groups(groups)?)
    }

    pub fn group(&self, group_id: &str) -> Result<&Group> {
        self.groups
            .get(&normalize_id(group_id))
            .ok_or_else(|| Error::not_found(Entity::Group, group_id.trim()))
    }

    pub fn members(&self, group_id: &str) -> Result<&[Member]> {
        self.group(group_id).map(|g| g.members.as_slice())
    }

    pub fn group_ids(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Display name of a country, taken from the first group listing it.
    pub fn display_name(&self, country_code: &str) -> Option<&str> {
        self.groups
            .values()
            .flat_map(|g| g.members.iter())
            .find(|m| m.code.eq_ignore_ascii_case(country_code.trim()))
            .map(|m| m.name.as_str())
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

fn validate(group: &Group) -> Result<()> {
    let invalid = |reason: String| Error::InvalidGroup {
        group: group.id.clone(),
        reason,
    };
    if group.id.is_empty() {
        return Err(invalid("empty group id".into()));
    }
    if group.members.is_empty() {
        return Err(invalid("group has no members".into()));
    }
    let mut seen = BTreeSet::new();
    for m in &group.members {
        if m.code.is_empty() {
            return Err(invalid(format!("member '{}' has no country code", m.name)));
        }
        if !seen.insert(m.code.as_str()) {
            return Err(invalid(format!("duplicate member '{}'", m.code)));
        }
    }
    Ok(())
}
