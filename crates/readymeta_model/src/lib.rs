use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

// Go-style zero values: a missing key and an explicit `null` both decode to the empty value.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "rel", default, deserialize_with = "nullable")]
    pub rel: String,
    #[serde(rename = "href", default, deserialize_with = "nullable")]
    pub href: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(rename = "Start_Date", default, deserialize_with = "nullable")]
    pub start_date: String,
    #[serde(rename = "End_Date", default, deserialize_with = "nullable")]
    pub end_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    #[serde(rename = "Given_Name", default, deserialize_with = "nullable")]
    pub given_name: String,
    #[serde(rename = "Family_Name", default, deserialize_with = "nullable")]
    pub family_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonIdentifier {
    #[serde(rename = "Name_Identifier_Scheme", default, deserialize_with = "nullable")]
    pub scheme: String,
    #[serde(rename = "Name_Identifier", default, deserialize_with = "nullable")]
    pub identifier: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    #[serde(rename = "Name", default, deserialize_with = "nullable")]
    pub name: PersonName,
    #[serde(rename = "Affiliation", default, deserialize_with = "nullable")]
    pub affiliation: Vec<String>,
    #[serde(rename = "Person_Identifier", default, deserialize_with = "nullable")]
    pub person_identifier: Vec<PersonIdentifier>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    #[serde(flatten)]
    pub person: Person,
    #[serde(rename = "Contributor_Type", default, deserialize_with = "nullable")]
    pub contributor_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingReference {
    #[serde(rename = "Funder_Name", default, deserialize_with = "nullable")]
    pub funder_name: String,
    #[serde(rename = "Award_Number", default, deserialize_with = "nullable")]
    pub award_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentIdentifier {
    #[serde(rename = "Identifier_Scheme", default, deserialize_with = "nullable")]
    pub scheme: String,
    #[serde(rename = "Identifier", default, deserialize_with = "nullable")]
    pub identifier: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedDatapackage {
    #[serde(rename = "Persistent_Identifier", default, deserialize_with = "nullable")]
    pub persistent_identifier: PersistentIdentifier,
    #[serde(rename = "Relation_Type", default, deserialize_with = "nullable")]
    pub relation_type: String,
    #[serde(rename = "Title", default, deserialize_with = "nullable")]
    pub title: String,
}

/// Yoda 1.8 dataset metadata as written by the research data portal.
///
/// Every field is optional on the wire. Absent keys decode to empty strings,
/// empty lists or a zero retention period so downstream consumers can treat
/// absence uniformly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "links", default, deserialize_with = "nullable")]
    pub links: Vec<Link>,
    #[serde(rename = "Discipline", default, deserialize_with = "nullable")]
    pub discipline: Vec<String>,
    #[serde(rename = "Language", default, deserialize_with = "nullable")]
    pub language: String,
    #[serde(rename = "Collected", default, deserialize_with = "nullable")]
    pub collected: DateRange,
    #[serde(rename = "Covered_Geolocation_Place", default, deserialize_with = "nullable")]
    pub covered_geolocation_place: Vec<String>,
    #[serde(rename = "Covered_Period", default, deserialize_with = "nullable")]
    pub covered_period: DateRange,
    #[serde(rename = "Tag", default, deserialize_with = "nullable")]
    pub tag: Vec<String>,
    #[serde(rename = "Related_Datapackage", default, deserialize_with = "nullable")]
    pub related_datapackage: Vec<RelatedDatapackage>,
    #[serde(rename = "Retention_Period", default, deserialize_with = "nullable")]
    pub retention_period: i64,
    #[serde(rename = "Data_Type", default, deserialize_with = "nullable")]
    pub data_type: String,
    #[serde(rename = "Funding_Reference", default, deserialize_with = "nullable")]
    pub funding_reference: Vec<FundingReference>,
    #[serde(rename = "Creator", default, deserialize_with = "nullable")]
    pub creator: Vec<Person>,
    #[serde(rename = "Contributor", default, deserialize_with = "nullable")]
    pub contributor: Vec<Contributor>,
    #[serde(rename = "Data_Access_Restriction", default, deserialize_with = "nullable")]
    pub data_access_restriction: String,
    #[serde(rename = "Title", default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(rename = "Description", default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(rename = "Version", default, deserialize_with = "nullable")]
    pub version: String,
    #[serde(rename = "Retention_Information", default, deserialize_with = "nullable")]
    pub retention_information: String,
    #[serde(rename = "Embargo_End_Date", default, deserialize_with = "nullable")]
    pub embargo_end_date: String,
    #[serde(rename = "Data_Classification", default, deserialize_with = "nullable")]
    pub data_classification: String,
    #[serde(rename = "Collection_Name", default, deserialize_with = "nullable")]
    pub collection_name: String,
    #[serde(rename = "Remarks", default, deserialize_with = "nullable")]
    pub remarks: String,
    #[serde(rename = "License", default, deserialize_with = "nullable")]
    pub license: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    /// Every field is written, empty or not.
    Full,
    /// Empty strings, empty lists, zero numbers and objects left empty by
    /// that pruning are dropped.
    OmitEmpty,
}

impl Metadata {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json_value(&self, mode: EncodeMode) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if mode == EncodeMode::OmitEmpty {
            prune_empty(&mut value);
        }
        Ok(value)
    }

    pub fn to_json_pretty(&self, mode: EncodeMode) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_json_value(mode)?)
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

// Objects are pruned bottom-up so a struct whose fields were all empty disappears too.
// Array elements are kept in place to preserve positions.
fn prune_empty(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                prune_empty(child);
            }
            let kept: Map<String, Value> = std::mem::take(map)
                .into_iter()
                .filter(|(_, child)| !is_empty_value(child))
                .collect();
            *map = kept;
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                prune_empty(item);
            }
        }
        _ => {}
    }
}

pub fn fingerprint_sha256(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
