use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::InternalId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedType {
    Single,
    King,
    Queen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fixture {
    Bathtub,
    Shower,
    Toilet,
    Bidet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Amenity {
    AirConditioner,
    FreeWifi,
    ParkingSpace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bed {
    pub number_beds: u32,
    #[serde(rename = "type")]
    pub bed_type: BedType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bedroom {
    #[serde(default)]
    pub beds: Vec<Bed>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bathroom {
    #[serde(default)]
    pub fixtures: Vec<Fixture>,
}

/// An `HH:MM` to `HH:MM` window, kept as text the way every vendor exchanges it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub begin_time: String,
    pub end_time: String,
}

impl TimeWindow {
    pub fn new(begin_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            begin_time: begin_time.into(),
            end_time: end_time.into(),
        }
    }

    /// Parses the `"HH:MM-HH:MM"` form. Returns `None` when there is no separator.
    pub fn parse_range(range: &str) -> Option<Self> {
        let (begin, end) = range.split_once('-')?;
        Some(Self::new(begin.trim(), end.trim()))
    }

    pub fn to_range(&self) -> String {
        format!("{}-{}", self.begin_time, self.end_time)
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::new("00:00", "00:00")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseRules {
    #[serde(default)]
    pub check_in: TimeWindow,
    #[serde(default)]
    pub check_out: TimeWindow,
    #[serde(default)]
    pub smoking: bool,
    #[serde(default)]
    pub parties: bool,
    #[serde(default)]
    pub rest_time: TimeWindow,
    #[serde(default)]
    pub allow_pets: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone_number: String,
}

/// The canonical, vendor-agnostic property record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<InternalId>,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    /// Whether `price` is what the owner wants to receive, so vendor commission must be added.
    #[serde(default)]
    pub after_commission: bool,
    #[serde(default)]
    pub number_guests: u32,
    #[serde(default)]
    pub square_meters: u32,
    #[serde(default)]
    pub bedrooms: BTreeMap<String, Bedroom>,
    #[serde(default)]
    pub bathrooms: BTreeMap<String, Bathroom>,
    #[serde(default)]
    pub amenities: Vec<Amenity>,
    #[serde(default)]
    pub house_rules: HouseRules,
    #[serde(default)]
    pub additional_info: String,
    #[serde(default)]
    pub cancellation_policy: String,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

/// Partial property update. Absent fields are left untouched on the vendor side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_commission: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_guests: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square_meters: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<BTreeMap<String, Bedroom>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<BTreeMap<String, Bathroom>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amenities: Option<Vec<Amenity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_rules: Option<HouseRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contacts: Option<Vec<Contact>>,
}

impl From<&Property> for PropertyUpdate {
    fn from(property: &Property) -> Self {
        PropertyUpdate {
            title: Some(property.title.clone()),
            address: Some(property.address.clone()),
            description: Some(property.description.clone()),
            price: Some(property.price),
            after_commission: Some(property.after_commission),
            number_guests: Some(property.number_guests),
            square_meters: Some(property.square_meters),
            bedrooms: Some(property.bedrooms.clone()),
            bathrooms: Some(property.bathrooms.clone()),
            amenities: Some(property.amenities.clone()),
            house_rules: Some(property.house_rules.clone()),
            additional_info: Some(property.additional_info.clone()),
            cancellation_policy: Some(property.cancellation_policy.clone()),
            contacts: Some(property.contacts.clone()),
        }
    }
}
