//! Field translation between the canonical records and each vendor's property schema.
//!
//! Converters are pure: they never touch the identifier store. The adapter resolves
//! identities before and after calling them.
mod clickandgo;
mod earthstayin;
mod zooking;

pub use clickandgo::ClickandgoConverter;
pub use earthstayin::EarthstayinConverter;
pub use zooking::ZookingConverter;

use std::collections::BTreeMap;
use std::sync::Arc;

use propertease_wrapper_shared::types::{Amenity, Bathroom, Bed, BedType, Bedroom, Fixture};
use propertease_wrapper_shared::{ExternalId, Property, PropertyUpdate, Service};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ConversionError;

/// A vendor property translated to the canonical schema, still keyed by its vendor id.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedProperty {
    pub external_id: ExternalId,
    pub property: Property,
}

pub trait VendorConverter: Send + Sync {
    /// Translates one element of the vendor's property listing.
    ///
    /// The returned property has no internal id. Vendor enum values with no canonical
    /// counterpart are dropped.
    fn import_property(&self, raw: Value) -> Result<ImportedProperty, ConversionError>;

    /// Translates a partial update; only the fields present in `update` are emitted.
    fn export_update(&self, update: &PropertyUpdate) -> Result<Value, ConversionError>;

    /// Translates a whole property for creation on the vendor side.
    fn export_property(&self, property: &Property) -> Result<Value, ConversionError> {
        let mut payload = self.export_update(&PropertyUpdate::from(property))?;
        if let Value::Object(fields) = &mut payload {
            fields.insert(
                "user_email".to_string(),
                Value::String(property.user_email.clone()),
            );
        }
        Ok(payload)
    }
}

/// Returns the converter for `service`.
pub fn converter_for(service: Service) -> Arc<dyn VendorConverter> {
    match service {
        Service::Zooking => Arc::new(ZookingConverter),
        Service::Earthstayin => Arc::new(EarthstayinConverter),
        Service::Clickandgo => Arc::new(ClickandgoConverter),
    }
}

/// Bidirectional lookup between a canonical enum and a vendor's labels.
pub(crate) struct Dictionary<T: 'static> {
    pairs: &'static [(T, &'static str)],
}

impl<T: Copy + PartialEq> Dictionary<T> {
    pub(crate) const fn new(pairs: &'static [(T, &'static str)]) -> Self {
        Self { pairs }
    }

    pub(crate) fn to_vendor(&self, value: T) -> Option<&'static str> {
        self.pairs
            .iter()
            .find(|(canonical, _)| *canonical == value)
            .map(|(_, label)| *label)
    }

    pub(crate) fn to_canonical(&self, label: &str) -> Option<T> {
        self.pairs
            .iter()
            .find(|(_, vendor)| *vendor == label)
            .map(|(canonical, _)| *canonical)
    }

    pub(crate) fn export_all(&self, values: &[T]) -> Vec<String> {
        values
            .iter()
            .filter_map(|value| self.to_vendor(*value))
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn import_all(&self, labels: &[String]) -> Vec<T> {
        labels
            .iter()
            .filter_map(|label| self.to_canonical(label))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct VendorBed {
    #[serde(default)]
    pub number_beds: u32,
    pub bed_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct VendorBathroom {
    pub name: String,
    #[serde(default)]
    pub bathroom_fixtures: Vec<String>,
}

pub(crate) type VendorBedrooms = BTreeMap<String, Vec<VendorBed>>;

pub(crate) fn export_bedrooms(
    bedrooms: &BTreeMap<String, Bedroom>,
    dictionary: &Dictionary<BedType>,
) -> VendorBedrooms {
    bedrooms
        .iter()
        .map(|(name, bedroom)| {
            let beds = bedroom
                .beds
                .iter()
                .filter_map(|bed| {
                    Some(VendorBed {
                        number_beds: bed.number_beds,
                        bed_type: dictionary.to_vendor(bed.bed_type)?.to_string(),
                    })
                })
                .collect();
            (name.clone(), beds)
        })
        .collect()
}

pub(crate) fn import_bedrooms(
    bedrooms: &VendorBedrooms,
    dictionary: &Dictionary<BedType>,
) -> BTreeMap<String, Bedroom> {
    bedrooms
        .iter()
        .map(|(name, beds)| {
            let beds = beds
                .iter()
                .filter_map(|bed| {
                    Some(Bed {
                        number_beds: bed.number_beds,
                        bed_type: dictionary.to_canonical(&bed.bed_type)?,
                    })
                })
                .collect();
            (name.clone(), Bedroom { beds })
        })
        .collect()
}

pub(crate) fn export_bathrooms(
    bathrooms: &BTreeMap<String, Bathroom>,
    dictionary: &Dictionary<Fixture>,
) -> Vec<VendorBathroom> {
    bathrooms
        .iter()
        .map(|(name, bathroom)| VendorBathroom {
            name: name.clone(),
            bathroom_fixtures: dictionary.export_all(&bathroom.fixtures),
        })
        .collect()
}

pub(crate) fn import_bathrooms(
    bathrooms: &[VendorBathroom],
    dictionary: &Dictionary<Fixture>,
) -> BTreeMap<String, Bathroom> {
    bathrooms
        .iter()
        .map(|bathroom| {
            (
                bathroom.name.clone(),
                Bathroom {
                    fixtures: dictionary.import_all(&bathroom.bathroom_fixtures),
                },
            )
        })
        .collect()
}

pub(crate) fn export_amenities(amenities: &[Amenity], dictionary: &Dictionary<Amenity>) -> Vec<String> {
    dictionary.export_all(amenities)
}

/// Price the vendor should list. `after_commission` means the owner's price excludes the fee.
pub(crate) fn listed_price(price: f64, after_commission: Option<bool>, commission: f64) -> f64 {
    if after_commission.unwrap_or(false) {
        price * (1.0 + commission)
    } else {
        price
    }
}

/// Decodes a vendor record, reporting which service sent it on failure.
pub(crate) fn decode<T: for<'de> Deserialize<'de>>(
    service: Service,
    raw: Value,
) -> Result<T, ConversionError> {
    serde_json::from_value(raw)
        .map_err(|e| ConversionError::malformed(format!("{service} property: {e}")))
}
