use propertease_wrapper_shared::types::{Amenity, BedType, Fixture, HouseRules};
use propertease_wrapper_shared::{ExternalId, Property, PropertyUpdate, Service};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    decode, export_amenities, export_bathrooms, export_bedrooms, import_bathrooms,
    import_bedrooms, listed_price, Dictionary, ImportedProperty, VendorBathroom, VendorBedrooms,
    VendorConverter,
};
use crate::errors::ConversionError;

const COMMISSION: f64 = 0.03;

const BEDS: Dictionary<BedType> = Dictionary::new(&[
    (BedType::Single, "single_bed"),
    (BedType::King, "king_bed"),
    (BedType::Queen, "queen_bed"),
]);

const FIXTURES: Dictionary<Fixture> = Dictionary::new(&[
    (Fixture::Bathtub, "tub"),
    (Fixture::Shower, "shower"),
    (Fixture::Toilet, "toilet"),
]);

const AMENITIES: Dictionary<Amenity> = Dictionary::new(&[
    (Amenity::AirConditioner, "AC"),
    (Amenity::FreeWifi, "wifi"),
    (Amenity::ParkingSpace, "open_parking"),
]);

/// Zooking has no house rules, cancellation policy or contacts.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ZookingProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<ExternalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    curr_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    number_of_guests: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    square_meters: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bedrooms: Option<VendorBedrooms>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bathrooms: Option<Vec<VendorBathroom>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    amenities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    additional_info: Option<String>,
}

pub struct ZookingConverter;

impl VendorConverter for ZookingConverter {
    fn import_property(&self, raw: Value) -> Result<ImportedProperty, ConversionError> {
        let vendor: ZookingProperty = decode(Service::Zooking, raw)?;
        let external_id = vendor
            .id
            .ok_or_else(|| ConversionError::malformed("zooking property without id"))?;

        let property = Property {
            id: None,
            user_email: vendor.user_email.unwrap_or_default(),
            title: vendor.name.unwrap_or_default(),
            address: vendor.address.unwrap_or_default(),
            description: vendor.description.unwrap_or_default(),
            price: vendor.curr_price.unwrap_or_default(),
            after_commission: false,
            number_guests: vendor.number_of_guests.unwrap_or_default(),
            square_meters: vendor.square_meters.unwrap_or_default(),
            bedrooms: import_bedrooms(&vendor.bedrooms.unwrap_or_default(), &BEDS),
            bathrooms: import_bathrooms(&vendor.bathrooms.unwrap_or_default(), &FIXTURES),
            amenities: AMENITIES.import_all(&vendor.amenities.unwrap_or_default()),
            house_rules: HouseRules::default(),
            additional_info: vendor.additional_info.unwrap_or_default(),
            cancellation_policy: String::new(),
            contacts: Vec::new(),
        };

        Ok(ImportedProperty {
            external_id,
            property,
        })
    }

    fn export_update(&self, update: &PropertyUpdate) -> Result<Value, ConversionError> {
        let vendor = ZookingProperty {
            name: update.title.clone(),
            address: update.address.clone(),
            description: update.description.clone(),
            curr_price: update
                .price
                .map(|price| listed_price(price, update.after_commission, COMMISSION)),
            number_of_guests: update.number_guests,
            square_meters: update.square_meters,
            bedrooms: update
                .bedrooms
                .as_ref()
                .map(|bedrooms| export_bedrooms(bedrooms, &BEDS)),
            bathrooms: update
                .bathrooms
                .as_ref()
                .map(|bathrooms| export_bathrooms(bathrooms, &FIXTURES)),
            amenities: update
                .amenities
                .as_ref()
                .map(|amenities| export_amenities(amenities, &AMENITIES)),
            additional_info: update.additional_info.clone(),
            ..Default::default()
        };
        Ok(serde_json::to_value(vendor)?)
    }
}
