use propertease_wrapper_shared::types::{Amenity, BedType, Fixture, HouseRules, TimeWindow};
use propertease_wrapper_shared::{ExternalId, Property, PropertyUpdate, Service};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    decode, export_amenities, export_bathrooms, export_bedrooms, import_bathrooms,
    import_bedrooms, Dictionary, ImportedProperty, VendorBathroom, VendorBedrooms,
    VendorConverter,
};
use crate::errors::ConversionError;

const ACCESSIBILITIES_SEPARATOR: &str = ". This property has the following accessibilities: ";
const REST_TIME_END: &str = "08:00";

const BEDS: Dictionary<BedType> = Dictionary::new(&[
    (BedType::Single, "single_bed"),
    (BedType::King, "king_bed"),
    (BedType::Queen, "queen_bed"),
]);

const FIXTURES: Dictionary<Fixture> = Dictionary::new(&[
    (Fixture::Bathtub, "bathtub"),
    (Fixture::Shower, "shower"),
    (Fixture::Toilet, "toilet"),
    (Fixture::Bidet, "bidet"),
]);

const AMENITIES: Dictionary<Amenity> = Dictionary::new(&[
    (Amenity::AirConditioner, "AC"),
    (Amenity::FreeWifi, "free_wifi"),
    (Amenity::ParkingSpace, "car_parking"),
]);

#[derive(Debug, Default, Serialize, Deserialize)]
struct EarthstayinHouseRules {
    #[serde(default)]
    checkin_time: String,
    #[serde(default)]
    checkout_time: String,
    #[serde(default)]
    smoking_allowed: bool,
    /// Only the start of the quiet period.
    #[serde(default)]
    rest_time: String,
    #[serde(default)]
    pets_allowed: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EarthstayinProperty {
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
    #[serde(
        rename = "available_amenities",
        alias = "amenities",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    amenities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    house_rules: Option<EarthstayinHouseRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    additional_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    accessibilities: Option<Vec<String>>,
}

fn import_house_rules(rules: EarthstayinHouseRules) -> HouseRules {
    HouseRules {
        check_in: TimeWindow::parse_range(&rules.checkin_time).unwrap_or_default(),
        check_out: TimeWindow::parse_range(&rules.checkout_time).unwrap_or_default(),
        smoking: rules.smoking_allowed,
        parties: false,
        rest_time: TimeWindow::new(rules.rest_time, REST_TIME_END),
        allow_pets: rules.pets_allowed,
    }
}

fn export_house_rules(rules: &HouseRules) -> EarthstayinHouseRules {
    EarthstayinHouseRules {
        checkin_time: rules.check_in.to_range(),
        checkout_time: rules.check_out.to_range(),
        smoking_allowed: rules.smoking,
        rest_time: rules.rest_time.begin_time.clone(),
        pets_allowed: rules.allow_pets,
    }
}

fn join_accessibilities(info: String, accessibilities: &[String]) -> String {
    if accessibilities.is_empty() {
        info
    } else {
        format!("{info}{ACCESSIBILITIES_SEPARATOR}{}", accessibilities.join(", "))
    }
}

fn split_accessibilities(info: &str) -> (String, Vec<String>) {
    match info.split_once(ACCESSIBILITIES_SEPARATOR) {
        Some((info, list)) => (
            info.to_string(),
            list.split(", ")
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        None => (info.to_string(), Vec::new()),
    }
}

pub struct EarthstayinConverter;

impl VendorConverter for EarthstayinConverter {
    fn import_property(&self, raw: Value) -> Result<ImportedProperty, ConversionError> {
        let vendor: EarthstayinProperty = decode(Service::Earthstayin, raw)?;
        let external_id = vendor
            .id
            .ok_or_else(|| ConversionError::malformed("earthstayin property without id"))?;

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
            house_rules: vendor
                .house_rules
                .map(import_house_rules)
                .unwrap_or_default(),
            additional_info: join_accessibilities(
                vendor.additional_info.unwrap_or_default(),
                &vendor.accessibilities.unwrap_or_default(),
            ),
            cancellation_policy: String::new(),
            contacts: Vec::new(),
        };

        Ok(ImportedProperty {
            external_id,
            property,
        })
    }

    /// Earthstayin charges no commission, so the price is sent as given.
    fn export_update(&self, update: &PropertyUpdate) -> Result<Value, ConversionError> {
        let (additional_info, accessibilities) = match update.additional_info.as_deref() {
            Some(info) => {
                let (info, accessibilities) = split_accessibilities(info);
                (Some(info), Some(accessibilities))
            }
            None => (None, None),
        };

        let vendor = EarthstayinProperty {
            name: update.title.clone(),
            address: update.address.clone(),
            description: update.description.clone(),
            curr_price: update.price,
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
            house_rules: update.house_rules.as_ref().map(export_house_rules),
            additional_info,
            accessibilities,
            ..Default::default()
        };
        Ok(serde_json::to_value(vendor)?)
    }
}
