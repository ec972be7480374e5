use propertease_wrapper_shared::types::{
    Amenity, BedType, Contact, Fixture, HouseRules, TimeWindow,
};
use propertease_wrapper_shared::{ExternalId, Property, PropertyUpdate, Service};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    decode, export_amenities, export_bathrooms, export_bedrooms, import_bathrooms,
    import_bedrooms, listed_price, Dictionary, ImportedProperty, VendorBathroom, VendorBedrooms,
    VendorConverter,
};
use crate::errors::ConversionError;

const COMMISSION: f64 = 0.02;

const BEDS: Dictionary<BedType> = Dictionary::new(&[
    (BedType::Single, "single"),
    (BedType::King, "king"),
    (BedType::Queen, "queen"),
]);

const FIXTURES: Dictionary<Fixture> = Dictionary::new(&[
    (Fixture::Bathtub, "tub"),
    (Fixture::Shower, "shower"),
    (Fixture::Toilet, "toilet"),
]);

const AMENITIES: Dictionary<Amenity> = Dictionary::new(&[
    (Amenity::AirConditioner, "AC"),
    (Amenity::FreeWifi, "wifi_free"),
    (Amenity::ParkingSpace, "parking"),
]);

#[derive(Debug, Default, Serialize, Deserialize)]
struct ClickandgoHouseRules {
    #[serde(default)]
    check_in: String,
    #[serde(default)]
    check_out: String,
    #[serde(default)]
    smoking_allowed: bool,
    #[serde(default)]
    parties_allowed: bool,
    #[serde(default)]
    rest_time: String,
    #[serde(default)]
    pets_allowed: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HouseManager {
    #[serde(default)]
    name: String,
    #[serde(default)]
    phone_number: String,
    #[serde(default)]
    languages: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ClickandgoProperty {
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
    guest_num: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    house_area: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bedrooms: Option<VendorBedrooms>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bathrooms: Option<Vec<VendorBathroom>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    available_amenities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    house_rules: Option<ClickandgoHouseRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    additional_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    house_manager: Option<HouseManager>,
}

fn import_house_rules(rules: ClickandgoHouseRules) -> HouseRules {
    HouseRules {
        check_in: TimeWindow::parse_range(&rules.check_in).unwrap_or_default(),
        check_out: TimeWindow::parse_range(&rules.check_out).unwrap_or_default(),
        smoking: rules.smoking_allowed,
        parties: rules.parties_allowed,
        rest_time: TimeWindow::parse_range(&rules.rest_time).unwrap_or_default(),
        allow_pets: rules.pets_allowed,
    }
}

fn export_house_rules(rules: &HouseRules) -> ClickandgoHouseRules {
    ClickandgoHouseRules {
        check_in: rules.check_in.to_range(),
        check_out: rules.check_out.to_range(),
        smoking_allowed: rules.smoking,
        parties_allowed: rules.parties,
        rest_time: rules.rest_time.to_range(),
        pets_allowed: rules.allow_pets,
    }
}

/// Clickandgo keeps a single house manager; only the first contact survives export.
fn export_contacts(contacts: &[Contact]) -> Option<HouseManager> {
    contacts.first().map(|contact| HouseManager {
        name: contact.name.clone(),
        phone_number: contact.phone_number.clone(),
        languages: Vec::new(),
    })
}

pub struct ClickandgoConverter;

impl VendorConverter for ClickandgoConverter {
    fn import_property(&self, raw: Value) -> Result<ImportedProperty, ConversionError> {
        let vendor: ClickandgoProperty = decode(Service::Clickandgo, raw)?;
        let external_id = vendor
            .id
            .ok_or_else(|| ConversionError::malformed("clickandgo property without id"))?;

        let contacts = vendor
            .house_manager
            .map(|manager| Contact {
                name: manager.name,
                phone_number: manager.phone_number,
            })
            .into_iter()
            .collect();

        let property = Property {
            id: None,
            user_email: vendor.user_email.unwrap_or_default(),
            title: vendor.name.unwrap_or_default(),
            address: vendor.address.unwrap_or_default(),
            description: vendor.description.unwrap_or_default(),
            price: vendor.curr_price.unwrap_or_default(),
            after_commission: false,
            number_guests: vendor.guest_num.unwrap_or_default(),
            square_meters: vendor.house_area.unwrap_or_default(),
            bedrooms: import_bedrooms(&vendor.bedrooms.unwrap_or_default(), &BEDS),
            bathrooms: import_bathrooms(&vendor.bathrooms.unwrap_or_default(), &FIXTURES),
            amenities: AMENITIES.import_all(&vendor.available_amenities.unwrap_or_default()),
            house_rules: vendor
                .house_rules
                .map(import_house_rules)
                .unwrap_or_default(),
            additional_info: vendor.additional_info.unwrap_or_default(),
            cancellation_policy: String::new(),
            contacts,
        };

        Ok(ImportedProperty {
            external_id,
            property,
        })
    }

    fn export_update(&self, update: &PropertyUpdate) -> Result<Value, ConversionError> {
        let vendor = ClickandgoProperty {
            name: update.title.clone(),
            address: update.address.clone(),
            description: update.description.clone(),
            curr_price: update
                .price
                .map(|price| listed_price(price, update.after_commission, COMMISSION)),
            guest_num: update.number_guests,
            house_area: update.square_meters,
            bedrooms: update
                .bedrooms
                .as_ref()
                .map(|bedrooms| export_bedrooms(bedrooms, &BEDS)),
            bathrooms: update
                .bathrooms
                .as_ref()
                .map(|bathrooms| export_bathrooms(bathrooms, &FIXTURES)),
            available_amenities: update
                .amenities
                .as_ref()
                .map(|amenities| export_amenities(amenities, &AMENITIES)),
            house_rules: update.house_rules.as_ref().map(export_house_rules),
            additional_info: update.additional_info.clone(),
            house_manager: update
                .contacts
                .as_deref()
                .and_then(export_contacts),
            ..Default::default()
        };
        Ok(serde_json::to_value(vendor)?)
    }
}
