// src/models/criteria.rs

use serde::{Deserialize, Serialize};

use crate::error::MatchError;
use crate::models::core::{field_has_text, Coordinates, ListingType, PropertyRecord};

/// What a comparable search is anchored on. Usually derived from a subject
/// property, but can be built directly for ad-hoc searches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Reference of the subject the search is run for.
    pub reference: String,

    pub property_type: Option<String>,

    pub coordinates: Option<Coordinates>,
    pub urbanization: Option<String>,
    pub suburb: Option<String>,
    pub city: Option<String>,

    pub build_area: Option<f64>,
    pub bedrooms: Option<u32>,
    pub price: Option<f64>,

    pub features: Vec<String>,

    pub listing_type: ListingType,

    /// Catalog pre-filter radius. Not part of the scoring itself.
    pub radius_km: f64,
}

impl SearchCriteria {
    pub fn from_property(subject: &PropertyRecord, radius_km: f64) -> Self {
        Self {
            reference: subject.reference.clone(),
            property_type: subject.property_type.clone(),
            coordinates: subject.coordinates,
            urbanization: subject.urbanization.clone(),
            suburb: subject.suburb.clone(),
            city: subject.city.clone(),
            build_area: subject.build_area,
            bedrooms: subject.bedrooms,
            price: subject.price,
            features: subject.features.clone(),
            listing_type: subject.listing_type,
            radius_km,
        }
    }

    /// A search needs a property type, some location signal and at least one
    /// comparable attribute, otherwise scoring has nothing to rank on.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.property_type.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(MatchError::InvalidCriteria(
                "missing property type".to_string(),
            ));
        }

        let has_location = self.coordinates.is_some()
            || field_has_text(&self.urbanization)
            || field_has_text(&self.suburb)
            || field_has_text(&self.city);
        if !has_location {
            return Err(MatchError::InvalidCriteria(
                "no location signal (coordinates or hierarchy field)".to_string(),
            ));
        }

        if self.build_area.is_none() && self.bedrooms.is_none() && self.price.is_none() {
            return Err(MatchError::InvalidCriteria(
                "none of build area, bedrooms or price present".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::PropertyId;

    fn subject() -> PropertyRecord {
        PropertyRecord {
            id: PropertyId("s1".to_string()),
            reference: "R-100".to_string(),
            urbanization: Some("Nueva Andalucía".to_string()),
            suburb: None,
            city: Some("Marbella".to_string()),
            street_address: None,
            coordinates: Some(Coordinates { latitude: 36.5, longitude: -4.88 }),
            build_area: Some(150.0),
            plot_area: None,
            bedrooms: Some(3),
            bathrooms: Some(2),
            price: Some(495_000.0),
            property_type: Some("apartment".to_string()),
            features: vec!["pool".to_string()],
            listing_type: ListingType::Sale,
        }
    }

    #[test]
    fn test_criteria_from_property_is_valid() {
        let criteria = SearchCriteria::from_property(&subject(), 5.0);
        assert!(criteria.validate().is_ok());
        assert_eq!(criteria.reference, "R-100");
        assert!((criteria.radius_km - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_property_type_rejected() {
        let mut criteria = SearchCriteria::from_property(&subject(), 5.0);
        criteria.property_type = None;
        let err = criteria.validate().unwrap_err();
        assert!(err.to_string().contains("property type"));
    }

    #[test]
    fn test_missing_location_rejected() {
        let mut criteria = SearchCriteria::from_property(&subject(), 5.0);
        criteria.coordinates = None;
        criteria.urbanization = None;
        criteria.city = None;
        let err = criteria.validate().unwrap_err();
        assert!(err.to_string().contains("location"));
    }

    #[test]
    fn test_blank_hierarchy_is_not_a_location_signal() {
        let mut criteria = SearchCriteria::from_property(&subject(), 5.0);
        criteria.coordinates = None;
        criteria.urbanization = Some("  ".to_string());
        criteria.city = None;
        assert!(criteria.validate().is_err());
    }

    #[test]
    fn test_missing_all_attributes_rejected() {
        let mut criteria = SearchCriteria::from_property(&subject(), 5.0);
        criteria.build_area = None;
        criteria.bedrooms = None;
        criteria.price = None;
        let err = criteria.validate().unwrap_err();
        assert!(err.to_string().contains("build area"));
    }

    #[test]
    fn test_one_attribute_is_enough() {
        let mut criteria = SearchCriteria::from_property(&subject(), 5.0);
        criteria.build_area = None;
        criteria.price = None;
        assert!(criteria.validate().is_ok());
    }
}
