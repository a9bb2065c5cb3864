// src/models/core.rs

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::MatchError;

//------------------------------------------------------------------------------
// IDENTIFIER TYPES
//------------------------------------------------------------------------------

/// Strongly typed identifier for property records
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyId(pub String);

impl std::fmt::Display for PropertyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//------------------------------------------------------------------------------
// CORE DOMAIN MODELS
//------------------------------------------------------------------------------

/// WGS84 point. Only built from finite values; ingestion drops anything else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Whether a listing is offered for sale or as a rental. The two markets
/// are never compared against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Sale,
    Rental,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::Sale => "sale",
            ListingType::Rental => "rental",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "rental" | "rent" | "let" | "long_term" | "short_term" => ListingType::Rental,
            _ => ListingType::Sale,
        }
    }
}

/// A cleaned catalog listing, the unit both the comparable matcher and the
/// location grouper operate on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: PropertyId,

    /// Agency reference code, falls back to the id when the feed omits it.
    pub reference: String,

    /// Location hierarchy, most specific first. Any subset may be present.
    pub urbanization: Option<String>,
    pub suburb: Option<String>,
    pub city: Option<String>,

    /// Free-text street address, used for display and geocoding queries only.
    pub street_address: Option<String>,

    pub coordinates: Option<Coordinates>,

    /// Constructed area in square meters.
    pub build_area: Option<f64>,
    pub plot_area: Option<f64>,

    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,

    /// Asking price for sales, monthly price for rentals.
    pub price: Option<f64>,

    pub property_type: Option<String>,

    /// Amenity tags ("pool", "sea views", ...). Empty when the feed value
    /// was missing or malformed.
    pub features: Vec<String>,

    pub listing_type: ListingType,
}

impl PropertyRecord {
    /// True when at least one hierarchy tier carries text.
    pub fn has_location_text(&self) -> bool {
        field_has_text(&self.urbanization)
            || field_has_text(&self.suburb)
            || field_has_text(&self.city)
    }

    pub fn has_coordinates(&self) -> bool {
        self.coordinates.is_some()
    }
}

/// Whether an optional text field carries anything beyond whitespace.
pub(crate) fn field_has_text(field: &Option<String>) -> bool {
    field.as_deref().map_or(false, |s| !s.trim().is_empty())
}

//------------------------------------------------------------------------------
// RAW CATALOG INGESTION
//------------------------------------------------------------------------------

/// A listing as it arrives from an agency feed. Field names vary per feed,
/// hence the aliases; everything except the id is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProperty {
    pub id: String,

    #[serde(default)]
    pub reference: Option<String>,

    #[serde(default, alias = "urbanisation", alias = "urb")]
    pub urbanization: Option<String>,

    #[serde(default, alias = "area", alias = "zone")]
    pub suburb: Option<String>,

    #[serde(default, alias = "town", alias = "locality", alias = "municipality")]
    pub city: Option<String>,

    #[serde(default, alias = "address", alias = "street")]
    pub street_address: Option<String>,

    #[serde(default, alias = "lat")]
    pub latitude: Option<f64>,

    #[serde(default, alias = "lng", alias = "lon")]
    pub longitude: Option<f64>,

    #[serde(default, alias = "built_area", alias = "constructed_area", alias = "size")]
    pub build_area: Option<f64>,

    #[serde(default, alias = "plot", alias = "plot_size")]
    pub plot_area: Option<f64>,

    #[serde(default, alias = "beds")]
    pub bedrooms: Option<u32>,

    #[serde(default, alias = "baths")]
    pub bathrooms: Option<u32>,

    #[serde(default)]
    pub price: Option<f64>,

    #[serde(default, alias = "asking_price")]
    pub sale_price: Option<f64>,

    #[serde(default)]
    pub rental_price: Option<f64>,

    #[serde(default, alias = "long_term_price")]
    pub monthly_price: Option<f64>,

    #[serde(default, alias = "type")]
    pub property_type: Option<String>,

    /// Arrives as a JSON array, a JSON-encoded string, or a comma list
    /// depending on the feed.
    #[serde(default)]
    pub features: Option<serde_json::Value>,

    #[serde(default, alias = "operation", alias = "listing")]
    pub listing_type: Option<String>,
}

impl RawProperty {
    /// Clean the raw listing into a `PropertyRecord`. Never fails: malformed
    /// pieces are dropped field by field and logged at warn.
    pub fn into_record(self) -> PropertyRecord {
        let listing_type = self
            .listing_type
            .as_deref()
            .map(ListingType::from_str)
            .unwrap_or(ListingType::Sale);

        let price = match listing_type {
            ListingType::Sale => self.price.or(self.sale_price),
            ListingType::Rental => self.price.or(self.rental_price).or(self.monthly_price),
        };

        let features = match self.features {
            None => Vec::new(),
            Some(value) => parse_features(&value).unwrap_or_else(|e| {
                warn!("Property {}: {}", self.id, e);
                Vec::new()
            }),
        };

        let coordinates = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                Some(Coordinates { latitude: lat, longitude: lon })
            }
            (Some(_), Some(_)) => {
                warn!(
                    "Property {}: {}",
                    self.id,
                    MatchError::MalformedField {
                        field: "coordinates".to_string(),
                        reason: "non-finite latitude or longitude".to_string(),
                    }
                );
                None
            }
            _ => None,
        };

        let reference = clean_text(self.reference).unwrap_or_else(|| self.id.clone());

        PropertyRecord {
            id: PropertyId(self.id),
            reference,
            urbanization: clean_text(self.urbanization),
            suburb: clean_text(self.suburb),
            city: clean_text(self.city),
            street_address: clean_text(self.street_address),
            coordinates,
            build_area: self.build_area,
            plot_area: self.plot_area,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            price,
            property_type: clean_text(self.property_type),
            features,
            listing_type,
        }
    }
}

/// Trim a text field, mapping blank to missing.
fn clean_text(field: Option<String>) -> Option<String> {
    field.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_features(value: &serde_json::Value) -> Result<Vec<String>, MatchError> {
    match value {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(items) => {
            let mut features = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(s) if !s.trim().is_empty() => features.push(s.trim().to_string()),
                    Some(_) => {}
                    None => {
                        return Err(MatchError::MalformedField {
                            field: "features".to_string(),
                            reason: format!("non-string entry in feature array: {}", item),
                        })
                    }
                }
            }
            Ok(features)
        }
        serde_json::Value::String(s) => {
            // Some feeds double-encode the array, others send a comma list.
            match serde_json::from_str::<Vec<String>>(s) {
                Ok(parsed) => Ok(parsed
                    .into_iter()
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty())
                    .collect()),
                Err(_) if s.trim_start().starts_with('[') => Err(MatchError::MalformedField {
                    field: "features".to_string(),
                    reason: "unparseable JSON feature array".to_string(),
                }),
                Err(_) => Ok(s
                    .split(',')
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty())
                    .collect()),
            }
        }
        other => Err(MatchError::MalformedField {
            field: "features".to_string(),
            reason: format!("expected array or string, got {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(id: &str) -> RawProperty {
        serde_json::from_value(json!({ "id": id })).unwrap()
    }

    #[test]
    fn test_features_from_json_array() {
        let mut r = raw("p1");
        r.features = Some(json!(["Pool", " Sea Views ", ""]));
        let record = r.into_record();
        assert_eq!(record.features, vec!["Pool", "Sea Views"]);
    }

    #[test]
    fn test_features_from_encoded_string() {
        let mut r = raw("p1");
        r.features = Some(json!("[\"pool\",\"garage\"]"));
        let record = r.into_record();
        assert_eq!(record.features, vec!["pool", "garage"]);
    }

    #[test]
    fn test_features_from_comma_list() {
        let mut r = raw("p1");
        r.features = Some(json!("pool, garage , terrace"));
        let record = r.into_record();
        assert_eq!(record.features, vec!["pool", "garage", "terrace"]);
    }

    #[test]
    fn test_malformed_features_become_empty() {
        let mut r = raw("p1");
        r.features = Some(json!({"pool": true}));
        let record = r.into_record();
        assert!(record.features.is_empty());

        let mut r = raw("p2");
        r.features = Some(json!([1, 2, 3]));
        let record = r.into_record();
        assert!(record.features.is_empty());
    }

    #[test]
    fn test_price_fallback_by_listing_type() {
        let mut r = raw("p1");
        r.sale_price = Some(450_000.0);
        let record = r.into_record();
        assert_eq!(record.listing_type, ListingType::Sale);
        assert_eq!(record.price, Some(450_000.0));

        let mut r = raw("p2");
        r.listing_type = Some("rental".to_string());
        r.sale_price = Some(450_000.0);
        r.monthly_price = Some(1_800.0);
        let record = r.into_record();
        assert_eq!(record.listing_type, ListingType::Rental);
        assert_eq!(record.price, Some(1_800.0));
    }

    #[test]
    fn test_blank_fields_become_missing() {
        let mut r = raw("p1");
        r.city = Some("   ".to_string());
        r.urbanization = Some(" Nueva Andalucía ".to_string());
        let record = r.into_record();
        assert_eq!(record.city, None);
        assert_eq!(record.urbanization.as_deref(), Some("Nueva Andalucía"));
        assert!(record.has_location_text());
    }

    #[test]
    fn test_non_finite_coordinates_dropped() {
        let mut r = raw("p1");
        r.latitude = Some(f64::NAN);
        r.longitude = Some(-4.9);
        let record = r.into_record();
        assert!(record.coordinates.is_none());
    }

    #[test]
    fn test_reference_falls_back_to_id() {
        let record = raw("ref-less").into_record();
        assert_eq!(record.reference, "ref-less");
    }

    #[test]
    fn test_feed_aliases() {
        let r: RawProperty = serde_json::from_value(json!({
            "id": "p9",
            "urb": "Los Naranjos",
            "town": "Marbella",
            "lat": 36.5,
            "lng": -4.9,
            "built_area": 120.0,
            "beds": 3,
            "operation": "rent"
        }))
        .unwrap();
        let record = r.into_record();
        assert_eq!(record.urbanization.as_deref(), Some("Los Naranjos"));
        assert_eq!(record.city.as_deref(), Some("Marbella"));
        assert!(record.has_coordinates());
        assert_eq!(record.build_area, Some(120.0));
        assert_eq!(record.bedrooms, Some(3));
        assert_eq!(record.listing_type, ListingType::Rental);
    }
}
