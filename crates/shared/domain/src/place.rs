//! Place entity: a geotagged "bio" shop, market, farm or similar.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::lifecycle::SoftDelete;

/// Place category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Restaurant,
    Shop,
    Farm,
    Market,
    Cafe,
    Bakery,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Restaurant,
        Category::Shop,
        Category::Farm,
        Category::Market,
        Category::Cafe,
        Category::Bakery,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Restaurant => "restaurant",
            Category::Shop => "shop",
            Category::Farm => "farm",
            Category::Market => "market",
            Category::Cafe => "cafe",
            Category::Bakery => "bakery",
            Category::Other => "other",
        }
    }

    /// Message returned when a category value is not recognised
    pub fn invalid_message() -> String {
        let values: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
        format!("Invalid category. Values: {}", values.join(", "))
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DomainError::validation(Category::invalid_message()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic position plus optional postal details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Opening window for one day label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TimeRange {
    pub open: String,
    pub close: String,
}

/// Day label (e.g. "monday") to opening window
pub type OpeningHours = BTreeMap<String, TimeRange>;

/// Contact details; every field optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Place entity
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub location: Location,
    pub category: Category,
    pub tags: Vec<String>,
    /// Reserved: review aggregation is not implemented
    pub rating: f64,
    pub reviews_count: u32,
    pub opening_hours: OpeningHours,
    pub contact: Contact,
    /// Uid of the creating user
    pub created_by: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Place {
    /// Build a freshly created place with default flags.
    pub fn new(id: String, new: NewPlace, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            description: new.description,
            location: new.location,
            category: new.category,
            tags: new.tags,
            rating: 0.0,
            reviews_count: 0,
            opening_hours: new.opening_hours,
            contact: new.contact,
            created_by: new.created_by,
            is_verified: false,
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether the place shows up on the map
    pub fn is_listed(&self) -> bool {
        self.is_active && !self.is_deleted()
    }

    /// Merge allow-listed fields.
    pub fn apply(&mut self, patch: PlacePatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(opening_hours) = patch.opening_hours {
            self.opening_hours = opening_hours;
        }
        if let Some(contact) = patch.contact {
            self.contact = contact;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(is_verified) = patch.is_verified {
            self.is_verified = is_verified;
        }
        self.updated_at = now;
    }
}

impl SoftDelete for Place {
    const ENTITY: &'static str = "Place";

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
        self.deleted_at = at;
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// Place creation data (already validated)
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlace {
    pub name: String,
    pub description: Option<String>,
    pub location: Location,
    pub category: Category,
    pub tags: Vec<String>,
    pub opening_hours: OpeningHours,
    pub contact: Contact,
    pub created_by: String,
}

/// Allow-listed place update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<Location>,
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub opening_hours: Option<OpeningHours>,
    pub contact: Option<Contact>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
}

impl PlacePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.opening_hours.is_none()
            && self.contact.is_none()
            && self.is_active.is_none()
            && self.is_verified.is_none()
    }
}

/// Equality filters for place listings. Soft-deleted places are always excluded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceFilter {
    pub category: Option<Category>,
    pub city: Option<String>,
    pub is_verified: Option<bool>,
    pub created_by: Option<String>,
}

impl PlaceFilter {
    pub fn by_category(category: Category) -> Self {
        Self {
            category: Some(category),
            ..Default::default()
        }
    }

    pub fn by_owner(uid: impl Into<String>) -> Self {
        Self {
            created_by: Some(uid.into()),
            ..Default::default()
        }
    }

    /// Check a place against every set filter (deletion excluded).
    pub fn matches(&self, place: &Place) -> bool {
        !place.is_deleted()
            && self.category.map_or(true, |c| place.category == c)
            && self
                .city
                .as_deref()
                .map_or(true, |city| place.location.city.as_deref() == Some(city))
            && self.is_verified.map_or(true, |v| place.is_verified == v)
            && self
                .created_by
                .as_deref()
                .map_or(true, |uid| place.created_by == uid)
    }
}

/// Place response (safe to return to client)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PlaceResponse {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub location: Location,
    pub category: Category,
    pub tags: Vec<String>,
    pub rating: f64,
    pub reviews_count: u32,
    pub opening_hours: OpeningHours,
    pub contact: Contact,
    pub created_by: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Place> for PlaceResponse {
    fn from(place: Place) -> Self {
        Self {
            is_deleted: place.is_deleted(),
            id: place.id,
            name: place.name,
            description: place.description,
            location: place.location,
            category: place.category,
            tags: place.tags,
            rating: place.rating,
            reviews_count: place.reviews_count,
            opening_hours: place.opening_hours,
            contact: place.contact,
            created_by: place.created_by,
            is_verified: place.is_verified,
            is_active: place.is_active,
            deleted_at: place.deleted_at,
            created_at: place.created_at,
            updated_at: place.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, owner: &str) -> Place {
        Place::new(
            id.to_string(),
            NewPlace {
                name: "Bio Market".to_string(),
                description: None,
                location: Location {
                    latitude: 41.90,
                    longitude: 12.49,
                    address: None,
                    city: Some("Roma".to_string()),
                    country: None,
                },
                category: Category::Market,
                tags: vec![],
                opening_hours: OpeningHours::new(),
                contact: Contact::default(),
                created_by: owner.to_string(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_new_place_defaults() {
        let place = sample("p1", "u1");
        assert_eq!(place.rating, 0.0);
        assert_eq!(place.reviews_count, 0);
        assert!(!place.is_verified);
        assert!(place.is_active);
        assert!(!place.is_deleted());
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("bakery".parse::<Category>().unwrap(), Category::Bakery);

        let err = "pub".parse::<Category>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid category. Values: restaurant, shop, farm, market, cafe, bakery, other"
        );
    }

    #[test]
    fn test_apply_only_touches_given_fields() {
        let mut place = sample("p1", "u1");
        place.apply(
            PlacePatch {
                name: Some("Mercato Bio".to_string()),
                is_active: Some(false),
                ..Default::default()
            },
            Utc::now(),
        );

        assert_eq!(place.name, "Mercato Bio");
        assert!(!place.is_active);
        assert_eq!(place.category, Category::Market);
        assert_eq!(place.created_by, "u1");
    }

    #[test]
    fn test_filter_matches() {
        let mut place = sample("p1", "u1");

        assert!(PlaceFilter::default().matches(&place));
        assert!(PlaceFilter::by_category(Category::Market).matches(&place));
        assert!(!PlaceFilter::by_category(Category::Farm).matches(&place));
        assert!(PlaceFilter::by_owner("u1").matches(&place));
        assert!(!PlaceFilter::by_owner("u2").matches(&place));

        let city = PlaceFilter {
            city: Some("Milano".to_string()),
            ..Default::default()
        };
        assert!(!city.matches(&place));

        place.soft_delete(Utc::now()).unwrap();
        assert!(!PlaceFilter::default().matches(&place));
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let json = serde_json::to_value(PlaceResponse::from(sample("p1", "u1"))).unwrap();
        assert_eq!(json["createdBy"], "u1");
        assert_eq!(json["isVerified"], false);
        assert_eq!(json["reviewsCount"], 0);
        assert_eq!(json["category"], "market");
        assert_eq!(json["location"]["latitude"], 41.90);
    }
}
