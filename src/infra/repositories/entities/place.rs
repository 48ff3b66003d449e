//! Place table for SeaORM.
//!
//! Location is flattened into columns; tags, opening hours and contact
//! are stored as JSONB documents.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use common::AppError;
use domain::{Category, Location, Place};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "places")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub category: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub opening_hours: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub contact: Json,
    pub rating: f64,
    pub reviews_count: i32,
    #[sea_orm(column_type = "Text")]
    pub created_by: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn corrupt(field: &str, err: impl std::fmt::Display) -> AppError {
    AppError::internal(format!("Stored place has invalid {}: {}", field, err))
}

impl TryFrom<Model> for Place {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let category: Category = model
            .category
            .parse()
            .map_err(|e| corrupt("category", e))?;

        Ok(Place {
            id: model.id,
            name: model.name,
            description: model.description,
            location: Location {
                latitude: model.latitude,
                longitude: model.longitude,
                address: model.address,
                city: model.city,
                country: model.country,
            },
            category,
            tags: serde_json::from_value(model.tags).map_err(|e| corrupt("tags", e))?,
            rating: model.rating,
            reviews_count: u32::try_from(model.reviews_count).unwrap_or_default(),
            opening_hours: serde_json::from_value(model.opening_hours)
                .map_err(|e| corrupt("opening hours", e))?,
            contact: serde_json::from_value(model.contact).map_err(|e| corrupt("contact", e))?,
            created_by: model.created_by,
            is_verified: model.is_verified,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        })
    }
}

impl TryFrom<Place> for ActiveModel {
    type Error = AppError;

    fn try_from(place: Place) -> Result<Self, Self::Error> {
        let encode = |field: &str, value: serde_json::Result<Json>| {
            value.map_err(|e| corrupt(field, e))
        };

        Ok(ActiveModel {
            id: Set(place.id),
            name: Set(place.name),
            description: Set(place.description),
            latitude: Set(place.location.latitude),
            longitude: Set(place.location.longitude),
            address: Set(place.location.address),
            city: Set(place.location.city),
            country: Set(place.location.country),
            category: Set(place.category.to_string()),
            tags: Set(encode("tags", serde_json::to_value(&place.tags))?),
            opening_hours: Set(encode(
                "opening hours",
                serde_json::to_value(&place.opening_hours),
            )?),
            contact: Set(encode("contact", serde_json::to_value(&place.contact))?),
            rating: Set(place.rating),
            reviews_count: Set(i32::try_from(place.reviews_count).unwrap_or(i32::MAX)),
            created_by: Set(place.created_by),
            is_verified: Set(place.is_verified),
            is_active: Set(place.is_active),
            created_at: Set(place.created_at),
            updated_at: Set(place.updated_at),
            deleted_at: Set(place.deleted_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn model() -> Model {
        let now = Utc::now();
        Model {
            id: "p1".to_string(),
            name: "Bio Market".to_string(),
            description: None,
            latitude: 41.90,
            longitude: 12.49,
            address: None,
            city: Some("Roma".to_string()),
            country: None,
            category: "market".to_string(),
            tags: json!(["organic"]),
            opening_hours: json!({"monday": {"open": "08:00", "close": "13:00"}}),
            contact: json!({"phone": "06 1234"}),
            rating: 0.0,
            reviews_count: 0,
            created_by: "u1".to_string(),
            is_verified: false,
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_model_into_place() {
        let place = Place::try_from(model()).unwrap();
        assert_eq!(place.category, Category::Market);
        assert_eq!(place.tags, vec!["organic".to_string()]);
        assert_eq!(place.opening_hours["monday"].open, "08:00");
        assert_eq!(place.contact.phone.as_deref(), Some("06 1234"));
        assert_eq!(place.location.city.as_deref(), Some("Roma"));
    }

    #[test]
    fn test_unknown_category_is_internal() {
        let mut bad = model();
        bad.category = "pub".to_string();
        let err = Place::try_from(bad).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
