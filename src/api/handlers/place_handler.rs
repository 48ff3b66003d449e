//! Place handlers.
//!
//! Reads are public; writes need a bearer token and the service applies
//! the ownership and admin checks.

use axum::{
    extract::{Extension, Path, Query, State},
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::api::middleware::auth_middleware;
use crate::api::AppState;
use crate::types::{ApiResponse, Created};
use common::{AppError, AppResult};
use domain::{
    Category, Contact, Location, NearbyPlace, NearbyQuery, NewPlace, OpeningHours, Place,
    PlaceFilter, PlacePatch, PlaceResponse, Principal, MAX_TAGS, MAX_TAG_LENGTH,
};

pub const MSG_PLACE_CREATED: &str = "Place created successfully";
pub const MSG_PLACE_UPDATED: &str = "Place updated successfully";
pub const MSG_PLACE_DELETED: &str = "Place deleted successfully";
pub const MSG_PLACE_HARD_DELETED: &str = "Place permanently deleted";
pub const MSG_PLACE_RESTORED: &str = "Place restored successfully";

// =============================================================================
// Request bodies
// =============================================================================

/// Position and postal details
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LocationRequest {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    #[schema(example = 41.90)]
    pub latitude: f64,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180"
    ))]
    #[schema(example = 12.49)]
    pub longitude: f64,
    #[validate(length(max = 200, message = "Address must be at most 200 characters"))]
    pub address: Option<String>,
    #[validate(length(max = 100, message = "City must be at most 100 characters"))]
    #[schema(example = "Roma")]
    pub city: Option<String>,
    #[validate(length(max = 100, message = "Country must be at most 100 characters"))]
    pub country: Option<String>,
}

impl From<LocationRequest> for Location {
    fn from(request: LocationRequest) -> Self {
        Self {
            latitude: request.latitude,
            longitude: request.longitude,
            address: request.address,
            city: request.city,
            country: request.country,
        }
    }
}

/// Contact details; empty email or website strings are accepted
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct ContactRequest {
    #[validate(length(max = 20, message = "Phone must be at most 20 characters"))]
    pub phone: Option<String>,
    #[validate(custom(function = "validate_email_or_empty"))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_url_or_empty"))]
    pub website: Option<String>,
}

impl From<ContactRequest> for Contact {
    fn from(request: ContactRequest) -> Self {
        Self {
            phone: request.phone,
            email: request.email,
            website: request.website,
        }
    }
}

/// Place creation request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaceRequest {
    #[serde(default)]
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    #[schema(example = "Bio Market")]
    pub name: String,
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
    #[validate(nested)]
    pub location: LocationRequest,
    #[serde(default)]
    #[validate(custom(function = "validate_category"))]
    #[schema(example = "market")]
    pub category: String,
    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
    /// Day label to `{open, close}`
    #[schema(value_type = Option<Object>)]
    pub opening_hours: Option<OpeningHours>,
    #[validate(nested)]
    pub contact: Option<ContactRequest>,
}

impl CreatePlaceRequest {
    fn into_new_place(self) -> AppResult<NewPlace> {
        Ok(NewPlace {
            name: self.name,
            description: self.description,
            location: self.location.into(),
            category: self.category.parse::<Category>()?,
            tags: self.tags.unwrap_or_default(),
            opening_hours: self.opening_hours.unwrap_or_default(),
            contact: self.contact.map(Contact::from).unwrap_or_default(),
            // Stamped with the caller by the service
            created_by: String::new(),
        })
    }
}

/// Place update request; at least one field
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlaceRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
    #[validate(nested)]
    pub location: Option<LocationRequest>,
    #[validate(custom(function = "validate_category"))]
    pub category: Option<String>,
    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
    /// Day label to `{open, close}`
    #[schema(value_type = Option<Object>)]
    pub opening_hours: Option<OpeningHours>,
    #[validate(nested)]
    pub contact: Option<ContactRequest>,
    pub is_active: Option<bool>,
    /// Admin only
    pub is_verified: Option<bool>,
}

impl UpdatePlaceRequest {
    fn into_patch(self) -> AppResult<PlacePatch> {
        let category = self
            .category
            .map(|c| c.parse::<Category>())
            .transpose()?;

        Ok(PlacePatch {
            name: self.name,
            description: self.description,
            location: self.location.map(Location::from),
            category,
            tags: self.tags,
            opening_hours: self.opening_hours,
            contact: self.contact.map(Contact::from),
            is_active: self.is_active,
            is_verified: self.is_verified,
        })
    }
}

// =============================================================================
// Query strings
// =============================================================================

/// Equality filters for the place list
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListPlacesQuery {
    #[validate(custom(function = "validate_category"))]
    pub category: Option<String>,
    pub city: Option<String>,
    /// Only `true` filters; any other value is ignored
    pub is_verified: Option<String>,
}

impl ListPlacesQuery {
    fn into_filter(self) -> AppResult<PlaceFilter> {
        Ok(PlaceFilter {
            category: self.category.map(|c| c.parse::<Category>()).transpose()?,
            city: self.city,
            is_verified: (self.is_verified.as_deref() == Some("true")).then_some(true),
            created_by: None,
        })
    }
}

/// Nearby search parameters, parsed by hand so every malformed value
/// gets the same answer
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NearbyParams {
    /// Latitude in degrees
    pub lat: Option<String>,
    /// Longitude in degrees
    pub lng: Option<String>,
    /// Kilometres, default 10, at most 100
    pub radius: Option<String>,
}

impl NearbyParams {
    fn into_query(self) -> AppResult<NearbyQuery> {
        let coordinate = |value: Option<String>| {
            value
                .and_then(|v| v.trim().parse::<f64>().ok())
                .ok_or_else(|| AppError::validation(domain::nearby::MSG_INVALID_NEARBY_PARAMS))
        };

        let latitude = coordinate(self.lat)?;
        let longitude = coordinate(self.lng)?;
        // An unparsable radius is rejected by the range check
        let radius = self
            .radius
            .map(|r| r.trim().parse::<f64>().unwrap_or(f64::NAN));

        Ok(NearbyQuery::new(latitude, longitude, radius)?)
    }
}

// =============================================================================
// Response bodies
// =============================================================================

/// `{place}` payload
#[derive(Debug, Serialize, ToSchema)]
pub struct PlaceData {
    pub place: PlaceResponse,
}

/// `{places}` payload
#[derive(Debug, Serialize, ToSchema)]
pub struct PlacesData {
    pub places: Vec<PlaceResponse>,
}

/// A place with its distance from the search point
#[derive(Debug, Serialize, ToSchema)]
pub struct NearbyPlaceResponse {
    #[serde(flatten)]
    pub place: PlaceResponse,
    /// Kilometres, two decimals
    pub distance: f64,
}

impl From<NearbyPlace> for NearbyPlaceResponse {
    fn from(found: NearbyPlace) -> Self {
        Self {
            place: found.place.into(),
            distance: found.distance_km,
        }
    }
}

/// `{places}` payload of a nearby search
#[derive(Debug, Serialize, ToSchema)]
pub struct NearbyPlacesData {
    pub places: Vec<NearbyPlaceResponse>,
}

/// Parameters a nearby search ran with
#[derive(Debug, Serialize, ToSchema)]
pub struct NearbySearchParams {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
}

// =============================================================================
// Validators
// =============================================================================

fn invalid(code: &'static str, message: impl Into<String>) -> ValidationError {
    let message: String = message.into();
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

fn validate_category(category: &str) -> Result<(), ValidationError> {
    category
        .parse::<Category>()
        .map(|_| ())
        .map_err(|_| invalid("category", Category::invalid_message()))
}

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.len() as u64 > MAX_TAGS {
        return Err(invalid("tags", format!("At most {} tags are allowed", MAX_TAGS)));
    }
    if tags.iter().any(|t| t.chars().count() > MAX_TAG_LENGTH) {
        return Err(invalid(
            "tags",
            format!("Each tag must be at most {} characters", MAX_TAG_LENGTH),
        ));
    }
    Ok(())
}

fn validate_email_or_empty(email: &str) -> Result<(), ValidationError> {
    use validator::ValidateEmail;

    if email.is_empty() || email.validate_email() {
        Ok(())
    } else {
        Err(invalid("email", "Invalid contact email"))
    }
}

fn validate_url_or_empty(website: &str) -> Result<(), ValidationError> {
    use validator::ValidateUrl;

    if website.is_empty() || website.validate_url() {
        Ok(())
    } else {
        Err(invalid("url", "Invalid website URL"))
    }
}

// =============================================================================
// Routes
// =============================================================================

fn place_data(place: Place) -> PlaceData {
    PlaceData {
        place: place.into(),
    }
}

fn places_response(places: Vec<Place>) -> ApiResponse<PlacesData> {
    let count = places.len();
    let places = places.into_iter().map(PlaceResponse::from).collect();
    ApiResponse::list(PlacesData { places }, count)
}

/// Create place routes
pub fn place_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_place))
        .route("/:id", put(update_place).delete(delete_place))
        .route("/:id/permanent", delete(hard_delete_place))
        .route("/:id/restore", patch(restore_place))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/", get(list_places))
        .route("/nearby", get(nearby_places))
        .route("/category/:category", get(places_by_category))
        .route("/user/:uid", get(places_by_user))
        .route("/:id", get(get_place))
        .merge(protected)
}

/// List places
#[utoipa::path(
    get,
    path = "/api/places",
    tag = "Places",
    params(ListPlacesQuery),
    responses(
        (status = 200, description = "Places matching the filters", body = PlacesData),
        (status = 400, description = "Invalid category")
    )
)]
pub async fn list_places(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ListPlacesQuery>,
) -> AppResult<ApiResponse<PlacesData>> {
    let places = state.place_service.list(query.into_filter()?).await?;
    Ok(places_response(places))
}

/// Places within a radius, nearest first
#[utoipa::path(
    get,
    path = "/api/places/nearby",
    tag = "Places",
    params(NearbyParams),
    responses(
        (status = 200, description = "Nearby places with distance in km", body = NearbyPlacesData),
        (status = 400, description = "Invalid parameters")
    )
)]
pub async fn nearby_places(
    State(state): State<AppState>,
    Query(params): Query<NearbyParams>,
) -> AppResult<ApiResponse<NearbyPlacesData, NearbySearchParams>> {
    let query = params.into_query()?;
    let found = state.place_service.nearby(query).await?;

    let count = found.len();
    let places = found.into_iter().map(NearbyPlaceResponse::from).collect();

    Ok(
        ApiResponse::list(NearbyPlacesData { places }, count).with_params(NearbySearchParams {
            latitude: query.latitude,
            longitude: query.longitude,
            radius: query.radius_km,
        }),
    )
}

/// Places of one category
#[utoipa::path(
    get,
    path = "/api/places/category/{category}",
    tag = "Places",
    params(("category" = String, Path, description = "Place category")),
    responses(
        (status = 200, description = "Places of the category", body = PlacesData),
        (status = 400, description = "Invalid category")
    )
)]
pub async fn places_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> AppResult<ApiResponse<PlacesData>> {
    let places = state.place_service.list_by_category(&category).await?;
    Ok(places_response(places))
}

/// Places created by a user
#[utoipa::path(
    get,
    path = "/api/places/user/{uid}",
    tag = "Places",
    params(("uid" = String, Path, description = "Creator's user id")),
    responses(
        (status = 200, description = "Places created by the user", body = PlacesData)
    )
)]
pub async fn places_by_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<ApiResponse<PlacesData>> {
    let places = state.place_service.list_by_owner(&uid).await?;
    Ok(places_response(places))
}

/// Get a place by id
#[utoipa::path(
    get,
    path = "/api/places/{id}",
    tag = "Places",
    params(("id" = String, Path, description = "Place id")),
    responses(
        (status = 200, description = "The place", body = PlaceData),
        (status = 404, description = "Place not found")
    )
)]
pub async fn get_place(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PlaceData>> {
    let place = state.place_service.get(&id).await?;
    Ok(ApiResponse::success(place_data(place)))
}

/// Create a place owned by the caller
#[utoipa::path(
    post,
    path = "/api/places",
    tag = "Places",
    security(("bearer_auth" = [])),
    request_body = CreatePlaceRequest,
    responses(
        (status = 201, description = "Place created", body = PlaceData),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_place(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreatePlaceRequest>,
) -> AppResult<Created<PlaceData>> {
    let place = state
        .place_service
        .create(&principal, payload.into_new_place()?)
        .await?;

    Ok(Created(ApiResponse::with_message(place_data(place), MSG_PLACE_CREATED)))
}

/// Update a place (owner or admin; verification admin only)
#[utoipa::path(
    put,
    path = "/api/places/{id}",
    tag = "Places",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Place id")),
    request_body = UpdatePlaceRequest,
    responses(
        (status = 200, description = "Place updated", body = PlaceData),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner, or verification by a non-admin"),
        (status = 404, description = "Place not found")
    )
)]
pub async fn update_place(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdatePlaceRequest>,
) -> AppResult<ApiResponse<PlaceData>> {
    let place = state
        .place_service
        .update(&principal, &id, payload.into_patch()?)
        .await?;

    Ok(ApiResponse::with_message(place_data(place), MSG_PLACE_UPDATED))
}

/// Soft-delete a place (owner or admin)
#[utoipa::path(
    delete,
    path = "/api/places/{id}",
    tag = "Places",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Place id")),
    responses(
        (status = 200, description = "Place deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Place not found"),
        (status = 409, description = "Place already deleted")
    )
)]
pub async fn delete_place(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.place_service.soft_delete(&principal, &id).await?;
    Ok(ApiResponse::message(MSG_PLACE_DELETED))
}

/// Permanently delete a place (admin only)
#[utoipa::path(
    delete,
    path = "/api/places/{id}/permanent",
    tag = "Places",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Place id")),
    responses(
        (status = 200, description = "Place permanently deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 404, description = "Place not found")
    )
)]
pub async fn hard_delete_place(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.place_service.hard_delete(&principal, &id).await?;
    Ok(ApiResponse::message(MSG_PLACE_HARD_DELETED))
}

/// Restore a soft-deleted place (admin only)
#[utoipa::path(
    patch,
    path = "/api/places/{id}/restore",
    tag = "Places",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Place id")),
    responses(
        (status = 200, description = "Place restored", body = PlaceData),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 404, description = "Place not found"),
        (status = 409, description = "Place is not deleted")
    )
)]
pub async fn restore_place(
    Extension(principal): Extension<Principal>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PlaceData>> {
    let place = state.place_service.restore(&principal, &id).await?;
    Ok(ApiResponse::with_message(place_data(place), MSG_PLACE_RESTORED))
}
