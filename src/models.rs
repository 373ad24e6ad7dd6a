use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::Role,
    error::{ApiError, ApiResult},
    query::{FieldDef, FieldKind, FieldPolicy},
};

// --- Core Application Schemas (Mapped to Database) ---

/// Bootcamp
///
/// A bootcamp record from the `bootcamps` table. The primary resource of the
/// directory; owned by the publisher who created it (`owner_id` is set at
/// creation time and never changes).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Bootcamp {
    pub id: Uuid,
    // FK to users.id. Immutable after creation; the basis of every
    // ownership check on this resource.
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Vec<String>,
    pub housing: bool,

    /// Serialized under the public API names rather than the column names;
    /// the query pipeline's field policy performs the same mapping for
    /// filters and sorts.
    #[serde(rename = "averagerating")]
    pub average_rating: Option<f64>,
    #[serde(rename = "averagecost")]
    pub average_cost: Option<f64>,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// BootcampSummary
///
/// The embedded shape used when a review listing is populated with its parent
/// bootcamp. Deliberately minimal: just enough for a client to label the
/// review.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BootcampSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

/// Review
///
/// A review of a bootcamp, owned by the user who wrote it. `bootcamp` is only
/// filled in when the request asked for `populate=bootcamp`; it is never read
/// from the reviews table itself.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Review {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub bootcamp_id: Uuid,
    pub title: String,
    pub text: String,
    pub rating: i32,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootcamp: Option<BootcampSummary>,
}

/// User
///
/// The local identity record. Credentials live with the external auth
/// provider; this table mirrors the id and carries the role used for RBAC.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Field Policies (Query Pipeline Allow-Lists) ---

/// Filterable/sortable/selectable fields for bootcamp listings. Only fields
/// declared here reach a query plan; everything else is rejected up front.
pub const BOOTCAMP_FIELDS: FieldPolicy = FieldPolicy {
    fields: &[
        FieldDef { name: "name", column: "name", kind: FieldKind::Text },
        FieldDef { name: "description", column: "description", kind: FieldKind::Text },
        FieldDef { name: "website", column: "website", kind: FieldKind::Text },
        FieldDef { name: "phone", column: "phone", kind: FieldKind::Text },
        FieldDef { name: "email", column: "email", kind: FieldKind::Text },
        FieldDef { name: "address", column: "address", kind: FieldKind::Text },
        FieldDef { name: "housing", column: "housing", kind: FieldKind::Bool },
        FieldDef { name: "averagerating", column: "average_rating", kind: FieldKind::Number },
        FieldDef { name: "averagecost", column: "average_cost", kind: FieldKind::Number },
    ],
    relations: &[],
};

/// Field policy for review listings. `populate=bootcamp` embeds the parent
/// bootcamp summary.
pub const REVIEW_FIELDS: FieldPolicy = FieldPolicy {
    fields: &[
        FieldDef { name: "title", column: "title", kind: FieldKind::Text },
        FieldDef { name: "text", column: "text", kind: FieldKind::Text },
        FieldDef { name: "rating", column: "rating", kind: FieldKind::Number },
    ],
    relations: &["bootcamp"],
};

/// Field policy for the admin user listing.
pub const USER_FIELDS: FieldPolicy = FieldPolicy {
    fields: &[
        FieldDef { name: "name", column: "name", kind: FieldKind::Text },
        FieldDef { name: "email", column: "email", kind: FieldKind::Text },
        FieldDef { name: "role", column: "role", kind: FieldKind::Text },
    ],
    relations: &[],
};

// --- Request Payloads (Input Schemas) ---

/// CreateBootcampRequest
///
/// Input payload for publishing a new bootcamp (POST /bootcamps). The owner
/// is taken from the authenticated session, never from the body.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateBootcampRequest {
    pub name: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub careers: Vec<String>,
    #[serde(default)]
    pub housing: bool,
    pub average_cost: Option<f64>,
}

impl CreateBootcampRequest {
    /// Field validation. All failing messages are collected in declaration
    /// order and reported together as one 400.
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Please add a name".to_string());
        } else if self.name.len() > 50 {
            errors.push("Name can not be more than 50 characters".to_string());
        }
        if self.description.trim().is_empty() {
            errors.push("Please add a description".to_string());
        } else if self.description.len() > 500 {
            errors.push("Description can not be more than 500 characters".to_string());
        }
        if let Some(cost) = self.average_cost {
            if cost < 0.0 {
                errors.push("Average cost must not be negative".to_string());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(errors))
        }
    }
}

/// UpdateBootcampRequest
///
/// Partial update payload (PUT /bootcamps/{id}). `Option<T>` throughout so
/// only the provided fields are written (COALESCE in the repository).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateBootcampRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub housing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_cost: Option<f64>,
}

impl UpdateBootcampRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                errors.push("Please add a name".to_string());
            } else if name.len() > 50 {
                errors.push("Name can not be more than 50 characters".to_string());
            }
        }
        if let Some(description) = &self.description {
            if description.trim().is_empty() {
                errors.push("Please add a description".to_string());
            } else if description.len() > 500 {
                errors.push("Description can not be more than 500 characters".to_string());
            }
        }
        if let Some(cost) = self.average_cost {
            if cost < 0.0 {
                errors.push("Average cost must not be negative".to_string());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(errors))
        }
    }
}

/// CreateReviewRequest
///
/// Input payload for reviewing a bootcamp
/// (POST /bootcamps/{id}/reviews).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateReviewRequest {
    pub title: String,
    pub text: String,
    pub rating: i32,
}

impl CreateReviewRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push("Please add a title for the review".to_string());
        } else if self.title.len() > 100 {
            errors.push("Title can not be more than 100 characters".to_string());
        }
        if self.text.trim().is_empty() {
            errors.push("Please add some text".to_string());
        }
        if !(1..=10).contains(&self.rating) {
            errors.push("Rating must be between 1 and 10".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(errors))
        }
    }
}

/// Partial review update (PUT /reviews/{id}).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
}

impl UpdateReviewRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                errors.push("Please add a title for the review".to_string());
            } else if title.len() > 100 {
                errors.push("Title can not be more than 100 characters".to_string());
            }
        }
        if let Some(text) = &self.text {
            if text.trim().is_empty() {
                errors.push("Please add some text".to_string());
            }
        }
        if let Some(rating) = self.rating {
            if !(1..=10).contains(&rating) {
                errors.push("Rating must be between 1 and 10".to_string());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(errors))
        }
    }
}

/// CreateUserRequest
///
/// Admin-only user creation (POST /users). The id mirrors the external auth
/// provider's subject when supplied, otherwise a fresh one is generated.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateUserRequest {
    pub id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl CreateUserRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Please add a name".to_string());
        }
        if !self.email.contains('@') {
            errors.push("Please add a valid email".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(errors))
        }
    }
}

/// Partial user update (PUT /users/{id}).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                errors.push("Please add a name".to_string());
            }
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                errors.push("Please add a valid email".to_string());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(errors))
        }
    }
}

// --- Response Envelopes ---

/// DataEnvelope
///
/// The wire shape of every single-resource success response:
/// `{ "success": true, "data": <resource> }`.
#[derive(Debug, Clone, Serialize)]
pub struct DataEnvelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
