use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Session identity --

/// Authenticated identity attached to a request once its session cookie
/// resolves. Canonical definition lives here in dienynas-types because both
/// the session middleware and the handlers need it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

// -- Validation --

/// An error attached to a single form field, rendered inline by the client
/// rather than as a page-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

// -- Account --

/// Current values for pre-filling the account form.
#[derive(Debug, Serialize)]
pub struct AccountView {
    pub name: String,
    pub email: String,
    pub avatar: String,
}

// -- Entries --

#[derive(Debug, Deserialize)]
pub struct EntryForm {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// One page of a listing plus the numbers a client needs to render
/// pagination controls.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u32,
}
