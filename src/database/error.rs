use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use serde_json::{json, Value};
use warp::{
    http::StatusCode,
    reject,
    reply::{Reply, Response},
};

/// Validation messages keyed by request field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlError {
    InvalidRequest,
    InvalidSession,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    UnsupportedMediaType,
    InternalServerError,
}

impl HtmlError {
    pub fn code(self) -> u16 {
        match self {
            HtmlError::InvalidRequest => 400,
            HtmlError::InvalidSession | HtmlError::Unauthorized => 401,
            HtmlError::Forbidden => 403,
            HtmlError::NotFound => 404,
            HtmlError::MethodNotAllowed => 405,
            HtmlError::PayloadTooLarge => 413,
            HtmlError::UnsupportedMediaType => 415,
            HtmlError::InternalServerError => 500,
        }
    }

    fn default_info(self) -> &'static str {
        match self {
            HtmlError::InvalidRequest => "Invalid request.",
            HtmlError::InvalidSession => "Invalid token.",
            HtmlError::Unauthorized => "Authentication credentials were not provided.",
            HtmlError::Forbidden => "You do not have permission to perform this action.",
            HtmlError::NotFound => "Not found.",
            HtmlError::MethodNotAllowed => "Method not allowed.",
            HtmlError::PayloadTooLarge => "Request body is too large.",
            HtmlError::UnsupportedMediaType => "Unsupported media type in request.",
            HtmlError::InternalServerError => "Internal server error.",
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error {
            code: self.code(),
            info: Some(info.to_owned()),
            fields: None,
            key: "detail",
        }
    }

    pub fn default(self) -> Error {
        self.new(self.default_info())
    }

    /// Builds an error whose body is the field map itself.
    pub fn fields(self, fields: FieldErrors) -> Error {
        Error {
            code: self.code(),
            info: None,
            fields: Some(fields),
            key: "detail",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub code: u16,
    pub info: Option<String>,
    pub fields: Option<FieldErrors>,
    key: &'static str,
}

impl Error {
    /// Moves the message under another top level key, e.g. `{"errors": ..}`.
    pub fn keyed(mut self, key: &'static str) -> Self {
        self.key = key;
        self
    }

    /// Single field error, rendered as `{"<field>": ["<message>"]}`.
    pub fn field(field: &str, message: &str) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_owned(), vec![message.to_owned()]);
        HtmlError::InvalidRequest.fields(fields)
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn body(&self) -> Value {
        match &self.fields {
            Some(fields) => json!(fields),
            None => json!({ self.key: self.info }),
        }
    }

    pub fn into_response(self) -> Response {
        warp::reply::with_status(warp::reply::json(&self.body()), self.status()).into_response()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.info, &self.fields) {
            (Some(info), _) => write!(f, "{} ({info})", self.code),
            (None, Some(fields)) => write!(f, "{} ({fields:?})", self.code),
            (None, None) => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for Error {}

impl reject::Reject for Error {}

/// Constraint failures that map to a client error rather than a 500.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Violation {
    Unique(Option<String>),
    ForeignKey,
}

#[derive(Debug)]
pub struct QueryError {
    info: String,
    violation: Option<Violation>,
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

impl std::error::Error for QueryError {}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            violation: None,
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) if e.is_unique_violation() => Self {
                info: format!("{e}"),
                violation: Some(Violation::Unique(e.constraint().map(str::to_owned))),
            },
            sqlx::Error::Database(e) if e.is_foreign_key_violation() => Self {
                info: format!("{e}"),
                violation: Some(Violation::ForeignKey),
            },
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(String::from("Row not found")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            e => Self::new(format!("{e}")),
        }
    }
}

/// Unique constraints on `users` that the registration form reports per field.
fn unique_field_error(constraint: &str) -> Option<Error> {
    match constraint {
        "users_email_key" => Some(Error::field(
            "email",
            "A user with that email already exists.",
        )),
        "users_username_key" => Some(Error::field(
            "username",
            "A user with that username already exists.",
        )),
        _ => None,
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        match value.violation {
            Some(Violation::Unique(constraint)) => {
                log::warn!("Unique constraint violated: {}", value.info);
                constraint
                    .as_deref()
                    .and_then(unique_field_error)
                    .unwrap_or_else(|| HtmlError::InvalidRequest.new("This object already exists."))
            }
            // The referenced row went away between the lookup and the write.
            Some(Violation::ForeignKey) => {
                log::warn!("Foreign key violated: {}", value.info);
                HtmlError::NotFound.default()
            }
            None => {
                log::error!("Query failed: {}", value.info);
                HtmlError::InternalServerError.default()
            }
        }
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}
