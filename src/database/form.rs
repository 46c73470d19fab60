use serde_json::{Map, Value};
use url::form_urlencoded;

use super::error::{Error, FieldErrors, HtmlError};

pub type FormData = Map<String, Value>;

pub const REQUIRED: &str = "This field is required.";

/// JSON request body read field by field. Every failed read is recorded under
/// the field's name and reported together by [`Form::finish`].
pub struct Form {
    inner: FormData,
    errors: FieldErrors,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self {
            inner: data,
            errors: FieldErrors::new(),
        }
    }

    pub fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(data) => Ok(Self::from_data(data)),
            _ => Err(HtmlError::InvalidRequest.new("Invalid data. Expected a dictionary.")),
        }
    }

    /// Present and not `null`.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.get(key).is_some_and(|value| !value.is_null())
    }

    pub fn add_error(&mut self, key: &str, message: impl Into<String>) {
        self.errors
            .entry(key.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn get_str(&mut self, key: &str, max_len: usize) -> Option<String> {
        if !self.contains(key) {
            self.add_error(key, REQUIRED);
            return None;
        }
        self.get_optional_str(key, max_len)
    }

    pub fn get_optional_str(&mut self, key: &str, max_len: usize) -> Option<String> {
        let value = match self.inner.get(key) {
            Some(Value::Null) | None => return None,
            Some(Value::String(value)) => value.trim().to_owned(),
            Some(_) => {
                self.add_error(key, "Not a valid string.");
                return None;
            }
        };

        if value.is_empty() {
            self.add_error(key, "This field may not be blank.");
            return None;
        }
        if value.chars().count() > max_len {
            self.add_error(
                key,
                format!("Ensure this field has no more than {max_len} characters."),
            );
            return None;
        }
        Some(value)
    }

    pub fn get_int(&mut self, key: &str, min: i32, max: i32) -> Option<i32> {
        if !self.contains(key) {
            self.add_error(key, REQUIRED);
            return None;
        }
        self.get_optional_int(key, min, max)
    }

    pub fn get_optional_int(&mut self, key: &str, min: i32, max: i32) -> Option<i32> {
        let value = match self.inner.get(key) {
            Some(Value::Null) | None => return None,
            Some(Value::Number(number)) => number.as_i64(),
            Some(Value::String(value)) => value.trim().parse::<i64>().ok(),
            Some(_) => None,
        };

        let Some(value) = value else {
            self.add_error(key, "A valid integer is required.");
            return None;
        };
        if value < i64::from(min) {
            self.add_error(
                key,
                format!("Ensure this value is greater than or equal to {min}."),
            );
            return None;
        }
        if value > i64::from(max) {
            self.add_error(
                key,
                format!("Ensure this value is less than or equal to {max}."),
            );
            return None;
        }
        i32::try_from(value).ok()
    }

    pub fn get_list(&mut self, key: &str) -> Option<Vec<Value>> {
        match self.inner.get(key) {
            Some(Value::Null) | None => {
                self.add_error(key, REQUIRED);
                None
            }
            Some(Value::Array(values)) => Some(values.to_owned()),
            Some(_) => {
                self.add_error(key, "Expected a list of items.");
                None
            }
        }
    }

    pub fn into_errors(self) -> FieldErrors {
        self.errors
    }

    pub fn finish(self) -> Result<(), Error> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(HtmlError::InvalidRequest.fields(self.errors))
    }
}

/// Decoded query string. Keys may repeat (`?tags=a&tags=b`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(raw: &str) -> Self {
        Self {
            pairs: form_urlencoded::parse(raw.as_bytes())
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// `1` and `true` switch a filter on, anything else leaves it off.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some("1") | Some("true") | Some("True"))
    }

    pub fn get_int(&self, key: &str) -> Result<Option<i64>, Error> {
        match self.get(key) {
            None | Some("") => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| Error::field(key, "A valid integer is required.")),
        }
    }

    /// Query string with `key` replaced by `value`, or removed when `value` is `None`.
    pub fn with(&self, key: &str, value: Option<&str>) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in self.pairs.iter().filter(|(k, _)| k != key) {
            serializer.append_pair(k, v);
        }
        if let Some(value) = value {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}
