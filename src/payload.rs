//! Login payload representation and canonicalization.
//!
//! The Telegram Login Widget delivers a flat set of string fields plus a
//! `hash` computed by the identity provider. Verification signs the
//! *data-check string*: every field except `hash`, sorted by key, rendered
//! `key=value` and joined with newlines. Values are used verbatim: the
//! upstream scheme applies no escaping, and the string must be bit-exact.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{AuthError, AuthResult};

/// Fields a login payload must carry, in the order they are checked.
/// The fixed order keeps rejection messages deterministic.
pub const REQUIRED_FIELDS: [&str; 4] = ["id", "first_name", "auth_date", "hash"];

/// Raw login payload from the identity provider.
///
/// Backed by a `BTreeMap`, so iteration order is already the lexicographic
/// key order the signing scheme requires, regardless of the order fields
/// arrived in. Unknown fields are kept: everything except `hash` is signed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginPayload(BTreeMap<String, String>);

impl LoginPayload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a payload from key/value pairs. Later duplicates win.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Insert a field, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of fields, including `hash`.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the payload carries no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first required field missing from this payload, if any.
    pub fn missing_required_field(&self) -> Option<&'static str> {
        REQUIRED_FIELDS
            .into_iter()
            .find(|name| !self.0.contains_key(*name))
    }

    /// Build the canonical data-check string: all fields except `hash`,
    /// sorted ascending by key, `key=value` joined with `\n`. No escaping.
    pub fn data_check_string(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.0 {
            if key == "hash" {
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
        out
    }
}

/// Identity projected from a verified login payload.
///
/// Optional fields are omitted from JSON when absent.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResolvedUser {
    /// Telegram user id
    pub id: i64,

    /// First name (always present on a valid payload)
    pub first_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl ResolvedUser {
    /// Project a user from a payload whose signature has already been
    /// verified. Fails if `id` is absent or not an integer.
    pub fn from_payload(payload: &LoginPayload) -> AuthResult<Self> {
        let id = payload
            .get("id")
            .ok_or(AuthError::MissingField("id"))?
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidUserId)?;

        let first_name = payload
            .get("first_name")
            .ok_or(AuthError::MissingField("first_name"))?
            .to_string();

        let opt = |key: &str| payload.get(key).map(str::to_string);

        Ok(Self {
            id,
            first_name,
            last_name: opt("last_name"),
            username: opt("username"),
            photo_url: opt("photo_url"),
            language_code: opt("language_code"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LoginPayload {
        LoginPayload::from_pairs([
            ("id", "1000"),
            ("first_name", "Tester"),
            ("username", "qa_bot"),
            ("auth_date", "1700000000"),
            ("hash", "abcdef"),
        ])
    }

    #[test]
    fn data_check_string_excludes_hash_and_sorts() {
        let s = sample().data_check_string();
        assert_eq!(
            s,
            "auth_date=1700000000\nfirst_name=Tester\nid=1000\nusername=qa_bot"
        );
        assert!(!s.contains("hash"));
    }

    #[test]
    fn data_check_string_is_order_independent() {
        let forward = sample();
        let reversed = LoginPayload::from_pairs([
            ("hash", "abcdef"),
            ("auth_date", "1700000000"),
            ("username", "qa_bot"),
            ("first_name", "Tester"),
            ("id", "1000"),
        ]);
        assert_eq!(forward.data_check_string(), reversed.data_check_string());
    }

    #[test]
    fn unknown_fields_are_signed() {
        let mut payload = sample();
        payload.insert("custom_field", "x");
        assert!(payload.data_check_string().contains("custom_field=x"));
    }

    #[test]
    fn values_are_verbatim() {
        let payload = LoginPayload::from_pairs([("first_name", "a=b\nc"), ("id", "1")]);
        assert_eq!(payload.data_check_string(), "first_name=a=b\nc\nid=1");
    }

    #[test]
    fn missing_required_field_checks_in_fixed_order() {
        let empty = LoginPayload::new();
        assert_eq!(empty.missing_required_field(), Some("id"));

        let mut payload = LoginPayload::new();
        payload.insert("id", "1");
        assert_eq!(payload.missing_required_field(), Some("first_name"));

        assert_eq!(sample().missing_required_field(), None);
    }

    #[test]
    fn resolved_user_projection() {
        let user = ResolvedUser::from_payload(&sample()).unwrap();
        assert_eq!(user.id, 1000);
        assert_eq!(user.first_name, "Tester");
        assert_eq!(user.username.as_deref(), Some("qa_bot"));
        assert_eq!(user.last_name, None);
    }

    #[test]
    fn resolved_user_rejects_non_integer_id() {
        let mut payload = sample();
        payload.insert("id", "not-a-number");
        assert!(matches!(
            ResolvedUser::from_payload(&payload),
            Err(AuthError::InvalidUserId)
        ));
    }

    #[test]
    fn resolved_user_json_skips_absent_fields() {
        let user = ResolvedUser::from_payload(&sample()).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], 1000);
        assert_eq!(json["username"], "qa_bot");
        assert!(json.get("last_name").is_none());
        assert!(json.get("photo_url").is_none());
    }
}
