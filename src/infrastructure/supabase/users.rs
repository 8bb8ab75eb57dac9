//! Normalization of the admin user listing.
//!
//! Depending on the auth server version the listing is either an object with a
//! `users` array or a bare array. Both are reduced to the first user's UUID
//! here so nothing past the client boundary sees the raw shape.

use crate::domain::errors::StoreError;
use serde_json::Value;
use uuid::Uuid;

pub fn first_user_id(body: &Value) -> Result<Uuid, StoreError> {
    let users = match body {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("users") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(StoreError::UnexpectedShape {
                    detail: format!("'users' is not a list: {}", truncate(other)),
                });
            }
            None => {
                return Err(StoreError::UnexpectedShape {
                    detail: "user listing has no 'users' field".to_string(),
                });
            }
        },
        other => {
            return Err(StoreError::UnexpectedShape {
                detail: format!("user listing is not a list or object: {}", truncate(other)),
            });
        }
    };

    let first = users.first().ok_or(StoreError::NoUsers)?;
    let id = first
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::UnexpectedShape {
            detail: format!("user record without a string id: {}", truncate(first)),
        })?;

    Uuid::parse_str(id).map_err(|e| StoreError::UnexpectedShape {
        detail: format!("user id '{}' is not a UUID: {}", id, e),
    })
}

fn truncate(value: &Value) -> String {
    let mut text = value.to_string();
    if text.len() > 120 {
        let mut cut = 120;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ID: &str = "5f0c3c1e-8f4a-4c55-9d55-2f1b0b7f8a11";

    #[test]
    fn test_wrapped_listing() {
        let body = json!({"users": [{"id": ID, "email": "a@b.c"}], "aud": "authenticated"});
        assert_eq!(first_user_id(&body).unwrap().to_string(), ID);
    }

    #[test]
    fn test_bare_listing() {
        let body = json!([{"id": ID}, {"id": "ignored"}]);
        assert_eq!(first_user_id(&body).unwrap().to_string(), ID);
    }

    #[test]
    fn test_empty_listing() {
        assert!(matches!(
            first_user_id(&json!({"users": []})),
            Err(StoreError::NoUsers)
        ));
        assert!(matches!(first_user_id(&json!([])), Err(StoreError::NoUsers)));
    }

    #[test]
    fn test_unrecognized_shapes() {
        for body in [
            json!("users"),
            json!({"data": []}),
            json!({"users": {"id": ID}}),
            json!([{"uid": ID}]),
            json!([{"id": 42}]),
            json!([{"id": "not-a-uuid"}]),
        ] {
            assert!(
                matches!(first_user_id(&body), Err(StoreError::UnexpectedShape { .. })),
                "accepted {}",
                body
            );
        }
    }
}
