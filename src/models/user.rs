use serde::{Deserialize, Serialize};

/// A stored account. The password field holds the bcrypt hash and never
/// leaves the server; responses use [`PublicUser`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// The shape user references take on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.user_id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_view_drops_the_password() {
        let user = User {
            user_id: "u-1".to_string(),
            username: "marta".to_string(),
            email: "marta@example.com".to_string(),
            password: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
        };
        let public = PublicUser::from(&user);
        let value = serde_json::to_value(&public).unwrap();
        assert_eq!(value["id"], "u-1");
        assert_eq!(value["username"], "marta");
        assert!(value.get("password").is_none());
    }

    #[test]
    fn stored_user_keys_on_underscore_id() {
        let user = User {
            user_id: "u-9".to_string(),
            username: "jo".to_string(),
            email: "jo@example.com".to_string(),
            password: "hash".to_string(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["_id"], "u-9");
        assert!(value.get("user_id").is_none());
    }
}
