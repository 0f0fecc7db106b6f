// src/user_directory.rs

use std::collections::{HashMap, HashSet};

use futures_util::StreamExt;
use log::error;
use mongodb::bson::doc;
use mongodb::{Collection, Database};

use crate::error::TaskError;
use crate::models::user::{PublicUser, User};

/// Read-side user lookups, used to expand creator, assignee and comment
/// author ids into `{id, username, email}` objects on the way out.
#[derive(Clone)]
pub struct UserDirectory {
    users: Collection<User>,
}

impl UserDirectory {
    pub fn new(db: &Database) -> Self {
        UserDirectory {
            users: db.collection::<User>("users"),
        }
    }

    fn lookup_failure(err: mongodb::error::Error) -> TaskError {
        error!("User lookup failure: {}", err);
        TaskError::infrastructure(err.to_string())
    }

    pub async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, TaskError> {
        self.users
            .find_one(doc! { "_id": user_id })
            .await
            .map_err(Self::lookup_failure)
    }

    /// Resolves a batch of ids in one query. Ids with no matching user are
    /// simply absent from the map; callers render those references as null.
    pub async fn lookup_many(
        &self,
        ids: impl IntoIterator<Item = String>,
    ) -> Result<HashMap<String, PublicUser>, TaskError> {
        let unique: Vec<String> = ids
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if unique.is_empty() {
            return Ok(HashMap::new());
        }
        let mut cursor = self
            .users
            .find(doc! { "_id": { "$in": &unique } })
            .await
            .map_err(Self::lookup_failure)?;
        let mut found = HashMap::new();
        while let Some(user_res) = cursor.next().await {
            match user_res {
                Ok(user) => {
                    found.insert(user.user_id.clone(), PublicUser::from(&user));
                }
                Err(e) => {
                    error!("Error reading users cursor: {}", e);
                    return Err(TaskError::infrastructure(e.to_string()));
                }
            }
        }
        Ok(found)
    }
}
