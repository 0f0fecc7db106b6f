// src/auth.rs

use std::sync::OnceLock;

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{error, info};
use mongodb::bson::doc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{FieldError, TaskError};
use crate::models::user::{PublicUser, User};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangePasswordRequest {
    #[serde(rename = "currentPassword")]
    pub current_password: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub username: String,
}

// JWT Creation
pub fn create_jwt(user_id: &str, secret: &str) -> Result<String, TaskError> {
    let expiration = Utc::now() + Duration::hours(24);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| {
        error!("Error signing JWT: {}", e);
        TaskError::infrastructure(e.to_string())
    })
}

// JWT Validation
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"))
}

/// Collects every field failure before reporting; returns the trimmed
/// username and email on success.
fn validate_registration(info: &RegisterRequest) -> Result<(String, String), TaskError> {
    let mut errors = Vec::new();
    let username = info.username.trim().to_string();
    let email = info.email.trim().to_string();
    if username.chars().count() < 3 {
        errors.push(FieldError::new(
            "username",
            "Username must be at least 3 characters long",
        ));
    }
    if !email_regex().is_match(&email) {
        errors.push(FieldError::new("email", "Please provide a valid email"));
    }
    if info.password.chars().count() < 6 {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 6 characters long",
        ));
    }
    if !errors.is_empty() {
        return Err(TaskError::Validation(errors));
    }
    Ok((username, email))
}

fn db_failure(context: &str, e: mongodb::error::Error) -> TaskError {
    error!("{}: {}", context, e);
    TaskError::infrastructure(e.to_string())
}

/// POST /users/register
pub async fn register(
    data: web::Data<AppState>,
    info: web::Json<RegisterRequest>,
) -> Result<HttpResponse, TaskError> {
    let (username, email) = validate_registration(&info)?;

    let users = data.mongodb.db.collection::<User>("users");
    let existing = users
        .find_one(doc! { "$or": [ { "email": &email }, { "username": &username } ] })
        .await
        .map_err(|e| db_failure("Error checking existing users", e))?;
    if existing.is_some() {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": "User already exists" })));
    }

    let hashed_password = hash(&info.password, DEFAULT_COST).map_err(|e| {
        error!("Error hashing password: {}", e);
        TaskError::infrastructure(e.to_string())
    })?;
    let new_user = User {
        user_id: Uuid::new_v4().to_string(),
        username,
        email,
        password: hashed_password,
    };
    users
        .insert_one(&new_user)
        .await
        .map_err(|e| db_failure("Error inserting user", e))?;

    info!("User registered: {}", new_user.user_id);
    let token = create_jwt(&new_user.user_id, &data.config.jwt_secret)?;
    Ok(HttpResponse::Created().json(json!({
        "token": token,
        "user": PublicUser::from(&new_user),
    })))
}

/// POST /users/login
pub async fn login(
    data: web::Data<AppState>,
    info: web::Json<LoginRequest>,
) -> Result<HttpResponse, TaskError> {
    let users = data.mongodb.db.collection::<User>("users");
    let user = users
        .find_one(doc! { "email": info.email.trim() })
        .await
        .map_err(|e| db_failure("Error logging in", e))?;

    match user {
        Some(user) if verify(&info.password, &user.password).unwrap_or(false) => {
            let token = create_jwt(&user.user_id, &data.config.jwt_secret)?;
            Ok(HttpResponse::Ok().json(json!({
                "token": token,
                "user": PublicUser::from(&user),
            })))
        }
        // Same answer whether the email or the password was wrong.
        _ => Ok(HttpResponse::Unauthorized().json(json!({ "message": "Invalid credentials" }))),
    }
}

/// PUT /users/password
pub async fn change_password(
    req: HttpRequest,
    data: web::Data<AppState>,
    info: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, TaskError> {
    let actor_id = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => {
            return Ok(HttpResponse::Unauthorized()
                .json(json!({ "message": "Authentication required" })))
        }
    };
    if info.new_password.chars().count() < 6 {
        return Err(TaskError::invalid_field(
            "newPassword",
            "Password must be at least 6 characters long",
        ));
    }

    let users = data.mongodb.db.collection::<User>("users");
    let user = users
        .find_one(doc! { "_id": &actor_id })
        .await
        .map_err(|e| db_failure("Error fetching user", e))?
        .ok_or_else(|| TaskError::not_found("User not found"))?;

    if !verify(&info.current_password, &user.password).unwrap_or(false) {
        return Ok(
            HttpResponse::BadRequest().json(json!({ "message": "Current password is incorrect" }))
        );
    }

    let hashed_password = hash(&info.new_password, DEFAULT_COST).map_err(|e| {
        error!("Error hashing password: {}", e);
        TaskError::infrastructure(e.to_string())
    })?;
    users
        .update_one(
            doc! { "_id": &actor_id },
            doc! { "$set": { "password": hashed_password } },
        )
        .await
        .map_err(|e| db_failure("Error updating password", e))?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Password updated successfully" })))
}

/// PUT /users/me
pub async fn update_profile(
    req: HttpRequest,
    data: web::Data<AppState>,
    info: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, TaskError> {
    let actor_id = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => {
            return Ok(HttpResponse::Unauthorized()
                .json(json!({ "message": "Authentication required" })))
        }
    };
    let username = info.username.trim().to_string();
    if username.chars().count() < 3 {
        return Err(TaskError::invalid_field(
            "username",
            "Username must be at least 3 characters long",
        ));
    }

    let users = data.mongodb.db.collection::<User>("users");
    let taken = users
        .find_one(doc! { "username": &username, "_id": { "$ne": &actor_id } })
        .await
        .map_err(|e| db_failure("Error checking username", e))?;
    if taken.is_some() {
        return Ok(
            HttpResponse::BadRequest().json(json!({ "message": "Username is already taken" }))
        );
    }

    let user = users
        .find_one(doc! { "_id": &actor_id })
        .await
        .map_err(|e| db_failure("Error fetching user", e))?
        .ok_or_else(|| TaskError::not_found("User not found"))?;
    users
        .update_one(
            doc! { "_id": &actor_id },
            doc! { "$set": { "username": &username } },
        )
        .await
        .map_err(|e| db_failure("Error updating profile", e))?;

    Ok(HttpResponse::Ok().json(PublicUser {
        id: user.user_id,
        username,
        email: user.email,
    }))
}
