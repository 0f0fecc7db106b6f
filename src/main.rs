// src/main.rs

mod app_state;
mod auth;
mod board;
mod board_server;
mod config;
mod db;
mod error;
#[cfg(test)]
mod memory_store;
mod models;
mod task_service;
mod task_store;
mod tasks;
mod user_directory;
mod web_socket;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix::Actor;
use actix_cors::Cors;
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    error::{InternalError, JsonPayloadError, QueryPayloadError},
    http,
    middleware::Logger,
    web, App, Error, HttpMessage, HttpRequest, HttpResponse, HttpServer, Responder,
};
use env_logger::Env;
use futures::future::{ok, Ready};
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::{change_password, login, register, update_profile, validate_jwt};
use crate::tasks::{
    add_comment, create_task, delete_task, get_board, get_task, list_tasks, update_task,
    update_task_status,
};
use crate::web_socket::ws_index;

#[derive(Debug)]
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware { service })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        // Extract "Bearer <token>" from the Authorization header if present.
        // A request with no header passes through anonymous; handlers that
        // need an identity answer 401 themselves.
        if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
            if let Ok(auth_str) = auth_header.to_str() {
                if auth_str.starts_with("Bearer ") {
                    let token = auth_str.trim_start_matches("Bearer ").trim().to_string();
                    let secret = req
                        .app_data::<web::Data<AppState>>()
                        .map(|data| data.config.jwt_secret.clone())
                        .unwrap_or_default();
                    match validate_jwt(&token, &secret) {
                        Ok(claims) => {
                            // Insert the actor id as a string extension
                            req.extensions_mut().insert(claims.sub);
                        }
                        Err(e) => {
                            let (req_parts, _payload) = req.into_parts();
                            let resp = HttpResponse::Unauthorized()
                                .json(json!({ "message": format!("Invalid token: {}", e) }))
                                .map_into_boxed_body();
                            let srv_resp = ServiceResponse::new(req_parts, resp);
                            return Box::pin(async move { Ok(srv_resp) });
                        }
                    }
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

/// Malformed or schema-violating JSON bodies come back in the same
/// envelope field validation uses.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    let body = json!({
        "message": "Validation Error",
        "errors": [{ "field": "body", "message": err.to_string() }],
    });
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}

fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> Error {
    let body = json!({
        "message": "Validation Error",
        "errors": [{ "field": "query", "message": err.to_string() }],
    });
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}

async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({ "message": "Welcome to Task Management System API" }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env();
    let mongodb = Arc::new(db::MongoDB::init(&config.mongo_uri, &config.database_name).await);
    let board_server = board_server::BoardServer::new().start();
    let task_store = Arc::new(task_store::MongoTaskStore::new(&mongodb.db));

    let state = AppState {
        board_server,
        mongodb: mongodb.clone(),
        tasks: task_service::TaskService::new(task_store),
        users: user_directory::UserDirectory::new(&mongodb.db),
        config: config.clone(),
    };

    let frontend_origin = config.frontend_origin.clone();
    let bind_addr = config.bind_addr.clone();

    println!("Server running at http://{}", bind_addr);
    println!("Allowed CORS Origin: {}", frontend_origin);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication)
            .app_data(web::Data::new(state.clone()))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .route("/", web::get().to(index))
            // USERS
            .service(
                web::scope("/users")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/password", web::put().to(change_password))
                    .route("/me", web::put().to(update_profile)),
            )
            // TASKS
            .service(
                web::scope("/tasks")
                    .route("", web::get().to(list_tasks))
                    .route("", web::post().to(create_task))
                    .route("/board", web::get().to(get_board))
                    .route("/{id}", web::get().to(get_task))
                    .route("/{id}", web::put().to(update_task))
                    .route("/{id}", web::delete().to(delete_task))
                    .route("/{id}/status", web::patch().to(update_task_status))
                    .route("/{id}/comments", web::post().to(add_comment)),
            )
            // WEBSOCKET route for real-time board updates
            .service(web::resource("/ws").route(web::get().to(ws_index)))
    })
    .bind(&bind_addr)?
    .run()
    .await
}
