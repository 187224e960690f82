#![allow(async_fn_in_trait)]

extern crate actix_web;
extern crate chrono;
extern crate default;
extern crate dotenv;
extern crate hex;
extern crate itertools;
extern crate jsonwebtoken;
extern crate log;
extern crate rand;
extern crate serde;
extern crate sha2;
extern crate thiserror;
extern crate tokio;
extern crate uuid;

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod handlers;
pub mod impls;
pub mod middlewares;

use actix_web::web::{self, delete, get, post, put, resource, scope, JsonConfig, PathConfig};

use crate::core::ports::repository::Manager;
use crate::error::Error;
use crate::middlewares::jwt::JwtAuth;

/// Registers the `/api` routes for a store of type `M`.
///
/// The app must provide `Data<M>`, `Data<JWT>` and `Data<Config>`.
pub fn configure<M>(cfg: &mut web::ServiceConfig)
where
    M: Manager + 'static,
{
    cfg.app_data(JsonConfig::default().error_handler(|err, _| Error::Invalid(err.to_string()).into()))
        .app_data(PathConfig::default().error_handler(|err, _| Error::Invalid(err.to_string()).into()))
        .service(
            scope("/api")
                .route("/register", post().to(handlers::register::<M>))
                .route("/login", post().to(handlers::login::<M>))
                .service(
                    scope("")
                        .wrap(JwtAuth::<M>::new())
                        .service(
                            resource("/account")
                                .route(get().to(handlers::account::detail::<M>))
                                .route(put().to(handlers::account::update::<M>)),
                        )
                        .service(
                            scope("/polls")
                                .route("", get().to(handlers::poll::list::<M>))
                                .route("", post().to(handlers::poll::create::<M>))
                                .service(
                                    scope("/{poll_id}")
                                        .route("", get().to(handlers::poll::detail::<M>))
                                        .route("", put().to(handlers::poll::rename::<M>))
                                        .route("", delete().to(handlers::poll::delete_poll::<M>))
                                        .route("/join", post().to(handlers::poll::join::<M>))
                                        .route("/results", get().to(handlers::poll::results::<M>))
                                        .route("/options", post().to(handlers::option::add::<M>))
                                        .route("/options", get().to(handlers::option::list::<M>))
                                        .route("/vote", post().to(handlers::vote::cast::<M>))
                                        .route("/unvote", post().to(handlers::vote::retract::<M>)),
                                ),
                        ),
                ),
        );
}
