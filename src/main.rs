use actix_web::middleware::Logger;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use log::info;

use bitebattle::config::Config;
use bitebattle::impls::storage::memory::MemoryStore;
use bitebattle::impls::tokener::jwt::JWT;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Config::from_env().context("failed to load configuration")?;

    let store = Data::new(MemoryStore::new(config.lock_timeout));
    let tokener = Data::new(JWT::new(config.jwt_secret.as_bytes().to_vec()));
    let bind = (config.host.clone(), config.port);
    info!("vote policy: {:?}, lock timeout: {:?}", config.vote_policy, config.lock_timeout);
    let config = Data::new(config);

    info!("listening on {}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(store.clone())
            .app_data(tokener.clone())
            .app_data(config.clone())
            .configure(bitebattle::configure::<MemoryStore>)
    })
    .bind(bind)
    .context("failed to bind listener")?
    .run()
    .await
    .context("server exited with error")
}
