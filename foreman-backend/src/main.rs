use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;

use foreman_backend::config::Config;
use foreman_backend::{controllers, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            log::error!("{}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };
    let host = config.host.clone();
    let port = config.port;

    log::info!("Initializing agents (model {})", config.openai_model);
    let state = AppState::from_config(config).map_err(|e| {
        log::error!("Failed to initialize: {}", e);
        std::io::Error::other(e)
    })?;
    log::info!(
        "Known integrations: {}",
        state.run_context.known_domains.join(", ")
    );
    let state = web::Data::new(state);

    log::info!("Starting server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::agent::config)
            .configure(controllers::composio::config)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
