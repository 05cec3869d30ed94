use actix_web::{web, HttpResponse, Responder};

use crate::{config::Config, AppState};

/// Version from Cargo.toml, available at compile time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(root)));
    cfg.service(web::resource("/api/health").route(web::get().to(health_check)));
    cfg.service(web::resource("/api/health/config").route(web::get().to(get_config_status)));
}

async fn root() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "foreman-backend",
        "version": VERSION,
        "endpoints": {
            "agent": "/agent/invoke",
            "health": "/api/health",
            "composio": "/api/composio"
        }
    }))
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": VERSION
    }))
}

async fn get_config_status(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "env": Config::env_summary(),
        "model": state.config.openai_model,
        "plan_extraction": state.config.plan_extraction.to_string(),
        "known_integrations": state.config.known_integrations,
        "tool_search_configured": state.config.tool_hub_url.is_some()
    }))
}
