use actix_web::{web, HttpResponse, Responder};

use crate::agents::SupervisorRequest;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/agent/invoke").route(web::post().to(invoke)));
}

async fn invoke(state: web::Data<AppState>, body: web::Json<SupervisorRequest>) -> impl Responder {
    let request = body.into_inner();
    log::info!(
        "[AGENT] Invoke on thread {} ({} chars)",
        request.thread_id.as_deref().unwrap_or("default"),
        request.input.len()
    );

    match state.supervisor.run(request).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => {
            log::error!("[AGENT] Supervisor failed: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "detail": e
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Supervisor;
    use crate::ai::{AiResponse, MockAiClient};
    use crate::config::Config;
    use crate::context::RunContext;
    use crate::testing::{FakeBroker, FakeSearch};
    use actix_web::{test, App};
    use std::sync::Arc;

    fn state(responses: Vec<AiResponse>) -> AppState {
        let broker = Arc::new(FakeBroker::default());
        let run = RunContext::builder(
            Arc::new(MockAiClient::new(responses)),
            Arc::new(FakeSearch::new(vec![])),
            broker.clone(),
        )
        .build();
        AppState {
            config: Config::from_lookup(|key| match key {
                "OPENAI_API_KEY" => Some("sk-test".to_string()),
                "COMPOSIO_API_KEY" => Some("ck-test".to_string()),
                "COMPOSIO_USER_ID" => Some("user-1".to_string()),
                _ => None,
            })
            .unwrap(),
            run_context: run.clone(),
            supervisor: Arc::new(Supervisor::new(run)),
            linker: broker,
        }
    }

    #[actix_web::test]
    async fn test_invoke_returns_outcome() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(vec![AiResponse::text("Hello there")])))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/agent/invoke")
            .set_json(serde_json::json!({"input": "hi", "thread_id": "t-1"}))
            .to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["output"], "Hello there");
        assert_eq!(resp["thread_id"], "t-1");
        assert_eq!(resp["iterations"], 1);
        assert!(resp["todos"].as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_invoke_model_failure_is_500() {
        let app = test::init_service(App::new().app_data(web::Data::new(state(vec![]))).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/agent/invoke")
            .set_json(serde_json::json!({"input": "hi"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["detail"].as_str().unwrap().contains("Model error"));
    }
}
