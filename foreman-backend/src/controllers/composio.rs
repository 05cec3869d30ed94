//! Server-side proxy for account linking and direct tool execution, so the
//! frontend never holds the broker API key.

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::integrations::{AccountFilter, ToolInvocation};
use crate::AppState;

const DEFAULT_WAIT_TIMEOUT_MS: u64 = 120_000;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/composio")
            .service(web::resource("/connected-accounts").route(web::get().to(list_connected_accounts)))
            .service(
                web::resource("/connected-accounts/{account_id}").route(web::delete().to(delete_connected_account)),
            )
            .service(web::resource("/connect").route(web::post().to(initiate_connection)))
            .service(web::resource("/wait-for-connection").route(web::post().to(wait_for_connection)))
            .service(web::resource("/tools/execute/{tool_slug}").route(web::post().to(execute_tool)))
            .service(web::resource("/health").route(web::get().to(health_check))),
    );
}

#[derive(Debug, Deserialize)]
struct ConnectRequest {
    user_id: String,
    auth_config_id: String,
    #[serde(default)]
    callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaitForConnectionRequest {
    connection_id: String,
    #[serde(default)]
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ExecuteRequest {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    connected_account_id: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
}

fn server_error(context: &str, e: String) -> HttpResponse {
    log::error!("[COMPOSIO] {}: {}", context, e);
    HttpResponse::InternalServerError().json(json!({
        "detail": format!("{}: {}", context, e)
    }))
}

/// Repeated keys and comma-separated values both accumulate
fn account_filter(pairs: &[(String, String)]) -> AccountFilter {
    let mut filter = AccountFilter::default();
    for (key, value) in pairs {
        let target = match key.trim_end_matches("[]") {
            "user_ids" => &mut filter.user_ids,
            "toolkit_slugs" => &mut filter.toolkit_slugs,
            "auth_config_ids" => &mut filter.auth_config_ids,
            _ => continue,
        };
        target.extend(
            value
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        );
    }
    filter
}

async fn list_connected_accounts(
    state: web::Data<AppState>,
    query: web::Query<Vec<(String, String)>>,
) -> impl Responder {
    let filter = account_filter(&query);
    match state.linker.list_connected_accounts(&filter).await {
        Ok(accounts) => {
            let items: Vec<Value> = accounts
                .iter()
                .map(|account| {
                    json!({
                        "id": account.id,
                        "status": account.status,
                        "user_id": account.user_id,
                        "toolkit": { "slug": account.toolkit_slug.clone().unwrap_or_default() },
                    })
                })
                .collect();
            HttpResponse::Ok().json(json!({
                "total": items.len(),
                "items": items,
            }))
        }
        Err(e) => server_error("Failed to list connected accounts", e),
    }
}

async fn initiate_connection(state: web::Data<AppState>, body: web::Json<ConnectRequest>) -> impl Responder {
    let request = body.into_inner();
    log::info!(
        "[COMPOSIO] Initiating connection for user {} with auth config {}",
        request.user_id,
        request.auth_config_id
    );

    match state
        .linker
        .initiate_connection(&request.user_id, &request.auth_config_id, request.callback_url.as_deref())
        .await
    {
        Ok(connection) => match connection.redirect_url {
            Some(redirect_url) => HttpResponse::Ok().json(json!({
                "redirectUrl": redirect_url,
                "connectionId": connection.connection_id.unwrap_or_default(),
            })),
            None => server_error(
                "Failed to initiate connection",
                "Composio did not return a redirect URL".to_string(),
            ),
        },
        Err(e) => server_error("Failed to initiate connection", e),
    }
}

async fn wait_for_connection(
    state: web::Data<AppState>,
    body: web::Json<WaitForConnectionRequest>,
) -> impl Responder {
    let request = body.into_inner();
    let timeout = request.timeout_ms.unwrap_or(DEFAULT_WAIT_TIMEOUT_MS);

    match state.linker.wait_for_connection(&request.connection_id, timeout).await {
        Ok(account) => HttpResponse::Ok().json(json!({
            "status": account.status,
            "connectedAccountId": account.id,
        })),
        Err(e) => server_error("Failed to wait for connection", e),
    }
}

async fn delete_connected_account(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let account_id = path.into_inner();
    match state.linker.delete_connected_account(&account_id).await {
        Ok(()) => {
            log::info!("[COMPOSIO] Deleted connected account {}", account_id);
            HttpResponse::Ok().json(json!({
                "success": true,
                "message": format!("Connected account {} deleted", account_id),
            }))
        }
        Err(e) => server_error("Failed to delete connected account", e),
    }
}

async fn execute_tool(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ExecuteRequest>,
) -> impl Responder {
    let tool_slug = path.into_inner();
    let request = body.into_inner();

    let user_id = match request.user_id.filter(|u| !u.trim().is_empty()) {
        Some(u) => u,
        None => {
            return HttpResponse::BadRequest().json(json!({
                "detail": "user_id is required"
            }));
        }
    };
    let arguments = match request.arguments {
        Some(Value::Object(map)) => Value::Object(map),
        _ => json!({}),
    };

    let invocation = ToolInvocation {
        tool_name: tool_slug.clone(),
        user_id,
        connected_account_id: request.connected_account_id,
        arguments,
    };

    match state.linker.execute_tool(invocation).await {
        Ok(result) => {
            let data = match result {
                Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
                other => other,
            };
            HttpResponse::Ok().json(json!({
                "data": data,
                "success": true,
            }))
        }
        Err(e) => server_error(&format!("Failed to execute tool {}", tool_slug), e),
    }
}

async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "composio_configured": !state.config.composio_api_key.is_empty(),
    }))
}
