use serde_json::json;

use crate::gateway::{HttpGateway, RecordGateway};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::str_param;
use crate::ipc::types::{AppState, Request};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "gatewayUrl": state.gateway.as_ref().map(|g| g.describe()),
        }),
    )
}

fn handle_configure(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(url) = str_param(&req.params, "url") else {
        return err(&req.id, "bad_params", "missing url", None);
    };
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return err(
            &req.id,
            "bad_params",
            "gateway url must start with http:// or https://",
            None,
        );
    }

    let gateway = match HttpGateway::new(&url) {
        Ok(g) => g,
        Err(e) => return err(&req.id, "gateway_error", e.to_string(), None),
    };
    let described = gateway.describe();
    state.gateway = Some(Box::new(gateway));
    state.reset_views();
    tracing::info!(url = %described, "record gateway configured");

    ok(&req.id, json!({ "gatewayUrl": described }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "gateway.configure" => Some(handle_configure(state, req)),
        _ => None,
    }
}
