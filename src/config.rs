use std::env;

/// Environment variable naming the record store base address. When unset
/// the chrome must send `gateway.configure` before any data method.
pub const GATEWAY_URL_ENV: &str = "ROSTERD_GATEWAY_URL";

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub gateway_url: Option<String>,
}

pub fn load() -> Config {
    // A .env next to the binary is a convenience for packaged installs.
    dotenvy::dotenv().ok();
    let gateway_url = env::var(GATEWAY_URL_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    Config { gateway_url }
}
