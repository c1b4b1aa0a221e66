use std::env;

/// Runtime configuration shared by both gateway services.
///
/// Host, port and database URL are read by each service at startup;
/// everything here is the cross-cutting remainder.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Public base URL this gateway is reachable at, used to build the
    /// status-callback URLs handed to the vendor.
    pub public_base_url: String,
    /// When true, operations with no resolvable credential proceed with a
    /// synthetic default bundle instead of failing. Off by default: the
    /// default vendor domain is almost certainly wrong for a real tenant.
    pub allow_default_credentials: bool,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let public_base_url = env::var("EXOGATE_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8085".to_string())
            .trim_end_matches('/')
            .to_string();

        let allow_default_credentials = env::var("EXOGATE_ALLOW_DEFAULT_AUTH")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            public_base_url,
            allow_default_credentials,
        }
    }
}
