use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Prefix for session keys derived from the local execution unit rather
/// than a transport session. Keys carrying it take part in the detached
/// fallback scan below.
const DETACHED_PREFIX: &str = "detached-";

/// Well-known key a transport layer may bind a header under so that
/// detached invocations can find it.
pub const GLOBAL_SESSION_KEY: &str = "detached-global";

const DEFAULT_FROM_NUMBER: &str = "default_from";
const DEFAULT_CALLER_ID: &str = "default_caller";
const DEFAULT_API_DOMAIN: &str = "https://api.exotel.com";
const DEFAULT_ACCOUNT_SID: &str = "default_account";
const DEFAULT_PORTAL_URL: &str = "https://my.exotel.com";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingHeader,
    #[error("no credential available for this session")]
    NoCredential,
}

/// Authentication scheme tag recognized in inbound headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Basic,
    Bearer,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Basic => "Basic",
            AuthScheme::Bearer => "Bearer",
        }
    }
}

/// Parsed credential bundle for one vendor operation.
///
/// Built fresh from the raw header for every logical operation and never
/// mutated afterwards. `token_digest` doubles as the tenant/user id in
/// callback rows and callback URLs, so it is never empty: a synthetic
/// token is substituted when no real one exists.
#[derive(Debug, Clone)]
pub struct AuthData {
    pub token: String,
    pub token_digest: String,
    pub from_number: String,
    pub caller_id: String,
    pub api_domain: String,
    pub account_sid: String,
    pub portal_url: String,
    pub scheme: AuthScheme,
}

impl AuthData {
    /// Parse a raw `Authorization` header value.
    ///
    /// Accepted shapes, most to least structured:
    /// - `Bearer {json}` / `Basic {json}` — scheme recorded, remainder
    ///   parsed as a JSON object (single quotes and a missing outer `{}`
    ///   are tolerated), fields mapped by name with defaults for absences;
    /// - bare JSON object — as above with the default `Basic` scheme;
    /// - anything else — the scheme-stripped remainder becomes the token
    ///   verbatim and every other field is defaulted.
    ///
    /// Only an absent/blank header is an error; malformed content degrades.
    pub fn parse(header: &str) -> Result<Self, AuthError> {
        let trimmed = header.trim();
        if trimmed.is_empty() {
            return Err(AuthError::MissingHeader);
        }

        let (scheme, body) = if let Some(rest) = trimmed.strip_prefix("Bearer ") {
            (AuthScheme::Bearer, rest.trim())
        } else if let Some(rest) = trimmed.strip_prefix("Basic ") {
            (AuthScheme::Basic, rest.trim())
        } else {
            (AuthScheme::Basic, trimmed)
        };

        match parse_json_body(body) {
            Some(fields) => {
                let token = match fields.get("token") {
                    Some(token) if !token.is_empty() => token.clone(),
                    _ => {
                        warn!("Auth header parsed but carries no token, using synthetic token");
                        synthetic_token()
                    }
                };
                let field = |name: &str, default: &str| {
                    fields
                        .get(name)
                        .cloned()
                        .unwrap_or_else(|| default.to_string())
                };
                Ok(Self {
                    token_digest: token_digest(&token),
                    token,
                    from_number: field("from_number", DEFAULT_FROM_NUMBER),
                    caller_id: field("caller_id", DEFAULT_CALLER_ID),
                    api_domain: field("api_domain", DEFAULT_API_DOMAIN),
                    account_sid: field("account_sid", DEFAULT_ACCOUNT_SID),
                    portal_url: field("exotel_portal_url", DEFAULT_PORTAL_URL),
                    scheme,
                })
            }
            None => {
                debug!("Auth header is not JSON-shaped, treating it as an opaque token");
                Ok(Self::opaque(body.to_string(), scheme))
            }
        }
    }

    /// Bundle for an opaque token with every tenant field defaulted.
    fn opaque(token: String, scheme: AuthScheme) -> Self {
        Self {
            token_digest: token_digest(&token),
            token,
            from_number: DEFAULT_FROM_NUMBER.to_string(),
            caller_id: DEFAULT_CALLER_ID.to_string(),
            api_domain: DEFAULT_API_DOMAIN.to_string(),
            account_sid: DEFAULT_ACCOUNT_SID.to_string(),
            portal_url: DEFAULT_PORTAL_URL.to_string(),
            scheme,
        }
    }

    /// Last-resort bundle used when no credential could be resolved and the
    /// deployment allows degraded operation. The synthetic token keeps the
    /// digest stable enough to act as a pseudo-identity for one operation.
    pub fn fallback() -> Self {
        Self::opaque(synthetic_token(), AuthScheme::Basic)
    }

    /// `Authorization` header value for an outbound vendor call.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.scheme.as_str(), self.token)
    }
}

fn synthetic_token() -> String {
    format!("default_token_{}", chrono::Utc::now().timestamp_millis())
}

/// Lowercase hex MD5 of the token; the stable per-tenant identifier.
pub fn token_digest(token: &str) -> String {
    format!("{:x}", md5::compute(token.as_bytes()))
}

/// Attempt to read the header body as a flat JSON object, tolerating single
/// quotes and a missing outer brace pair. Returns None when it cannot be
/// made into JSON.
fn parse_json_body(body: &str) -> Option<HashMap<String, String>> {
    let mut candidate = body.trim().to_string();
    if candidate.contains('\'') {
        candidate = candidate.replace('\'', "\"");
    }
    if !candidate.starts_with('{') {
        candidate = format!("{{{candidate}}}");
    }

    let parsed: Value = serde_json::from_str(&candidate).ok()?;
    let object = parsed.as_object()?;

    let mut fields = HashMap::new();
    for (key, value) in object {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        fields.insert(key.clone(), text);
    }
    Some(fields)
}

/// Identity of the logical caller for one operation, carried explicitly
/// through the call chain instead of re-derived from ambient state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_key: String,
    pub auth_header: Option<String>,
}

impl SessionContext {
    pub fn new(session_key: impl Into<String>, auth_header: Option<String>) -> Self {
        Self {
            session_key: session_key.into(),
            auth_header,
        }
    }

    /// Context for an invocation with no transport session id. The key is
    /// derived from the current worker thread so repeated calls on the same
    /// worker correlate and the key space stays bounded by the thread pool,
    /// and marked so the store's detached fallback chain applies.
    pub fn detached(auth_header: Option<String>) -> Self {
        let thread_id = format!("{:?}", std::thread::current().id());
        let digits: String = thread_id.chars().filter(|c| c.is_ascii_digit()).collect();
        Self {
            session_key: format!("{DETACHED_PREFIX}worker-{digits}"),
            auth_header,
        }
    }

    pub fn is_detached(&self) -> bool {
        self.session_key.starts_with(DETACHED_PREFIX)
    }
}

/// Process-wide session-key -> raw-header bindings.
///
/// This is a compatibility shim for invocations that arrive without a
/// captured header; callers that have one pass it in the `SessionContext`
/// and never hit the fallback chain. The chain trades isolation for
/// availability: under the detached-scan and last-known fallbacks one
/// caller's stored header can be handed to another caller's session. Safe
/// only for single-tenant deployments.
#[derive(Default)]
pub struct SessionAuthStore {
    bindings: Mutex<HashMap<String, String>>,
    last_known: RwLock<Option<String>>,
}

impl SessionAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a header to a session key and update the last-known slot.
    pub fn record(&self, session_key: &str, header: &str) {
        debug!(
            "Recording auth header for session '{}' -> {}",
            session_key,
            mask_header(header)
        );
        self.bindings
            .lock()
            .expect("session binding lock poisoned")
            .insert(session_key.to_string(), header.to_string());
        *self.last_known.write().expect("last-known lock poisoned") = Some(header.to_string());
    }

    /// Resolve the best-available raw header for this context.
    ///
    /// Order: the context's own header (recorded as a side effect), the
    /// context's session binding, then for detached contexts the global key
    /// and any other detached binding (arbitrary order), and finally the
    /// last-known header. None means nothing was ever captured.
    pub fn resolve(&self, ctx: &SessionContext) -> Option<String> {
        if let Some(header) = ctx.auth_header.as_deref() {
            if !header.trim().is_empty() {
                self.record(&ctx.session_key, header);
                return Some(header.to_string());
            }
        }

        let bindings = self.bindings.lock().expect("session binding lock poisoned");
        if let Some(stored) = bindings.get(&ctx.session_key) {
            debug!("Using stored auth header for session '{}'", ctx.session_key);
            return Some(stored.clone());
        }

        if ctx.is_detached() {
            if let Some(global) = bindings.get(GLOBAL_SESSION_KEY) {
                info!("Using global auth binding for session '{}'", ctx.session_key);
                return Some(global.clone());
            }
            if let Some((key, header)) = bindings
                .iter()
                .find(|(key, _)| key.starts_with(DETACHED_PREFIX))
            {
                info!(
                    "Using auth binding of detached session '{}' for '{}'",
                    key, ctx.session_key
                );
                return Some(header.clone());
            }
        }
        drop(bindings);

        if let Some(last) = self
            .last_known
            .read()
            .expect("last-known lock poisoned")
            .clone()
        {
            info!(
                "Using last known auth header for session '{}'",
                ctx.session_key
            );
            return Some(last);
        }

        warn!("No auth header available for session '{}'", ctx.session_key);
        None
    }
}

/// Shortened header form safe for logs.
pub fn mask_header(header: &str) -> String {
    if header.len() < 10 {
        return "***".to_string();
    }
    format!("{}...{}", &header[..8], &header[header.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_recorded_and_stripped() {
        let auth = AuthData::parse("Bearer {'token':'t1'}").unwrap();
        assert_eq!(auth.scheme, AuthScheme::Bearer);
        assert_eq!(auth.token, "t1");
    }

    #[test]
    fn basic_prefix_is_recorded_and_stripped() {
        let auth = AuthData::parse("Basic {'token':'t2'}").unwrap();
        assert_eq!(auth.scheme, AuthScheme::Basic);
        assert_eq!(auth.token, "t2");
    }

    #[test]
    fn scheme_less_header_defaults_to_basic() {
        let auth = AuthData::parse("{'token':'t3'}").unwrap();
        assert_eq!(auth.scheme, AuthScheme::Basic);
    }

    #[test]
    fn json_fields_map_verbatim_with_defaults_for_absences() {
        let auth = AuthData::parse(
            "{'token':'abc123','from_number':'08000000000','account_sid':'ACC1','api_domain':'https://api.vendor.test'}",
        )
        .unwrap();
        assert_eq!(auth.token, "abc123");
        assert_eq!(auth.from_number, "08000000000");
        assert_eq!(auth.account_sid, "ACC1");
        assert_eq!(auth.api_domain, "https://api.vendor.test");
        assert_eq!(auth.caller_id, "default_caller");
        assert_eq!(auth.portal_url, "https://my.exotel.com");
        assert_eq!(auth.scheme, AuthScheme::Basic);
    }

    #[test]
    fn double_quoted_json_parses_too() {
        let auth = AuthData::parse(r#"{"token":"abc123","caller_id":"080123"}"#).unwrap();
        assert_eq!(auth.token, "abc123");
        assert_eq!(auth.caller_id, "080123");
    }

    #[test]
    fn braceless_body_is_wrapped() {
        let auth = AuthData::parse("'token':'t9','account_sid':'SID9'").unwrap();
        assert_eq!(auth.token, "t9");
        assert_eq!(auth.account_sid, "SID9");
    }

    #[test]
    fn unparseable_header_becomes_the_token() {
        let auth = AuthData::parse("not-json-at-all").unwrap();
        assert_eq!(auth.token, "not-json-at-all");
        assert_eq!(auth.from_number, "default_from");
        assert_eq!(auth.account_sid, "default_account");
    }

    #[test]
    fn scheme_prefixed_opaque_token_is_stripped() {
        let auth = AuthData::parse("Bearer just-a-token").unwrap();
        assert_eq!(auth.scheme, AuthScheme::Bearer);
        assert_eq!(auth.token, "just-a-token");
    }

    #[test]
    fn blank_header_is_an_error() {
        assert!(matches!(
            AuthData::parse("   "),
            Err(AuthError::MissingHeader)
        ));
    }

    #[test]
    fn digest_is_deterministic_md5_hex() {
        let auth = AuthData::parse("{'token':'abc123'}").unwrap();
        assert_eq!(auth.token_digest, "e99a18c428cb38d5f260853678922e03");
        assert_eq!(auth.token_digest, token_digest("abc123"));
    }

    #[test]
    fn missing_token_yields_nonempty_digest() {
        let auth = AuthData::parse("{'account_sid':'SID1'}").unwrap();
        assert!(auth.token.starts_with("default_token_"));
        assert!(!auth.token_digest.is_empty());
    }

    #[test]
    fn fallback_bundle_has_defaults_and_synthetic_token() {
        let auth = AuthData::fallback();
        assert!(auth.token.starts_with("default_token_"));
        assert_eq!(auth.api_domain, "https://api.exotel.com");
        assert!(!auth.token_digest.is_empty());
    }

    #[test]
    fn authorization_header_joins_scheme_and_token() {
        let auth = AuthData::parse("Bearer {'token':'tok'}").unwrap();
        assert_eq!(auth.authorization_header(), "Bearer tok");
    }

    #[test]
    fn context_header_wins_and_is_recorded() {
        let store = SessionAuthStore::new();
        let ctx = SessionContext::new("s1", Some("{'token':'a'}".to_string()));
        assert_eq!(store.resolve(&ctx).as_deref(), Some("{'token':'a'}"));

        // A later call on the same session without a header finds the binding
        let later = SessionContext::new("s1", None);
        assert_eq!(store.resolve(&later).as_deref(), Some("{'token':'a'}"));
    }

    #[test]
    fn detached_context_falls_back_to_global_binding() {
        let store = SessionAuthStore::new();
        store.record(GLOBAL_SESSION_KEY, "{'token':'g'}");
        let ctx = SessionContext::detached(None);
        assert!(ctx.is_detached());
        assert_eq!(store.resolve(&ctx).as_deref(), Some("{'token':'g'}"));
    }

    #[test]
    fn detached_context_scans_other_detached_bindings() {
        let store = SessionAuthStore::new();
        store.record("detached-task-99", "{'token':'other'}");
        let ctx = SessionContext::new(format!("{DETACHED_PREFIX}task-1"), None);
        assert_eq!(store.resolve(&ctx).as_deref(), Some("{'token':'other'}"));
    }

    #[test]
    fn transport_session_falls_back_to_last_known() {
        let store = SessionAuthStore::new();
        store.record("someone-else", "{'token':'last'}");
        let ctx = SessionContext::new("fresh-session", None);
        assert_eq!(store.resolve(&ctx).as_deref(), Some("{'token':'last'}"));
    }

    #[test]
    fn empty_store_resolves_to_none() {
        let store = SessionAuthStore::new();
        let ctx = SessionContext::new("nobody", None);
        assert!(store.resolve(&ctx).is_none());
    }

    #[test]
    fn last_write_wins_per_session() {
        let store = SessionAuthStore::new();
        store.record("s1", "first");
        store.record("s1", "second");
        let ctx = SessionContext::new("s1", None);
        assert_eq!(store.resolve(&ctx).as_deref(), Some("second"));
    }

    #[test]
    fn mask_header_keeps_only_edges() {
        assert_eq!(mask_header("short"), "***");
        let masked = mask_header("Bearer abcdefghijklmnop");
        assert!(masked.starts_with("Bearer a"));
        assert!(masked.ends_with("mnop"));
        assert!(masked.contains("..."));
    }
}
