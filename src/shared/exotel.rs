use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::shared::auth::{AuthData, AuthError, SessionAuthStore, SessionContext};
use crate::shared::cache::MetadataCache;
use crate::shared::config::GatewayConfig;
use crate::shared::http::{HttpExecutor, VendorError};
use crate::shared::models::{AppState, DatabaseError, SmsCallback, VoiceCallback};
use crate::shared::phone;

const METADATA_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Vendor(#[from] VendorError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// One message of a dynamic bulk send. Field names follow the vendor's
/// request shape.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkMessage {
    #[serde(rename = "Body", alias = "body")]
    pub body: String,
    #[serde(rename = "To", alias = "to")]
    pub to: String,
}

/// Client for the vendor's SMS/voice REST API.
///
/// Every operation resolves credentials from the caller's session context,
/// issues the vendor call through the retrying executor, and returns the
/// vendor's JSON body untouched. Callback bookkeeping rides along: send
/// responses seed rows that later status webhooks update.
pub struct ExotelClient {
    state: Arc<AppState>,
    config: GatewayConfig,
    http: HttpExecutor,
    cache: MetadataCache,
    pub sessions: Arc<SessionAuthStore>,
    callback_id: String,
}

impl ExotelClient {
    pub fn new(state: Arc<AppState>, config: GatewayConfig) -> Self {
        Self {
            state,
            config,
            http: HttpExecutor::new(),
            cache: MetadataCache::new(),
            sessions: Arc::new(SessionAuthStore::new()),
            // Distinguishes this process's callback URLs from a previous
            // incarnation's
            callback_id: Uuid::new_v4().to_string(),
        }
    }

    /// Resolve the credential bundle for this operation. With no resolvable
    /// header the outcome is policy-driven: degrade to a synthetic default
    /// bundle when the deployment allows it, fail otherwise.
    fn credentials(&self, ctx: &SessionContext) -> Result<AuthData, ToolError> {
        match self.sessions.resolve(ctx) {
            Some(header) => Ok(AuthData::parse(&header)?),
            None if self.config.allow_default_credentials => {
                warn!(
                    "No credential for session '{}', proceeding with defaults",
                    ctx.session_key
                );
                Ok(AuthData::fallback())
            }
            None => Err(AuthError::NoCredential.into()),
        }
    }

    fn sms_status_callback_url(&self, auth: &AuthData) -> String {
        format!(
            "{}/sms-status-callback/{}/{}",
            self.config.public_base_url, self.callback_id, auth.token_digest
        )
    }

    fn call_status_callback_url(&self, auth: &AuthData) -> String {
        format!(
            "{}/call-status/{}/{}",
            self.config.public_base_url, self.callback_id, auth.token_digest
        )
    }

    /// Send one DLT-compliant SMS. The initial callback row is saved off
    /// the request path; a failed save never fails the send.
    pub async fn send_sms(
        &self,
        ctx: &SessionContext,
        to_number: &str,
        message: &str,
        dlt_template_id: &str,
        dlt_entity_id: &str,
    ) -> Result<String, ToolError> {
        info!("Sending SMS to: {}", to_number);
        let auth = self.credentials(ctx)?;
        let status_callback = self.sms_status_callback_url(&auth);

        let form = form_pairs(&[
            ("From", auth.from_number.as_str()),
            ("To", to_number),
            ("Body", message),
            ("StatusCallback", status_callback.as_str()),
            ("StatusCallbackContentType", "application/json"),
            ("SmsType", "promotional"),
            ("DltTemplateId", dlt_template_id),
            ("DltEntityId", dlt_entity_id),
        ]);

        let url = vendor_url(&auth, "Sms/send.json");
        let response = self.http.post_form(&url, &form, &auth).await?;
        info!("SMS response: {}", response);

        let state = self.state.clone();
        let user_id = auth.token_digest.clone();
        let body = response.clone();
        tokio::spawn(async move {
            if let Err(e) = save_initial_sms(&state, &body, &user_id).await {
                warn!("Async SMS callback save failed: {}", e);
            }
        });

        Ok(response)
    }

    /// Call the target number and bridge it to the credential's default
    /// number.
    pub async fn send_voice_call(
        &self,
        ctx: &SessionContext,
        to_number: &str,
    ) -> Result<String, ToolError> {
        info!("Sending voice call to: {}", to_number);
        let auth = self.credentials(ctx)?;
        let status_callback = self.call_status_callback_url(&auth);

        let form = form_pairs(&[
            ("From", to_number),
            ("To", auth.from_number.as_str()),
            ("CallerId", auth.caller_id.as_str()),
            ("StatusCallback", status_callback.as_str()),
            ("StatusCallbackContentType", "application/json"),
            ("Record", "true"),
        ]);

        let url = vendor_url(&auth, "Calls/connect.json");
        let response = self.http.post_form(&url, &form, &auth).await?;
        info!("Voice call response: {}", response);

        if let Err(e) = save_initial_voice(&self.state, &response, &auth.token_digest).await {
            error!("Error saving initial voice callback: {}", e);
        }

        Ok(response)
    }

    /// Bridge an explicit pair of numbers.
    pub async fn connect_call(
        &self,
        ctx: &SessionContext,
        from_number: &str,
        to_number: &str,
    ) -> Result<String, ToolError> {
        info!("Sending voice call from: {} to: {}", from_number, to_number);
        let auth = self.credentials(ctx)?;
        let status_callback = self.call_status_callback_url(&auth);

        let form = form_pairs(&[
            ("From", from_number),
            ("To", to_number),
            ("CallerId", auth.caller_id.as_str()),
            ("StatusCallback", status_callback.as_str()),
            ("StatusCallbackContentType", "application/json"),
            ("Record", "true"),
        ]);

        let url = vendor_url(&auth, "Calls/connect.json");
        let response = self.http.post_form(&url, &form, &auth).await?;
        info!("Voice call response: {}", response);

        if let Err(e) = save_initial_voice(&self.state, &response, &auth.token_digest).await {
            error!("Error saving initial voice callback: {}", e);
        }

        Ok(response)
    }

    /// Same SMS body to several recipients in one vendor request.
    pub async fn send_bulk_sms(
        &self,
        ctx: &SessionContext,
        to_numbers: &[String],
        message: &str,
    ) -> Result<String, ToolError> {
        info!("Sending bulk SMS to {} numbers", to_numbers.len());
        let auth = self.credentials(ctx)?;
        let status_callback = self.sms_status_callback_url(&auth);

        let form = bulk_sms_form(&auth.from_number, to_numbers, message, &status_callback);
        let url = vendor_url(&auth, "Sms/send.json");
        let response = self.http.post_form(&url, &form, &auth).await?;
        info!("Bulk SMS response: {}", response);

        if let Err(e) = save_initial_bulk_sms(&self.state, &response, &auth.token_digest).await {
            error!("Error saving bulk SMS callbacks: {}", e);
        }

        Ok(response)
    }

    /// Per-recipient message bodies in one vendor request.
    pub async fn send_dynamic_bulk_sms(
        &self,
        ctx: &SessionContext,
        messages: &[BulkMessage],
    ) -> Result<String, ToolError> {
        info!("Sending dynamic bulk SMS with {} messages", messages.len());
        let auth = self.credentials(ctx)?;
        let status_callback = self.sms_status_callback_url(&auth);

        let form = dynamic_bulk_sms_form(&auth.from_number, messages, &status_callback);
        let url = vendor_url(&auth, "Sms/bulksend.json");
        let response = self.http.post_form(&url, &form, &auth).await?;
        info!("Dynamic bulk SMS response: {}", response);

        if let Err(e) = save_initial_bulk_sms(&self.state, &response, &auth.token_digest).await {
            error!("Error saving bulk SMS callbacks: {}", e);
        }

        Ok(response)
    }

    /// Call a number and drop it into a predefined vendor call flow.
    pub async fn connect_call_flow(
        &self,
        ctx: &SessionContext,
        app_id: &str,
        from_number: &str,
    ) -> Result<String, ToolError> {
        info!("Connecting call flow: {}", app_id);
        let auth = self.credentials(ctx)?;
        let status_callback = self.call_status_callback_url(&auth);
        let flow_url = format!(
            "{}/{}/exoml/start_voice/{}",
            auth.portal_url, auth.account_sid, app_id
        );

        let form = form_pairs(&[
            ("From", from_number),
            ("CallerId", auth.caller_id.as_str()),
            ("StatusCallback", status_callback.as_str()),
            ("Url", flow_url.as_str()),
            ("StatusCallbackContentType", "application/json"),
            ("Record", "true"),
        ]);

        let url = vendor_url(&auth, "Calls/connect.json");
        let response = self.http.post_form(&url, &form, &auth).await?;
        info!("Call flow response: {}", response);

        if let Err(e) = save_initial_voice(&self.state, &response, &auth.token_digest).await {
            error!("Error saving initial voice callback: {}", e);
        }

        Ok(response)
    }

    /// Vendor-side call log filtered by originating number.
    pub async fn bulk_call_details(
        &self,
        ctx: &SessionContext,
        from_number: &str,
    ) -> Result<String, ToolError> {
        info!("Fetching bulk voice call details...");
        let auth = self.credentials(ctx)?;
        let url = format!(
            "{}?From=0{}",
            vendor_url(&auth, "Calls"),
            from_number.replace("+91", "")
        );
        Ok(self.http.get(&url, &auth).await?)
    }

    /// Number metadata lookup, cached for 15 minutes per account+number.
    pub async fn number_metadata(
        &self,
        ctx: &SessionContext,
        number: &str,
    ) -> Result<String, ToolError> {
        info!("Fetching number metadata for: {}", number);
        let auth = self.credentials(ctx)?;
        let url = vendor_url(&auth, &format!("Numbers/{number}"));
        let cache_key = format!("metadata:{}:{}", auth.account_sid, number);

        let result = self
            .cache
            .get_or_fetch(&cache_key, METADATA_TTL, || async {
                self.http.get(&url, &auth).await
            })
            .await?;
        Ok(result)
    }

    /// SMS delivery records for one number, scoped to the caller's tenant.
    pub async fn sms_callbacks(
        &self,
        ctx: &SessionContext,
        phone_number: &str,
    ) -> Result<Value, ToolError> {
        info!("Fetching SMS callbacks for phone number: {}", phone_number);
        let auth = self.credentials(ctx)?;
        let formatted = phone::format_for_query(phone_number);
        let user_id = &auth.token_digest;

        let callbacks = self.state.find_sms_callbacks(&formatted, user_id).await?;
        info!(
            "Found {} SMS callbacks for phone number: {}",
            callbacks.len(),
            formatted
        );

        Ok(json!({
            "status_data": callbacks,
            "search_info": {
                "phone_number": phone_number,
                "formatted_number": formatted,
                "records_found": callbacks.len(),
                "search_type": "SMS to_number with user_id security",
            }
        }))
    }

    /// Voice call records where the number is either leg, scoped to the
    /// caller's tenant.
    pub async fn voice_callbacks(
        &self,
        ctx: &SessionContext,
        phone_number: &str,
    ) -> Result<Value, ToolError> {
        info!("Fetching voice callbacks for: {}", phone_number);
        let auth = self.credentials(ctx)?;
        let formatted = phone::format_for_query(phone_number);
        let user_id = &auth.token_digest;

        let callbacks = self.state.find_voice_callbacks(&formatted, user_id).await?;
        info!("Voice callback search returned {} records", callbacks.len());

        Ok(json!({
            "status_data": callbacks,
            "search_info": {
                "phone_number": phone_number,
                "formatted_number": formatted,
                "user_id": user_id,
                "records_found": callbacks.len(),
                "search_type": "to_number OR from_number with user_id security",
            }
        }))
    }

    /// Apply an SMS status webhook: update the row seeded at send time, or
    /// create it when the webhook arrives first.
    pub async fn save_sms_status(
        &self,
        data: &HashMap<String, String>,
        user_id: &str,
    ) -> Result<(), DatabaseError> {
        let sms_sid = clean_value(data.get("SmsSid"));
        if sms_sid.is_empty() {
            warn!("SMS status callback without SmsSid, ignoring");
            return Ok(());
        }
        info!("Processing SMS callback for SmsSid: {}", sms_sid);

        if self.state.find_sms_callback_by_sid(&sms_sid).await?.is_some() {
            self.state
                .update_sms_callback_status(
                    &sms_sid,
                    &clean_value(data.get("Status")),
                    &clean_value(data.get("DetailedStatus")),
                    &clean_value(data.get("DetailedStatusCode")),
                    &clean_value(data.get("SmsUnits")),
                    &clean_value(data.get("DateSent")),
                )
                .await?;
            info!("Updated existing SMS callback with SmsSid: {}", sms_sid);
        } else {
            warn!(
                "No existing SMS callback found for SmsSid: {}, creating record from callback",
                sms_sid
            );
            let record = SmsCallback::new(
                user_id.to_string(),
                sms_sid.clone(),
                phone::format_for_query(&clean_value(data.get("To"))),
                clean_value(data.get("Status")),
                clean_value(data.get("DetailedStatus")),
                clean_value(data.get("DetailedStatusCode")),
                clean_value(data.get("SmsUnits")),
                clean_value(data.get("DateSent")),
            );
            self.state.insert_sms_callback(&record).await?;
        }
        Ok(())
    }

    /// Apply a voice status webhook. Only the fields present in the payload
    /// overwrite the stored row.
    pub async fn save_voice_status(
        &self,
        data: &HashMap<String, String>,
        user_id: &str,
    ) -> Result<(), DatabaseError> {
        let call_sid = clean_value(data.get("CallSid"));
        if call_sid.is_empty() {
            warn!("Voice status callback without CallSid, creating new record");
            let record = voice_record_from_callback(data, user_id);
            return self.state.insert_voice_callback(&record).await;
        }
        info!("Processing voice callback for CallSid: {}", call_sid);

        match self.state.find_voice_callback_by_sid(&call_sid).await? {
            Some(mut existing) => {
                for (key, field) in [
                    ("Status", &mut existing.status),
                    ("RecordingUrl", &mut existing.recording_url),
                    ("DateUpdated", &mut existing.date_updated),
                    ("EndTime", &mut existing.end_time),
                    ("Duration", &mut existing.duration),
                    ("Price", &mut existing.price),
                    ("AnsweredBy", &mut existing.answered_by),
                ] {
                    if let Some(value) = data.get(key) {
                        *field = clean_value(Some(value));
                    }
                }
                self.state
                    .update_voice_callback(&call_sid, &existing)
                    .await?;
                info!("Updated existing voice callback with CallSid: {}", call_sid);
            }
            None => {
                warn!(
                    "No existing voice callback for CallSid: {}, creating record from callback",
                    call_sid
                );
                let mut record = voice_record_from_callback(data, user_id);
                record.call_sid = call_sid.clone();
                self.state.insert_voice_callback(&record).await?;
            }
        }
        Ok(())
    }
}

fn vendor_url(auth: &AuthData, path: &str) -> String {
    format!(
        "{}/v1/Accounts/{}/{}",
        auth.api_domain.trim_end_matches('/'),
        auth.account_sid,
        path
    )
}

fn form_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Bulk sends address recipients with indexed `To[<i>]` keys.
fn bulk_sms_form(
    from_number: &str,
    to_numbers: &[String],
    message: &str,
    status_callback: &str,
) -> Vec<(String, String)> {
    let mut form = vec![("From".to_string(), from_number.to_string())];
    for (i, number) in to_numbers.iter().enumerate() {
        form.push((format!("To[{i}]"), number.clone()));
    }
    form.push(("Body".to_string(), message.to_string()));
    form.push(("StatusCallback".to_string(), status_callback.to_string()));
    form.push((
        "StatusCallbackContentType".to_string(),
        "application/json".to_string(),
    ));
    form
}

/// Dynamic bulk sends carry per-message bodies as `Message[<i>][Body]` /
/// `Message[<i>][To]`.
fn dynamic_bulk_sms_form(
    from_number: &str,
    messages: &[BulkMessage],
    status_callback: &str,
) -> Vec<(String, String)> {
    let mut form = vec![
        ("From".to_string(), from_number.to_string()),
        ("StatusCallback".to_string(), status_callback.to_string()),
        (
            "StatusCallbackContentType".to_string(),
            "application/json".to_string(),
        ),
    ];
    for (i, message) in messages.iter().enumerate() {
        form.push((format!("Message[{i}][Body]"), message.body.clone()));
        form.push((format!("Message[{i}][To]"), message.to.clone()));
    }
    form
}

/// Webhook values sometimes arrive wrapped in `['...']`; strip the wrapper.
fn clean_value(value: Option<&String>) -> String {
    let s = value.map(String::as_str).unwrap_or("");
    let s = s.strip_prefix("['").unwrap_or(s);
    let s = s.strip_suffix("']").unwrap_or(s);
    s.to_string()
}

fn text_field(node: &Value, key: &str) -> String {
    node.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Seed an SMS row from the vendor's send response (`SMSMessage` envelope).
fn parse_initial_sms(response: &str, user_id: &str) -> Option<SmsCallback> {
    let value: Value = serde_json::from_str(response).ok()?;
    let sms = value.get("SMSMessage")?;
    let to_number = phone::format_for_query(&text_field(sms, "To"));
    Some(SmsCallback::new(
        user_id.to_string(),
        text_field(sms, "Sid"),
        to_number,
        text_field(sms, "Status"),
        text_field(sms, "DetailedStatus"),
        text_field(sms, "DetailedStatusCode"),
        text_field(sms, "SmsUnits"),
        text_field(sms, "DateCreated"),
    ))
}

/// Seed a voice row from the vendor's connect response (`Call` envelope).
fn parse_initial_voice(response: &str, user_id: &str) -> Option<VoiceCallback> {
    let value: Value = serde_json::from_str(response).ok()?;
    let call = value.get("Call")?;
    let sid = text_field(call, "Sid");
    Some(VoiceCallback {
        id: None,
        user_id: user_id.to_string(),
        sid: sid.clone(),
        parent_call_sid: text_field(call, "ParentCallSid"),
        date_created: text_field(call, "DateCreated"),
        date_updated: text_field(call, "DateUpdated"),
        account_sid: text_field(call, "AccountSid"),
        to_number: phone::format_for_query(&text_field(call, "To")),
        from_number: phone::format_for_query(&text_field(call, "From")),
        phone_number_sid: text_field(call, "PhoneNumberSid"),
        start_time: text_field(call, "StartTime"),
        end_time: text_field(call, "EndTime"),
        duration: text_field(call, "Duration"),
        price: text_field(call, "Price"),
        direction: text_field(call, "Direction"),
        answered_by: text_field(call, "AnsweredBy"),
        forwarded_from: text_field(call, "ForwardedFrom"),
        caller_name: text_field(call, "CallerName"),
        uri: text_field(call, "Uri"),
        recording_url: text_field(call, "RecordingUrl"),
        call_sid: sid,
        status: text_field(call, "Status"),
    })
}

fn voice_record_from_callback(data: &HashMap<String, String>, user_id: &str) -> VoiceCallback {
    let digits: String = clean_value(data.get("To"))
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    VoiceCallback {
        id: None,
        user_id: user_id.to_string(),
        sid: clean_value(data.get("Sid")),
        parent_call_sid: clean_value(data.get("ParentCallSid")),
        date_created: clean_value(data.get("DateCreated")),
        date_updated: clean_value(data.get("DateUpdated")),
        account_sid: clean_value(data.get("AccountSid")),
        to_number: digits,
        from_number: clean_value(data.get("From")),
        phone_number_sid: clean_value(data.get("PhoneNumberSid")),
        start_time: clean_value(data.get("StartTime")),
        end_time: clean_value(data.get("EndTime")),
        duration: clean_value(data.get("Duration")),
        price: clean_value(data.get("Price")),
        direction: clean_value(data.get("Direction")),
        answered_by: clean_value(data.get("AnsweredBy")),
        forwarded_from: clean_value(data.get("ForwardedFrom")),
        caller_name: clean_value(data.get("CallerName")),
        uri: clean_value(data.get("Uri")),
        recording_url: clean_value(data.get("RecordingUrl")),
        call_sid: clean_value(data.get("CallSid")),
        status: clean_value(data.get("Status")),
    }
}

async fn save_initial_sms(
    state: &Arc<AppState>,
    response: &str,
    user_id: &str,
) -> Result<(), DatabaseError> {
    if let Some(record) = parse_initial_sms(response, user_id) {
        state.insert_sms_callback(&record).await?;
        info!(
            "Saved initial SMS callback with SmsSid: {} and to_number: {}",
            record.sms_sid, record.to_number
        );
    }
    Ok(())
}

/// Bulk send responses are arrays of the single-send envelope; a non-array
/// body falls back to single parsing.
async fn save_initial_bulk_sms(
    state: &Arc<AppState>,
    response: &str,
    user_id: &str,
) -> Result<(), DatabaseError> {
    let Ok(value) = serde_json::from_str::<Value>(response) else {
        warn!("Bulk SMS response is not JSON, skipping callback seed");
        return Ok(());
    };

    match value.as_array() {
        Some(entries) => {
            info!("Processing bulk SMS response with {} messages", entries.len());
            for entry in entries {
                if let Some(record) = parse_initial_sms(&entry.to_string(), user_id) {
                    state.insert_sms_callback(&record).await?;
                    info!(
                        "Saved bulk SMS callback with SmsSid: {} for number: {}",
                        record.sms_sid, record.to_number
                    );
                }
            }
            Ok(())
        }
        None => save_initial_sms(state, response, user_id).await,
    }
}

async fn save_initial_voice(
    state: &Arc<AppState>,
    response: &str,
    user_id: &str,
) -> Result<(), DatabaseError> {
    if let Some(record) = parse_initial_voice(response, user_id) {
        state.insert_voice_callback(&record).await?;
        info!(
            "Saved initial voice callback with CallSid: {}, to_number: {}, from_number: {}",
            record.call_sid, record.to_number, record.from_number
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::auth::AuthScheme;

    fn test_auth() -> AuthData {
        AuthData::parse(
            "{'token':'abc123','from_number':'08000000000','caller_id':'08044440000','account_sid':'ACC1','api_domain':'https://api.vendor.test'}",
        )
        .unwrap()
    }

    #[test]
    fn vendor_urls_follow_the_account_path() {
        let auth = test_auth();
        assert_eq!(
            vendor_url(&auth, "Sms/send.json"),
            "https://api.vendor.test/v1/Accounts/ACC1/Sms/send.json"
        );
        assert_eq!(
            vendor_url(&auth, "Numbers/09876543210"),
            "https://api.vendor.test/v1/Accounts/ACC1/Numbers/09876543210"
        );
    }

    #[test]
    fn credential_bundle_matches_header_fields() {
        let auth = test_auth();
        assert_eq!(auth.token, "abc123");
        assert_eq!(auth.from_number, "08000000000");
        assert_eq!(auth.account_sid, "ACC1");
        assert_eq!(auth.api_domain, "https://api.vendor.test");
        assert_eq!(auth.scheme, AuthScheme::Basic);
        assert_eq!(auth.token_digest, "e99a18c428cb38d5f260853678922e03");
    }

    #[test]
    fn bulk_form_indexes_recipients() {
        let numbers = vec!["09000000001".to_string(), "09000000002".to_string()];
        let form = bulk_sms_form("080", &numbers, "hello", "http://cb");
        assert!(form.contains(&("To[0]".to_string(), "09000000001".to_string())));
        assert!(form.contains(&("To[1]".to_string(), "09000000002".to_string())));
        assert!(form.contains(&("Body".to_string(), "hello".to_string())));
        assert!(form.contains(&("From".to_string(), "080".to_string())));
    }

    #[test]
    fn dynamic_bulk_form_indexes_message_fields() {
        let messages = vec![
            BulkMessage {
                body: "hi a".to_string(),
                to: "09000000001".to_string(),
            },
            BulkMessage {
                body: "hi b".to_string(),
                to: "09000000002".to_string(),
            },
        ];
        let form = dynamic_bulk_sms_form("080", &messages, "http://cb");
        assert!(form.contains(&("Message[0][Body]".to_string(), "hi a".to_string())));
        assert!(form.contains(&("Message[0][To]".to_string(), "09000000001".to_string())));
        assert!(form.contains(&("Message[1][Body]".to_string(), "hi b".to_string())));
        assert!(form.contains(&("Message[1][To]".to_string(), "09000000002".to_string())));
    }

    #[test]
    fn bulk_message_accepts_vendor_casing() {
        let parsed: BulkMessage =
            serde_json::from_str(r#"{"Body":"hello","To":"09000000001"}"#).unwrap();
        assert_eq!(parsed.body, "hello");
        assert_eq!(parsed.to, "09000000001");

        let lower: BulkMessage =
            serde_json::from_str(r#"{"body":"hello","to":"09000000001"}"#).unwrap();
        assert_eq!(lower.to, "09000000001");
    }

    #[test]
    fn clean_value_strips_bracket_wrapper() {
        assert_eq!(clean_value(Some(&"['queued']".to_string())), "queued");
        assert_eq!(clean_value(Some(&"queued".to_string())), "queued");
        assert_eq!(clean_value(None), "");
    }

    #[test]
    fn initial_sms_row_is_parsed_from_send_response() {
        let response = r#"{
            "SMSMessage": {
                "Sid": "sms-1",
                "To": "+919876543210",
                "Status": "queued",
                "DetailedStatus": "PENDING_TO_OPERATOR",
                "DetailedStatusCode": "21010",
                "SmsUnits": "1",
                "DateCreated": "2025-01-01 10:00:00"
            }
        }"#;
        let record = parse_initial_sms(response, "user-1").unwrap();
        assert_eq!(record.sms_sid, "sms-1");
        assert_eq!(record.to_number, "09876543210");
        assert_eq!(record.status, "queued");
        assert_eq!(record.user_id, "user-1");
    }

    #[test]
    fn initial_voice_row_is_parsed_from_connect_response() {
        let response = r#"{
            "Call": {
                "Sid": "call-1",
                "To": "09876543210",
                "From": "08000000000",
                "Status": "in-progress",
                "Direction": "outbound-api"
            }
        }"#;
        let record = parse_initial_voice(response, "user-1").unwrap();
        assert_eq!(record.call_sid, "call-1");
        assert_eq!(record.sid, "call-1");
        assert_eq!(record.to_number, "09876543210");
        assert_eq!(record.from_number, "08000000000");
        assert_eq!(record.status, "in-progress");
    }

    #[test]
    fn malformed_send_response_seeds_nothing() {
        assert!(parse_initial_sms("not json", "u").is_none());
        assert!(parse_initial_sms(r#"{"other":1}"#, "u").is_none());
        assert!(parse_initial_voice(r#"{"SMSMessage":{}}"#, "u").is_none());
    }
}
