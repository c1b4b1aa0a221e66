use serde::{Deserialize, Serialize};

/// One row of the `voice_callbacks` table: the full vendor call record as
/// last reported, updated in place as status webhooks arrive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceCallback {
    pub id: Option<i64>,
    pub user_id: String,
    pub sid: String,
    pub parent_call_sid: String,
    pub date_created: String,
    pub date_updated: String,
    pub account_sid: String,
    pub to_number: String,
    pub from_number: String,
    pub phone_number_sid: String,
    pub start_time: String,
    pub end_time: String,
    pub duration: String,
    pub price: String,
    pub direction: String,
    pub answered_by: String,
    pub forwarded_from: String,
    pub caller_name: String,
    pub uri: String,
    pub recording_url: String,
    pub call_sid: String,
    pub status: String,
}
