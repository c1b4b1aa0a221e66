use serde::{Deserialize, Serialize};

/// One row of the `sms_callbacks` table: the latest known delivery state of
/// a single outbound SMS, keyed by the vendor-assigned sid and scoped to
/// the tenant that sent it.
///
/// All vendor fields are kept as strings; the vendor's formats drift and
/// the gateway only passes them through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsCallback {
    pub id: Option<i64>,
    pub user_id: String,
    pub sms_sid: String,
    pub to_number: String,
    pub status: String,
    pub detailed_status: String,
    pub detailed_status_code: String,
    pub sms_units: String,
    pub date_sent: String,
}

impl SmsCallback {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        sms_sid: String,
        to_number: String,
        status: String,
        detailed_status: String,
        detailed_status_code: String,
        sms_units: String,
        date_sent: String,
    ) -> Self {
        Self {
            id: None,
            user_id,
            sms_sid,
            to_number,
            status,
            detailed_status,
            detailed_status_code,
            sms_units,
            date_sent,
        }
    }
}
