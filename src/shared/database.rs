use sqlx::mysql::MySqlPoolOptions;
use sqlx::{query, MySql, Pool, Row};

use crate::shared::models::{AppState, DatabaseError, SmsCallback, VoiceCallback};

pub async fn init_pool(database_url: &str) -> anyhow::Result<Pool<MySql>> {
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn init_database(database_url: &str) -> anyhow::Result<AppState> {
    let pool = init_pool(database_url).await?;
    Ok(AppState::new(pool))
}

impl AppState {
    // SMS callback operations

    pub async fn insert_sms_callback(&self, record: &SmsCallback) -> Result<(), DatabaseError> {
        query(
            r#"
            INSERT INTO sms_callbacks
                (user_id, sms_sid, to_number, status, detailed_status, detailed_status_code, sms_units, date_sent)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.sms_sid)
        .bind(&record.to_number)
        .bind(&record.status)
        .bind(&record.detailed_status)
        .bind(&record.detailed_status_code)
        .bind(&record.sms_units)
        .bind(&record.date_sent)
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    pub async fn find_sms_callback_by_sid(
        &self,
        sms_sid: &str,
    ) -> Result<Option<SmsCallback>, DatabaseError> {
        let row = query(
            r#"
            SELECT id, user_id, sms_sid, to_number, status, detailed_status, detailed_status_code, sms_units, date_sent
            FROM sms_callbacks
            WHERE sms_sid = ?
            LIMIT 1
            "#,
        )
        .bind(sms_sid)
        .fetch_optional(&*self.db)
        .await?;

        Ok(row.map(map_sms_row))
    }

    pub async fn update_sms_callback_status(
        &self,
        sms_sid: &str,
        status: &str,
        detailed_status: &str,
        detailed_status_code: &str,
        sms_units: &str,
        date_sent: &str,
    ) -> Result<(), DatabaseError> {
        query(
            r#"
            UPDATE sms_callbacks
            SET status = ?, detailed_status = ?, detailed_status_code = ?, sms_units = ?, date_sent = ?
            WHERE sms_sid = ?
            "#,
        )
        .bind(status)
        .bind(detailed_status)
        .bind(detailed_status_code)
        .bind(sms_units)
        .bind(date_sent)
        .bind(sms_sid)
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    /// All SMS rows for one normalized recipient number, scoped to the
    /// requesting tenant.
    pub async fn find_sms_callbacks(
        &self,
        to_number: &str,
        user_id: &str,
    ) -> Result<Vec<SmsCallback>, DatabaseError> {
        let rows = query(
            r#"
            SELECT id, user_id, sms_sid, to_number, status, detailed_status, detailed_status_code, sms_units, date_sent
            FROM sms_callbacks
            WHERE to_number = ? AND user_id = ?
            ORDER BY id DESC
            "#,
        )
        .bind(to_number)
        .bind(user_id)
        .fetch_all(&*self.db)
        .await?;

        Ok(rows.into_iter().map(map_sms_row).collect())
    }

    // Voice callback operations

    pub async fn insert_voice_callback(&self, record: &VoiceCallback) -> Result<(), DatabaseError> {
        query(
            r#"
            INSERT INTO voice_callbacks
                (user_id, sid, parent_call_sid, date_created, date_updated, account_sid,
                 to_number, from_number, phone_number_sid, start_time, end_time, duration,
                 price, direction, answered_by, forwarded_from, caller_name, uri,
                 recording_url, call_sid, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.sid)
        .bind(&record.parent_call_sid)
        .bind(&record.date_created)
        .bind(&record.date_updated)
        .bind(&record.account_sid)
        .bind(&record.to_number)
        .bind(&record.from_number)
        .bind(&record.phone_number_sid)
        .bind(&record.start_time)
        .bind(&record.end_time)
        .bind(&record.duration)
        .bind(&record.price)
        .bind(&record.direction)
        .bind(&record.answered_by)
        .bind(&record.forwarded_from)
        .bind(&record.caller_name)
        .bind(&record.uri)
        .bind(&record.recording_url)
        .bind(&record.call_sid)
        .bind(&record.status)
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    pub async fn find_voice_callback_by_sid(
        &self,
        call_sid: &str,
    ) -> Result<Option<VoiceCallback>, DatabaseError> {
        let row = query(
            r#"
            SELECT id, user_id, sid, parent_call_sid, date_created, date_updated, account_sid,
                   to_number, from_number, phone_number_sid, start_time, end_time, duration,
                   price, direction, answered_by, forwarded_from, caller_name, uri,
                   recording_url, call_sid, status
            FROM voice_callbacks
            WHERE call_sid = ?
            LIMIT 1
            "#,
        )
        .bind(call_sid)
        .fetch_optional(&*self.db)
        .await?;

        Ok(row.map(map_voice_row))
    }

    /// Apply a webhook delta to an existing call row. Only the fields that
    /// change over a call's lifetime are touched.
    pub async fn update_voice_callback(
        &self,
        call_sid: &str,
        record: &VoiceCallback,
    ) -> Result<(), DatabaseError> {
        query(
            r#"
            UPDATE voice_callbacks
            SET status = ?, recording_url = ?, date_updated = ?, end_time = ?,
                duration = ?, price = ?, answered_by = ?
            WHERE call_sid = ?
            "#,
        )
        .bind(&record.status)
        .bind(&record.recording_url)
        .bind(&record.date_updated)
        .bind(&record.end_time)
        .bind(&record.duration)
        .bind(&record.price)
        .bind(&record.answered_by)
        .bind(call_sid)
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    /// All voice rows where the normalized number appears as either leg of
    /// the call, scoped to the requesting tenant.
    pub async fn find_voice_callbacks(
        &self,
        phone_number: &str,
        user_id: &str,
    ) -> Result<Vec<VoiceCallback>, DatabaseError> {
        let rows = query(
            r#"
            SELECT id, user_id, sid, parent_call_sid, date_created, date_updated, account_sid,
                   to_number, from_number, phone_number_sid, start_time, end_time, duration,
                   price, direction, answered_by, forwarded_from, caller_name, uri,
                   recording_url, call_sid, status
            FROM voice_callbacks
            WHERE (to_number = ? OR from_number = ?) AND user_id = ?
            ORDER BY id DESC
            "#,
        )
        .bind(phone_number)
        .bind(phone_number)
        .bind(user_id)
        .fetch_all(&*self.db)
        .await?;

        Ok(rows.into_iter().map(map_voice_row).collect())
    }
}

fn map_sms_row(row: sqlx::mysql::MySqlRow) -> SmsCallback {
    SmsCallback {
        id: row.try_get("id").ok(),
        user_id: row.try_get("user_id").unwrap_or_default(),
        sms_sid: row.try_get("sms_sid").unwrap_or_default(),
        to_number: row.try_get("to_number").unwrap_or_default(),
        status: row.try_get("status").unwrap_or_default(),
        detailed_status: row.try_get("detailed_status").unwrap_or_default(),
        detailed_status_code: row.try_get("detailed_status_code").unwrap_or_default(),
        sms_units: row.try_get("sms_units").unwrap_or_default(),
        date_sent: row.try_get("date_sent").unwrap_or_default(),
    }
}

fn map_voice_row(row: sqlx::mysql::MySqlRow) -> VoiceCallback {
    VoiceCallback {
        id: row.try_get("id").ok(),
        user_id: row.try_get("user_id").unwrap_or_default(),
        sid: row.try_get("sid").unwrap_or_default(),
        parent_call_sid: row.try_get("parent_call_sid").unwrap_or_default(),
        date_created: row.try_get("date_created").unwrap_or_default(),
        date_updated: row.try_get("date_updated").unwrap_or_default(),
        account_sid: row.try_get("account_sid").unwrap_or_default(),
        to_number: row.try_get("to_number").unwrap_or_default(),
        from_number: row.try_get("from_number").unwrap_or_default(),
        phone_number_sid: row.try_get("phone_number_sid").unwrap_or_default(),
        start_time: row.try_get("start_time").unwrap_or_default(),
        end_time: row.try_get("end_time").unwrap_or_default(),
        duration: row.try_get("duration").unwrap_or_default(),
        price: row.try_get("price").unwrap_or_default(),
        direction: row.try_get("direction").unwrap_or_default(),
        answered_by: row.try_get("answered_by").unwrap_or_default(),
        forwarded_from: row.try_get("forwarded_from").unwrap_or_default(),
        caller_name: row.try_get("caller_name").unwrap_or_default(),
        uri: row.try_get("uri").unwrap_or_default(),
        recording_url: row.try_get("recording_url").unwrap_or_default(),
        call_sid: row.try_get("call_sid").unwrap_or_default(),
        status: row.try_get("status").unwrap_or_default(),
    }
}
