use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::error::TimestampError;

/// Google Calendar APIに渡すRFC3339形式の日付文字列を生成
pub fn format_datetime_for_api(dt: DateTime<Utc>) -> String {
    // ミリ秒まで残し、Zを使ってUTCであることを示す
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// イベント時刻の文字列をUTCのDateTimeに正規化する
///
/// 受け付ける形式:
/// - RFC 3339 (`2024-01-01T12:00:00Z`, `2024-01-01T14:00:00.250+02:00`)
/// - 日付と時刻の区切りに空白、小文字の `t` / `z`
/// - コロンなしのオフセット (`2024-01-01T14:00:00+0200`)
///
/// オフセットもゾーン指定もない時刻は曖昧なため `MissingOffset` として拒否する。
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TimestampError::Empty);
    }

    let mut normalized = trimmed.to_ascii_uppercase();
    if normalized.len() > 10 && normalized.as_bytes()[10] == b' ' {
        normalized.replace_range(10..11, "T");
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt.with_timezone(&Utc));
    }

    if NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f").is_ok() {
        return Err(TimestampError::MissingOffset(trimmed.to_string()));
    }

    Err(TimestampError::Invalid(trimmed.to_string()))
}
