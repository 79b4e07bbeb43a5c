use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TimestampError;
use crate::utils::parse_timestamp;

/// イベントの開始・終了時刻（Google Calendar APIの EventDateTime）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    /// 終日イベントの日付（YYYY-MM-DD）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// オフセット付きの日時
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,

    /// タイムゾーン名（表示用、判定には使わない）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    pub fn timed(date_time: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time.into()),
            ..Default::default()
        }
    }

    pub fn all_day(date: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
            ..Default::default()
        }
    }

    fn is_all_day(&self) -> bool {
        self.date.as_deref().is_some_and(|d| !d.is_empty())
    }

    fn timestamp(&self) -> Option<&str> {
        self.date_time.as_deref().filter(|dt| !dt.is_empty())
    }
}

/// カレンダーイベント（APIレスポンスのスナップショット）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default)]
    pub start: Option<EventTime>,

    #[serde(default)]
    pub end: Option<EventTime>,
}

/// イベントの区間の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSpan {
    /// どちらかの境界が終日指定
    AllDay,

    /// どちらかの境界に日時がない
    Incomplete,

    /// 開始・終了ともに時刻付き（UTCに正規化済み）
    Timed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl EventSpan {
    /// 半開区間 [start, end) に now が含まれるか
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Timed { start, end } => *start <= now && now < *end,
            Self::AllDay | Self::Incomplete => false,
        }
    }
}

impl CalendarEvent {
    /// ログ表示用の名前
    pub fn label(&self) -> &str {
        self.summary
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("(untitled)")
    }

    /// ログ表示用の説明（名前とステータス）
    pub fn describe(&self) -> String {
        match self.status.as_deref() {
            Some(status) => format!("'{}' [{}]", self.label(), status),
            None => format!("'{}'", self.label()),
        }
    }

    /// 開始・終了時刻を分類し、時刻付きならUTCに正規化する
    pub fn span(&self) -> Result<EventSpan, TimestampError> {
        let start = self.start.as_ref();
        let end = self.end.as_ref();

        if start.is_some_and(EventTime::is_all_day) || end.is_some_and(EventTime::is_all_day) {
            return Ok(EventSpan::AllDay);
        }

        let (Some(start), Some(end)) = (
            start.and_then(EventTime::timestamp),
            end.and_then(EventTime::timestamp),
        ) else {
            return Ok(EventSpan::Incomplete);
        };

        Ok(EventSpan::Timed {
            start: parse_timestamp(start)?,
            end: parse_timestamp(end)?,
        })
    }

    /// now の時点で進行中か
    pub fn is_live_at(&self, now: DateTime<Utc>) -> Result<bool, TimestampError> {
        Ok(self.span()?.contains(now))
    }
}
