use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

use crate::calendar::{
    EventPages, EventSource, EventsRequest, TimeWindow, DEFAULT_LEAD_MINUTES,
    DEFAULT_LOOKBACK_MINUTES, DEFAULT_PAGE_SIZE,
};
use crate::error::LiveError;
use crate::event::CalendarEvent;

/// 判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveStatus {
    Live,
    Off,
}

impl LiveStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

impl From<bool> for LiveStatus {
    fn from(live: bool) -> Self {
        if live {
            Self::Live
        } else {
            Self::Off
        }
    }
}

impl std::fmt::Display for LiveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => f.write_str("is live"),
            Self::Off => f.write_str("is off"),
        }
    }
}

/// 判定の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckSettings {
    /// now からどれだけ遡ってイベントを検索するか
    pub lookback: Duration,

    /// now からどれだけ先まで検索するか
    pub lead: Duration,

    /// 1ページあたりの件数
    pub page_size: u32,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            lookback: Duration::minutes(i64::from(DEFAULT_LOOKBACK_MINUTES)),
            lead: Duration::minutes(i64::from(DEFAULT_LEAD_MINUTES)),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// ページを順に読み、now の時点で進行中の最初のイベントを返す
///
/// 一致した時点で打ち切り、以降のページは取得しない。
pub async fn find_live_event<S: EventSource + ?Sized>(
    pages: &mut EventPages<'_, S>,
    now: DateTime<Utc>,
) -> Result<Option<CalendarEvent>, LiveError> {
    let mut examined = 0usize;

    while let Some(events) = pages.next_page().await? {
        for event in events {
            examined += 1;
            let live = event.is_live_at(now).map_err(|source| LiveError::Timestamp {
                event: event.label().to_string(),
                source,
            })?;

            if live {
                debug!("Event {} is in progress", event.describe());
                return Ok(Some(event));
            }
        }
    }

    debug!("No event in progress among {} events", examined);
    Ok(None)
}

/// カレンダーに now の時点で進行中のイベントがあるか判定する
pub async fn check_is_live<S: EventSource + ?Sized>(
    source: &S,
    calendar_id: &str,
    now: DateTime<Utc>,
    settings: &CheckSettings,
) -> Result<LiveStatus, LiveError> {
    let window = TimeWindow::around(now, settings.lookback, settings.lead);
    debug!(
        "Time range: {} to {}",
        window.start.to_rfc3339(),
        window.end.to_rfc3339()
    );

    let request = EventsRequest::new(calendar_id, window).with_page_size(settings.page_size);
    let mut pages = EventPages::new(source, request);

    let status = match find_live_event(&mut pages, now).await? {
        Some(event) => {
            info!("Calendar {} is live: {}", calendar_id, event.describe());
            LiveStatus::Live
        }
        None => {
            info!("Calendar {} has no event in progress", calendar_id);
            LiveStatus::Off
        }
    };

    debug!("Fetched {} page(s)", pages.pages_fetched());
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{EventPage, MockEventSource};
    use crate::event::EventTime;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn event(start: &str, end: &str) -> CalendarEvent {
        CalendarEvent {
            start: Some(EventTime::timed(start)),
            end: Some(EventTime::timed(end)),
            ..Default::default()
        }
    }

    fn finished_events(count: usize) -> Vec<CalendarEvent> {
        (0..count)
            .map(|_| event("2024-01-01T01:00:00Z", "2024-01-01T02:00:00Z"))
            .collect()
    }

    #[tokio::test]
    async fn stops_after_first_page_with_live_event() {
        let mut source = MockEventSource::new();
        source.expect_list_events().times(1).returning(|_| {
            Ok(EventPage {
                items: vec![event("2024-01-01T11:30:00Z", "2024-01-01T12:30:00Z")],
                next_page_token: Some("p2".to_string()),
            })
        });

        let status = check_is_live(&source, "cal123", now(), &CheckSettings::default())
            .await
            .unwrap();
        assert_eq!(status, LiveStatus::Live);
    }

    #[tokio::test]
    async fn examines_every_page_when_nothing_is_live() {
        let mut source = MockEventSource::new();
        let mut seq = mockall::Sequence::new();
        for (size, next) in [(50, Some("p2")), (50, Some("p3")), (7, None)] {
            source
                .expect_list_events()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_| {
                    Ok(EventPage {
                        items: finished_events(size),
                        next_page_token: next.map(str::to_string),
                    })
                });
        }

        let window = TimeWindow::around(now(), Duration::hours(12), Duration::minutes(1));
        let mut pages = EventPages::new(&source, EventsRequest::new("cal123", window));
        assert_eq!(find_live_event(&mut pages, now()).await.unwrap(), None);
        assert_eq!(pages.pages_fetched(), 3);
    }

    #[tokio::test]
    async fn live_event_on_last_page_is_found() {
        let mut source = MockEventSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_list_events()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(EventPage {
                    items: finished_events(50),
                    next_page_token: Some("p2".to_string()),
                })
            });
        source
            .expect_list_events()
            .withf(|req| req.page_token.as_deref() == Some("p2"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(EventPage {
                    items: vec![event("2024-01-01T12:00:00Z", "2024-01-01T13:00:00Z")],
                    next_page_token: None,
                })
            });

        let status = check_is_live(&source, "cal123", now(), &CheckSettings::default())
            .await
            .unwrap();
        assert!(status.is_live());
    }

    #[tokio::test]
    async fn event_ending_now_is_off() {
        let mut source = MockEventSource::new();
        source.expect_list_events().times(1).returning(|_| {
            Ok(EventPage {
                items: vec![event("2024-01-01T11:30:00Z", "2024-01-01T12:00:00Z")],
                next_page_token: None,
            })
        });

        let status = check_is_live(&source, "cal123", now(), &CheckSettings::default())
            .await
            .unwrap();
        assert_eq!(status, LiveStatus::Off);
        assert_eq!(status.to_string(), "is off");
    }

    #[tokio::test]
    async fn request_uses_settings() {
        let mut source = MockEventSource::new();
        source
            .expect_list_events()
            .withf(|req| {
                req.calendar_id == "cal123"
                    && req.page_size == 10
                    && req.window.start == Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap()
                    && req.window.end == Utc.with_ymd_and_hms(2024, 1, 1, 12, 5, 0).unwrap()
            })
            .times(1)
            .returning(|_| Ok(EventPage::default()));

        let settings = CheckSettings {
            lookback: Duration::minutes(60),
            lead: Duration::minutes(5),
            page_size: 10,
        };
        let status = check_is_live(&source, "cal123", now(), &settings).await.unwrap();
        assert_eq!(status, LiveStatus::Off);
    }

    #[tokio::test]
    async fn malformed_timestamp_aborts() {
        let mut source = MockEventSource::new();
        source.expect_list_events().times(1).returning(|_| {
            Ok(EventPage {
                items: vec![event("yesterday", "2024-01-01T12:30:00Z")],
                next_page_token: Some("p2".to_string()),
            })
        });

        let err = check_is_live(&source, "cal123", now(), &CheckSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LiveError::Timestamp { .. }));
    }

    #[test]
    fn status_words() {
        assert_eq!(LiveStatus::from(true).to_string(), "is live");
        assert_eq!(LiveStatus::from(false).to_string(), "is off");
    }
}
