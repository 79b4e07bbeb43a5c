use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::Deserialize;

use crate::auth::TokenProvider;
use crate::error::FetchError;
use crate::event::CalendarEvent;
use crate::utils::format_datetime_for_api;

/// Google Calendar API のベースURL
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// 1ページあたりの最大件数
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// 問い合わせ窓の終端を now より先に伸ばす分数
///
/// 運用上のポリシーで、判定の正しさには影響しない。
pub const DEFAULT_LEAD_MINUTES: u32 = 1;

/// 問い合わせ窓の始端を遡る分数
pub const DEFAULT_LOOKBACK_MINUTES: u32 = 720;

/// イベント検索の時間窓
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// now - lookback から now + lead までの窓
    pub fn around(now: DateTime<Utc>, lookback: Duration, lead: Duration) -> Self {
        Self {
            start: now - lookback,
            end: now + lead,
        }
    }
}

/// events.list の1リクエスト分のパラメータ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsRequest {
    pub calendar_id: String,
    pub window: TimeWindow,
    pub page_size: u32,
    pub page_token: Option<String>,
}

impl EventsRequest {
    pub fn new(calendar_id: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            window,
            page_size: DEFAULT_PAGE_SIZE,
            page_token: None,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

/// events.list のレスポンス1ページ分
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    #[serde(default)]
    pub items: Vec<CalendarEvent>,

    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// イベント一覧の取得元
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSource: Send + Sync {
    /// 1ページ分のイベントを取得する
    async fn list_events(&self, request: &EventsRequest) -> Result<EventPage, FetchError>;
}

/// ページトークンをたどってイベントを遅延取得するシーケンス
///
/// `next_page` を呼ぶたびに1リクエストだけ発行する。途中で打ち切れば残りのページは取得しない。
pub struct EventPages<'a, S: EventSource + ?Sized> {
    source: &'a S,
    first: EventsRequest,
    current: EventsRequest,
    finished: bool,
    pages_fetched: usize,
}

impl<'a, S: EventSource + ?Sized> EventPages<'a, S> {
    pub fn new(source: &'a S, request: EventsRequest) -> Self {
        Self {
            source,
            current: request.clone(),
            first: request,
            finished: false,
            pages_fetched: 0,
        }
    }

    /// 次のページを取得する。全ページを読み終えていれば `None`
    pub async fn next_page(&mut self) -> Result<Option<Vec<CalendarEvent>>, FetchError> {
        if self.finished {
            return Ok(None);
        }

        let page = match self.source.list_events(&self.current).await {
            Ok(page) => page,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };
        self.pages_fetched += 1;

        debug!(
            "Retrieved {} events from calendar {} (page {})",
            page.items.len(),
            self.current.calendar_id,
            self.pages_fetched
        );

        match page.next_page_token.filter(|token| !token.is_empty()) {
            Some(token) => self.current.page_token = Some(token),
            None => self.finished = true,
        }

        Ok(Some(page.items))
    }

    /// 最初のページからやり直す
    pub fn restart(&mut self) {
        self.current = self.first.clone();
        self.finished = false;
        self.pages_fetched = 0;
    }

    /// これまでに取得したページ数
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// 残りのページをすべて取得する
    pub async fn collect_all(mut self) -> Result<Vec<CalendarEvent>, FetchError> {
        let mut all_events = Vec::new();
        while let Some(events) = self.next_page().await? {
            all_events.extend(events);
        }
        Ok(all_events)
    }
}

/// Google Calendar API クライアント
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    tokens: Box<dyn TokenProvider>,
    base_url: String,
}

impl GoogleCalendarClient {
    /// トークンプロバイダを受け取ってクライアントを作成する
    pub fn new(
        tokens: Box<dyn TokenProvider>,
        timeout: std::time::Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Transport)?;

        Ok(Self {
            http,
            tokens,
            base_url: DEFAULT_API_BASE.to_string(),
        })
    }

    /// APIのベースURLを差し替える
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn events_url(&self, request: &EventsRequest) -> Result<url::Url, FetchError> {
        let endpoint = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&request.calendar_id)
        );

        let mut url = url::Url::parse(&endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("timeMin", &format_datetime_for_api(request.window.start))
                .append_pair("timeMax", &format_datetime_for_api(request.window.end))
                .append_pair("singleEvents", "true")
                .append_pair("orderBy", "startTime")
                .append_pair("maxResults", &request.page_size.to_string());
            if let Some(token) = &request.page_token {
                query.append_pair("pageToken", token);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl EventSource for GoogleCalendarClient {
    async fn list_events(&self, request: &EventsRequest) -> Result<EventPage, FetchError> {
        let token = self.tokens.access_token().await?;
        let url = self.events_url(request)?;

        debug!("Calendar API URL: {}", url);

        let res = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = res.status();
        let response_text = res.text().await.map_err(FetchError::Transport)?;

        if !status.is_success() {
            warn!("Calendar API request failed: {}", status);
            return Err(FetchError::Status {
                status,
                body: response_text,
            });
        }

        debug!("Response length: {} bytes", response_text.len());

        serde_json::from_str(&response_text).map_err(FetchError::Decode)
    }
}
