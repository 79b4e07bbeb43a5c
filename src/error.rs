use std::path::PathBuf;
use thiserror::Error;

/// 設定ファイルの読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to locate the executable to find the default config file")]
    Locate(#[source] std::io::Error),

    #[error("Failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path} as JSON")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse config file {path} as TOML")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// カレンダーIDの解決エラー
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("either --calendar-id or --sheet must be provided")]
    MissingTarget,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("calendarId not found for sheet {sheet} in {path}")]
    CalendarNotFound { sheet: String, path: PathBuf },
}

/// 認証エラー
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read service account key {path}")]
    ServiceAccountKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build authenticator")]
    Authenticator(#[source] std::io::Error),

    #[error("Failed to obtain access token")]
    Token(#[from] yup_oauth2::Error),

    #[error("Token response did not contain an access token")]
    EmptyToken,
}

/// イベント一覧取得のエラー
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Failed to build calendar API URL")]
    Url(#[from] url::ParseError),

    #[error("Failed to send request to Google Calendar API")]
    Transport(#[source] reqwest::Error),

    #[error("Calendar API request failed: {status} - {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to parse calendar API response")]
    Decode(#[source] serde_json::Error),
}

/// タイムスタンプの正規化エラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("timestamp is empty")]
    Empty,

    #[error("timestamp {0:?} has no UTC offset or zone designator")]
    MissingOffset(String),

    #[error("timestamp {0:?} is not a valid RFC 3339 / ISO 8601 timestamp")]
    Invalid(String),
}

/// 判定処理全体のエラー
#[derive(Debug, Error)]
pub enum LiveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to parse time of event {event}")]
    Timestamp {
        event: String,
        #[source]
        source: TimestampError,
    },
}
