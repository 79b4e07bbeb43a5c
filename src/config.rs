use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ResolveError};

/// スケジューラのシートキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum SheetKey {
    #[value(name = "A")]
    A,
    #[value(name = "B")]
    B,
    #[value(name = "C")]
    C,
    #[value(name = "D")]
    D,
}

impl SheetKey {
    /// 設定ファイル上のキー名
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl std::fmt::Display for SheetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 既定の設定ファイル名
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// シートキーからカレンダーIDへの対応表
///
/// シートごとの中身は参照するキーだけを検査するため、型を固定しない。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// シートごとの設定
    #[serde(default)]
    pub sheets: serde_json::Value,
}

impl SheetsConfig {
    /// シートに対応する空でないカレンダーIDを返す
    pub fn calendar_id(&self, sheet: SheetKey) -> Option<&str> {
        self.sheets
            .get(sheet.as_str())
            .and_then(|cfg| cfg.get("calendarId"))
            .and_then(serde_json::Value::as_str)
            .filter(|id| !id.trim().is_empty())
    }
}

/// 実行ファイルと同じディレクトリにある設定ファイルのパス
pub fn sibling_config_path(exe: &Path) -> PathBuf {
    exe.parent()
        .unwrap_or_else(|| Path::new("."))
        .join(DEFAULT_CONFIG_FILE)
}

/// 既定の設定ファイルのパス（実行ファイルの隣）
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let exe = std::env::current_exe().map_err(ConfigError::Locate)?;
    Ok(sibling_config_path(&exe))
}

/// 設定ファイルを読み込む（拡張子が .toml ならTOML、それ以外はJSON）
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SheetsConfig, ConfigError> {
    let path = path.as_ref();
    let config_str = read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    if is_toml {
        toml::from_str(&config_str).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_json::from_str(&config_str).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// 引数からカレンダーIDを決定する
///
/// カレンダーIDが直接指定されていればそれを優先し、設定ファイルは読まない。
pub fn resolve_calendar_id(
    calendar_id: Option<&str>,
    sheet: Option<SheetKey>,
    config_path: &Path,
) -> Result<String, ResolveError> {
    if let Some(id) = calendar_id.filter(|id| !id.is_empty()) {
        debug!("Using calendar ID from arguments: {}", id);
        return Ok(id.to_string());
    }

    let sheet = sheet.ok_or(ResolveError::MissingTarget)?;

    debug!("Resolving calendar ID for sheet {} from {}", sheet, config_path.display());
    let config = load_config(config_path)?;

    config
        .calendar_id(sheet)
        .map(str::to_string)
        .ok_or_else(|| ResolveError::CalendarNotFound {
            sheet: sheet.to_string(),
            path: config_path.to_path_buf(),
        })
}
