use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};
use yup_oauth2::authenticator::{
    ApplicationDefaultCredentialsTypes, Authenticator, DefaultHyperClient, HyperClientBuilder,
};
use yup_oauth2::{
    ApplicationDefaultCredentialsAuthenticator, ApplicationDefaultCredentialsFlowOpts,
    ServiceAccountAuthenticator,
};

use crate::error::AuthError;

/// カレンダー読み取り専用スコープ
pub const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// サービスアカウント鍵ファイルを指す環境変数
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// アクセストークンの供給元
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// 固定のトークンを返すプロバイダ（テストやトークンを外部で取得済みの場合）
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

/// 認証情報の取得方法
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// サービスアカウントの鍵ファイル
    ServiceAccountKey(PathBuf),

    /// 実行環境のデフォルト認証情報（gcloud / メタデータサーバ）
    ApplicationDefault,
}

impl CredentialSource {
    /// 鍵ファイルが存在すればそれを使い、なければデフォルト認証情報にフォールバックする
    pub fn from_key_path(path: Option<&Path>) -> Self {
        match path {
            Some(path) if path.is_file() => Self::ServiceAccountKey(path.to_path_buf()),
            Some(path) => {
                debug!(
                    "Service account key {} not found, falling back to application default credentials",
                    path.display()
                );
                Self::ApplicationDefault
            }
            None => Self::ApplicationDefault,
        }
    }
}

type DefaultAuthenticator = Authenticator<<DefaultHyperClient as HyperClientBuilder>::Connector>;

/// yup-oauth2 を使ったGoogleのトークンプロバイダ
pub struct GoogleTokenProvider {
    auth: DefaultAuthenticator,
    scopes: Vec<String>,
}

impl GoogleTokenProvider {
    /// 認証情報の取得方法に応じて認証器を初期化する
    pub async fn from_source(source: &CredentialSource) -> Result<Self, AuthError> {
        let auth = match source {
            CredentialSource::ServiceAccountKey(path) => {
                info!("Using service account key {}", path.display());
                let key = yup_oauth2::read_service_account_key(path)
                    .await
                    .map_err(|source| AuthError::ServiceAccountKey {
                        path: path.clone(),
                        source,
                    })?;

                ServiceAccountAuthenticator::builder(key)
                    .build()
                    .await
                    .map_err(AuthError::Authenticator)?
            }
            CredentialSource::ApplicationDefault => {
                info!("Using application default credentials");
                let opts = ApplicationDefaultCredentialsFlowOpts::default();
                match ApplicationDefaultCredentialsAuthenticator::builder(opts).await {
                    ApplicationDefaultCredentialsTypes::ServiceAccount(builder) => {
                        builder.build().await.map_err(AuthError::Authenticator)?
                    }
                    ApplicationDefaultCredentialsTypes::InstanceMetadata(builder) => {
                        builder.build().await.map_err(AuthError::Authenticator)?
                    }
                }
            }
        };

        Ok(Self {
            auth,
            scopes: vec![CALENDAR_READONLY_SCOPE.to_string()],
        })
    }
}

#[async_trait]
impl TokenProvider for GoogleTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        let token = self.auth.token(self.scopes.as_slice()).await?;
        let token = token.token().ok_or(AuthError::EmptyToken)?;
        debug!("Access token obtained, length: {}", token.len());
        Ok(token.to_string())
    }
}
