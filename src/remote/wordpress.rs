//! Typed client for the `exam-app/v1` REST namespace of the WordPress plugin.
//!
//! Every authenticated call sends the session token as a bearer header.
//! WordPress reports failures as `{code, message, data: {status}}`; those are
//! translated into [`AppError`] variants here so callers never look at raw
//! status codes.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        certificate::CertificateData,
        organization::Organization,
        question::{Question, SheetQuestionsRequest},
        session::TokenPayload,
        test_result::TestResult,
        user::{UpdateNameRequest, UpdateNameResponse},
    },
};

static SHEET_URL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^https://docs\.google\.com/spreadsheets/d/[A-Za-z0-9_-]+").ok()
});

/// `true` for a Google Sheets document URL the plugin can import questions from.
pub fn is_sheet_url(raw: &str) -> bool {
    let Ok(parsed) = url::Url::parse(raw.trim()) else {
        return false;
    };
    if parsed.scheme() != "https" || parsed.host_str() != Some("docs.google.com") {
        return false;
    }
    SHEET_URL
        .as_ref()
        .is_some_and(|re| re.is_match(parsed.as_str()))
}

/// Error body returned by the WordPress REST API.
#[derive(Debug, Default, Deserialize)]
struct WpError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Clone)]
pub struct WordPressClient {
    http: reqwest::Client,
    base_url: String,
}

impl WordPressClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /app-config`: the organizations and their exams. Public.
    pub async fn get_app_config(&self) -> Result<Vec<Organization>, AppError> {
        self.send(self.http.get(self.url("/app-config"))).await
    }

    /// `GET /get-user-data`: fresh identity, entitlements and prices.
    pub async fn get_user_data(&self, token: &str) -> Result<TokenPayload, AppError> {
        self.send(self.http.get(self.url("/get-user-data")).bearer_auth(token))
            .await
    }

    /// `GET /user-results`: every result WordPress holds for the token's user.
    pub async fn get_user_results(&self, token: &str) -> Result<Vec<TestResult>, AppError> {
        self.send(self.http.get(self.url("/user-results")).bearer_auth(token))
            .await
    }

    pub async fn get_result(&self, token: &str, test_id: &str) -> Result<TestResult, AppError> {
        let path = format!("/result/{}", test_id);
        self.send(self.http.get(self.url(&path)).bearer_auth(token))
            .await
    }

    /// `GET /certificate-data/{testId}`. WordPress applies its own gate.
    pub async fn get_certificate_data(
        &self,
        token: &str,
        test_id: &str,
    ) -> Result<CertificateData, AppError> {
        let path = format!("/certificate-data/{}", test_id);
        self.send(self.http.get(self.url(&path)).bearer_auth(token))
            .await
    }

    pub async fn update_name(
        &self,
        token: &str,
        full_name: &str,
    ) -> Result<UpdateNameResponse, AppError> {
        let body = UpdateNameRequest {
            full_name: full_name.to_string(),
        };
        self.send(
            self.http
                .post(self.url("/update-name"))
                .bearer_auth(token)
                .json(&body),
        )
        .await
    }

    /// `POST /submit-result`. The echoed result is not needed.
    pub async fn submit_result(&self, token: &str, result: &TestResult) -> Result<(), AppError> {
        let _: serde_json::Value = self
            .send(
                self.http
                    .post(self.url("/submit-result"))
                    .bearer_auth(token)
                    .json(result),
            )
            .await?;
        Ok(())
    }

    /// `POST /questions-from-sheet`: draws `count` questions from a Google Sheet.
    pub async fn questions_from_sheet(
        &self,
        token: &str,
        sheet_url: &str,
        count: u32,
    ) -> Result<Vec<Question>, AppError> {
        if !is_sheet_url(sheet_url) {
            return Err(AppError::BadRequest(format!(
                "Not a Google Sheets URL: {}",
                sheet_url
            )));
        }
        let body = SheetQuestionsRequest {
            sheet_url: sheet_url.to_string(),
            count,
        };
        body.validate()?;

        self.send(
            self.http
                .post(self.url("/questions-from-sheet"))
                .bearer_auth(token)
                .json(&body),
        )
        .await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AppError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                AppError::SyncError(format!("Unexpected response from WordPress: {}", e))
            });
        }

        let body = response.json::<WpError>().await.unwrap_or_default();
        Err(map_error(status, body))
    }
}

fn map_error(status: StatusCode, body: WpError) -> AppError {
    let message = if body.message.is_empty() {
        format!("WordPress answered {}", status)
    } else {
        body.message
    };

    match status {
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::FORBIDDEN if body.code == "not_earned" => AppError::NotEligible(message),
        StatusCode::UNAUTHORIZED => AppError::InvalidToken(message),
        StatusCode::FORBIDDEN if body.code.starts_with("jwt_") => AppError::InvalidToken(message),
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::BAD_REQUEST => AppError::BadRequest(message),
        _ => AppError::SyncError(format!("{} ({})", message, status)),
    }
}
