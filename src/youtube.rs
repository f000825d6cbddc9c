//! YouTube Data API client
//!
//! Drives the two-step resumable upload: an init request carrying the
//! video metadata opens a session, then the file body is streamed to
//! the session URL in a single PUT.

use crate::auth::CredentialStore;
use crate::error::{Error, Result, UploadError};
use crate::logger::ActivityLog;
use crate::types::{Credentials, Privacy, UploadJob};
use futures::stream;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Body, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com";

/// Resumable upload endpoint
const UPLOAD_ENDPOINT: &str = "/upload/youtube/v3/videos";

/// Read size when streaming the file body
const CHUNK_SIZE: usize = 256 * 1024;

/// Video insert request body
#[derive(Debug, Serialize)]
struct VideoResource<'a> {
    snippet: Snippet<'a>,
    status: Status,
}

#[derive(Debug, Serialize)]
struct Snippet<'a> {
    title: &'a str,
    description: &'a str,
    tags: &'a [String],
    #[serde(rename = "categoryId")]
    category_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Status {
    #[serde(rename = "privacyStatus")]
    privacy_status: Privacy,
}

/// Video insert response
#[derive(Debug, Deserialize)]
struct VideoResponse {
    id: Option<String>,
}

/// Standard Google error envelope
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: u16,
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    #[serde(default)]
    reason: Option<String>,
}

/// Client for uploading a single video
pub struct YouTubeClient {
    http: Client,
    api_base: String,
    store: CredentialStore,
    credentials: Credentials,
    log: ActivityLog,
}

impl YouTubeClient {
    /// Create a new client
    pub fn new(store: CredentialStore, credentials: Credentials, log: ActivityLog) -> Self {
        Self::with_api_base(store, credentials, log, YOUTUBE_API_BASE.to_string())
    }

    /// Create with custom API base
    pub fn with_api_base(
        store: CredentialStore,
        credentials: Credentials,
        log: ActivityLog,
        api_base: String,
    ) -> Self {
        Self {
            http: Client::new(),
            api_base,
            store,
            credentials,
            log,
        }
    }

    /// Upload a video and return its id
    ///
    /// `on_progress` receives the fraction of bytes sent, updated after
    /// each chunk leaves the reader. If the API rejects the access
    /// token, it is refreshed once and the session init retried. The
    /// attempt and its outcome are recorded in the activity log.
    pub async fn upload<F>(&mut self, job: &UploadJob, on_progress: F) -> Result<String>
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        match self.try_upload(job, on_progress).await {
            Ok(video_id) => {
                self.log.upload_success(&video_id);
                Ok(video_id)
            }
            Err(e) => {
                self.log.upload_error(&e);
                Err(e)
            }
        }
    }

    async fn try_upload<F>(&mut self, job: &UploadJob, on_progress: F) -> Result<String>
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        // File checks come before any network traffic
        let metadata = tokio::fs::metadata(&job.file_path)
            .await
            .map_err(|_| UploadError::FileNotFound(job.file_path.clone()))?;
        if metadata.is_dir() {
            return Err(UploadError::PathIsDirectory(job.file_path.clone()).into());
        }
        if !metadata.is_file() {
            return Err(UploadError::PathNotRegularFile(job.file_path.clone()).into());
        }

        let file_size = metadata.len();
        let content_type = mime_guess::from_path(&job.file_path)
            .first_or_octet_stream()
            .to_string();

        self.log
            .upload_start(&job.file_path, &job.metadata.title, file_size);
        info!(
            "Starting upload of {} ({} bytes, {})",
            job.file_path.display(),
            file_size,
            content_type
        );

        let session_url = self.init_session(job, file_size, &content_type).await?;
        let video_id = self
            .send_file(&session_url, &job.file_path, file_size, &content_type, on_progress)
            .await?;

        info!("Upload complete: video id {}", video_id);

        Ok(video_id)
    }

    /// Open a resumable upload session and return its URL
    async fn init_session(
        &mut self,
        job: &UploadJob,
        file_size: u64,
        content_type: &str,
    ) -> Result<String> {
        let response = self.request_session(job, file_size, content_type).await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Access token rejected; refreshing and retrying");
            self.credentials = self.store.refresh().await?;
            self.request_session(job, file_size, content_type).await?
        } else {
            response
        };

        if !response.status().is_success() {
            return Err(decode_api_error(response).await);
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| UploadError::MissingSessionUrl.into())
    }

    async fn request_session(
        &self,
        job: &UploadJob,
        file_size: u64,
        content_type: &str,
    ) -> Result<reqwest::Response> {
        let url = format!(
            "{}{}?uploadType=resumable&part=snippet,status",
            self.api_base, UPLOAD_ENDPOINT
        );

        let meta = &job.metadata;
        let body = VideoResource {
            snippet: Snippet {
                title: &meta.title,
                description: &meta.description,
                tags: &meta.tags,
                category_id: &meta.category_id,
            },
            status: Status {
                privacy_status: meta.privacy,
            },
        };

        let response = self
            .http
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.credentials.access_token),
            )
            .header("X-Upload-Content-Length", file_size)
            .header("X-Upload-Content-Type", content_type)
            .json(&body)
            .send()
            .await?;

        Ok(response)
    }

    /// Stream the file body to the session URL
    async fn send_file<F>(
        &self,
        session_url: &str,
        path: &Path,
        file_size: u64,
        content_type: &str,
        on_progress: F,
    ) -> Result<String>
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        let file = tokio::fs::File::open(path).await?;
        let on_progress = Arc::new(on_progress);
        let log = self.log.clone();

        let body_stream = stream::unfold((file, 0u64), move |(mut file, sent)| {
            let on_progress = on_progress.clone();
            let log = log.clone();
            async move {
                let mut buf = vec![0u8; CHUNK_SIZE];
                match file.read(&mut buf).await {
                    Ok(0) => None,
                    Ok(n) => {
                        buf.truncate(n);
                        let sent = sent + n as u64;
                        let fraction = sent as f64 / file_size as f64;
                        log.upload_progress(fraction);
                        on_progress(fraction);
                        Some((Ok::<_, std::io::Error>(buf), (file, sent)))
                    }
                    Err(e) => Some((Err(e), (file, sent))),
                }
            }
        });

        let response = self
            .http
            .put(session_url)
            .header(
                "Authorization",
                format!("Bearer {}", self.credentials.access_token),
            )
            // Explicit length keeps the transfer un-chunked
            .header(CONTENT_LENGTH, file_size)
            .header(CONTENT_TYPE, content_type)
            .body(Body::wrap_stream(body_stream))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(decode_api_error(response).await);
        }

        let video: VideoResponse = response.json().await?;
        video
            .id
            .ok_or_else(|| UploadError::NoVideoIdReturned.into())
    }
}

/// Decode the Google error envelope, falling back to the raw body
async fn decode_api_error(response: reqwest::Response) -> Error {
    let code = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ApiErrorEnvelope>(&body) {
        Ok(envelope) => {
            let reasons = envelope
                .error
                .errors
                .iter()
                .filter_map(|e| e.reason.clone())
                .collect();

            UploadError::Api {
                code: envelope.error.code,
                status: envelope.error.status,
                message: envelope.error.message,
                reasons,
            }
            .into()
        }
        Err(_) => UploadError::Api {
            code,
            status: None,
            message: if body.is_empty() {
                format!("HTTP {}", code)
            } else {
                body
            },
            reasons: Vec::new(),
        }
        .into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LogLevel, VideoMetadata};
    use chrono::Utc;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_log(dir: &TempDir) -> ActivityLog {
        ActivityLog::with_dir(dir.path().join("logs"), LogLevel::Info)
    }

    fn test_job(file_path: PathBuf) -> UploadJob {
        UploadJob {
            file_path,
            metadata: VideoMetadata {
                title: "My Video".to_string(),
                description: "A description".to_string(),
                tags: vec!["demo".to_string(), "test".to_string()],
                privacy: Privacy::Private,
                category_id: "22".to_string(),
            },
        }
    }

    fn test_credentials(token: &str) -> Credentials {
        Credentials {
            access_token: token.to_string(),
            refresh_token: Some("r-1".to_string()),
            expiry: Utc::now(),
            scope: None,
        }
    }

    /// Store pointing at paths that do not exist; refresh would fail
    fn inert_store(dir: &TempDir) -> CredentialStore {
        CredentialStore::with_paths(
            dir.path().join("no-tokens.json"),
            dir.path().join("no-secrets.json"),
            test_log(dir),
        )
    }

    fn write_video_file(dir: &TempDir, bytes: usize) -> PathBuf {
        let path = dir.path().join("video.mp4");
        std::fs::write(&path, vec![7u8; bytes]).unwrap();
        path
    }

    #[tokio::test]
    async fn test_upload_streams_file_and_returns_id() {
        let server = MockServer::start().await;
        let session_url = format!("{}/session/1", server.uri());

        Mock::given(method("POST"))
            .and(path(UPLOAD_ENDPOINT))
            .and(query_param("uploadType", "resumable"))
            .and(query_param("part", "snippet,status"))
            .and(header("Authorization", "Bearer tok"))
            .and(header("X-Upload-Content-Type", "video/mp4"))
            .and(body_partial_json(serde_json::json!({
                "snippet": { "title": "My Video", "categoryId": "22" },
                "status": { "privacyStatus": "private" }
            })))
            .respond_with(ResponseTemplate::new(200).insert_header("Location", session_url.as_str()))
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/session/1"))
            .and(header("Content-Type", "video/mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "id": "vid123", "kind": "youtube#video" })),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        // Three chunks: 256 KiB, 256 KiB, and a 88 KiB remainder
        let file_path = write_video_file(&dir, 600 * 1024);
        let job = test_job(file_path);

        let progress: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = progress.clone();

        let log = test_log(&dir);
        let mut client = YouTubeClient::with_api_base(
            inert_store(&dir),
            test_credentials("tok"),
            log.clone(),
            server.uri(),
        );
        let video_id = client
            .upload(&job, move |f| seen.lock().unwrap().push(f))
            .await
            .unwrap();

        assert_eq!(video_id, "vid123");

        let fractions = progress.lock().unwrap();
        assert_eq!(fractions.len(), 3);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*fractions.last().unwrap(), 1.0);

        // Start and outcome are recorded; progress stays below INFO
        let lines = log.tail(10).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Upload started"));
        assert!(lines[1].contains("Upload succeeded"));
        assert!(lines[1].contains("vid123"));
    }

    #[tokio::test]
    async fn test_upload_refreshes_token_once_on_401() {
        let server = MockServer::start().await;
        let session_url = format!("{}/session/2", server.uri());

        // Stale token is rejected, refreshed token accepted
        Mock::given(method("POST"))
            .and(path(UPLOAD_ENDPOINT))
            .and(header("Authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_ENDPOINT))
            .and(header("Authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).insert_header("Location", session_url.as_str()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/session/2"))
            .and(header("Authorization", "Bearer fresh"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "vid456" })),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let cache_path = dir.path().join("tokens.json");
        std::fs::write(
            &cache_path,
            serde_json::to_string(&test_credentials("stale")).unwrap(),
        )
        .unwrap();
        let secrets_path = dir.path().join("client_secrets.json");
        std::fs::write(
            &secrets_path,
            serde_json::json!({
                "installed": {
                    "client_id": "id",
                    "client_secret": "sec",
                    "token_uri": format!("{}/token", server.uri()),
                }
            })
            .to_string(),
        )
        .unwrap();
        let store = CredentialStore::with_paths(cache_path, secrets_path, test_log(&dir));

        let file_path = write_video_file(&dir, 1024);
        let job = test_job(file_path);

        let mut client = YouTubeClient::with_api_base(
            store,
            test_credentials("stale"),
            test_log(&dir),
            server.uri(),
        );
        let video_id = client.upload(&job, |_| {}).await.unwrap();

        assert_eq!(video_id, "vid456");
    }

    #[tokio::test]
    async fn test_upload_decodes_api_error_envelope() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(UPLOAD_ENDPOINT))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {
                    "code": 403,
                    "message": "The request cannot be completed because you have exceeded your quota.",
                    "errors": [
                        { "message": "quota", "domain": "youtube.quota", "reason": "quotaExceeded" }
                    ],
                    "status": "PERMISSION_DENIED"
                }
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let file_path = write_video_file(&dir, 64);
        let job = test_job(file_path);

        let mut client = YouTubeClient::with_api_base(
            inert_store(&dir),
            test_credentials("tok"),
            test_log(&dir),
            server.uri(),
        );
        let err = client.upload(&job, |_| {}).await.unwrap_err();

        match err {
            Error::Upload(UploadError::Api {
                code,
                status,
                message,
                reasons,
            }) => {
                assert_eq!(code, 403);
                assert_eq!(status.as_deref(), Some("PERMISSION_DENIED"));
                assert!(message.contains("exceeded your quota"));
                assert_eq!(reasons, vec!["quotaExceeded".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_directory_rejected_before_any_request() {
        let dir = TempDir::new().unwrap();
        let job = test_job(dir.path().to_path_buf());

        // Unroutable base: reaching the network would fail differently
        let mut client = YouTubeClient::with_api_base(
            inert_store(&dir),
            test_credentials("tok"),
            test_log(&dir),
            "http://127.0.0.1:9".to_string(),
        );
        let err = client.upload(&job, |_| {}).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Upload(UploadError::PathIsDirectory(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file_rejected_before_any_request() {
        let dir = TempDir::new().unwrap();
        let job = test_job(dir.path().join("gone.mp4"));

        let mut client = YouTubeClient::with_api_base(
            inert_store(&dir),
            test_credentials("tok"),
            test_log(&dir),
            "http://127.0.0.1:9".to_string(),
        );
        let err = client.upload(&job, |_| {}).await.unwrap_err();

        assert!(matches!(err, Error::Upload(UploadError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_session_url_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(UPLOAD_ENDPOINT))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let file_path = write_video_file(&dir, 64);
        let job = test_job(file_path);

        let mut client = YouTubeClient::with_api_base(
            inert_store(&dir),
            test_credentials("tok"),
            test_log(&dir),
            server.uri(),
        );
        let err = client.upload(&job, |_| {}).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Upload(UploadError::MissingSessionUrl)
        ));
    }

    #[tokio::test]
    async fn test_missing_video_id_is_an_error() {
        let server = MockServer::start().await;
        let session_url = format!("{}/session/3", server.uri());

        Mock::given(method("POST"))
            .and(path(UPLOAD_ENDPOINT))
            .respond_with(ResponseTemplate::new(200).insert_header("Location", session_url.as_str()))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/session/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let file_path = write_video_file(&dir, 64);
        let job = test_job(file_path);

        let mut client = YouTubeClient::with_api_base(
            inert_store(&dir),
            test_credentials("tok"),
            test_log(&dir),
            server.uri(),
        );
        let err = client.upload(&job, |_| {}).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Upload(UploadError::NoVideoIdReturned)
        ));
    }
}
