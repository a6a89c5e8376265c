use super::{ExportSink, FileId};
use crate::error::{FeedError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart&fields=id";

/// Google Drive v3 sink that creates each blob inside a fixed folder.
///
/// Authentication is an OAuth access token issued elsewhere; this sink only
/// presents it as a bearer credential.
pub struct DriveSink {
    client: reqwest::Client,
    access_token: String,
    folder_id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

impl DriveSink {
    pub fn new(access_token: impl Into<String>, folder_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.into(),
            folder_id: folder_id.into(),
        }
    }
}

/// Builds a `multipart/related` body: JSON metadata part, then the media part.
fn multipart_body(boundary: &str, metadata: &serde_json::Value, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 256);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: application/json\r\n\r\n",
            b = boundary,
            m = metadata
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[async_trait]
impl ExportSink for DriveSink {
    async fn upload(&self, name: &str, content: Vec<u8>) -> Result<FileId> {
        let boundary = format!("fxfeed-{}", uuid::Uuid::new_v4().simple());
        let metadata = json!({
            "name": name,
            "parents": [self.folder_id],
            "mimeType": "application/json",
        });

        let created = self
            .client
            .post(UPLOAD_URL)
            .bearer_auth(&self.access_token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(multipart_body(&boundary, &metadata, &content))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| FeedError::SinkUnavailable(e.to_string()))?
            .json::<CreatedFile>()
            .await
            .map_err(|e| FeedError::SinkUnavailable(format!("unexpected upload response: {}", e)))?;

        info!(file_id = %created.id, name, folder = %self.folder_id, "uploaded snapshot to drive");
        Ok(FileId(created.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_body_layout() {
        let metadata = json!({"name": "currencies.json"});
        let body = multipart_body("xyz", &metadata, br#"{"USD":"4.97"}"#);
        let text = String::from_utf8(body).unwrap();

        assert_eq!(
            text,
            "--xyz\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{\"name\":\"currencies.json\"}\r\n\
             --xyz\r\nContent-Type: application/json\r\n\r\n{\"USD\":\"4.97\"}\r\n--xyz--\r\n"
        );
    }
}
