// S3-compatible bucket backend
// Works against AWS S3, MinIO and Supabase Storage's S3 endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use tracing::{debug, error};

use super::{FileEntry, StorageBackend, StorageError, StorageResult, StoredFile};
use crate::config::StorageConfig;

/// Objects returned by a single listing call. Further pages are not fetched.
pub const LIST_PAGE_SIZE: usize = 100;

pub struct RemoteBucket {
    bucket: Bucket,
    public_base: String,
}

impl RemoteBucket {
    pub fn from_config(config: &StorageConfig) -> anyhow::Result<Self> {
        let region = match &config.s3_endpoint {
            Some(endpoint) => Region::Custom {
                region: config.s3_region.clone(),
                endpoint: endpoint.trim_end_matches('/').to_string(),
            },
            None => config.s3_region.parse()?,
        };

        let credentials = Credentials::new(
            config.s3_access_key_id.as_deref(),
            config.s3_secret_access_key.as_deref(),
            None,
            None,
            None,
        )?;

        let mut bucket = Bucket::new(&config.s3_bucket, region, credentials)?;
        if config.s3_endpoint.is_some() {
            bucket = bucket.with_path_style();
        }

        let public_base = config
            .public_url
            .clone()
            .unwrap_or_else(|| bucket.url())
            .trim_end_matches('/')
            .to_string();

        Ok(Self { bucket, public_base })
    }
}

/// Every bucket failure, including a missing object, surfaces as unavailable
fn backend_error(err: S3Error) -> StorageError {
    let msg = match err {
        S3Error::HttpFailWithBody(status, body) => {
            let detail = extract_xml_message(&body).unwrap_or(body);
            format!("Storage request failed with status {}: {}", status, detail)
        }
        other => other.to_string(),
    };
    error!("Bucket operation failed: {}", msg);
    StorageError::BackendUnavailable(msg)
}

/// Pull `<Message>` out of an S3 XML error document
fn extract_xml_message(body: &str) -> Option<String> {
    let start = body.find("<Message>")? + "<Message>".len();
    let end = body[start..].find("</Message>")? + start;
    Some(body[start..end].to_string())
}

#[async_trait]
impl StorageBackend for RemoteBucket {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn write(&self, key: &str, bytes: Bytes, content_type: &str) -> StorageResult<()> {
        debug!(bucket = %self.bucket.name(), key = %key, "Uploading object");
        self.bucket
            .put_object_with_content_type(key, &bytes, content_type)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> Option<String> {
        Some(format!("{}/{}", self.public_base, key))
    }

    async fn list(&self) -> StorageResult<Vec<FileEntry>> {
        let (page, _status) = self
            .bucket
            .list_page(String::new(), Some("/".to_string()), None, None, Some(LIST_PAGE_SIZE))
            .await
            .map_err(backend_error)?;

        Ok(page
            .contents
            .into_iter()
            .map(|object| FileEntry {
                url: self.public_url(&object.key),
                size: Some(object.size),
                updated_at: DateTime::parse_from_rfc3339(&object.last_modified)
                    .ok()
                    .map(|t| t.with_timezone(&Utc)),
                name: object.key,
            })
            .collect())
    }

    async fn get(&self, key: &str) -> StorageResult<StoredFile> {
        let response = self.bucket.get_object(key).await.map_err(backend_error)?;
        let content_type = response.headers().get("content-type").cloned();

        Ok(StoredFile {
            key: key.to_string(),
            bytes: response.bytes().clone(),
            content_type,
            updated_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageProvider;
    use mockito::Matcher;

    fn config_for(endpoint: &str) -> StorageConfig {
        StorageConfig {
            provider: StorageProvider::S3,
            upload_dir: "uploads".into(),
            s3_bucket: "pdfs".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_access_key_id: Some("test-access".to_string()),
            s3_secret_access_key: Some("test-secret".to_string()),
            s3_endpoint: Some(endpoint.to_string()),
            public_url: None,
        }
    }

    #[test]
    fn test_public_url_uses_configured_base() {
        let mut config = config_for("http://127.0.0.1:9000");
        config.public_url =
            Some("https://proj.supabase.co/storage/v1/object/public/pdfs/".to_string());
        let remote = RemoteBucket::from_config(&config).unwrap();

        assert_eq!(
            remote.public_url("September_2024.pdf").as_deref(),
            Some("https://proj.supabase.co/storage/v1/object/public/pdfs/September_2024.pdf")
        );
    }

    #[test]
    fn test_extract_xml_message() {
        let body = "<?xml version=\"1.0\"?><Error><Code>NoSuchKey</Code>\
                    <Message>The specified key does not exist.</Message></Error>";
        assert_eq!(
            extract_xml_message(body).as_deref(),
            Some("The specified key does not exist.")
        );
        assert_eq!(extract_xml_message("plain text"), None);
    }

    #[tokio::test]
    async fn test_write_and_get_against_bucket() {
        let mut server = mockito::Server::new_async().await;
        let put = server
            .mock("PUT", "/pdfs/September_2024.pdf")
            .with_status(200)
            .with_header("ETag", "\"d41d8cd98f00b204e9800998ecf8427e\"")
            .create_async()
            .await;
        let get = server
            .mock("GET", "/pdfs/September_2024.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("%PDF-1.4 body")
            .create_async()
            .await;

        let remote = RemoteBucket::from_config(&config_for(&server.url())).unwrap();
        remote
            .write("September_2024.pdf", Bytes::from_static(b"%PDF-1.4 body"), "application/pdf")
            .await
            .unwrap();
        let stored = remote.get("September_2024.pdf").await.unwrap();

        put.assert_async().await;
        get.assert_async().await;
        assert_eq!(stored.bytes.as_ref(), b"%PDF-1.4 body");
        assert_eq!(stored.content_type.as_deref(), Some("application/pdf"));
    }

    #[tokio::test]
    async fn test_missing_object_surfaces_backend_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/pdfs/doesnotexist.pdf")
            .with_status(404)
            .with_body(
                "<?xml version=\"1.0\"?><Error><Code>NoSuchKey</Code>\
                 <Message>Object not found</Message></Error>",
            )
            .create_async()
            .await;

        let remote = RemoteBucket::from_config(&config_for(&server.url())).unwrap();
        let err = remote.get("doesnotexist.pdf").await.unwrap_err();

        match err {
            StorageError::BackendUnavailable(msg) => assert!(msg.contains("Object not found")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_reads_single_page() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>pdfs</Name>
  <Prefix></Prefix>
  <KeyCount>1</KeyCount>
  <MaxKeys>100</MaxKeys>
  <Delimiter>/</Delimiter>
  <IsTruncated>false</IsTruncated>
  <Contents>
    <Key>Agustus_2024.pdf</Key>
    <LastModified>2024-08-02T10:00:00.000Z</LastModified>
    <ETag>"abc"</ETag>
    <Size>42</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
</ListBucketResult>"#;
        let list = server
            .mock("GET", Matcher::Regex(r"^/pdfs/?".to_string()))
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(body)
            .create_async()
            .await;

        let remote = RemoteBucket::from_config(&config_for(&server.url())).unwrap();
        let entries = remote.list().await.unwrap();

        list.assert_async().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Agustus_2024.pdf");
        assert_eq!(entries[0].size, Some(42));
        assert!(entries[0].url.as_deref().unwrap().ends_with("/Agustus_2024.pdf"));
        assert!(entries[0].updated_at.is_some());
    }
}
