use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Object type discriminator for plain file objects, the only kind we scan.
pub const OBJECT_TYPE_FILE: u8 = 0;

/// An object in the storage platform that should be scanned.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScanRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub bucket_key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bucket: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dir: String,
    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub object_type: u8,
    pub backend_file_id: Option<String>,
    pub dest_url: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub auth_hash: Option<String>,
    pub created_at: Option<String>,
    pub md5_hash: Option<String>,
}

/// Treat an explicit JSON `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ScanRequest {
    /// Extension of the object key including the leading dot, or an empty string.
    pub fn key_extension(&self) -> String {
        let name = self.key.rsplit('/').next().unwrap_or_default();
        match name.rfind('.') {
            Some(idx) => name[idx..].to_string(),
            None => String::new(),
        }
    }

    /// MD5 digest for log and alert correlation.
    pub fn md5_display(&self) -> &str {
        self.md5_hash.as_deref().unwrap_or("unknown")
    }
}

/// Small JSON body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiMessage {
    pub code: u16,
    pub message: String,
}

impl ApiMessage {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IndexResponse {
    pub code: u16,
    pub message: String,
    pub current: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_key(key: &str) -> ScanRequest {
        serde_json::from_value(serde_json::json!({ "key": key })).unwrap()
    }

    #[test]
    fn test_key_extension() {
        assert_eq!(request_with_key("photo.png").key_extension(), ".png");
        assert_eq!(request_with_key("archive.tar.gz").key_extension(), ".gz");
        assert_eq!(request_with_key("README").key_extension(), "");
        assert_eq!(request_with_key("dir.d/README").key_extension(), "");
        assert_eq!(request_with_key("").key_extension(), "");
    }

    #[test]
    fn test_deserialize_full_object() {
        let body = r#"{
            "bucket_key": "bkt/key1.exe",
            "bucket": "bkt",
            "key": "key1.exe",
            "dir": "/",
            "type": 0,
            "backend_file_id": "3,01637037d6",
            "content_type": "application/octet-stream",
            "content_length": 68,
            "md5_hash": "44d88612fea8a8f36de82e1278abb02f"
        }"#;
        let req: ScanRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.object_type, OBJECT_TYPE_FILE);
        assert_eq!(req.backend_file_id.as_deref(), Some("3,01637037d6"));
        assert_eq!(req.content_length, Some(68));
        assert_eq!(req.md5_display(), "44d88612fea8a8f36de82e1278abb02f");
        assert!(req.dest_url.is_none());
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let body = r#"{
            "bucket_key": "bkt/key1",
            "bucket": null,
            "key": "key1.exe",
            "dir": null,
            "type": null,
            "backend_file_id": "3,01637037d6",
            "md5_hash": null
        }"#;
        let req: ScanRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.bucket, "");
        assert_eq!(req.dir, "");
        assert_eq!(req.object_type, OBJECT_TYPE_FILE);
        assert_eq!(req.md5_display(), "unknown");
    }

    #[test]
    fn test_missing_md5_displays_unknown() {
        let req = request_with_key("a.txt");
        assert_eq!(req.md5_display(), "unknown");
    }
}
