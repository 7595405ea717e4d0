use uuid::Uuid;

/// A single-file `multipart/form-data` body.
pub(crate) struct MultipartBody {
    pub(crate) content_type: String,
    pub(crate) bytes: Vec<u8>,
}

impl MultipartBody {
    pub(crate) fn single_file(field: &str, file_name: &str, media_type: &str, data: &[u8]) -> Self {
        let boundary = format!("shape-hunter-{}", Uuid::new_v4().simple());
        let file_name = file_name.replace(['"', '\r', '\n'], "_");
        let mut bytes = Vec::with_capacity(data.len() + 256);
        bytes.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        bytes.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n")
                .as_bytes(),
        );
        bytes.extend_from_slice(format!("Content-Type: {media_type}\r\n\r\n").as_bytes());
        bytes.extend_from_slice(data);
        bytes.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        Self {
            content_type: format!("multipart/form-data; boundary={boundary}"),
            bytes,
        }
    }
}
