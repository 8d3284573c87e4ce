/// One audio payload that has passed ingress validation.
///
/// ## Invariants:
/// - `size_bytes == bytes.len()`
/// - `size_bytes > 0` for every submission produced by the validator
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSubmission {
    pub bytes: Vec<u8>,
    pub size_bytes: usize,
    pub declared_mime_type: Option<String>,
    /// Client-side file name; only ever used as a classification hint.
    pub original_name: Option<String>,
}

impl AudioSubmission {
    pub fn new(bytes: Vec<u8>, declared_mime_type: Option<String>, original_name: Option<String>) -> Self {
        Self {
            size_bytes: bytes.len(),
            bytes,
            declared_mime_type,
            original_name,
        }
    }
}
