//! Structured renderer: exact round-trip of the filtered document

use std::io::{self, Write};

use crate::diagnostics::Document;
use crate::error::MetalintError;
use crate::result::Result;

/// Serialize the document to stdout, preserving the failure-shape /
/// issue-shape distinction so `decode(encode(doc)) == doc`.
pub fn print(doc: &Document) -> Result<bool> {
    let encoded = doc.encode_pretty()?;
    let mut out = io::stdout().lock();
    out.write_all(encoded.as_bytes())
        .and_then(|_| out.write_all(b"\n"))
        .map_err(|e| MetalintError::io_error("<stdout>", e))?;
    Ok(super::has_fail_severity(doc))
}

#[cfg(test)]
mod tests {
    use crate::diagnostics::Document;

    #[test]
    fn encode_preserves_both_entry_shapes() {
        let data = br#"{"pkg": {"broken": {"error": "boom"}, "lint": [{"message":"m","posn":"a.go:1"}]}}"#;
        let doc = Document::decode(data).unwrap();
        let encoded = doc.encode_pretty().unwrap();
        assert!(encoded.contains("\"error\": \"boom\""));
        assert!(encoded.contains("\"posn\": \"a.go:1\""));
        assert_eq!(Document::decode(encoded.as_bytes()).unwrap(), doc);
    }
}
