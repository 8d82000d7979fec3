use serde_json::Value;
use std::io::{self, Read};

use dcf_core::DcfError;

/// Request JSON piped on stdin, or `None` on an interactive terminal.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut raw = Vec::new();
    io::stdin().lock().read_to_end(&mut raw)?;
    Ok(parse_piped(&raw)?)
}

/// Whitespace-only input means nothing was piped, so callers fall back to flags.
fn parse_piped(raw: &[u8]) -> Result<Option<Value>, DcfError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(raw)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_falls_back() {
        assert_eq!(parse_piped(b"").unwrap(), None);
        assert_eq!(parse_piped(b" \n\t").unwrap(), None);
    }

    #[test]
    fn test_document_parsed() {
        let value = parse_piped(b"\n{\"fcf_base\": 100}\n").unwrap().unwrap();
        assert_eq!(value["fcf_base"], 100);
    }

    #[test]
    fn test_malformed_is_serialization_error() {
        let err = parse_piped(b"{not json").unwrap_err();
        assert_eq!(err.kind(), "serialization_error");
    }
}
