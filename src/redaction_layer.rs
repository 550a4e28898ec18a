use lazy_static::lazy_static;
use regex::Regex;
use std::io::Write;

lazy_static! {
    static ref REDACTION_REGEX: Regex = Regex::new(
        r"(?i)(sk-[A-Za-z0-9_-]{20,}|Bearer\s+[^\s]+|x-api-key:\s*[^\s]+|api_key=[^&\s)]+|key=[^&\s)]+)"
    ).expect("Invalid redaction regex");
}

/// Masks API keys before log lines reach a sink. Provider errors embed the
/// request URL, and the Gemini and Last.fm URLs carry their key as a query
/// parameter.
pub struct RedactingWriter<W: Write> {
    inner: W,
}

impl<W: Write> RedactingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

pub fn redact(input: &str) -> std::borrow::Cow<'_, str> {
    REDACTION_REGEX.replace_all(input, "[REDACTED]")
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let input = String::from_utf8_lossy(buf);
        let redacted = redact(&input);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_query_keys_and_bearer_tokens() {
        let line = "error sending request for url (https://generativelanguage.googleapis.com/v1beta/models/m:streamGenerateContent?alt=sse&key=AIzaSECRET)";
        let out = redact(line);
        assert!(!out.contains("AIzaSECRET"));
        assert!(out.contains("alt=sse"));

        let out = redact("Authorization: Bearer abc.def");
        assert!(!out.contains("abc.def"));

        let out = redact("GET /2.0/?method=track.getInfo&api_key=lastfm123&artist=IU");
        assert!(!out.contains("lastfm123"));
        assert!(out.contains("artist=IU"));
    }

    #[test]
    fn test_writer_reports_original_length() {
        let mut buf = Vec::new();
        let mut writer = RedactingWriter::new(&mut buf);
        let input = b"key=secret done";
        assert_eq!(writer.write(input).unwrap(), input.len());
        assert_eq!(String::from_utf8(buf).unwrap(), "[REDACTED] done");
    }
}
