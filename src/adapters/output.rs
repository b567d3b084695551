use crate::domain::model::ApiResponse;
use crate::utils::error::Result;
use reqwest::StatusCode;
use std::io::Write;

/// Transport-side writer for one response.
///
/// With `emit_headers` set, a CGI-style header block (`Status`,
/// `Content-Type`) is written lazily in front of the first body byte. Once
/// anything has been written, status and content type are frozen.
pub struct ResponseSink<W: Write> {
    writer: W,
    emit_headers: bool,
    output_started: bool,
    status: Option<u16>,
    content_type: Option<&'static str>,
}

impl<W: Write> ResponseSink<W> {
    pub fn new(writer: W, emit_headers: bool) -> Self {
        Self {
            writer,
            emit_headers,
            output_started: false,
            status: None,
            content_type: None,
        }
    }

    pub fn headers_sent(&self) -> bool {
        self.output_started
    }

    pub fn set_status(&mut self, status: u16) -> bool {
        if self.output_started {
            tracing::warn!("Status {} ignored: output already started", status);
            return false;
        }
        self.status = Some(status);
        true
    }

    pub fn set_content_type(&mut self, content_type: &'static str) -> bool {
        if self.output_started {
            tracing::warn!("Content-Type {} ignored: output already started", content_type);
            return false;
        }
        self.content_type = Some(content_type);
        true
    }

    pub fn write_body(&mut self, body: &str) -> Result<()> {
        if !self.output_started {
            self.output_started = true;
            if self.emit_headers {
                self.write_header_block()?;
            }
        }
        self.writer.write_all(body.as_bytes())?;
        Ok(())
    }

    /// Finish the header block without a body (e.g. an error status).
    pub fn finish(&mut self) -> Result<()> {
        self.write_body("")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn send(&mut self, response: &ApiResponse) -> Result<()> {
        self.set_content_type(response.content_type);
        self.write_body(&response.body)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header_block(&mut self) -> Result<()> {
        if let Some(code) = self.status {
            let reason = StatusCode::from_u16(code)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default();
            write!(self.writer, "Status: {} {}\r\n", code, reason)?;
        }
        if let Some(content_type) = self.content_type {
            write!(self.writer, "Content-Type: {}\r\n", content_type)?;
        }
        self.writer.write_all(b"\r\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> ApiResponse {
        ApiResponse {
            body: "[]".to_string(),
            content_type: "application/json",
        }
    }

    fn written(sink: ResponseSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_body_only_without_headers() {
        let mut sink = ResponseSink::new(Vec::new(), false);
        sink.send(&response()).unwrap();
        assert_eq!(written(sink), "[]");
    }

    #[test]
    fn test_header_block_precedes_body() {
        let mut sink = ResponseSink::new(Vec::new(), true);
        sink.send(&response()).unwrap();
        assert_eq!(written(sink), "Content-Type: application/json\r\n\r\n[]");
    }

    #[test]
    fn test_content_type_frozen_after_output() {
        let mut sink = ResponseSink::new(Vec::new(), true);
        sink.write_body("x").unwrap();

        assert!(sink.headers_sent());
        assert!(!sink.set_content_type("text/xml"));
        assert!(!sink.set_status(500));
        sink.write_body("y").unwrap();
        assert_eq!(written(sink), "\r\nxy");
    }

    #[test]
    fn test_error_status_block() {
        let mut sink = ResponseSink::new(Vec::new(), true);
        assert!(sink.set_status(502));
        sink.finish().unwrap();
        assert_eq!(written(sink), "Status: 502 Bad Gateway\r\n\r\n");
    }
}
