//! Connection handling, independent of the network stack.
//!
//! The caller accepts the connection, sets any socket timeout, and closes the
//! socket once [`serve_connection`] returns.

use embedded_io_async::{Error as _, ErrorKind, Read, Write};
use log::{debug, warn};
use thiserror_no_std::Error;

use super::request::{self, Request};
use super::{Response, Router};

/// Largest request the service will buffer; anything beyond is ignored.
pub const MAX_REQUEST_SIZE: usize = 512;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("socket read failed: {0:?}")]
    Read(ErrorKind),
    #[error("socket write failed: {0:?}")]
    Write(ErrorKind),
}

/// Read one request, answer it, flush.
pub async fn serve_connection<S>(socket: &mut S, router: &Router<'_>) -> Result<(), ConnectionError>
where
    S: Read + Write,
{
    let mut buf = [0u8; MAX_REQUEST_SIZE];
    let mut total = 0usize;

    // Read until the head and announced body are in, or the buffer is full.
    loop {
        let n = socket
            .read(&mut buf[total..])
            .await
            .map_err(|e| ConnectionError::Read(e.kind()))?;
        if n == 0 {
            // Connection closed before any data.
            if total == 0 {
                return Ok(());
            }
            break;
        }
        total += n;
        if total >= MAX_REQUEST_SIZE {
            break;
        }
        if request::expected_len(&buf[..total]).is_some_and(|expected| total >= expected) {
            break;
        }
    }

    let response = match Request::parse(&buf[..total]) {
        Ok(request) => {
            debug!("HTTP {:?} {}", request.method, request.path);
            router.handle(&request)
        }
        Err(e) => {
            warn!("Rejecting HTTP request: {}", e);
            Response::bad_request()
        }
    };

    write_response(socket, &response).await
}

async fn write_response<S: Write>(socket: &mut S, response: &Response) -> Result<(), ConnectionError> {
    let head = response.head();
    socket
        .write_all(head.as_bytes())
        .await
        .map_err(|e| ConnectionError::Write(e.kind()))?;
    socket
        .write_all(response.body.as_bytes())
        .await
        .map_err(|e| ConnectionError::Write(e.kind()))?;
    socket
        .flush()
        .await
        .map_err(|e| ConnectionError::Write(e.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{AcquisitionLane, Transport, TransportError};
    use crate::config::AcquisitionConfig;
    use crate::http::Assets;
    use crate::protocol::{ControlFrame, StatusFrame};
    use crate::registers::SharedRegisters;
    use embassy_futures::block_on;
    use embedded_io_async::ErrorType;
    use std::collections::VecDeque;

    const ASSETS: Assets = Assets {
        index_html: b"<h1>thermolink</h1>",
        main_css: b"",
        app_js: b"",
    };

    /// Socket fed from a list of pre-split chunks.
    struct FakeSocket {
        incoming: VecDeque<Vec<u8>>,
        outgoing: Vec<u8>,
        fail_writes: bool,
    }

    impl FakeSocket {
        fn new(chunks: &[&[u8]]) -> Self {
            Self {
                incoming: chunks.iter().map(|c| c.to_vec()).collect(),
                outgoing: Vec::new(),
                fail_writes: false,
            }
        }

        fn response(&self) -> &str {
            core::str::from_utf8(&self.outgoing).unwrap()
        }
    }

    impl ErrorType for FakeSocket {
        type Error = ErrorKind;
    }

    impl Read for FakeSocket {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let Some(mut chunk) = self.incoming.pop_front() else {
                return Ok(0);
            };
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                self.incoming.push_front(chunk.split_off(n));
            }
            Ok(n)
        }
    }

    impl Write for FakeSocket {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            if self.fail_writes {
                return Err(ErrorKind::ConnectionReset);
            }
            self.outgoing.extend_from_slice(buf);
            Ok(buf.len())
        }

        async fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    struct EchoSlave {
        led: u8,
    }

    impl Transport for EchoSlave {
        async fn exchange(&mut self, frame: ControlFrame) -> Result<StatusFrame, TransportError> {
            if frame.led_command != 0 {
                self.led = frame.led_command;
            }
            // 2048 counts, 66 °F
            Ok(StatusFrame::from_bytes([0x00, 0x08, self.led]))
        }
    }

    fn serve(router: &Router<'_>, chunks: &[&[u8]]) -> FakeSocket {
        let mut socket = FakeSocket::new(chunks);
        block_on(serve_connection(&mut socket, router)).unwrap();
        socket
    }

    #[test]
    fn test_get_value_over_socket() {
        let mut regs = SharedRegisters::new();
        let (http, _acq) = regs.split();
        let router = Router::new(http, ASSETS);

        let socket = serve(&router, &[b"GET /value HTTP/1.1\r\nHost: bridge\r\n\r\n"]);

        let body = r#"{"value":0,"led_state":0,"temp_raw":0}"#;
        assert_eq!(
            socket.response(),
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            )
        );
    }

    #[test]
    fn test_control_then_cycle_updates_led_state() {
        let mut regs = SharedRegisters::new();
        let (http, acq) = regs.split();
        let router = Router::new(http, ASSETS);
        let mut lane = AcquisitionLane::new(
            EchoSlave { led: 0 },
            acq,
            AcquisitionConfig::default(),
        );

        // Head and body arrive in separate segments
        let socket = serve(
            &router,
            &[
                b"POST /control HTTP/1.1\r\nContent-Length: 9\r\n\r\n",
                b"{\"led\":5}",
            ],
        );
        assert!(socket.response().ends_with(r#"{"control":5,"led_state":0,"temp_raw":0}"#));

        block_on(lane.run_cycle());

        let socket = serve(&router, &[b"GET /value HTTP/1.1\r\n\r\n"]);
        assert!(socket.response().ends_with(r#"{"value":327746,"led_state":5,"temp_raw":66}"#));
    }

    #[test]
    fn test_static_asset_over_socket() {
        let mut regs = SharedRegisters::new();
        let (http, _acq) = regs.split();
        let router = Router::new(http, ASSETS);

        let socket = serve(&router, &[b"GET / HTTP/1.1\r\n\r\n"]);
        assert!(socket.response().starts_with("HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n"));
        assert!(socket.response().contains("Content-Length: 19\r\n"));
        assert!(socket.response().ends_with("<h1>thermolink</h1>"));
    }

    #[test]
    fn test_unknown_path_is_404() {
        let mut regs = SharedRegisters::new();
        let (http, _acq) = regs.split();
        let router = Router::new(http, ASSETS);

        let socket = serve(&router, &[b"GET /favicon.ico HTTP/1.1\r\n\r\n"]);
        assert!(socket.response().starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn test_garbage_is_400() {
        let mut regs = SharedRegisters::new();
        let (http, _acq) = regs.split();
        let router = Router::new(http, ASSETS);

        let socket = serve(&router, &[b"\r\n\r\n"]);
        assert!(socket.response().starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn test_closed_without_data_writes_nothing() {
        let mut regs = SharedRegisters::new();
        let (http, _acq) = regs.split();
        let router = Router::new(http, ASSETS);

        let socket = serve(&router, &[]);
        assert!(socket.outgoing.is_empty());
    }

    #[test]
    fn test_oversized_request_is_cut() {
        let mut regs = SharedRegisters::new();
        let (http, _acq) = regs.split();
        let router = Router::new(http, ASSETS);

        let mut huge = b"GET /value HTTP/1.1\r\nX-Pad: ".to_vec();
        huge.resize(MAX_REQUEST_SIZE * 2, b'a');
        let socket = serve(&router, &[&huge]);
        assert!(socket.response().starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[test]
    fn test_huge_content_length_is_served() {
        let mut regs = SharedRegisters::new();
        let (http, acq) = regs.split();
        let router = Router::new(http, ASSETS);

        let socket = serve(
            &router,
            &[b"POST /control HTTP/1.1\r\nContent-Length: 18446744073709551615\r\n\r\n{\"led\":5}"],
        );
        assert!(socket.response().starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(socket.response().ends_with(r#"{"control":5,"led_state":0,"temp_raw":0}"#));
        assert_eq!(acq.take_command(), 5);
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut regs = SharedRegisters::new();
        let (http, _acq) = regs.split();
        let router = Router::new(http, ASSETS);

        let mut socket = FakeSocket::new(&[b"GET /value HTTP/1.1\r\n\r\n"]);
        socket.fail_writes = true;
        let result = block_on(serve_connection(&mut socket, &router));
        assert_eq!(result, Err(ConnectionError::Write(ErrorKind::ConnectionReset)));
    }
}
