//! HTTP control service.
//!
//! A deliberately small HTTP/1.1 subset: one request per connection, the
//! response always closes the connection. Routes:
//!
//! | request                        | response                          |
//! |--------------------------------|-----------------------------------|
//! | `GET /`, `GET /index.html`     | embedded page, `text/html`        |
//! | `GET /main.css`                | embedded stylesheet               |
//! | `GET /app.js`                  | embedded script                   |
//! | `GET /value`                   | register snapshot as JSON         |
//! | `POST /control`                | queue LED command, JSON echo      |
//! | anything else                  | `404 Not Found`                   |
//!
//! The two JSON routes always answer `200`, even when the control body is
//! unusable; in that case the command register is simply left alone.

mod request;
mod server;

pub use request::{Method, Request};
pub use server::{ConnectionError, MAX_REQUEST_SIZE, serve_connection};

use core::fmt::Write as _;

use log::{error, warn};
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::registers::CommandPort;

/// Capacity for JSON response bodies.
pub const JSON_CAPACITY: usize = 128;
/// Capacity for the status line and headers.
pub const HEAD_CAPACITY: usize = 256;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("request head is not valid UTF-8")]
    NotUtf8,
    #[error("request line is missing or malformed")]
    RequestLine,
    #[error("control body is not a JSON object with a numeric \"led\"")]
    ControlBody,
}

/// Static files served by the HTTP service.
#[derive(Debug, Clone, Copy)]
pub struct Assets {
    pub index_html: &'static [u8],
    pub main_css: &'static [u8],
    pub app_js: &'static [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    InternalServerError,
}

impl Status {
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::InternalServerError => 500,
        }
    }

    pub const fn reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
            Self::InternalServerError => "Internal Server Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Static(&'static [u8]),
    Json(heapless::Vec<u8, JSON_CAPACITY>),
}

impl Body {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Static(bytes) => bytes,
            Self::Json(json) => json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub content_type: &'static str,
    pub body: Body,
}

impl Response {
    fn asset(content_type: &'static str, bytes: &'static [u8]) -> Self {
        Self {
            status: Status::Ok,
            content_type,
            body: Body::Static(bytes),
        }
    }

    fn text(status: Status, text: &'static str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: Body::Static(text.as_bytes()),
        }
    }

    pub fn not_found() -> Self {
        Self::text(Status::NotFound, "Not Found")
    }

    pub fn bad_request() -> Self {
        Self::text(Status::BadRequest, "Bad Request")
    }

    fn json<T: Serialize>(value: &T) -> Self {
        match encode_json(value) {
            Some(json) => Self {
                status: Status::Ok,
                content_type: "application/json",
                body: Body::Json(json),
            },
            None => {
                error!("JSON response does not fit in {} bytes", JSON_CAPACITY);
                Self::text(Status::InternalServerError, "Internal Server Error")
            }
        }
    }

    /// Status line and headers, including the blank line.
    pub fn head(&self) -> heapless::String<HEAD_CAPACITY> {
        let mut head = heapless::String::new();
        write!(
            head,
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n",
            self.status.code(),
            self.status.reason(),
            self.content_type,
            self.body.as_bytes().len()
        )
        .ok();
        head
    }
}

fn encode_json<T: Serialize>(value: &T) -> Option<heapless::Vec<u8, JSON_CAPACITY>> {
    let mut buf = [0u8; JSON_CAPACITY];
    let len = serde_json_core::to_slice(value, &mut buf).ok()?;
    heapless::Vec::from_slice(&buf[..len]).ok()
}

/// Body of `GET /value`.
#[derive(Debug, Serialize)]
struct ValueReply {
    value: u32,
    led_state: u8,
    temp_raw: u16,
}

/// Body of `POST /control`.
#[derive(Debug, Serialize)]
struct ControlReply {
    control: u8,
    led_state: u8,
    temp_raw: u16,
}

#[derive(Debug, Deserialize)]
struct ControlRequest {
    led: Option<f64>,
}

/// Extract the LED command from a `POST /control` body.
///
/// Fractions are truncated and only the low 8 bits of the integer are kept.
pub fn parse_control_body(body: &[u8]) -> Result<u8, ParseError> {
    let (request, _) = serde_json_core::from_slice::<ControlRequest>(body)
        .map_err(|_| ParseError::ControlBody)?;
    let led = request.led.ok_or(ParseError::ControlBody)?;
    Ok(led as i32 as u8)
}

/// Maps requests onto the register set and the embedded assets.
pub struct Router<'a> {
    port: CommandPort<'a>,
    assets: Assets,
}

impl<'a> Router<'a> {
    pub fn new(port: CommandPort<'a>, assets: Assets) -> Self {
        Self { port, assets }
    }

    pub fn handle(&self, request: &Request<'_>) -> Response {
        match (request.method, request.path) {
            (Method::Get, "/" | "/index.html") => {
                Response::asset("text/html", self.assets.index_html)
            }
            (Method::Get, "/main.css") => Response::asset("text/css", self.assets.main_css),
            (Method::Get, "/app.js") => {
                Response::asset("application/javascript", self.assets.app_js)
            }
            (Method::Get, "/value") => self.value(),
            (Method::Post, "/control") => self.control(request.body),
            _ => Response::not_found(),
        }
    }

    fn value(&self) -> Response {
        let snapshot = self.port.snapshot();
        Response::json(&ValueReply {
            value: snapshot.packed(),
            led_state: snapshot.led_state,
            temp_raw: snapshot.temp_raw,
        })
    }

    fn control(&self, body: &[u8]) -> Response {
        let control = match parse_control_body(body) {
            Ok(command) => {
                self.port.write_command(command);
                command
            }
            Err(e) => {
                warn!("POST /control ignored: {}", e);
                self.port.pending_command()
            }
        };

        let snapshot = self.port.snapshot();
        Response::json(&ControlReply {
            control,
            led_state: snapshot.led_state,
            temp_raw: snapshot.temp_raw,
        })
    }
}
