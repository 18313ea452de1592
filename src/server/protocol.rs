//! Request and reply messages
//!
//! ```text
//! -> {"method":"GetCat","id":"..."}
//! <- {"status":"ok","cat":{...}}
//!
//! -> {"method":"StreamNewCats"}
//! <- {"cat":{...},"event":"added"}
//! <- {"cat":{...},"event":"added"}
//! ```

use serde::{Deserialize, Serialize};

use crate::catalog::CatRecord;
use crate::chat::ChatMessage;
use crate::registry::Delivery;
use crate::service::ServiceError;

/// First line sent by a client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "method")]
pub enum Request {
    ListCats,
    GetCat {
        #[serde(default)]
        id: String,
    },
    AddSource {
        #[serde(default)]
        name: String,
        #[serde(default)]
        url: String,
        #[serde(default, rename = "type")]
        kind: String,
    },
    StreamCatFeed,
    StreamCatsByBreed {
        #[serde(default)]
        breed: String,
    },
    StreamNewCats,
    CatChat,
}

impl Request {
    /// Parse a request line; any failure is `InvalidArgument`
    pub fn parse(line: &[u8]) -> Result<Self, ServiceError> {
        serde_json::from_slice(line)
            .map_err(|e| ServiceError::InvalidArgument(format!("malformed request: {}", e)))
    }

    /// Method name, for logging
    pub fn method(&self) -> &'static str {
        match self {
            Request::ListCats => "ListCats",
            Request::GetCat { .. } => "GetCat",
            Request::AddSource { .. } => "AddSource",
            Request::StreamCatFeed => "StreamCatFeed",
            Request::StreamCatsByBreed { .. } => "StreamCatsByBreed",
            Request::StreamNewCats => "StreamNewCats",
            Request::CatChat => "CatChat",
        }
    }
}

/// Payload of a successful unary reply
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReplyBody<'a> {
    Cats { cats: Vec<&'a CatRecord>, total: usize },
    Cat { cat: &'a CatRecord },
    SourceAdded { ok: bool, message: &'a str },
}

/// Single-line answer to a unary request, or to a stream that failed to open
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply<'a> {
    Ok {
        #[serde(flatten)]
        body: ReplyBody<'a>,
    },
    Error {
        code: &'static str,
        message: String,
    },
}

impl<'a> Reply<'a> {
    /// Successful reply carrying `body`
    pub fn ok(body: ReplyBody<'a>) -> Self {
        Reply::Ok { body }
    }
}

impl From<&ServiceError> for Reply<'_> {
    fn from(e: &ServiceError) -> Self {
        Reply::Error {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

/// One line of an open stream
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StreamItem<'a> {
    Cat(&'a CatRecord),
    Added { cat: &'a CatRecord, event: &'static str },
    Chat(&'a ChatMessage),
}

impl<'a> From<&'a Delivery> for StreamItem<'a> {
    fn from(delivery: &'a Delivery) -> Self {
        match delivery {
            Delivery::Cat(record) => StreamItem::Cat(record),
            Delivery::Added(record) => StreamItem::Added {
                cat: record,
                event: "added",
            },
            Delivery::Chat(message) => StreamItem::Chat(message),
        }
    }
}
