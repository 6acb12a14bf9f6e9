use serde::{Deserialize, Serialize};

use crate::host::Host;
use crate::msgid::MsgId;
use crate::store::{Key, Value};

/// The wire payload of a message, discriminated on `type` the same way the
/// teacher's `maelstrom::MessageBody` is — one variant per row of spec.md
/// section 6's message table, plus the `read_ok` reply type that table
/// describes but does not name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Body {
    ClientWrite {
        keys: Vec<Key>,
        values: Vec<Value>,
    },
    #[serde(rename = "client_read")]
    ClientRead {
        #[serde(rename = "key")]
        keys: Vec<Key>,
    },
    ReadOk {
        value: Vec<Option<Value>>,
        order_index: Vec<Option<u64>>,
    },
    Write {
        id: MsgId,
        keys: Vec<Key>,
        values: Vec<Value>,
        from: Host,
    },
    Acknowledge {
        id: MsgId,
        from: Host,
    },
    ClientWriteAck {
        id: MsgId,
    },
    WriteOrder {
        id: MsgId,
        index: u64,
    },
    WriteResult {
        #[serde(rename = "key")]
        keys: Vec<Key>,
        #[serde(rename = "value")]
        values: Vec<Value>,
    },
    Exit,
}

/// An addressed message: `src`/`dest` are socket endpoints (nodes or
/// clients), `body` the discriminated payload. Mirrors the teacher's
/// `Envelope { src, dest, body }` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub src: Host,
    pub dest: Host,
    pub body: Body,
}

impl Envelope {
    pub fn new(src: Host, dest: Host, body: Body) -> Self {
        Self { src, dest, body }
    }
}
