//! Command-tagged message envelope and its JSON codec.
//!
//! Every message on the wire is one self-describing JSON object whose `cmd`
//! field names the command, with the command's payload fields beside it:
//!
//! ```text
//! {"cmd":"PLAYER_INIT","your_id":"1"}
//! {"cmd":"SERVER_UPDATE","players":[{"id":"1","color":{..},"position":{..}}]}
//! ```
//!
//! Decoding runs in two passes. The first pass reads nothing but `cmd`; the
//! second re-reads the whole object as the variant that tag selects. A tag
//! this build does not know is not an error: it decodes to
//! [`Envelope::Unrecognized`] so the receiving cycle can log it and move on.

use serde::{Deserialize, Serialize};

use crate::player::PlayerState;

/// Known command tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    PlayerInit,
    Handshake,
    PlayerUpdate,
    ServerUpdate,
    PlayerDropped,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::PlayerInit,
        Command::Handshake,
        Command::PlayerUpdate,
        Command::ServerUpdate,
        Command::PlayerDropped,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Command::PlayerInit => "PLAYER_INIT",
            Command::Handshake => "HANDSHAKE",
            Command::PlayerUpdate => "PLAYER_UPDATE",
            Command::ServerUpdate => "SERVER_UPDATE",
            Command::PlayerDropped => "PLAYER_DROPPED",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Command> {
        Self::ALL.into_iter().find(|command| command.tag() == tag)
    }
}

/// One message exchanged between the authority and a peer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "cmd", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Envelope {
    /// authority → peer: the id assigned to the peer's connection.
    PlayerInit { your_id: String },
    /// peer → authority: the peer's initial state, sent once after `PlayerInit`.
    Handshake { player: PlayerState },
    /// peer → authority: the peer's current state.
    PlayerUpdate { player: PlayerState },
    /// authority → peer: every registered player, in join order.
    ServerUpdate { players: Vec<PlayerState> },
    /// authority → peer: a player whose connection went away.
    PlayerDropped { dropped_id: String },
    /// A well-formed envelope carrying a tag this build does not handle.
    #[serde(skip)]
    Unrecognized { cmd: String },
}

impl Envelope {
    pub fn command(&self) -> Option<Command> {
        match self {
            Envelope::PlayerInit { .. } => Some(Command::PlayerInit),
            Envelope::Handshake { .. } => Some(Command::Handshake),
            Envelope::PlayerUpdate { .. } => Some(Command::PlayerUpdate),
            Envelope::ServerUpdate { .. } => Some(Command::ServerUpdate),
            Envelope::PlayerDropped { .. } => Some(Command::PlayerDropped),
            Envelope::Unrecognized { .. } => None,
        }
    }

    /// The raw tag as it appears (or appeared) on the wire.
    pub fn tag(&self) -> &str {
        match self {
            Envelope::Unrecognized { cmd } => cmd,
            other => other.command().map(Command::tag).unwrap_or_default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The bytes are not an envelope at all, or a known tag carries a
    /// payload of the wrong shape.
    #[error("malformed envelope: {0}")]
    Malformed(serde_json::Error),

    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    #[error("cannot encode unrecognized command {0:?}")]
    Unencodable(String),
}

/// Only the tag; every other field is ignored by the first decode pass.
#[derive(Deserialize)]
struct Header {
    cmd: String,
}

pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, ProtocolError> {
    if let Envelope::Unrecognized { cmd } = envelope {
        return Err(ProtocolError::Unencodable(cmd.clone()));
    }
    serde_json::to_vec(envelope).map_err(ProtocolError::Encode)
}

pub fn decode(data: &[u8]) -> Result<Envelope, ProtocolError> {
    let header: Header = serde_json::from_slice(data).map_err(ProtocolError::Malformed)?;

    match Command::from_tag(&header.cmd) {
        Some(_) => serde_json::from_slice(data).map_err(ProtocolError::Malformed),
        None => Ok(Envelope::Unrecognized { cmd: header.cmd }),
    }
}
