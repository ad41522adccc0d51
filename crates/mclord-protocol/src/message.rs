//! The message vocabulary carried inside text frames.
//!
//! Every message is a sequence of space-separated tokens. Clients send
//! [`ClientCommand`]s (once, to pick what the connection is for) and then
//! [`GameCommand`]s while playing. The server answers with
//! [`ServerMessage`]s, ending every session it terminates with a
//! `disconnect:<reason>` notice.

use std::fmt;

use crate::{InvitationCode, ProtocolError};

/// Splits a frame payload into tokens on single spaces.
///
/// Trailing empty tokens are dropped, so `"san e4 "` still reads as two
/// tokens; empty tokens in the middle are kept and make the message
/// malformed.
pub fn tokenize(payload: &str) -> Vec<String> {
    let mut tokens: Vec<String> =
        payload.split(' ').map(str::to_owned).collect();
    while tokens.last().is_some_and(String::is_empty) {
        tokens.pop();
    }
    tokens
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// The first message on a connection: what the client wants to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// `mclord_host`: create a room and wait for an opponent.
    Host,
    /// `mclord_quick_stats`: ask for online/room counts, then disconnect.
    QuickStats,
    /// `mclord_connect <code>`: join the room with this code.
    Connect(InvitationCode),
}

impl ClientCommand {
    /// Parses the initial command.
    ///
    /// # Errors
    /// [`ProtocolError::Malformed`] for any shape other than the three
    /// accepted ones, including a `mclord_connect` with an invalid code.
    pub fn parse(tokens: &[String]) -> Result<Self, ProtocolError> {
        match tokens {
            [cmd] if cmd == "mclord_host" => Ok(Self::Host),
            [cmd] if cmd == "mclord_quick_stats" => Ok(Self::QuickStats),
            [cmd, code] if cmd == "mclord_connect" => code
                .parse()
                .map(Self::Connect)
                .map_err(|_| malformed(tokens)),
            _ => Err(malformed(tokens)),
        }
    }
}

/// A message sent while a game is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameCommand {
    /// `san <move>`: play a move in short algebraic notation.
    Move(String),
    /// `resign <any>`: forfeit the game.
    Resign,
}

impl GameCommand {
    /// Parses an in-game message.
    ///
    /// Every in-game message is exactly two tokens; the argument to
    /// `resign` is ignored.
    pub fn parse(tokens: &[String]) -> Result<Self, ProtocolError> {
        match tokens {
            [cmd, san] if cmd == "san" && !san.is_empty() => {
                Ok(Self::Move(san.clone()))
            }
            [cmd, _] if cmd == "resign" => Ok(Self::Resign),
            _ => Err(malformed(tokens)),
        }
    }
}

fn malformed(tokens: &[String]) -> ProtocolError {
    ProtocolError::Malformed(tokens.join(" "))
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// A side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// The other side.
    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Wire label: `white` or `black`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the server is ending a session. Sent as `disconnect:<reason>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    ProtocolError,
    Overloaded,
    InvalidCode,
    AlreadyInGame,
    /// Five invitation codes in a row collided with live rooms.
    GivingUp,
    OpponentDisconnected,
    OpponentResigned,
    YouResigned,
    YouWon,
    YouLost,
    HostTimeout,
    TimedOutDraw,
    /// One clock ran out; carries the color whose clock is still running.
    TimedOut(Color),
}

impl DisconnectReason {
    /// Wire label, without the `disconnect:` prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProtocolError => "protocol_error",
            Self::Overloaded => "overloaded",
            Self::InvalidCode => "invalid_code",
            Self::AlreadyInGame => "already_in_game",
            Self::GivingUp => "ooooh_i_am_giving_it_up",
            Self::OpponentDisconnected => "opponent_disconnected",
            Self::OpponentResigned => "opponent_resigned",
            Self::YouResigned => "you_resigned",
            Self::YouWon => "you_won",
            Self::YouLost => "you_lost",
            Self::HostTimeout => "host_timeout",
            Self::TimedOutDraw => "timed_out_draw",
            Self::TimedOut(Color::White) => "timed_out_white",
            Self::TimedOut(Color::Black) => "timed_out_black",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the server can say to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// `host_ok <code>`
    HostOk(InvitationCode),
    /// `mclord_ok <online> <rooms>`
    Stats { online: usize, rooms: usize },
    /// `ok_starting <color>`
    Starting(Color),
    /// `san <move>`: the opponent's move, relayed verbatim.
    Move(String),
    /// `time_sync <hostTicks> <opponentTicks>`
    TimeSync { host: i64, opponent: i64 },
    /// `disconnect:<reason>`
    Disconnect(DisconnectReason),
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostOk(code) => write!(f, "host_ok {code}"),
            Self::Stats { online, rooms } => {
                write!(f, "mclord_ok {online} {rooms}")
            }
            Self::Starting(color) => write!(f, "ok_starting {color}"),
            Self::Move(san) => write!(f, "san {san}"),
            Self::TimeSync { host, opponent } => {
                write!(f, "time_sync {host} {opponent}")
            }
            Self::Disconnect(reason) => write!(f, "disconnect:{reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        tokenize(s)
    }

    #[test]
    fn test_tokenize_splits_on_spaces() {
        assert_eq!(toks("san e4"), vec!["san", "e4"]);
        assert_eq!(toks("san e4 "), vec!["san", "e4"]);
        assert_eq!(toks("san  e4"), vec!["san", "", "e4"]);
        assert!(toks("").is_empty());
    }

    #[test]
    fn test_parse_initial_commands() {
        assert_eq!(ClientCommand::parse(&toks("mclord_host")).unwrap(), ClientCommand::Host);
        assert_eq!(
            ClientCommand::parse(&toks("mclord_quick_stats")).unwrap(),
            ClientCommand::QuickStats
        );
        assert_eq!(
            ClientCommand::parse(&toks("mclord_connect 0af3")).unwrap(),
            ClientCommand::Connect("0af3".parse().unwrap())
        );
    }

    #[test]
    fn test_parse_initial_command_rejects_other_shapes() {
        for bad in [
            "",
            "mclord_host now",
            "mclord_quick_stats 1",
            "mclord_connect",
            "mclord_connect ABCD",
            "mclord_connect 0af3 x",
            "mclord_join 0af3",
            "san e4",
        ] {
            assert!(
                ClientCommand::parse(&toks(bad)).is_err(),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_parse_game_commands() {
        assert_eq!(GameCommand::parse(&toks("san Nf3")).unwrap(), GameCommand::Move("Nf3".into()));
        assert_eq!(GameCommand::parse(&toks("resign now")).unwrap(), GameCommand::Resign);
        assert!(GameCommand::parse(&toks("resign")).is_err());
        assert!(GameCommand::parse(&toks("resign now please")).is_err());
        assert!(GameCommand::parse(&toks("san")).is_err());
        assert!(GameCommand::parse(&toks("san e4 e5")).is_err());
        assert!(GameCommand::parse(&toks("move e4")).is_err());
        assert!(GameCommand::parse(&toks("mclord_host")).is_err());
    }

    #[test]
    fn test_server_message_wire_format() {
        let code: InvitationCode = "beef".parse().unwrap();
        assert_eq!(ServerMessage::HostOk(code).to_string(), "host_ok beef");
        assert_eq!(
            ServerMessage::Stats { online: 12, rooms: 3 }.to_string(),
            "mclord_ok 12 3"
        );
        assert_eq!(ServerMessage::Starting(Color::Black).to_string(), "ok_starting black");
        assert_eq!(ServerMessage::Move("exd5".into()).to_string(), "san exd5");
        assert_eq!(
            ServerMessage::TimeSync { host: 35900, opponent: 36000 }.to_string(),
            "time_sync 35900 36000"
        );
        assert_eq!(
            ServerMessage::Disconnect(DisconnectReason::TimedOut(Color::White)).to_string(),
            "disconnect:timed_out_white"
        );
        assert_eq!(
            ServerMessage::Disconnect(DisconnectReason::GivingUp).to_string(),
            "disconnect:ooooh_i_am_giving_it_up"
        );
    }

    #[test]
    fn test_color_opposite() {
        assert_eq!(Color::White.opposite(), Color::Black);
        assert_eq!(Color::Black.opposite().opposite(), Color::Black);
    }
}
