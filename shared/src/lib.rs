use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const MAX_ATTEMPTS: u32 = 6;
pub const WINNING_SCORE: u32 = 3;
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8888;
pub const MAX_FRAME_LEN: usize = 1024;

/// Rejections produced while decoding a text frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,
    #[error("frame of {len} bytes exceeds the frame size limit")]
    TooLong { len: usize },
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("{command} expects {expected} fields, got {found}")]
    WrongArity {
        command: String,
        expected: usize,
        found: usize,
    },
    #[error("invalid player name `{0}`")]
    InvalidName(String),
    #[error("invalid word `{0}`")]
    InvalidWord(String),
    #[error("invalid letter `{0}`")]
    InvalidLetter(String),
    #[error("invalid {field} `{value}`")]
    InvalidField { field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect { name: String },
    SetWord { name: String, word: String },
    Guess { name: String, letter: char },
    Disconnect { name: String },
}

impl Command {
    /// Decodes one client frame. Words and letters come back upper-cased.
    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        let frame = frame.trim_end_matches(&['\r', '\n'][..]);
        if frame.is_empty() {
            return Err(ProtocolError::Empty);
        }
        if frame.len() > MAX_FRAME_LEN {
            return Err(ProtocolError::TooLong { len: frame.len() });
        }

        let fields: Vec<&str> = frame.split(':').collect();
        match fields[0] {
            "CONNECT" => {
                expect_fields("CONNECT", &fields, 2)?;
                Ok(Command::Connect {
                    name: parse_name(fields[1])?,
                })
            }
            "SETWORD" => {
                expect_fields("SETWORD", &fields, 3)?;
                Ok(Command::SetWord {
                    name: parse_name(fields[1])?,
                    word: parse_word(fields[2])?,
                })
            }
            "GUESS" => {
                expect_fields("GUESS", &fields, 3)?;
                Ok(Command::Guess {
                    name: parse_name(fields[1])?,
                    letter: parse_letter(fields[2])?,
                })
            }
            "DISCONNECT" => {
                expect_fields("DISCONNECT", &fields, 2)?;
                Ok(Command::Disconnect {
                    name: fields[1].to_string(),
                })
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Command::Connect { name } => format!("CONNECT:{}", name),
            Command::SetWord { name, word } => format!("SETWORD:{}:{}", name, word),
            Command::Guess { name, letter } => format!("GUESS:{}:{}", name, letter),
            Command::Disconnect { name } => format!("DISCONNECT:{}", name),
        }
    }

    pub fn to_frame(&self) -> String {
        format!("{}\n", self.encode())
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::parse(s)
    }
}

fn expect_fields(command: &str, fields: &[&str], expected: usize) -> Result<(), ProtocolError> {
    if fields.len() == expected {
        Ok(())
    } else {
        Err(ProtocolError::WrongArity {
            command: command.to_string(),
            expected,
            found: fields.len(),
        })
    }
}

// Names end up inside USERS entries, so the roster separators are off limits.
fn parse_name(raw: &str) -> Result<String, ProtocolError> {
    if raw.is_empty() || raw.contains(',') || raw.chars().any(char::is_control) {
        return Err(ProtocolError::InvalidName(raw.to_string()));
    }
    Ok(raw.to_string())
}

// Every letter of the word must upper-case to exactly one guessable letter.
fn parse_word(raw: &str) -> Result<String, ProtocolError> {
    let invalid = || ProtocolError::InvalidWord(raw.to_string());
    if raw.is_empty() {
        return Err(invalid());
    }
    raw.chars()
        .map(|c| upper_letter(c).ok_or_else(invalid))
        .collect()
}

fn parse_letter(raw: &str) -> Result<char, ProtocolError> {
    let invalid = || ProtocolError::InvalidLetter(raw.to_string());

    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => upper_letter(c).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

fn upper_letter(c: char) -> Option<char> {
    if !c.is_alphabetic() {
        return None;
    }
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) if u.is_alphabetic() => Some(u),
        _ => None,
    }
}

/// What every participant may see of the round in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameView {
    pub masked_word: String,
    pub attempts_left: u32,
    pub current_guesser: String,
    pub guessed_letters: Vec<char>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEntry {
    pub name: String,
    pub color: String,
    pub score: u32,
    pub active: bool,
}

impl PlayerEntry {
    pub fn status(&self) -> &'static str {
        if self.active {
            "active"
        } else {
            "inactive"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    WaitWord { setter: String },
    Game(GameView),
    Users(Vec<PlayerEntry>),
    GameFinal { text: String },
    UpdateWord,
}

impl ServerMessage {
    pub fn encode(&self) -> String {
        match self {
            ServerMessage::WaitWord { setter } => format!("WAITWORD:{}", setter),
            ServerMessage::Game(view) => {
                let letters: Vec<String> =
                    view.guessed_letters.iter().map(|c| c.to_string()).collect();
                format!(
                    "GAME:{}:{}:{}:{}",
                    view.masked_word,
                    view.attempts_left,
                    view.current_guesser,
                    letters.join(",")
                )
            }
            ServerMessage::Users(players) => {
                let entries: Vec<String> = players
                    .iter()
                    .map(|p| format!("{}:{}:{}:{}", p.name, p.color, p.score, p.status()))
                    .collect();
                format!("USERS:{}", entries.join(","))
            }
            ServerMessage::GameFinal { text } => format!("GAMEFINAL:{}", text),
            ServerMessage::UpdateWord => "UPDATEWORD:".to_string(),
        }
    }

    /// Encoded message plus the newline delimiter
    pub fn to_frame(&self) -> String {
        format!("{}\n", self.encode())
    }

    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        let frame = frame.trim_end_matches(&['\r', '\n'][..]);
        if frame.is_empty() {
            return Err(ProtocolError::Empty);
        }

        let (prefix, rest) = frame
            .split_once(':')
            .ok_or_else(|| ProtocolError::UnknownCommand(frame.to_string()))?;

        match prefix {
            "WAITWORD" => Ok(ServerMessage::WaitWord {
                setter: rest.to_string(),
            }),
            "GAME" => parse_game_view(rest).map(ServerMessage::Game),
            "USERS" => parse_roster(rest).map(ServerMessage::Users),
            "GAMEFINAL" => Ok(ServerMessage::GameFinal {
                text: rest.to_string(),
            }),
            "UPDATEWORD" => Ok(ServerMessage::UpdateWord),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn parse_game_view(rest: &str) -> Result<GameView, ProtocolError> {
    let fields: Vec<&str> = rest.split(':').collect();
    if fields.len() != 4 {
        return Err(ProtocolError::WrongArity {
            command: "GAME".to_string(),
            expected: 4,
            found: fields.len(),
        });
    }

    let attempts_left = fields[1]
        .parse::<u32>()
        .map_err(|_| ProtocolError::InvalidField {
            field: "attempts",
            value: fields[1].to_string(),
        })?;

    let mut guessed_letters = Vec::new();
    if !fields[3].is_empty() {
        for raw in fields[3].split(',') {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => guessed_letters.push(c),
                _ => return Err(ProtocolError::InvalidLetter(raw.to_string())),
            }
        }
    }

    Ok(GameView {
        masked_word: fields[0].to_string(),
        attempts_left,
        current_guesser: fields[2].to_string(),
        guessed_letters,
    })
}

fn parse_roster(rest: &str) -> Result<Vec<PlayerEntry>, ProtocolError> {
    if rest.is_empty() {
        return Ok(Vec::new());
    }

    rest.split(',')
        .map(|entry| {
            let fields: Vec<&str> = entry.split(':').collect();
            if fields.len() != 4 {
                return Err(ProtocolError::WrongArity {
                    command: "USERS".to_string(),
                    expected: 4,
                    found: fields.len(),
                });
            }
            let score = fields[2]
                .parse::<u32>()
                .map_err(|_| ProtocolError::InvalidField {
                    field: "score",
                    value: fields[2].to_string(),
                })?;
            let active = match fields[3] {
                "active" => true,
                "inactive" => false,
                other => {
                    return Err(ProtocolError::InvalidField {
                        field: "status",
                        value: other.to_string(),
                    })
                }
            };
            Ok(PlayerEntry {
                name: fields[0].to_string(),
                color: fields[1].to_string(),
                score,
                active,
            })
        })
        .collect()
}
