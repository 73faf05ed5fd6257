//! Operator console command parsing.

/// Prefix of the kick command, matched case-insensitively.
const KICK_PREFIX: &str = "kick ";

/// One parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// `list` or `lista`
    List,

    /// `/<text>`, text trimmed
    Broadcast(String),

    /// `kick <name>`, name trimmed
    Kick(String),

    /// Anything else
    Ignored,
}

impl AdminCommand {
    /// Parses one console line. The line is trimmed first.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();

        if line.eq_ignore_ascii_case("list") || line.eq_ignore_ascii_case("lista") {
            return Self::List;
        }

        if let Some(text) = line.strip_prefix('/') {
            if !text.is_empty() {
                return Self::Broadcast(text.trim().to_string());
            }
        }

        match line.get(..KICK_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(KICK_PREFIX) => {
                Self::Kick(line[KICK_PREFIX.len()..].trim().to_string())
            }
            _ => Self::Ignored,
        }
    }
}
