//! Fixed protocol lines and incoming line classification.

/// Prompt sent right before the server waits for the display name.
pub const NAME_PROMPT: &str = "DIGITE SEU NOME:";

/// Line a client sends to leave the chat (compared case-insensitively).
pub const EXIT_COMMAND: &str = "/exit";

/// Direct notice sent to a session right before it is kicked.
pub const KICK_NOTICE: &str = "Você foi expulso pelo servidor.";

/// Rules block sent to every new connection before the name prompt.
///
/// The trailing empty line separates the rules from the prompt.
pub const DEFAULT_BANNER: &[&str] = &[
    "==== Regras do Chat ====",
    "1. Sem xingamentos.",
    "2. Não compartilhe informações pessoais.",
    "3. Seja respeitoso com todos.",
    "4. Mantenha o chat organizado.",
    "Os servidores estão de olho!!",
    "",
];

/// Removes a trailing `\n` or `\r\n` from a line read off the wire.
///
/// Other whitespace is preserved: chat lines are relayed verbatim.
pub fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Returns true if the line (without its line ending) asks to leave.
pub fn is_exit_command(line: &str) -> bool {
    line.eq_ignore_ascii_case(EXIT_COMMAND)
}
