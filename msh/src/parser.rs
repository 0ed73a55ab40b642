use std::collections::HashMap;
use tracing::debug;

/// Structured command descriptor consumed by the dispatcher.
///
/// `line` is the trimmed invocation text exactly as typed (the trailing `&`
/// included) and is what job listings display. `argv` is the tokenized form
/// with the background marker stripped and the first word alias-expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub line: String,
    pub argv: Vec<String>,
    pub background: bool,
}

/// Returns `None` for blank input or input that reduces to nothing (a bare
/// `&`, or an alias that expands to an empty string).
pub fn parse_command_line(
    input: &str,
    aliases: &HashMap<String, String>,
) -> Option<CommandLine> {
    let line = input.trim();
    if line.is_empty() {
        return None;
    }

    // A trailing '&' marks a background request even without surrounding
    // whitespace ("sleep 100&").
    let background = line.ends_with('&');
    let body = if background {
        line[..line.len() - 1].trim_end()
    } else {
        line
    };
    if body.is_empty() {
        return None;
    }

    let mut argv: Vec<String> = body.split_whitespace().map(str::to_string).collect();

    // One level of alias expansion on the command word.
    if let Some(expansion) = aliases.get(argv[0].as_str()) {
        debug!("alias expand '{}' -> '{}'", argv[0], expansion);
        let mut expanded: Vec<String> =
            expansion.split_whitespace().map(str::to_string).collect();
        expanded.extend(argv.drain(1..));
        argv = expanded;
    }
    if argv.is_empty() {
        return None;
    }

    Some(CommandLine {
        line: line.to_string(),
        argv,
        background,
    })
}
