use super::ShellProxy;
use msh_types::{Context, ExitStatus};

/// `alias` lists all aliases; `alias name='command'` defines one.
pub fn command(ctx: &Context, argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    if argv.len() < 2 {
        for (name, command) in proxy.list_aliases() {
            ctx.write_stdout(&format!("{name}='{command}'")).ok();
        }
        return ExitStatus::ExitedWith(0);
    }

    // Re-join so `alias gs='git status'` survives tokenization.
    let spec = argv[1..].join(" ");
    match parse_alias(&spec) {
        Some((name, command)) => {
            proxy.set_alias(name.to_string(), command.to_string());
            ExitStatus::ExitedWith(0)
        }
        None => {
            ctx.write_stderr(&format!("alias: invalid alias format: {spec}"))
                .ok();
            ExitStatus::ExitedWith(1)
        }
    }
}

fn parse_alias(spec: &str) -> Option<(&str, &str)> {
    let (name, value) = spec.split_once('=')?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    let value = value.trim();
    let value = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value);
    Some((name, value))
}

#[cfg(test)]
mod tests {
    use super::parse_alias;

    #[test]
    fn parses_quoted_and_bare_values() {
        assert_eq!(parse_alias("gs='git status'"), Some(("gs", "git status")));
        assert_eq!(parse_alias("ll=ls"), Some(("ll", "ls")));
    }

    #[test]
    fn rejects_malformed_specs() {
        assert_eq!(parse_alias("no equals sign"), None);
        assert_eq!(parse_alias("=empty"), None);
        assert_eq!(parse_alias("bad name=x"), None);
    }
}
