use anyhow::Result;
use clap::Parser;
use libc::STDIN_FILENO;
use msh::shell::Shell;
use msh_types::{Context, ExitStatus};
use nix::unistd::isatty;
use std::io::{BufRead, Write};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Execute a single command line and exit
    #[arg(short, long)]
    command: Option<String>,
}

fn main() -> ExitCode {
    if let Err(err) = init_tracing() {
        eprintln!("failed to initialize tracing: {err}");
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    let mut shell = Shell::new();
    if let Err(err) = shell.set_signals() {
        eprintln!("msh: {err}");
        return ExitCode::FAILURE;
    }

    let interactive = isatty(STDIN_FILENO).unwrap_or(false);
    let ctx = Context::new(shell.pid, shell.pgid, interactive);

    match cli.command.as_deref() {
        Some(command) => run_command(&mut shell, &ctx, command),
        None => run_loop(&mut shell, &ctx),
    }
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("MSH_LOG"))
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn run_command(shell: &mut Shell, ctx: &Context, command: &str) -> ExitCode {
    debug!("command mode: {:?}", command);
    match shell.eval_str(ctx, command) {
        Ok(ExitStatus::ExitedWith(code)) => ExitCode::from(code.clamp(0, 255) as u8),
        Ok(ExitStatus::Running(_)) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("msh: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_loop(shell: &mut Shell, ctx: &Context) -> ExitCode {
    debug!("start shell loop, interactive: {}", ctx.interactive);
    let stdin = std::io::stdin();
    let mut input = String::new();

    loop {
        if ctx.interactive {
            print!("{}> ", shell.prompt);
            std::io::stdout().flush().ok();
        }

        input.clear();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(err) => {
                eprintln!("msh: failed to read input: {err}");
                break;
            }
        }

        if let Err(err) = shell.eval_str(ctx, &input) {
            eprintln!("msh: {err}");
        }

        if let Some(status) = shell.exited {
            debug!("shell exit requested: {:?}", status);
            break;
        }
    }

    match shell.exited {
        Some(ExitStatus::ExitedWith(code)) => ExitCode::from(code.clamp(0, 255) as u8),
        _ => ExitCode::SUCCESS,
    }
}
