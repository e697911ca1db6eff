//! Chat with a streaming completion service from your terminal.
//!
//! # Usage
//!
//! ```bash
//! # Interactive chat
//! griseo
//!
//! # Seed every conversation from a prompt file
//! griseo --prompt prompts.yaml
//!
//! # Ask one question and exit
//! griseo what is the capital of France
//! ```
//!
//! # Commands
//!
//! While chatting, lines starting with `:` control the session:
//! - `:h`, `:help` - Show available commands
//! - `:c`, `:clear` - Reset the conversation to its seed
//! - `:s`, `:stats` - Show session statistics
//! - `:q`, `:quit` - Exit the application

use std::error::Error;
use std::process::ExitCode;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use griseo::chat::{
    ChatArgs, ChatConfig, ChatSession, Input, Outcome, PlainTextRenderer, Renderer, dispatch,
    help_text, parse_input,
};
use griseo::{OpenAi, prompts};

/// Main entry point for the griseo application.
#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let (args, words) = ChatArgs::from_command_line_relaxed("griseo [OPTIONS] [WORDS...]");
    if args.version {
        println!("griseo {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }
    let config = ChatConfig::from(args);
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    match run(config, words, &mut renderer).await {
        Ok(code) => code,
        Err(err) => {
            renderer.print_error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("griseo=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

async fn run(
    config: ChatConfig,
    words: Vec<String>,
    renderer: &mut PlainTextRenderer,
) -> Result<ExitCode, Box<dyn Error>> {
    let seed = match &config.prompt_file {
        Some(path) => prompts::load(path)?,
        None => Vec::new(),
    };
    let client = OpenAi::with_options(None, Some(config.base_url.clone()), Some(config.timeout))?;
    let mut session = ChatSession::from_config(client, &config, seed)?;

    let interrupt = session.interrupt_handle();
    // With nothing in flight a signal ends the process.
    ctrlc::set_handler(move || {
        if !interrupt.trigger() {
            std::process::exit(130);
        }
    })?;

    // oneshot
    if !words.is_empty() {
        session.set_echo_role(false);
        return match session.submit(&words.join(" "), renderer).await {
            Ok(_) => Ok(ExitCode::SUCCESS),
            Err(err) if err.is_interrupted() => Ok(ExitCode::FAILURE),
            Err(err) => {
                renderer.print_error(&err.to_string());
                Ok(ExitCode::FAILURE)
            }
        };
    }

    // interactive
    let mut rl = DefaultEditor::new()?;
    println!("Welcome to chat with Griseo!\n\n{}\n", help_text());

    loop {
        match rl.readline("user << ") {
            Ok(line) => match parse_input(&line) {
                Input::Empty => continue,
                Input::Command(command) => {
                    let _ = rl.add_history_entry(line.trim());
                    if dispatch(command, &mut session, renderer) == Outcome::Quit {
                        break;
                    }
                }
                Input::Message(text) => {
                    let _ = rl.add_history_entry(text.as_str());
                    match session.submit(&text, renderer).await {
                        Ok(_) => {}
                        Err(err) if err.is_interrupted() => {}
                        Err(err) => renderer.print_error(&err.to_string()),
                    }
                }
            },
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(ExitCode::SUCCESS)
}
