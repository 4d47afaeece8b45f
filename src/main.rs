#[macro_use]
extern crate derive_more;
#[macro_use]
extern crate lazy_static;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use ggez::{event, ContextBuilder};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::app::{App, Screen, SnakeScreen, WakeScreen};
use crate::backend::{Backend, LocalBackend, Principal, Retrying};
use crate::cli::{Cli, Command, StartScreen};
use crate::error::{ErrorConversion, Result};
use crate::prefs::Prefs;
use crate::wake::SystemClock;

mod app;
mod backend;
mod basic;
mod cli;
mod error;
mod prefs;
mod snake;
mod wake;

fn backend(prefs: &Prefs) -> Result<Retrying<LocalBackend>> {
    let caller = Principal::from(prefs.user.as_str());
    let local = LocalBackend::open(caller, &prefs.data_file)
        .with_trace_step(format!("opening {}", prefs.data_file.display()))?;
    Ok(Retrying::with_retries(local, prefs.backend_retries))
}

fn play(prefs: Prefs, backend: Box<dyn Backend>, start: StartScreen) -> Result {
    let (ctx, event_loop) = ContextBuilder::new("wake_warrior", "gorilskij")
        .window_mode(App::window_mode(&prefs))
        .window_setup(App::window_setup())
        .build()?;

    let wake = Screen::Wake(WakeScreen::new(backend, Box::new(SystemClock), &prefs));
    let snake = Screen::Snake(SnakeScreen::new(&prefs));
    let app = match start {
        StartScreen::Wake => App::new(wake, snake),
        StartScreen::Snake => App::new(snake, wake),
    };

    info!("opening the window as {}", prefs.user);
    event::run(ctx, event_loop, app)
}

fn run(cli: Cli) -> Result {
    let mut prefs = Prefs::load(cli.config.as_deref())?;
    if let Some(user) = cli.user {
        prefs = prefs.user(user);
    }
    let mut backend = backend(&prefs)?;

    match cli.command {
        None => play(prefs, Box::new(backend), StartScreen::default()),
        Some(Command::Play { screen }) => play(prefs, Box::new(backend), screen),
        Some(command) => cli::execute(&command, &mut backend, &SystemClock, &mut io::stdout()),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!("{:?}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
