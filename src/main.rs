//! binary entry point
//!
//! run with `RUST_LOG=strikefuzz=debug` (or similar) for structured logs
use std::process::ExitCode;

use clap::{CommandFactory, FromArgMatches};
use tracing::{error, subscriber::set_global_default, warn};
use tracing_subscriber::EnvFilter;

use strikefuzz::config::{bind_wordlists, Args};
use strikefuzz::cursor::WordCursor;
use strikefuzz::engine::Engine;
use strikefuzz::StrikeFuzzError;

fn main() -> ExitCode {
    // parse through `ArgMatches` so the raw flag positions survive; each
    // `-w` binds to the most recently declared templated field
    let matches = Args::command().get_matches();
    let mut args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(error) => error.exit(),
    };
    args.wordlist = bind_wordlists(&matches, args.wordlist);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();

    // logging is best-effort; a second initialization in tests is harmless
    let _ = set_global_default(subscriber);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(source) => {
            error!(%source, "fatal error, exiting");
            eprintln!("error: {source}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), StrikeFuzzError> {
    let (config, template, wordlists, filters) = args.into_parts()?;

    // an unopenable word-list degrades to the one-word dummy so that the
    // placeholder-count arithmetic stays valid; the run continues
    let cursors = wordlists
        .iter()
        .map(|path| {
            WordCursor::from_file(path).unwrap_or_else(|source| {
                warn!(%source, "degrading to the one-word dummy list");
                WordCursor::dummy()
            })
        })
        .collect();

    let mut engine = Engine::new(config, template, cursors, filters)?;

    // the engine is cooperative and single-threaded; a current-thread
    // runtime is all the multiplexing it needs
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(engine.run())
}
