use std::io;

use anyhow::Context;
use ember::{repl, Config};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env().context("invalid configuration")?;
    println!("Hello! This is the Ember programming language.");
    println!("Feel free to type in commands");
    repl::start(io::stdin().lock(), io::stdout(), &config)
}

/// Installs a stderr subscriber, but only when `RUST_LOG` is set.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}
