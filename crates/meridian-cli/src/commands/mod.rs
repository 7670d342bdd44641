mod backtest;
mod stream;

use std::path::PathBuf;

pub enum Command {
    Backtest { config: PathBuf, out: Option<PathBuf> },
    Stream { config: PathBuf, out: Option<PathBuf> },
}

pub fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Backtest { config, out } => backtest::run(config, out),
        Command::Stream { config, out } => stream::run(config, out),
    }
}
