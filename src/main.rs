use anyhow::Result;
use elens_rs::{run, Config};

fn main() -> Result<()> {
    // optional path to the config file, config.toml by default
    let cfg = match std::env::args().nth(1) {
        Some(path) => Config::from_path(path)?,
        None => Config::new()?,
    };
    run(cfg)
}
