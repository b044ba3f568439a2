mod actions;
mod classifier;
mod cli;
mod config;
mod events;
mod input;
mod logging;
mod pipeline;
mod replay;
mod tracker;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}
