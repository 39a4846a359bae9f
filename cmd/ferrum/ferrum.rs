use clap::Parser;
use cli::CLI;

mod cli;
mod initializers;

fn main() -> eyre::Result<()> {
    let CLI { opts, command } = CLI::parse();
    initializers::init_tracing(&opts);
    command.run(&opts)
}
