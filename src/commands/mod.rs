mod params;
mod trace;
mod utils;

use crate::cli::{Cli, Commands};
use png_to_svg::ConvertResult;

/// The main function to run the command based on CLI input.
pub fn run(cli: Cli) -> ConvertResult<()> {
    dispatch(cli.command)
}

/// Dispatch the command to the appropriate handler.
fn dispatch(command: Commands) -> ConvertResult<()> {
    match command {
        Commands::Trace(cmd) => trace::run(cmd),
        Commands::Params(cmd) => params::run(cmd),
    }
}
