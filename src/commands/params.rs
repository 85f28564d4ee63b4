use png_to_svg::ConvertResult;

use crate::cli::ParamsCommand;

use super::utils::load_config;

/// Print the effective parameters after merging the file and the flags.
pub fn run(cmd: ParamsCommand) -> ConvertResult<()> {
    let config = load_config(&cmd.params)?;
    println!("{}", serde_json::to_string_pretty(&config.to_params())?);
    Ok(())
}
