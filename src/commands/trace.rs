use png_to_svg::{ConvertResult, Converter};

use crate::cli::TraceCommand;

use super::utils::{derive_svg_path, load_config};

/// The main function to run the trace command.
pub fn run(cmd: TraceCommand) -> ConvertResult<()> {
    let config = load_config(&cmd.params)?;
    let output_path = cmd
        .output
        .clone()
        .unwrap_or_else(|| derive_svg_path(&cmd.input));

    Converter::new(config).convert_file(&cmd.input, &output_path)?;
    println!("SVG saved to {}", output_path.display());

    Ok(())
}
