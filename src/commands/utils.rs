use std::fs;
use std::path::{Path, PathBuf};

use png_to_svg::{ConvertResult, TraceConfig, TraceParams};

use crate::cli::ParamsArgs;

/// Read the optional params file, apply the flags on top and validate.
pub fn load_config(args: &ParamsArgs) -> ConvertResult<TraceConfig> {
    let mut params = match &args.params_file {
        Some(path) => TraceParams::from_json(&fs::read_to_string(path)?)?,
        None => TraceParams::default(),
    };
    args.apply(&mut params);
    params.validate()
}

/// Derive an SVG file path by changing the extension to "svg".
pub fn derive_svg_path(input: &Path) -> PathBuf {
    let mut path = input.to_path_buf();
    path.set_extension("svg");
    path
}
