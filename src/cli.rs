use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use png_to_svg::{FillRule, Hierarchical, TraceMode, TraceParams};

/// Command line interface definition.
#[derive(Parser, Debug)]
#[command(author, version, about, propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalOptions {
    /// Print per-stage statistics to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Trace a PNG image into an SVG document
    Trace(TraceCommand),
    /// Print the validated parameter bundle as JSON
    Params(ParamsCommand),
}

#[derive(Args, Debug)]
pub struct TraceCommand {
    /// Input PNG path
    pub input: PathBuf,
    /// Output SVG path (defaults to input name with `.svg`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub params: ParamsArgs,
}

#[derive(Args, Debug)]
pub struct ParamsCommand {
    #[command(flatten)]
    pub params: ParamsArgs,
}

/// Parameter sources shared by every command. Flags override the file.
#[derive(Args, Debug, Default)]
pub struct ParamsArgs {
    /// JSON parameter file
    #[arg(long = "params", value_name = "FILE", env = "PNG_TO_SVG_PARAMS")]
    pub params_file: Option<PathBuf>,
    /// Maximum number of colors in the palette
    #[arg(long = "palette-size")]
    pub palette_size: Option<i64>,
    /// Trace in black and white, splitting at this luminance (0-255)
    #[arg(long = "binary-threshold")]
    pub binary_threshold: Option<i64>,
    /// Maximum deviation of the fitted path from the pixel boundary
    #[arg(long = "tolerance")]
    pub curve_fit_tolerance: Option<f64>,
    /// Regions smaller than this many pixels are merged into a neighbour
    #[arg(long = "min-area")]
    pub minimum_region_area: Option<i64>,
    /// Decimal digits per coordinate (0-8)
    #[arg(long = "precision")]
    pub coordinate_precision: Option<i64>,
    /// Outline regions instead of filling them
    #[arg(long)]
    pub stroke: bool,
    /// Path simplification mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,
    /// Corner threshold in degrees
    #[arg(long = "corner-threshold")]
    pub corner_threshold: Option<f64>,
    /// Winding rule written into each path
    #[arg(long = "fill-rule", value_enum)]
    pub fill_rule: Option<FillRuleArg>,
    /// Cut enclosed regions out as holes, or stack them on top
    #[arg(long, value_enum)]
    pub hierarchical: Option<HierarchicalArg>,
}

impl ParamsArgs {
    /// Apply the flags that were given on top of `params`.
    pub fn apply(&self, params: &mut TraceParams) {
        if let Some(value) = self.palette_size {
            params.palette_size = value;
        }
        if let Some(value) = self.binary_threshold {
            params.binary_threshold = Some(value);
        }
        if let Some(value) = self.curve_fit_tolerance {
            params.curve_fit_tolerance = value;
        }
        if let Some(value) = self.minimum_region_area {
            params.minimum_region_area = value;
        }
        if let Some(value) = self.coordinate_precision {
            params.coordinate_precision = value;
        }
        if self.stroke {
            params.stroke_mode = true;
        }
        if let Some(value) = self.mode {
            params.mode = value.into();
        }
        if let Some(value) = self.corner_threshold {
            params.corner_threshold = value;
        }
        if let Some(value) = self.fill_rule {
            params.fill_rule = value.into();
        }
        if let Some(value) = self.hierarchical {
            params.hierarchical = value.into();
        }
    }
}

/// Path simplification modes.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    None,
    Polygon,
    Spline,
}

impl From<ModeArg> for TraceMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::None => TraceMode::None,
            ModeArg::Polygon => TraceMode::Polygon,
            ModeArg::Spline => TraceMode::Spline,
        }
    }
}

/// Winding rules.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FillRuleArg {
    Evenodd,
    Nonzero,
}

impl From<FillRuleArg> for FillRule {
    fn from(value: FillRuleArg) -> Self {
        match value {
            FillRuleArg::Evenodd => FillRule::EvenOdd,
            FillRuleArg::Nonzero => FillRule::NonZero,
        }
    }
}

/// Region layering.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum HierarchicalArg {
    Cutout,
    Stacked,
}

impl From<HierarchicalArg> for Hierarchical {
    fn from(value: HierarchicalArg) -> Self {
        match value {
            HierarchicalArg::Cutout => Hierarchical::Cutout,
            HierarchicalArg::Stacked => Hierarchical::Stacked,
        }
    }
}
