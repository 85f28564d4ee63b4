use png_to_svg::ConvertError;

pub fn report_error(err: &ConvertError) {
    match err {
        ConvertError::Config(_) | ConvertError::Json(_) => {
            eprintln!("{err}");
            eprintln!();
            eprintln!("Run `png-to-svg params` to print the defaults as a starting point.");
        }
        ConvertError::Image(_) | ConvertError::EmptyImage | ConvertError::ZeroDimension { .. } => {
            eprintln!("{err}");
            eprintln!("Only non-empty PNG images are supported.");
        }
        _ => {
            eprintln!("{err}");
        }
    }
}
