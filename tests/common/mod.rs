#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use quick_xml::Reader;
use quick_xml::events::Event;

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const RED: Rgba<u8> = Rgba([220, 20, 20, 255]);
pub const BLUE: Rgba<u8> = Rgba([20, 40, 200, 255]);

pub fn encode_png(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// White canvas with a black annulus centred in it.
pub fn ring(size: u32, inner: f64, outer: f64) -> RgbaImage {
    let c = size as f64 / 2.0;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f64 + 0.5 - c;
        let dy = y as f64 + 0.5 - c;
        let d = (dx * dx + dy * dy).sqrt();
        if d >= inner && d <= outer { BLACK } else { WHITE }
    })
}

/// White canvas with a red rectangle and a blue disk.
pub fn shapes(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| {
        let dx = x as f64 + 0.5 - w as f64 * 0.7;
        let dy = y as f64 + 0.5 - h as f64 * 0.6;
        if (2..w / 3).contains(&x) && (3..h - 3).contains(&y) {
            RED
        } else if dx * dx + dy * dy <= (h as f64 / 4.0).powi(2) {
            BLUE
        } else {
            WHITE
        }
    })
}

/// Pixel count per `#rrggbb` color.
pub fn color_areas(image: &RgbaImage) -> HashMap<String, usize> {
    let mut areas = HashMap::new();
    for px in image.pixels() {
        let hex = format!("#{:02x}{:02x}{:02x}", px[0], px[1], px[2]);
        *areas.entry(hex).or_insert(0) += 1;
    }
    areas
}

/// Attributes of one element, as owned strings.
pub type Attributes = HashMap<String, String>;

/// Parsed view of a generated document.
#[derive(Debug, Default)]
pub struct ParsedSvg {
    pub root: Attributes,
    pub paths: Vec<Attributes>,
}

/// Parse the document with a real XML reader; panics when it is malformed.
pub fn parse_svg(text: &str) -> ParsedSvg {
    let mut reader = Reader::from_str(text);
    let mut parsed = ParsedSvg::default();
    let mut depth = 0usize;
    let mut roots = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(elem)) => {
                depth += 1;
                if elem.name().as_ref() == b"svg" {
                    roots += 1;
                    parsed.root = attributes(&elem);
                }
            }
            Ok(Event::Empty(elem)) => {
                match elem.name().as_ref() {
                    b"path" => parsed.paths.push(attributes(&elem)),
                    b"svg" => {
                        roots += 1;
                        parsed.root = attributes(&elem);
                    }
                    other => panic!("unexpected element {}", String::from_utf8_lossy(other)),
                }
            }
            Ok(Event::End(_)) => depth -= 1,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => panic!("malformed SVG: {err}\n{text}"),
        }
    }
    assert_eq!(depth, 0, "unbalanced elements");
    assert_eq!(roots, 1, "expected exactly one <svg> root");
    parsed
}

fn attributes(elem: &quick_xml::events::BytesStart<'_>) -> Attributes {
    elem.attributes()
        .map(|attr| {
            let attr = attr.unwrap();
            (
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                String::from_utf8_lossy(&attr.value).into_owned(),
            )
        })
        .collect()
}
