mod common;

use std::ffi::{CStr, CString, c_char};

use png_to_svg::ffi::{SvgBuffer, convert_png_to_svg, free_cstring};

use common::*;

fn call(png: &[u8], params: Option<&str>) -> *mut c_char {
    let params = params.map(|p| CString::new(p).unwrap());
    let params_ptr = params.as_ref().map_or(std::ptr::null(), |p| p.as_ptr());
    unsafe { convert_png_to_svg(png.as_ptr(), png.len(), params_ptr) }
}

#[test]
fn success_returns_owned_document() {
    let png = encode_png(&ring(16, 3.0, 6.0));
    let ptr = call(&png, Some(r#"{"paletteSize": 2}"#));
    assert!(!ptr.is_null());

    let text = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_owned();
    let parsed = parse_svg(&text);
    assert_eq!(parsed.root["width"], "16");
    assert!(!parsed.paths.is_empty());

    unsafe { free_cstring(ptr) };
}

#[test]
fn null_params_use_defaults() {
    let png = encode_png(&shapes(20, 16));
    let ptr = call(&png, None);
    assert!(!ptr.is_null());
    let buffer = unsafe { SvgBuffer::from_raw(ptr) }.unwrap();
    assert_eq!(buffer.as_str(), png_to_svg::convert(&png, "").unwrap());
}

#[test]
fn failures_return_null() {
    let png = encode_png(&shapes(20, 16));
    assert!(call(&png, Some("{")).is_null());
    assert!(call(&png, Some(r#"{"paletteSize": 0}"#)).is_null());
    assert!(call(&png, Some(r#"{"minimumRegionArea": -1}"#)).is_null());
    assert!(call(b"garbage", Some("{}")).is_null());
    assert!(call(&png[..png.len() / 2], Some("{}")).is_null());
    assert!(call(&[], Some("{}")).is_null());
}

#[test]
fn null_image_pointer_returns_null() {
    let ptr = unsafe { convert_png_to_svg(std::ptr::null(), 128, std::ptr::null()) };
    assert!(ptr.is_null());
}

#[test]
fn releasing_null_is_a_no_op() {
    unsafe {
        free_cstring(std::ptr::null_mut());
        free_cstring(std::ptr::null_mut());
    }
}

#[test]
fn buffer_length_matches_c_string() {
    let png = encode_png(&shapes(12, 10));
    let buffer = png_to_svg::convert_to_buffer(&png, "{}").unwrap();
    assert_eq!(buffer.len(), buffer.as_c_str().to_bytes().len());
    let ptr = buffer.into_raw();
    let len = unsafe { CStr::from_ptr(ptr) }.to_bytes().len();
    let back = unsafe { SvgBuffer::from_raw(ptr) }.unwrap();
    assert_eq!(back.len(), len);
}
