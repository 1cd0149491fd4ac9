//! Console walkthrough of the native library.
//!
//! Uses the linked symbols unless `CLIBRS_LIBRARY` names a shared object.
//! Native code prints its own display lines to stdout; diagnostics go through
//! the logger (`RUST_LOG`, default `info`).

use anyhow::{Context, Result};
use clibrs::{BridgeConfig, Clib, ForeignPoint, ForeignString, Line, Point, WrappedPoint};
use env_logger::Env;

fn counter_and_strings(clib: &Clib) -> Result<()> {
    println!("Calling native counting function four times:");
    for _ in 0..4 {
        println!("{}", clib.counter_next());
    }
    println!();

    println!("Calling native function on a copy of an immutable string");
    let original = c"starting string";
    println!("Before: {:?}", original);
    let changed = clib.add_one(original);
    println!("After:  {:?} (native copy: {:?})", original, changed);

    println!("Calling native function with a mutable buffer this time");
    let mut buffer = original.to_bytes_with_nul().to_vec();
    println!("Before: {}", String::from_utf8_lossy(&buffer[..buffer.len() - 1]));
    clib.add_one_in_place(&mut buffer)?;
    println!("After:  {}", String::from_utf8_lossy(&buffer[..buffer.len() - 1]));
    println!();

    println!("Allocating and freeing memory on the native side");
    let phrase = ForeignString::allocate(clib).context("allocating native string")?;
    println!("Rust was just handed {:?}", phrase);
    let copy = phrase.read();
    phrase.release();
    println!("Kept a copy after release: {}", String::from_utf8_lossy(&copy));
    println!();
    Ok(())
}

fn points_and_lines(clib: &Clib) -> Result<()> {
    println!("Pass a struct into native code");
    let a = Point::new(1, 2);
    println!("Point in Rust is {}", a);
    clib.show_point(a);
    clib.show_point_ref(&a);
    println!();

    println!("Pass a nested struct into native code");
    let l = Line::new(Point::new(1, 2), Point::new(3, 4));
    println!("Line in Rust is {}", l);
    clib.show_line(l);
    println!("Native display: {}", clib.format_line(l)?);
    println!();

    println!("Pass by value");
    let a = Point::new(5, 6);
    println!("Point in Rust is {}", a);
    clib.move_point(a);
    println!("Point in Rust is {}", a);
    println!();

    println!("Pass by reference");
    let mut a = Point::new(5, 6);
    println!("Point in Rust is {}", a);
    clib.move_point_ref(&mut a);
    println!("Point in Rust is {}", a);
    println!();

    println!("Move a line in native code");
    let mut l = clib.get_line();
    println!("Line in Rust is {}", l);
    clib.move_line_ref(&mut l);
    println!("Line in Rust is {}", l);
    println!();

    println!("Return struct");
    for _ in 0..4 {
        println!("New Point in Rust (from native) is {}", clib.get_point());
    }
    println!();

    println!("Return struct pointer");
    let mut owned = ForeignPoint::allocate(clib).context("allocating native point")?;
    println!("Point in Rust is {}", owned.get());
    owned.move_in_place();
    println!("Point in Rust is {}", owned.get());
    owned.release();
    println!();
    Ok(())
}

fn wrapped_points(clib: &Clib) -> Result<()> {
    println!("Pass a wrapped point into native code");
    let a = WrappedPoint::new(clib, 1, 2);
    println!("Point in Rust is {}", a);
    a.show();
    println!("Native display: {}", a.native_text()?);
    println!();

    println!("Pass by value");
    let a = WrappedPoint::new(clib, 5, 6);
    println!("Point in Rust is {}", a);
    a.move_by_value();
    println!("Point in Rust is {}", a);
    println!();

    println!("Pass by reference");
    let mut a = WrappedPoint::new(clib, 5, 6);
    println!("Point in Rust is {}", a);
    a.move_by_ref();
    println!("Point in Rust is {}", a);
    println!();

    println!("Return default points");
    for _ in 0..4 {
        println!("New Point in Rust (from native) is {}", WrappedPoint::from_native(clib));
    }
    println!();
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = BridgeConfig::from_env();
    let clib = Clib::open(&config).with_context(|| format!("opening {:?}", config.source))?;
    log::info!("using native library {}", clib.name());

    counter_and_strings(&clib)?;
    points_and_lines(&clib)?;
    wrapped_points(&clib)?;

    clib.close();
    Ok(())
}
