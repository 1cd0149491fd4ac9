//! Calls through the built shared library, loaded at runtime the way a foreign
//! host would load it.

use clibrs::bridge::LINKED_NAME;
use clibrs::config::platform_lib_name;
use clibrs::{BridgeConfig, Clib, ForeignString, LibrarySource, Line, Point, WrappedPoint};
use std::path::PathBuf;

/// The cdylib cargo built next to this test binary, if any.
fn built_library() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let file = platform_lib_name("clibrs");
    exe.ancestors()
        .skip(1)
        .take(2)
        .map(|dir| dir.join(&file))
        .find(|path| path.is_file())
}

fn open_built() -> Option<Clib> {
    let Some(path) = built_library() else {
        eprintln!("shared library not built next to the test binary, skipping");
        return None;
    };
    let config = BridgeConfig::with_source(LibrarySource::Path(path));
    Some(Clib::open(&config).expect("built library should open and pass the layout check"))
}

#[test]
fn test_loaded_library_displays_on_stdout() {
    let Some(clib) = open_built() else { return };
    assert_ne!(clib.name(), LINKED_NAME);

    let line = Line::new(Point::new(1, 2), Point::new(3, 4));
    let before = clib.display_count();
    clib.show_line(line);
    clib.show_point(line.start);
    assert_eq!(clib.display_count(), before + 2);

    assert_eq!(clib.format_line(line).unwrap(), "(1, 2)->(3, 4)");
    clib.close();
}

#[test]
fn test_loaded_library_marshals_structs() {
    let Some(clib) = open_built() else { return };

    let p = Point::new(5, 6);
    clib.move_point(p);
    assert_eq!(p, Point::new(5, 6));

    let mut l = Line::new(Point::new(1, 2), Point::new(3, 4));
    clib.move_line_ref(&mut l);
    assert_eq!(l, Line::new(Point::new(2, 3), Point::new(4, 5)));

    let mut w = WrappedPoint::new(&clib, 5, 6);
    w.move_by_ref();
    assert_eq!(w.point(), Point::new(6, 7));
    let d = WrappedPoint::from_native(&clib).point();
    assert_eq!(d.x + d.y, 100);
}

#[test]
fn test_loaded_library_string_handshake() {
    let Some(clib) = open_built() else { return };

    let phrase = ForeignString::allocate(&clib).unwrap();
    assert_eq!(phrase.to_str().unwrap(), "I was written in C");
    let copy = phrase.read();
    phrase.release();

    assert_eq!(copy, b"I was written in C");
    assert_eq!(clib.live_handles(), 0);
    assert_eq!(clib.released_handles(), 1);
}
