//! Help overlay content loaded from `help-strings/*.txt` at compile time.
//! Edit the .txt files to change help content without touching Rust code.

macro_rules! include_help {
    ($name:literal) => {
        include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/src/help-strings/",
            $name,
            ".txt"
        ))
    };
}

pub fn grid() -> &'static str {
    include_help!("grid")
}

pub fn column_menu() -> &'static str {
    include_help!("column_menu")
}
