//! Binary to regenerate the stored `.ast.json` and `.err` fixtures
//!
//! Usage:
//!   cargo run --bin accept_fixtures            # Update all
//!   cargo run --bin accept_fixtures -- escape  # Update only fixtures matching "escape"

use std::fs;
use std::path::Path;
use upc::ast::nodes_to_json;
use upc::{GenerateOptions, Pipeline};
use walkdir::WalkDir;

fn main() {
    let filter: Option<String> = std::env::args().nth(1);
    let fixture_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures");

    let mut updated = 0;
    let mut skipped = 0;

    for entry in WalkDir::new(&fixture_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|s| s == "up"))
    {
        let path = entry.path();
        let path_str = path.to_string_lossy();

        if let Some(ref f) = filter {
            if !path_str.contains(f) {
                skipped += 1;
                continue;
            }
        }

        process_file(path);
        updated += 1;
    }

    println!("Updated {} files, skipped {}", updated, skipped);
}

fn process_file(path: &Path) {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {:?}: {}", path, e);
            return;
        }
    };

    let is_error_test = path.to_string_lossy().contains("/errors/");
    let mut pipeline = Pipeline::standard();

    if is_error_test {
        match pipeline.compile(&source, &GenerateOptions::default()) {
            Ok(_) => eprintln!("ERROR: {:?} is in errors/ but compiles", path),
            Err(e) => write(&path.with_extension("err"), &format!("{e}\n")),
        }
        return;
    }

    match pipeline.optimize(&source) {
        Ok(ast) => match nodes_to_json(&ast.nodes) {
            Ok(json) => write(&path.with_extension("ast.json"), &format!("{json}\n")),
            Err(e) => eprintln!("Failed to encode {:?}: {}", path, e),
        },
        Err(e) => eprintln!("ERROR: {:?} failed to parse but is not in errors/: {}", path, e),
    }
}

fn write(path: &Path, contents: &str) {
    if let Err(e) = fs::write(path, contents) {
        eprintln!("Failed to write {:?}: {}", path, e);
    } else {
        println!("  wrote {}", path.display());
    }
}
