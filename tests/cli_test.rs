use deck_export::model::ImageRef;
use deck_export::{Element, ElementKind, Presentation};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

fn run_command(store: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_deck-export"))
        .args(args)
        .env("DECK_STORE_DIR", store)
        .env("SETTLE_DELAY_MS", "0")
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn write_deck(dir: &Path, asset_id: &str) -> std::path::PathBuf {
    let mut p = Presentation::new("Cli deck");
    p.slides[0].elements.push(
        Element::new(ElementKind::Image(ImageRef {
            asset_id: asset_id.to_string(),
        }))
        .at(10.0, 10.0, 100.0, 100.0),
    );
    let path = dir.join("deck.json");
    fs::write(&path, serde_json::to_string(&p).expect("Serialization failed"))
        .expect("Failed to write deck");
    path
}

#[test]
fn test_add_image_then_export_html_from_file() {
    let work = TempDir::new().expect("Failed to create temp dir");
    let store = work.path().join("store");
    let image = work.path().join("pixel.png");
    fs::write(&image, PNG).expect("Failed to write image");

    let output = run_command(&store, &["add-image", "--file", image.to_str().unwrap()]);
    assert!(output.status.success(), "add-image failed: {:?}", output);
    let asset_id = stdout(&output).trim().to_string();
    assert!(store.join("images").join(&asset_id).exists());

    let deck = write_deck(work.path(), &asset_id);
    let out = work.path().join("out");
    let output = run_command(
        &store,
        &["export-html", "--file", deck.to_str().unwrap(), "-o", out.to_str().unwrap()],
    );
    assert!(output.status.success(), "export-html failed: {:?}", output);

    let html = fs::read_to_string(out.join("Cli deck.html")).expect("HTML was not written");
    assert!(html.contains("data:image/png;base64,"));
}

#[test]
fn test_json_export_import_and_list() {
    let work = TempDir::new().expect("Failed to create temp dir");
    let store = work.path().join("store");
    let image = work.path().join("pixel.png");
    fs::write(&image, PNG).expect("Failed to write image");

    let output = run_command(&store, &["add-image", "--file", image.to_str().unwrap()]);
    let asset_id = stdout(&output).trim().to_string();
    let deck = write_deck(work.path(), &asset_id);
    let out = work.path().join("out");

    let output = run_command(
        &store,
        &["export-json", "--file", deck.to_str().unwrap(), "-o", out.to_str().unwrap()],
    );
    assert!(output.status.success(), "export-json failed: {:?}", output);
    let archive = out.join("Cli deck.json");
    let text = fs::read_to_string(&archive).expect("Archive was not written");
    assert!(!text.contains(&asset_id));

    let output = run_command(&store, &["import-json", "--file", archive.to_str().unwrap()]);
    assert!(output.status.success(), "import-json failed: {:?}", output);
    let imported_id = stdout(&output)
        .split_whitespace()
        .nth(2)
        .expect("No id printed")
        .to_string();

    let output = run_command(&store, &["list"]);
    assert!(output.status.success());
    let listing = stdout(&output);
    assert!(listing.contains(&imported_id));
    assert!(listing.contains("Cli deck"));

    // Re-export from the store now that images are inline
    let again = work.path().join("again");
    let output = run_command(
        &store,
        &["export-json", "--id", &imported_id, "-o", again.to_str().unwrap()],
    );
    assert!(output.status.success(), "export-json --id failed: {:?}", output);
    assert!(again.join("Cli deck.json").exists());
}

#[test]
fn test_bad_input_exits_with_error() {
    let work = TempDir::new().expect("Failed to create temp dir");
    let store = work.path().join("store");
    let missing = work.path().join("missing.json");

    let out = work.path().to_str().unwrap();

    let output = run_command(&store, &["export-json", "--file", missing.to_str().unwrap(), "-o", out]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));

    let output = run_command(&store, &["export-json", "--id", "no-such-deck", "-o", out]);
    assert!(!output.status.success());

    let output = run_command(
        &store,
        &["export-pdf", "--id", "whatever", "--quality", "ultra", "-o", out],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown PDF quality"));
}
