use std::env;
use std::fs;
use std::path::PathBuf;

/// Put the linker script somewhere the linker can find it.
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("No out dir"));
    fs::write(out_dir.join("memory.x"), include_bytes!("memory.x"))
        .expect("Could not write file");

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}
