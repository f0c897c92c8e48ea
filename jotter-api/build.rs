//! Build script for the Jotter API
//!
//! Compiles the Protocol Buffer definitions into Rust code and writes the
//! encoded file descriptor set used by the reflection service.

use std::{env, path::PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    tonic_prost_build::configure()
        // Generate server code (we're implementing the service)
        .build_server(true)
        // Generate client code (used by the end-to-end tests)
        .build_client(true)
        .file_descriptor_set_path(out_dir.join("jotter_descriptor.bin"))
        .compile_protos(&["proto/jotter/v1/notes.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/jotter/v1/notes.proto");

    Ok(())
}
