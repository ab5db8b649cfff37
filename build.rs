use std::error::Error;

use vergen::{BuildBuilder, CargoBuilder, Emitter, RustcBuilder};

#[cfg(genproto)]
use std::{env, fs, io::Write, path::Path};

#[cfg(genproto)]
const COPYRIGHT_HEADER: &str = "// Generated from src/proto/bep.proto. Do not hand-edit the message\n// definitions below this header; the surrounding impls are hand-written.\n\n";

fn main() -> Result<(), Box<dyn Error>> {
    let build = BuildBuilder::all_build()?;
    let cargo = CargoBuilder::all_cargo()?;
    let rustc = RustcBuilder::all_rustc()?;

    Emitter::default()
        .add_instructions(&build)?
        .add_instructions(&cargo)?
        .add_instructions(&rustc)?
        .emit()?;

    #[cfg(genproto)]
    generate_protos();

    Ok(())
}

/// Regenerate `src/proto/bep.rs` from `src/proto/bep.proto`.
///
/// Not run by default: the checked-in file is hand-authored to match what
/// prost-build emits, since protoc is not assumed to be on the build host.
/// Run `RUSTFLAGS="--cfg genproto" cargo build` after editing the .proto file.
#[cfg(genproto)]
fn generate_protos() {
    prost_build::Config::new()
        .out_dir(env::var("OUT_DIR").unwrap())
        .compile_protos(&["src/proto/bep.proto"], &["src/proto/"])
        .expect("protobuf compilation failed");
    let out_dir = env::var("OUT_DIR").unwrap();
    let from_path = Path::new(&out_dir).join("bep.rs");
    let content = fs::read(&from_path).unwrap();
    let mut dest = fs::File::create(Path::new("src/proto").join("bep.rs")).unwrap();
    dest.write_all(COPYRIGHT_HEADER.as_bytes()).unwrap();
    dest.write_all(&content).unwrap();
}
