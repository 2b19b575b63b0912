//! Build script for kiln-runtime.
//!
//! Compiles the C test artifact in `tests/fixtures/` into one shared library
//! per variant so the integration tests can drive the real `libloading` path.
//! The output directory is exported as `KILN_FIXTURE_DIR`; when no C compiler
//! is available it is left unset and the native tests skip.

use std::env;
use std::path::{Path, PathBuf};

const FIXTURE_SOURCE: &str = "tests/fixtures/artifact.c";

/// Variant name and the define that selects it.
const VARIANTS: &[(&str, Option<&str>)] = &[
    ("full", None),
    // Same code as `full`, loaded only by the drop test so its free counter
    // isn't shared with concurrently running tests.
    ("drop", None),
    ("no_load_executable", Some("KILN_FIXTURE_NO_LOAD_EXECUTABLE")),
    ("no_get_function", Some("KILN_FIXTURE_NO_GET_FUNCTION")),
    ("no_initialization", Some("KILN_FIXTURE_NO_INIT")),
    ("null_executable", Some("KILN_FIXTURE_NULL_EXECUTABLE")),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo::rerun-if-changed={FIXTURE_SOURCE}");
    println!("cargo::rerun-if-changed=build.rs");

    if env::var("CARGO_CFG_TARGET_FAMILY").as_deref() != Ok("unix") {
        return Ok(());
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR")?).join("fixtures");
    std::fs::create_dir_all(&out_dir)?;
    let macos = env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("macos");

    for (name, define) in VARIANTS {
        let extension = if macos { "dylib" } else { "so" };
        let output = out_dir.join(format!("libkiln_fixture_{name}.{extension}"));
        if let Err(e) = compile_fixture(&output, *define, macos) {
            println!("cargo::warning=skipping native test fixtures: {e}");
            return Ok(());
        }
    }

    println!("cargo::rustc-env=KILN_FIXTURE_DIR={}", out_dir.display());
    Ok(())
}

fn compile_fixture(
    output: &Path,
    define: Option<&str>,
    macos: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let compiler = cc::Build::new().pic(true).try_get_compiler()?;
    let mut command = compiler.to_command();
    command.arg(if macos { "-dynamiclib" } else { "-shared" });
    if let Some(define) = define {
        command.arg(format!("-D{define}"));
    }
    command.arg("-o").arg(output).arg(FIXTURE_SOURCE);

    let status = command.status()?;
    if !status.success() {
        return Err(format!("compiling {} failed with {status}", output.display()).into());
    }
    Ok(())
}
