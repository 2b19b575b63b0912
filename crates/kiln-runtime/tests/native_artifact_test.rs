//! Tests for shared-library artifacts.
//!
//! The artifacts are built from `tests/fixtures/artifact.c` by `build.rs`.
//! Without a C compiler they are absent and these tests skip.

mod common;

use common::{init_tracing, native_fixture};
use kiln_runtime::{
    AllocatorKind, Artifact, ContextConfig, Device, ExecutionContext, HostBuffer, ModelConfig,
    NativeArtifact, Pipeline, RuntimeError, Stage, VmInitParams,
};
use std::ffi::c_int;

macro_rules! fixture_or_skip {
    ($variant:expr) => {
        match native_fixture($variant) {
            Some(path) => path,
            None => {
                eprintln!("Skipping test: native fixture `{}` was not built", $variant);
                return;
            }
        }
    };
}

fn with_entry(entry: &str) -> ContextConfig {
    ContextConfig {
        entry: entry.to_string(),
        ..ContextConfig::default()
    }
}

fn expect_missing_entry(result: kiln_runtime::Result<ExecutionContext>, expected: &str) {
    match result {
        Err(RuntimeError::MissingEntryPointError { symbol, .. }) => assert_eq!(symbol, expected),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("`{expected}` should be reported missing"),
    }
}

#[test]
fn test_native_classification() {
    init_tracing();
    let path = fixture_or_skip!("full");
    let mut context = ExecutionContext::load(&path, ContextConfig::default()).unwrap();
    assert!(context.description().starts_with("Module(type_key=library"));

    // `main` sums its arguments, so with one input the leading ten values
    // come straight back.
    let mut image = vec![0.0f32; 3 * 32 * 32];
    image[..10].copy_from_slice(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 2.5, 0.9, 1.0]);
    let buffers = vec![HostBuffer::from_vec(image, &[1, 3, 32, 32])];

    let pipeline = Pipeline::new(ModelConfig::cifar10("unused.bin")).unwrap();
    let report = pipeline.run_with_buffers(&mut context, &buffers).unwrap();

    assert_eq!(report.output[7], 2.5);
    assert_eq!(report.classification.index, 7);
    assert_eq!(report.classification.label, "horse");
    assert_eq!(context.stage(), Stage::Classified);
}

#[test]
fn test_native_initialization_arguments() {
    let path = fixture_or_skip!("full");
    let config = ContextConfig {
        init: VmInitParams {
            device: Device::cpu(3),
            allocator: AllocatorKind::Naive,
            host_device: Device::cpu(0),
            host_allocator: AllocatorKind::Pooled,
        },
        entry: "describe".to_string(),
    };
    let mut context = ExecutionContext::load(&path, config).unwrap();

    let mut input = context.empty(&[2, 5]);
    input.copy_from_slice(&[1.0; 10]).unwrap();
    let mut output = context.empty(&[10]);
    context.invoke(&[&input], &mut output).unwrap();

    // dev_type, dev_id, alloc, host_dev_type, host_dev_id, host_alloc, then
    // num_args, ndim and last dimension of the first argument.
    assert_eq!(
        output.to_vec(),
        vec![1.0, 3.0, 1.0, 1.0, 0.0, 2.0, 1.0, 2.0, 5.0, 1.0]
    );
}

#[test]
fn test_native_positional_arguments() {
    let path = fixture_or_skip!("full");
    let mut context = ExecutionContext::load(&path, ContextConfig::default()).unwrap();

    let mut a = context.empty(&[1, 4]);
    a.copy_from_slice(&[1.0, 2.0, 3.0, 4.0]).unwrap();
    let mut b = context.empty(&[1, 4]);
    b.copy_from_slice(&[10.0, 20.0, 30.0, 40.0]).unwrap();
    let mut output = context.empty(&[1, 4]);

    context.invoke(&[&a, &b], &mut output).unwrap();
    assert_eq!(output.to_vec(), vec![11.0, 22.0, 33.0, 44.0]);
}

#[test]
fn test_native_nonzero_status() {
    let path = fixture_or_skip!("full");
    let mut context = ExecutionContext::load(&path, with_entry("fail")).unwrap();

    let input = context.empty(&[1, 10]);
    let mut output = context.empty(&[1, 10]);
    match context.invoke(&[&input], &mut output) {
        Err(RuntimeError::InvocationError(message)) => {
            assert!(message.contains("status 7"), "message: {message}")
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("entry returned a failure status"),
    }
}

#[test]
fn test_native_rejected_arguments() {
    let path = fixture_or_skip!("full");
    let mut context = ExecutionContext::load(&path, ContextConfig::default()).unwrap();

    // Input smaller than the output, which `main` refuses.
    let input = context.empty(&[1, 2]);
    let mut output = context.empty(&[1, 10]);
    assert!(matches!(
        context.invoke(&[&input], &mut output),
        Err(RuntimeError::InvocationError(_))
    ));
}

#[test]
fn test_native_missing_load_executable() {
    let path = fixture_or_skip!("no_load_executable");
    expect_missing_entry(
        ExecutionContext::load(&path, ContextConfig::default()),
        "vm_load_executable",
    );
}

#[test]
fn test_native_missing_get_function() {
    let path = fixture_or_skip!("no_get_function");
    expect_missing_entry(
        ExecutionContext::load(&path, ContextConfig::default()),
        "vm_get_function",
    );
}

#[test]
fn test_native_missing_initialization() {
    let path = fixture_or_skip!("no_initialization");
    expect_missing_entry(
        ExecutionContext::load(&path, ContextConfig::default()),
        "vm_initialization",
    );
}

#[test]
fn test_native_missing_entry() {
    let path = fixture_or_skip!("full");
    expect_missing_entry(ExecutionContext::load(&path, with_entry("forward")), "forward");
}

#[test]
fn test_native_null_executable() {
    let path = fixture_or_skip!("null_executable");
    let artifact = NativeArtifact::open(&path).unwrap();
    assert!(matches!(
        artifact.load_executable(),
        Err(RuntimeError::ModuleLoadError { .. })
    ));
}

#[test]
fn test_native_module_freed_on_drop() {
    let path = fixture_or_skip!("drop");

    // Holding our own handle keeps the library mapped after the context
    // releases its reference, so the counter can be read afterwards.
    let resolved = std::fs::canonicalize(&path).unwrap();
    let library = unsafe { libloading::Library::new(&resolved) }.unwrap();
    let free_count: libloading::Symbol<unsafe extern "C" fn() -> c_int> =
        unsafe { library.get(b"kiln_fixture_free_count") }.unwrap();
    let before = unsafe { free_count() };

    let context = ExecutionContext::load(&path, ContextConfig::default()).unwrap();
    assert_eq!(unsafe { free_count() }, before);
    drop(context);

    assert_eq!(unsafe { free_count() }, before + 1);
}
