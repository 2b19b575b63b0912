//! Shared-library artifacts loaded with `libloading`.
//!
//! Expected C ABI:
//!
//! ```c
//! void* vm_load_executable(void);
//! void* vm_get_function(void* vm, const char* name);   /* NULL if absent */
//! void  vm_module_free(void* vm);                      /* optional */
//!
//! /* functions returned by vm_get_function */
//! void vm_initialization(void* vm, int dev_type, int dev_id, int alloc,
//!                        int host_dev_type, int host_dev_id, int host_alloc);
//! int  main(void* vm, const DLTensor* args, int num_args, DLTensor* out);
//! ```
//!
//! Entry functions return 0 on success and write their result into `out`.

use crate::artifact::{
    Artifact, INITIALIZATION_SYMBOL, LOAD_EXECUTABLE_SYMBOL, VirtualMachine, VmInitParams,
};
use crate::device::DLTensor;
use crate::error::{Result, RuntimeError};
use crate::tensor::DeviceTensor;
use libloading::Library;
use std::ffi::{CString, c_char, c_int, c_void};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const GET_FUNCTION_SYMBOL: &str = "vm_get_function";
const FREE_MODULE_SYMBOL: &str = "vm_module_free";

type LoadExecutableFn = unsafe extern "C" fn() -> *mut c_void;
type GetFunctionFn = unsafe extern "C" fn(*mut c_void, *const c_char) -> *mut c_void;
type FreeModuleFn = unsafe extern "C" fn(*mut c_void);
type InitializationFn =
    unsafe extern "C" fn(*mut c_void, c_int, c_int, c_int, c_int, c_int, c_int);
type EntryFn = unsafe extern "C" fn(*mut c_void, *const DLTensor, c_int, *mut DLTensor) -> c_int;

/// A compiled model artifact backed by a dynamically loaded library.
pub struct NativeArtifact {
    library: Arc<Library>,
    path: PathBuf,
}

impl NativeArtifact {
    /// Load the shared library at `path`.
    ///
    /// # Errors
    /// Returns [`RuntimeError::ModuleLoadError`] if the file doesn't exist or the
    /// platform loader rejects it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RuntimeError::ModuleLoadError {
                path: path.to_path_buf(),
                reason: "file does not exist".to_string(),
            });
        }

        // A bare file name would send dlopen to the library search path
        // instead of the working directory.
        let resolved = std::fs::canonicalize(path).map_err(|e| RuntimeError::ModuleLoadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // SAFETY: loading runs the library's static initializers. Artifacts are
        // trusted inputs produced by the model compiler.
        let library =
            unsafe { Library::new(&resolved) }.map_err(|e| RuntimeError::ModuleLoadError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        tracing::debug!(path = %resolved.display(), "Loaded artifact library");

        Ok(Self {
            library: Arc::new(library),
            path: resolved,
        })
    }

    /// Absolute path the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up an exported symbol, copying out the function pointer.
    ///
    /// # Safety
    /// `T` must match the symbol's actual signature.
    unsafe fn symbol<T: Copy>(&self, name: &str) -> Option<T> {
        unsafe { self.library.get::<T>(name.as_bytes()) }
            .ok()
            .map(|sym| *sym)
    }

    fn module_name(&self) -> String {
        format!("file `{}`", self.path.display())
    }
}

impl Artifact for NativeArtifact {
    fn description(&self) -> String {
        format!("Module(type_key=library, path={})", self.path.display())
    }

    fn load_executable(&self) -> Result<Box<dyn VirtualMachine>> {
        let load: LoadExecutableFn = unsafe { self.symbol(LOAD_EXECUTABLE_SYMBOL) }
            .ok_or_else(|| {
                RuntimeError::missing_entry(LOAD_EXECUTABLE_SYMBOL, self.module_name())
            })?;
        let get_function: GetFunctionFn = unsafe { self.symbol(GET_FUNCTION_SYMBOL) }
            .ok_or_else(|| RuntimeError::missing_entry(GET_FUNCTION_SYMBOL, self.module_name()))?;
        let free: Option<FreeModuleFn> = unsafe { self.symbol(FREE_MODULE_SYMBOL) };

        // SAFETY: signature fixed by the artifact ABI above.
        let handle = unsafe { load() };
        if handle.is_null() {
            return Err(RuntimeError::ModuleLoadError {
                path: self.path.clone(),
                reason: format!("`{LOAD_EXECUTABLE_SYMBOL}` returned a null module"),
            });
        }

        Ok(Box::new(NativeVm {
            handle,
            get_function,
            free,
            module: self.module_name(),
            _library: Arc::clone(&self.library),
        }))
    }
}

/// VM module handle returned by `vm_load_executable`.
struct NativeVm {
    handle: *mut c_void,
    get_function: GetFunctionFn,
    free: Option<FreeModuleFn>,
    module: String,
    // Keeps the code behind the function pointers mapped.
    _library: Arc<Library>,
}

impl NativeVm {
    fn lookup(&self, name: &str) -> Option<*mut c_void> {
        let name = CString::new(name).ok()?;
        // SAFETY: handle is live until drop; name is NUL-terminated.
        let ptr = unsafe { (self.get_function)(self.handle, name.as_ptr()) };
        (!ptr.is_null()).then_some(ptr)
    }
}

impl VirtualMachine for NativeVm {
    fn initialize(&mut self, params: &VmInitParams) -> Result<()> {
        let ptr = self
            .lookup(INITIALIZATION_SYMBOL)
            .ok_or_else(|| RuntimeError::missing_entry(INITIALIZATION_SYMBOL, &self.module))?;

        // SAFETY: vm_initialization has the InitializationFn signature by contract.
        unsafe {
            let init = std::mem::transmute::<*mut c_void, InitializationFn>(ptr);
            init(
                self.handle,
                params.device.kind as c_int,
                params.device.index,
                params.allocator as c_int,
                params.host_device.kind as c_int,
                params.host_device.index,
                params.host_allocator as c_int,
            );
        }
        Ok(())
    }

    fn has_function(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn invoke(
        &mut self,
        name: &str,
        args: &[&DeviceTensor],
        output: &mut DeviceTensor,
    ) -> Result<()> {
        let ptr = self
            .lookup(name)
            .ok_or_else(|| RuntimeError::missing_entry(name, &self.module))?;

        let views: Vec<DLTensor> = args.iter().map(|t| t.dl_view()).collect();
        let mut out = output.dl_view_mut();

        // SAFETY: views borrow tensors that outlive this call; entry functions
        // have the EntryFn signature by contract.
        let status = unsafe {
            let entry = std::mem::transmute::<*mut c_void, EntryFn>(ptr);
            entry(self.handle, views.as_ptr(), views.len() as c_int, &mut out)
        };

        if status != 0 {
            return Err(RuntimeError::InvocationError(format!(
                "`{name}` returned status {status}"
            )));
        }
        Ok(())
    }
}

impl Drop for NativeVm {
    fn drop(&mut self) {
        if let Some(free) = self.free {
            // SAFETY: handle came from vm_load_executable and is freed once.
            unsafe { free(self.handle) };
        }
    }
}
