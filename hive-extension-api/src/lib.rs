//! hive-extension-api - Extension API for hive hosts
//!
//! This crate provides what extension authors need to ship code a hive host
//! can restore, load, discover and unload at runtime. Extensions are native
//! dynamic libraries that register their types, each tagged with the
//! capabilities it provides, into an [`ExtensionRegistrar`].
//!
//! # Example
//!
//! ```ignore
//! use hive_extension_api::{Describe, DescribeCapability, ExtensionRegistrar, export_extensions};
//!
//! #[derive(Default)]
//! pub struct Hello;
//!
//! impl Describe for Hello {
//!     fn describe(&self) -> String {
//!         "Hello from an extension".to_string()
//!     }
//! }
//!
//! fn register(registrar: &mut ExtensionRegistrar) {
//!     registrar.register::<DescribeCapability, _>("hello.Hello", || Box::new(Hello));
//! }
//!
//! export_extensions!(register);
//! ```

pub mod error;
pub mod manifest;
pub mod registrar;

pub use error::ExtensionError;
pub use manifest::{ArtifactManifest, MANIFEST_SUFFIX, library_file_name};
pub use registrar::{
    Constructor, ErasedInstance, ExtensionRegistrar, Implementation, TypeDescriptor, TypeKind,
};

/// Current extension API version. Extensions must match this exactly.
pub const API_VERSION: u32 = 2;

/// Symbol exporting the API version of an extension library
pub const API_VERSION_SYMBOL: &[u8] = b"_hive_extension_api_version";

/// Symbol exporting the registration entry point of an extension library
pub const REGISTER_SYMBOL: &[u8] = b"_hive_extension_register";

/// Registration status: the registrar was filled
pub const REGISTER_OK: i32 = 0;
/// Registration status: the host passed a null registrar
pub const REGISTER_NULL: i32 = 1;
/// Registration status: the extension's registration function panicked
pub const REGISTER_PANICKED: i32 = 2;

/// A contract extension types can satisfy.
///
/// A capability pairs a stable name, used to tag registrations across the
/// library boundary, with the trait object hosts receive when they
/// instantiate a matching type.
pub trait Capability: 'static {
    /// Stable capability name, e.g. `hive.describe`.
    ///
    /// Instances are matched to capabilities by this name alone, so two
    /// capabilities sharing a name must share their `Instance` type.
    const NAME: &'static str;

    /// The object handed out for instances, usually `dyn SomeTrait`
    type Instance: ?Sized + 'static;
}

/// General-purpose capability: anything that can describe itself.
///
/// The `hive` CLI discovers and instantiates extensions through this
/// capability.
pub trait Describe: Send {
    fn describe(&self) -> String;
}

/// [`Capability`] marker for [`Describe`]
pub struct DescribeCapability;

impl Capability for DescribeCapability {
    const NAME: &'static str = "hive.describe";
    type Instance = dyn Describe;
}

/// Export a registration function for dynamic loading.
///
/// This macro generates the C ABI entry points hive uses to load extensions.
///
/// # Usage
///
/// ```ignore
/// fn register(registrar: &mut hive_extension_api::ExtensionRegistrar) { /* ... */ }
///
/// hive_extension_api::export_extensions!(register);
/// ```
///
/// # Generated Functions
///
/// - `_hive_extension_api_version()`: Returns the API version
/// - `_hive_extension_register()`: Fills the host's registrar and returns a
///   `REGISTER_*` status
#[macro_export]
macro_rules! export_extensions {
    ($register:path) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _hive_extension_api_version() -> u32 {
            $crate::API_VERSION
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _hive_extension_register(
            registrar: *mut $crate::ExtensionRegistrar,
        ) -> i32 {
            // SAFETY: the host passes a valid, exclusive pointer for the duration of the call.
            unsafe { $crate::register_entry(registrar, $register) }
        }
    };
}

/// Body of the generated `_hive_extension_register`.
///
/// A panic in `register` is caught here, inside the extension, and reported
/// as [`REGISTER_PANICKED`].
///
/// # Safety
///
/// `registrar` must be null or valid for exclusive access during the call.
#[doc(hidden)]
pub unsafe fn register_entry(
    registrar: *mut ExtensionRegistrar,
    register: fn(&mut ExtensionRegistrar),
) -> i32 {
    // SAFETY: guaranteed by the caller.
    let Some(registrar) = (unsafe { registrar.as_mut() }) else {
        return REGISTER_NULL;
    };

    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| register(registrar))) {
        Ok(()) => REGISTER_OK,
        Err(_) => REGISTER_PANICKED,
    }
}
