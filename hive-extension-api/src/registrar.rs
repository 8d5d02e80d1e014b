//! Explicit type registration
//!
//! Extensions describe the types they export by filling an
//! [`ExtensionRegistrar`] when the host asks them to. Every registered type
//! is tagged with the capabilities it provides, so discovery on the host side
//! is a plain filter over [`TypeDescriptor`]s.

use std::fmt;
use std::mem::ManuallyDrop;
use std::panic::AssertUnwindSafe;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::{Capability, ExtensionError};

/// Type-erased parameterless constructor.
///
/// The returned [`ErasedInstance`] always holds a `Box<C::Instance>` for the
/// capability the constructor was registered under.
pub type Constructor = Arc<dyn Fn() -> Result<ErasedInstance, ExtensionError> + Send + Sync>;

/// A freshly built `Box<C::Instance>` known only by its capability name.
///
/// `TypeId`s are not stable between separately compiled libraries, so
/// instances cross the library boundary as a raw pointer together with the
/// drop function of the crate that built them.
pub struct ErasedInstance {
    raw: NonNull<()>,
    drop_fn: unsafe fn(NonNull<()>),
}

impl ErasedInstance {
    fn new<C: Capability>(instance: Box<C::Instance>) -> Self {
        let outer: Box<Box<C::Instance>> = Box::new(instance);
        Self {
            raw: NonNull::from(Box::leak(outer)).cast(),
            drop_fn: drop_erased::<C>,
        }
    }

    /// # Safety
    ///
    /// `self` must have been built by `new::<D>` for a capability `D` whose
    /// instance type is `C::Instance`.
    unsafe fn into_instance<C: Capability>(self) -> Box<C::Instance> {
        let this = ManuallyDrop::new(self);
        // SAFETY: per the contract above the pointer came from `Box::leak`
        // of a `Box<Box<C::Instance>>`.
        let outer = unsafe { Box::from_raw(this.raw.cast::<Box<C::Instance>>().as_ptr()) };
        *outer
    }
}

impl Drop for ErasedInstance {
    fn drop(&mut self) {
        // SAFETY: `drop_fn` was monomorphized for the type behind `raw`.
        unsafe { (self.drop_fn)(self.raw) }
    }
}

impl fmt::Debug for ErasedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedInstance").finish_non_exhaustive()
    }
}

unsafe fn drop_erased<C: Capability>(raw: NonNull<()>) {
    // SAFETY: only installed by `ErasedInstance::new::<C>`.
    drop(unsafe { Box::from_raw(raw.cast::<Box<C::Instance>>().as_ptr()) });
}

/// Whether a registered type can be instantiated at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A concrete type
    Concrete,
    /// A base type that only exists to be specialized
    Abstract,
}

/// One capability implemented by a type
#[derive(Clone)]
pub struct Implementation {
    capability: String,
    constructor: Option<Constructor>,
}

impl Implementation {
    /// Name of the implemented capability
    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// Whether the type can be built without arguments for this capability
    pub fn has_default_constructor(&self) -> bool {
        self.constructor.is_some()
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("capability", &self.capability)
            .field("has_default_constructor", &self.has_default_constructor())
            .finish()
    }
}

/// Description of a type exported by an extension
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    full_name: String,
    kind: TypeKind,
    implementations: Vec<Implementation>,
}

impl TypeDescriptor {
    fn new(full_name: String, kind: TypeKind) -> Self {
        Self {
            full_name,
            kind,
            implementations: Vec::new(),
        }
    }

    /// Fully-qualified type name, e.g. `hello.Greeter`
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_abstract(&self) -> bool {
        self.kind == TypeKind::Abstract
    }

    /// All capabilities this type was registered with
    pub fn implementations(&self) -> &[Implementation] {
        &self.implementations
    }

    /// Check whether this type provides the named capability
    pub fn satisfies(&self, capability: &str) -> bool {
        self.implementation(capability).is_some()
    }

    /// Check whether this type can be built without arguments as `capability`
    pub fn has_default_constructor(&self, capability: &str) -> bool {
        self.implementation(capability)
            .is_some_and(Implementation::has_default_constructor)
    }

    /// Build a fresh instance through the parameterless constructor
    /// registered for capability `C`.
    pub fn construct<C: Capability>(&self) -> Result<Box<C::Instance>, ExtensionError> {
        let implementation =
            self.implementation(C::NAME)
                .ok_or_else(|| ExtensionError::CapabilityMismatch {
                    name: self.full_name.clone(),
                    capability: C::NAME.to_string(),
                })?;

        let constructor = implementation.constructor.as_ref().ok_or_else(|| {
            ExtensionError::NoDefaultConstructor {
                name: self.full_name.clone(),
            }
        })?;

        let erased = constructor()?;
        // SAFETY: the constructor was registered under `C::NAME`, and a
        // capability name identifies one instance type.
        Ok(unsafe { erased.into_instance::<C>() })
    }

    fn implementation(&self, capability: &str) -> Option<&Implementation> {
        self.implementations
            .iter()
            .find(|implementation| implementation.capability == capability)
    }
}

/// Collects the types an extension (or the host itself) exports.
///
/// # Example
///
/// ```
/// use hive_extension_api::{Describe, DescribeCapability, ExtensionRegistrar};
///
/// struct Hello;
///
/// impl Describe for Hello {
///     fn describe(&self) -> String {
///         "hello".to_string()
///     }
/// }
///
/// let mut registrar = ExtensionRegistrar::new();
/// registrar.register::<DescribeCapability, _>("demo.Hello", || Box::new(Hello));
/// assert_eq!(registrar.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ExtensionRegistrar {
    types: Vec<TypeDescriptor>,
}

impl ExtensionRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a concrete type providing capability `C` with a
    /// parameterless constructor.
    pub fn register<C, F>(&mut self, full_name: impl Into<String>, constructor: F) -> &mut Self
    where
        C: Capability,
        F: Fn() -> Box<C::Instance> + Send + Sync + 'static,
    {
        self.register_fallible::<C, _>(full_name, move || Ok(constructor()))
    }

    /// Register a concrete type whose constructor may fail.
    pub fn register_fallible<C, F>(
        &mut self,
        full_name: impl Into<String>,
        constructor: F,
    ) -> &mut Self
    where
        C: Capability,
        F: Fn() -> Result<Box<C::Instance>, ExtensionError> + Send + Sync + 'static,
    {
        let full_name = full_name.into();
        let name = full_name.clone();
        // Panics must not unwind out of an extension library
        let constructor: Constructor = Arc::new(move || {
            let instance = std::panic::catch_unwind(AssertUnwindSafe(|| constructor()))
                .map_err(|_| ExtensionError::Construction {
                    name: name.clone(),
                    reason: "constructor panicked".to_string(),
                })??;
            Ok(ErasedInstance::new::<C>(instance))
        });
        self.push(full_name, TypeKind::Concrete, C::NAME, Some(constructor))
    }

    /// Declare a concrete type that provides capability `C` but has no
    /// parameterless constructor. Hosts will skip it during discovery.
    pub fn declare<C: Capability>(&mut self, full_name: impl Into<String>) -> &mut Self {
        self.push(full_name.into(), TypeKind::Concrete, C::NAME, None)
    }

    /// Declare an abstract base type for capability `C`.
    pub fn declare_abstract<C: Capability>(&mut self, full_name: impl Into<String>) -> &mut Self {
        self.push(full_name.into(), TypeKind::Abstract, C::NAME, None)
    }

    pub fn types(&self) -> &[TypeDescriptor] {
        &self.types
    }

    pub fn into_types(self) -> Vec<TypeDescriptor> {
        self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn push(
        &mut self,
        full_name: String,
        kind: TypeKind,
        capability: &str,
        constructor: Option<Constructor>,
    ) -> &mut Self {
        let implementation = Implementation {
            capability: capability.to_string(),
            constructor,
        };

        // A second registration under the same name adds a capability
        match self.types.iter_mut().find(|t| t.full_name == full_name) {
            Some(existing) => {
                existing
                    .implementations
                    .retain(|i| i.capability != implementation.capability);
                existing.implementations.push(implementation);
                if kind == TypeKind::Abstract {
                    existing.kind = TypeKind::Abstract;
                }
            }
            None => {
                let mut descriptor = TypeDescriptor::new(full_name, kind);
                descriptor.implementations.push(implementation);
                self.types.push(descriptor);
            }
        }

        self
    }
}
