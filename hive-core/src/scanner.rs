//! Type discovery

use hive_extension_api::{Capability, TypeDescriptor};

/// Keep the types of a module that can be instantiated as capability `C`.
///
/// Abstract types and types that don't provide `C` are ignored. Types that
/// provide `C` but have no parameterless constructor are excluded with a
/// warning.
pub fn scan_types<C: Capability>(
    module_name: &str,
    descriptors: Vec<TypeDescriptor>,
) -> Vec<TypeDescriptor> {
    descriptors
        .into_iter()
        .filter(|descriptor| !descriptor.is_abstract() && descriptor.satisfies(C::NAME))
        .filter(|descriptor| {
            let constructible = descriptor.has_default_constructor(C::NAME);
            if !constructible {
                tracing::warn!(
                    module = %module_name,
                    type_name = %descriptor.full_name(),
                    capability = C::NAME,
                    "Type has no parameterless constructor, skipping"
                );
            }
            constructible
        })
        .collect()
}
