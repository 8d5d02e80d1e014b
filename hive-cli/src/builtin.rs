//! Extensions compiled into the hive binary

use hive_core::RegisterFn;
use hive_extension_api::{API_VERSION, Describe, DescribeCapability, ExtensionRegistrar};
use std::sync::Arc;

/// Full name of the built-in host information type
pub const HOST_INFO: &str = "hive.HostInfo";

/// Describes the running host
pub struct HostInfo;

impl Describe for HostInfo {
    fn describe(&self) -> String {
        format!(
            "hive {} (extension API v{})",
            env!("CARGO_PKG_VERSION"),
            API_VERSION
        )
    }
}

fn register(registrar: &mut ExtensionRegistrar) {
    registrar.register::<DescribeCapability, _>(HOST_INFO, || Box::new(HostInfo));
}

/// Registration function handed to the package environment
pub fn registration() -> RegisterFn {
    Arc::new(register)
}
