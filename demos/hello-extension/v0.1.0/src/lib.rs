//! Sample extension: two `Describe` types and one declared-only type

use hive_extension_api::{Describe, DescribeCapability, ExtensionRegistrar, export_extensions};

pub struct Hello;

impl Describe for Hello {
    fn describe(&self) -> String {
        format!("Hello from hello-extension {}", env!("CARGO_PKG_VERSION"))
    }
}

pub struct Counter {
    start: u32,
}

impl Describe for Counter {
    fn describe(&self) -> String {
        let counted: Vec<String> = (self.start..self.start + 3).map(|n| n.to_string()).collect();
        format!("Counting: {}", counted.join(", "))
    }
}

fn register(registrar: &mut ExtensionRegistrar) {
    registrar
        .register::<DescribeCapability, _>("hello.Hello", || Box::new(Hello))
        .register::<DescribeCapability, _>("hello.Counter", || Box::new(Counter { start: 1 }))
        // Discovered but skipped: no constructor
        .declare::<DescribeCapability>("hello.Template");
}

export_extensions!(register);
