pub mod probe;

pub use probe::{expand_java_template, probe_java, JavaInstallation};
