pub mod installer;
pub mod loader;
pub mod manager;
pub mod manifest;
pub mod registry;

pub use installer::ModuleInstaller;
pub use loader::ModuleLoader;
pub use manager::ModuleManager;
pub use manifest::{ManifestClient, ModuleDescriptor, RemoteManifest};
pub use registry::{Availability, InstalledModule, ModuleRegistry};

/// Map a framework name from the web UI to the module implementing it
///
/// Unknown frameworks fall back to the YOLO module, matching what the UI
/// sends by default.
#[must_use]
pub fn module_id_for_framework(framework: &str) -> &'static str {
    match framework {
        "pytorch" => "pytorch_custom",
        "tensorflow" => "tensorflow_unet",
        _ => "ultralytics_yolo",
    }
}
