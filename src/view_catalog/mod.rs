pub mod config;
pub mod errors;
pub mod view_map;
pub mod view_path;
pub mod view_tree;


// Re-export commonly used types
pub use config::{EndpointDefinition, ViewConfigDocument, ViewDefinition, ViewRef};
pub use errors::ViewSpecError;
pub use view_map::{ViewMap, ViewSource, ViewStore};
pub use view_path::{ViewPath, DEFAULT_ROOT_VARIABLE};
pub use view_tree::{PathLookup, PropertyEntry, ViewTree};
