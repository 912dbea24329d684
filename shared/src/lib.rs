pub mod annotations;
pub mod boxzoom;
pub mod collection;
pub mod coords;
pub mod listing;
pub mod query;
pub mod registry;
pub mod rich_text;
pub mod snapshot;
pub mod view_state;
pub mod viewer;

pub use annotations::{LabelMode, Marker, OverlayKind, SurfaceOverlays};
pub use collection::Annotations;
pub use coords::*;
pub use listing::*;
pub use registry::{SurfaceEntry, SurfaceRegistry, TileLayerDescriptor};
pub use snapshot::*;
pub use view_state::ViewState;
pub use viewer::{MapWidget, UrlStore, ViewerConfig, ViewerContext, ViewerNotice, ViewerStyle};
