mod blend;
mod format;
mod geocoding;
mod geometry;
mod id;
mod layer;
mod order;
mod registry;
mod sources;
mod surface;
mod view;
mod viewer;
mod visibility;

#[cfg(feature = "egui")]
mod ui;

pub use blend::*;
pub use format::*;
pub use geocoding::*;
pub use geometry::*;
pub use id::*;
pub use layer::*;
pub use order::*;
pub use registry::*;
pub use sources::*;
pub use surface::*;
#[cfg(feature = "egui")]
pub use ui::*;
pub use view::*;
pub use viewer::*;
pub use visibility::*;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
