//! Power grid map core. Grid records become MapLibre sources and a layered
//! style; [`MapController`] drives a live map built from them.

pub mod colors;
pub mod compositor;
pub mod controller;
pub mod dataset;
pub mod error;
pub mod expression;
pub mod geometry;
pub mod interaction;
pub mod layers;
pub mod logos;
pub mod map;
pub mod popup;
pub mod sprite;
pub mod style;
pub mod transform;
pub mod util;
pub mod visibility;

pub use colors::{PlantSource, Theme, VoltageClass};
pub use compositor::{StyleOptions, compose_style};
pub use controller::{ControllerConfig, DisposeHandle, MapController, Mounted};
pub use dataset::GridDataset;
pub use error::{MapError, Result};
pub use map::{LngLat, MapSurface, StyleMap};
pub use popup::DetailView;
pub use transform::{GeometrySet, transform_dataset};
