//! Bounding-box annotation on images: a canvas widget that turns pointer drags
//! into rectangles in image pixel space, and a small desktop host around it.

pub mod app;
pub mod canvas;
pub mod config;
pub mod geometry;
pub mod gesture;
pub mod loader;
pub mod model;
pub mod store;
pub mod surface;

pub use canvas::{AnnotationCanvas, CanvasEvent};
pub use model::{Annotation, BoxRect, Tag, ToolMode};
