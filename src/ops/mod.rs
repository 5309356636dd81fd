pub mod canvas_ops;
pub mod fill;
pub mod scripting;
pub mod shapes;
pub mod stamp;
pub mod transform;
