pub mod color;
pub mod classification;
pub mod projection;
pub mod synthesis;

pub use color::*;
pub use classification::*;
pub use projection::*;
pub use synthesis::*;
