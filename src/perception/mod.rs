pub mod debug;
pub mod layout;
pub mod ocr;
pub mod screenshot;
pub mod traits;
pub mod types;
