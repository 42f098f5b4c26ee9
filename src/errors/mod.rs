pub mod facade_error;

pub use facade_error::FacadeError;
