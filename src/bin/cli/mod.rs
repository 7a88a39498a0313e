pub mod args;
pub mod printer;
pub mod transport;

// Re-export commonly used types/functions for convenience
pub use args::*;
pub use printer::*;
pub use transport::*;
