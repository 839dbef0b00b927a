pub mod ast;
pub mod error;
pub mod interpreter;
pub mod language;
pub mod parser;
pub mod scanner;
pub mod services;

// Re-export error types for convenience
pub use error::{CompileError, Error, RuntimeError, ServiceError};
pub use language::{ProgramRequest, RunResult, run_program};
pub use services::ServiceRegistry;
