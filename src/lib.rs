pub mod build;
pub mod cache;
pub mod config;
pub mod emit;
pub mod error;
pub mod libclang;
pub mod parser;
pub mod paths;
pub mod analyzer {
    pub mod extract;
    pub mod forward;
    pub mod metadata;
    pub mod qualify;
}

// Re-export selected API for consumers
pub use build::{generate, get_output_files, run_batch, BatchRegen, Build, SingleFile};
pub use config::{CodegenConfig, CompileEnvironment};
pub use error::CodegenError;
pub use parser::{NodeKind, ParserAdapter, SyntaxNode, SyntaxTree};
