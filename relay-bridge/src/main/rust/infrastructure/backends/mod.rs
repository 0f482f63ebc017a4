mod console_backend;
mod line_backend;
mod memory_backend;

pub use console_backend::ConsoleBackend;
pub use line_backend::{LineBackend, LineTimeouts};
pub use memory_backend::MemoryBackend;
