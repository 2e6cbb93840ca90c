pub use json::JsonFileRepository;
pub use memory::MemoryRepository;

mod entity;
mod json;
mod memory;
