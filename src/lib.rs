pub mod configs;
pub mod console;
pub mod item;
pub mod library;

pub use item::{Book, User};
pub use library::{Library, LibraryError, LoanPolicy};
