// Public modules
pub mod model;
pub mod stream_chunk;
pub mod turn;

// Re-exports
pub use model::{KnownModel, Model};
pub use stream_chunk::StreamChunk;
pub use turn::{Role, Turn};
