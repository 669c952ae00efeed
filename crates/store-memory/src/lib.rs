mod adaptor;
mod entity;
mod managed;
mod mapping;
mod session;
mod store;

pub use adaptor::MemoryAdaptor;
pub use entity::Entity;
pub use managed::Managed;
pub use mapping::EntityMapping;
pub use session::MemorySession;
pub use store::MemoryStore;
