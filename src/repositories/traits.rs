//! Common repository traits
//!
//! Interfacce generiche per le operazioni di database condivise dai
//! repository.

/// Trait for creating new entities in the database
///
/// # Type Parameters
/// * `Entity` - Type of the returned entity (with ID assigned by the database)
/// * `CreateDTO` - DTO for creation (without ID)
pub trait Create<Entity, CreateDTO> {
    /// Creates a new entity and returns it with the assigned ID.
    async fn create(&self, data: &CreateDTO) -> Result<Entity, sqlx::Error>;
}

/// Trait for reading a single entity by primary key
///
/// # Type Parameters
/// * `Entity` - Type of the entity to read
/// * `Id` - Type of the primary key
pub trait Read<Entity, Id> {
    /// Reads an entity by primary key; `Ok(None)` when absent.
    async fn read(&self, id: &Id) -> Result<Option<Entity>, sqlx::Error>;
}
