//! Registry implementation
//!
//! Connections are kept in a vector in insertion order. Ids come from a
//! strictly increasing counter, so the vector is also sorted by id and
//! lookups are a binary search.

use super::entry::{Connection, ConnectionId};
use super::error::RegistryError;

/// Position of an in-progress walk over the registry
///
/// Obtained from [`Registry::cursor`] and advanced with
/// [`Registry::advance`]. Removals made through [`Registry::remove_at`] keep
/// it pointing at the next unvisited connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    next: usize,
}

/// Ordered, bounded set of live connections
pub struct Registry<W> {
    connections: Vec<Connection<W>>,
    max_connections: usize,
    next_id: u64,
}

impl<W> Registry<W> {
    /// Create an empty registry holding at most `max_connections` entries
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: Vec::new(),
            max_connections,
            next_id: 1,
        }
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check if no connection is registered
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Check if the connection limit is reached
    pub fn is_full(&self) -> bool {
        self.connections.len() >= self.max_connections
    }

    /// Maximum number of connections
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Register a connection at the tail
    ///
    /// When the registry is full the writer is dropped, which closes it, and
    /// existing connections are left untouched. Ids are only consumed by
    /// successful registrations.
    pub fn insert(
        &mut self,
        peer_ip: impl Into<String>,
        writer: W,
    ) -> Result<ConnectionId, RegistryError> {
        self.insert_with(peer_ip, |_| writer)
    }

    /// Register a connection whose writer is built from its id
    ///
    /// `make_writer` only runs when there is room for the connection.
    pub fn insert_with<F>(
        &mut self,
        peer_ip: impl Into<String>,
        make_writer: F,
    ) -> Result<ConnectionId, RegistryError>
    where
        F: FnOnce(ConnectionId) -> W,
    {
        if self.is_full() {
            return Err(RegistryError::Full(self.max_connections));
        }

        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;
        self.connections
            .push(Connection::new(id, peer_ip.into(), make_writer(id)));

        Ok(id)
    }

    /// Look up a connection
    pub fn get(&self, id: ConnectionId) -> Option<&Connection<W>> {
        self.position(id).map(|index| &self.connections[index])
    }

    /// Look up a connection mutably
    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection<W>> {
        match self.position(id) {
            Some(index) => Some(&mut self.connections[index]),
            None => None,
        }
    }

    /// Check if a connection is registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.position(id).is_some()
    }

    /// Unregister a connection and hand it back
    ///
    /// Dropping the returned entry closes the connection.
    pub fn remove(&mut self, id: ConnectionId) -> Result<Connection<W>, RegistryError> {
        let index = self.position(id).ok_or(RegistryError::NotFound(id))?;
        Ok(self.connections.remove(index))
    }

    /// Start a walk at the head of the registry
    pub fn cursor(&self) -> Cursor {
        Cursor::default()
    }

    /// Return the next connection of a walk
    pub fn advance(&mut self, cursor: &mut Cursor) -> Option<&mut Connection<W>> {
        let conn = self.connections.get_mut(cursor.next)?;
        cursor.next += 1;
        Some(conn)
    }

    /// Unregister a connection during a walk
    ///
    /// Works for the connection just returned by [`Registry::advance`] as
    /// well as any other one; the cursor is adjusted so the walk continues
    /// with the same next connection it would have visited.
    pub fn remove_at(
        &mut self,
        cursor: &mut Cursor,
        id: ConnectionId,
    ) -> Result<Connection<W>, RegistryError> {
        let index = self.position(id).ok_or(RegistryError::NotFound(id))?;
        if index < cursor.next {
            cursor.next -= 1;
        }
        Ok(self.connections.remove(index))
    }

    /// Ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.iter().map(|c| c.id)
    }

    /// Connections in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Connection<W>> {
        self.connections.iter()
    }

    /// Close every connection, returning how many were closed
    pub fn clear(&mut self) -> usize {
        let count = self.connections.len();
        self.connections.clear();
        count
    }

    fn position(&self, id: ConnectionId) -> Option<usize> {
        self.connections.binary_search_by_key(&id, |c| c.id).ok()
    }
}

impl<W> std::fmt::Debug for Registry<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("connections", &self.connections)
            .field("max_connections", &self.max_connections)
            .field("next_id", &self.next_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids<W>(registry: &Registry<W>) -> Vec<u64> {
        registry.ids().map(|id| id.get()).collect()
    }

    fn registry_with(count: usize) -> Registry<()> {
        let mut registry = Registry::new(16);
        for _ in 0..count {
            registry.insert("127.0.0.1", ()).unwrap();
        }
        registry
    }

    #[test]
    fn test_ids_increase_and_are_not_reused() {
        let mut registry = registry_with(3);
        assert_eq!(ids(&registry), vec![1, 2, 3]);

        registry.remove(ConnectionId::new(3)).unwrap();
        let id = registry.insert("127.0.0.1", ()).unwrap();

        assert_eq!(id.get(), 4);
        assert_eq!(ids(&registry), vec![1, 2, 4]);
    }

    #[test]
    fn test_insert_when_full_rejected() {
        let mut registry = Registry::new(2);
        registry.insert("10.0.0.1", ()).unwrap();
        registry.insert("10.0.0.2", ()).unwrap();

        let result = registry.insert("10.0.0.3", ());
        assert_eq!(result, Err(RegistryError::Full(2)));
        assert_eq!(registry.len(), 2);
        assert_eq!(ids(&registry), vec![1, 2]);

        // A rejected connection does not consume an id.
        registry.remove(ConnectionId::new(1)).unwrap();
        assert_eq!(registry.insert("10.0.0.3", ()).unwrap().get(), 3);
    }

    #[test]
    fn test_insert_with_builds_writer_only_when_admitted() {
        let mut registry = Registry::new(1);

        let id = registry.insert_with("10.0.0.1", |id| id.get()).unwrap();
        assert_eq!(registry.get(id).unwrap().writer, 1);

        let mut called = false;
        let result = registry.insert_with("10.0.0.1", |id| {
            called = true;
            id.get()
        });
        assert_eq!(result, Err(RegistryError::Full(1)));
        assert!(!called);
    }

    #[test]
    fn test_records_peer_address() {
        let mut registry = Registry::new(4);
        let id = registry.insert("192.168.1.20", ()).unwrap();

        assert_eq!(registry.get(id).unwrap().peer_ip, "192.168.1.20");
    }

    #[test]
    fn test_remove_missing_reports_failure() {
        let mut registry = registry_with(2);

        assert_eq!(
            registry.remove(ConnectionId::new(9)).unwrap_err(),
            RegistryError::NotFound(ConnectionId::new(9))
        );

        registry.remove(ConnectionId::new(1)).unwrap();
        assert!(registry.remove(ConnectionId::new(1)).is_err());
        assert_eq!(ids(&registry), vec![2]);
    }

    #[test]
    fn test_remove_head_middle_tail() {
        let mut registry = registry_with(5);

        registry.remove(ConnectionId::new(1)).unwrap();
        registry.remove(ConnectionId::new(3)).unwrap();
        registry.remove(ConnectionId::new(5)).unwrap();

        assert_eq!(ids(&registry), vec![2, 4]);
        assert!(registry.contains(ConnectionId::new(2)));
        assert!(!registry.contains(ConnectionId::new(3)));
    }

    #[test]
    fn test_remove_current_during_walk() {
        let mut registry = registry_with(4);
        let mut cursor = registry.cursor();
        let mut visited = Vec::new();

        while let Some(conn) = registry.advance(&mut cursor) {
            let id = conn.id;
            visited.push(id.get());
            if id.get() % 2 == 0 {
                registry.remove_at(&mut cursor, id).unwrap();
            }
        }

        assert_eq!(visited, vec![1, 2, 3, 4]);
        assert_eq!(ids(&registry), vec![1, 3]);
    }

    #[test]
    fn test_remove_other_entries_during_walk() {
        let mut registry = registry_with(5);
        let mut cursor = registry.cursor();
        let mut visited = Vec::new();

        while let Some(conn) = registry.advance(&mut cursor) {
            let id = conn.id;
            visited.push(id.get());
            if id.get() == 3 {
                // One already visited, one not yet visited.
                registry.remove_at(&mut cursor, ConnectionId::new(1)).unwrap();
                registry.remove_at(&mut cursor, ConnectionId::new(4)).unwrap();
            }
        }

        assert_eq!(visited, vec![1, 2, 3, 5]);
        assert_eq!(ids(&registry), vec![2, 3, 5]);
    }

    #[test]
    fn test_remove_every_entry_during_walk() {
        let mut registry = registry_with(3);
        let mut cursor = registry.cursor();
        let mut visited = Vec::new();

        while let Some(conn) = registry.advance(&mut cursor) {
            let id = conn.id;
            visited.push(id.get());
            registry.remove_at(&mut cursor, id).unwrap();
        }

        assert_eq!(visited, vec![1, 2, 3]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clear_counts_closed() {
        let mut registry = registry_with(3);

        assert_eq!(registry.clear(), 3);
        assert!(registry.is_empty());
        assert_eq!(registry.insert("127.0.0.1", ()).unwrap().get(), 4);
    }
}
