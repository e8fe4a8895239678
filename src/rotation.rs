use std::collections::VecDeque;

/// Ordered candidate endpoints with round-robin rotation.
///
/// The head is always the endpoint the next connection attempt targets.
#[derive(Debug, Clone, Default)]
pub struct EndpointRing {
    endpoints: VecDeque<String>,
}

impl EndpointRing {
    /// Create a ring from an already-normalized endpoint list
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints: endpoints.into(),
        }
    }

    /// Endpoint targeted by the next connection attempt
    pub fn current(&self) -> Option<&str> {
        self.endpoints.front().map(String::as_str)
    }

    /// Move the head to the tail.
    ///
    /// Returns the new head. No-op on an empty ring.
    pub fn rotate(&mut self) -> Option<&str> {
        if !self.endpoints.is_empty() {
            self.endpoints.rotate_left(1);
        }
        self.current()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Snapshot of the current candidate order
    pub fn to_vec(&self) -> Vec<String> {
        self.endpoints.iter().cloned().collect()
    }
}
