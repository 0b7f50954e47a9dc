//! Faces of a simulated forwarder.
//!
//! A face is whatever a forwarder can exchange packets with: the local
//! application (`FaceId::APP`), an in-process producer, or one end of a
//! simulated connection to another node.

use ndn_sim_common::ndn::Name;
use ndn_sim_common::types::{FaceId, FaceKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::connection::LinkEnd;
use crate::producer::Producer;

/// Producer attached to a forwarder under a prefix
#[derive(Clone)]
pub(crate) struct ProducerFace {
    pub producer: Arc<dyn Producer>,
    pub prefix: Name,
    /// Cache Data from this producer even when forwarded Data is not cached
    pub cache: bool,
}

#[derive(Clone)]
pub(crate) enum FaceHandle {
    App,
    Producer(ProducerFace),
    Link(LinkEnd),
}

impl FaceHandle {
    pub fn kind(&self) -> FaceKind {
        match self {
            FaceHandle::App => FaceKind::App,
            FaceHandle::Producer(_) => FaceKind::Producer,
            FaceHandle::Link(_) => FaceKind::Link,
        }
    }
}

impl fmt::Debug for FaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaceHandle::App => write!(f, "App"),
            FaceHandle::Producer(p) => write!(f, "Producer({})", p.prefix),
            FaceHandle::Link(end) => write!(f, "Link({:?})", end),
        }
    }
}

/// Description of a face, as shown to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaceInfo {
    pub id: FaceId,
    pub kind: FaceKind,
    pub description: String,
}

/// Faces of one forwarder. The application face always exists.
#[derive(Debug)]
pub(crate) struct FaceTable {
    faces: BTreeMap<FaceId, FaceHandle>,
    next_id: u32,
}

impl FaceTable {
    pub fn new() -> Self {
        let mut faces = BTreeMap::new();
        faces.insert(FaceId::APP, FaceHandle::App);
        Self {
            faces,
            next_id: FaceId::APP.0 + 1,
        }
    }

    pub fn add(&mut self, handle: FaceHandle) -> FaceId {
        let id = FaceId(self.next_id);
        self.next_id += 1;
        self.faces.insert(id, handle);
        id
    }

    pub fn get(&self, face: FaceId) -> Option<&FaceHandle> {
        self.faces.get(&face)
    }

    pub fn contains(&self, face: FaceId) -> bool {
        self.faces.contains_key(&face)
    }

    /// Removes a face. The application face cannot be removed.
    pub fn remove(&mut self, face: FaceId) -> Option<FaceHandle> {
        if face == FaceId::APP {
            return None;
        }
        self.faces.remove(&face)
    }

    /// Removes every face except the application face.
    pub fn drain(&mut self) -> Vec<(FaceId, FaceHandle)> {
        let app = self.faces.remove(&FaceId::APP);
        let drained = std::mem::take(&mut self.faces).into_iter().collect();
        if let Some(app) = app {
            self.faces.insert(FaceId::APP, app);
        }
        drained
    }

    pub fn link_faces(&self) -> Vec<FaceId> {
        self.faces
            .iter()
            .filter(|(_, handle)| matches!(handle, FaceHandle::Link(_)))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn is_caching_producer(&self, face: FaceId) -> bool {
        matches!(self.faces.get(&face), Some(FaceHandle::Producer(p)) if p.cache)
    }

    pub fn info(&self) -> Vec<FaceInfo> {
        self.faces
            .iter()
            .map(|(id, handle)| FaceInfo {
                id: *id,
                kind: handle.kind(),
                description: match handle {
                    FaceHandle::App => "application".to_string(),
                    FaceHandle::Producer(p) => format!("producer for {}", p.prefix),
                    FaceHandle::Link(end) => {
                        format!("link to {} over {}", end.remote_node(), end.connection_id())
                    }
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::PingServer;

    fn producer(prefix: &str, cache: bool) -> FaceHandle {
        FaceHandle::Producer(ProducerFace {
            producer: Arc::new(PingServer),
            prefix: Name::from(prefix),
            cache,
        })
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut table = FaceTable::new();
        let a = table.add(producer("/a", false));
        assert_eq!(a, FaceId(1));
        assert!(table.remove(a).is_some());
        let b = table.add(producer("/b", true));
        assert_eq!(b, FaceId(2));
        assert!(table.is_caching_producer(b));
        assert!(!table.contains(a));
    }

    #[test]
    fn test_app_face_is_permanent() {
        let mut table = FaceTable::new();
        table.add(producer("/a", false));
        assert!(table.remove(FaceId::APP).is_none());

        let drained = table.drain();
        assert_eq!(drained.len(), 1);
        assert!(table.contains(FaceId::APP));
        assert_eq!(table.info()[0].kind, FaceKind::App);
        assert!(table.link_faces().is_empty());
    }
}
