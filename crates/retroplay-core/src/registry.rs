//! Session registry
//!
//! Maps installed game clients to the content they can open. The registry
//! is an explicitly constructed service object owned by the host; there is
//! no process-global instance. Discovery and installation of clients is an
//! external concern; callers register a factory per client id together with
//! the file extensions it supports.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;

use crate::session::GameSession;

/// Constructor for a client's sessions.
pub type SessionFactory = Box<dyn Fn() -> Box<dyn GameSession> + Send + Sync>;

struct ClientEntry {
    extensions: BTreeSet<String>,
    factory: SessionFactory,
}

/// Registry of installed game clients, keyed by client id.
#[derive(Default)]
pub struct SessionRegistry {
    clients: Mutex<BTreeMap<String, ClientEntry>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client.
    ///
    /// `extensions` are matched case-insensitively, with or without a
    /// leading dot. Registering an id twice keeps the first registration
    /// and returns true, mirroring an already-registered client.
    pub fn register_client(&self, id: &str, extensions: &[&str], factory: SessionFactory) -> bool {
        if id.is_empty() {
            return false;
        }

        let mut clients = self.clients.lock();
        if clients.contains_key(id) {
            return true;
        }

        let extensions = extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .collect();
        clients.insert(
            id.to_string(),
            ClientEntry {
                extensions,
                factory,
            },
        );
        log::debug!("Registered game client {id}");
        true
    }

    /// Remove a client by id.
    pub fn unregister_client(&self, id: &str) {
        self.clients.lock().remove(id);
    }

    /// Create a new session for `id`.
    #[must_use]
    pub fn create(&self, id: &str) -> Option<Box<dyn GameSession>> {
        let clients = self.clients.lock();
        clients.get(id).map(|entry| (entry.factory)())
    }

    /// Ids of the clients able to open `path`, in id order.
    ///
    /// When `requested` names a client, only that client is considered; an
    /// unknown requested client yields no candidates.
    #[must_use]
    pub fn candidates(&self, path: &str, requested: Option<&str>) -> Vec<String> {
        let Some(extension) = extension_of(path) else {
            return Vec::new();
        };

        let clients = self.clients.lock();
        let mut candidates = Vec::new();

        for (id, entry) in clients.iter() {
            if let Some(requested) = requested {
                if requested != id {
                    continue;
                }
            }

            if entry.extensions.contains(&extension) {
                candidates.push(id.clone());
            }

            if requested.is_some() {
                break;
            }
        }

        candidates
    }

    /// All file extensions any registered client supports, plus the archive
    /// extensions content commonly ships in.
    #[must_use]
    pub fn extensions(&self) -> BTreeSet<String> {
        let mut extensions: BTreeSet<String> =
            [".zip".to_string(), ".rar".to_string()].into_iter().collect();

        let clients = self.clients.lock();
        for entry in clients.values() {
            extensions.extend(entry.extensions.iter().cloned());
        }
        extensions
    }

    /// Whether `path` looks like game content by extension.
    #[must_use]
    pub fn is_game(&self, path: &str) -> bool {
        match extension_of(path) {
            Some(extension) => self.extensions().contains(&extension),
            None => false,
        }
    }
}

fn normalize_extension(extension: &str) -> String {
    let extension = extension.to_ascii_lowercase();
    if extension.starts_with('.') {
        extension
    } else {
        format!(".{extension}")
    }
}

fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit(['/', '\\']).next()?;
    let dot = name.rfind('.')?;
    if dot == 0 || dot + 1 == name.len() {
        return None;
    }
    Some(name[dot..].to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{AvSink, GameSession};
    use crate::Result;

    struct DummySession;

    impl GameSession for DummySession {
        fn open(&mut self, _path: &str) -> Result<()> {
            Ok(())
        }

        fn close(&mut self) {}

        fn run_frame(&mut self, _av: &mut dyn AvSink) {}

        fn frame_rate(&self) -> f64 {
            60.0
        }
    }

    fn factory() -> SessionFactory {
        Box::new(|| Box::new(DummySession))
    }

    #[test]
    fn test_register_and_create() {
        let registry = SessionRegistry::new();
        assert!(registry.register_client("emu.nes", &["nes"], factory()));
        assert!(registry.create("emu.nes").is_some());
        assert!(registry.create("emu.snes").is_none());
    }

    #[test]
    fn test_duplicate_registration_is_kept_once() {
        let registry = SessionRegistry::new();
        assert!(registry.register_client("emu.nes", &["nes"], factory()));
        assert!(registry.register_client("emu.nes", &["sfc"], factory()));

        // The first registration wins
        assert_eq!(registry.candidates("game.sfc", None), Vec::<String>::new());
        assert_eq!(registry.candidates("game.nes", None), vec!["emu.nes"]);
    }

    #[test]
    fn test_candidates_match_extension_case_insensitively() {
        let registry = SessionRegistry::new();
        registry.register_client("emu.nes", &[".nes"], factory());
        registry.register_client("emu.gb", &["gb"], factory());

        assert_eq!(registry.candidates("roms/Game.NES", None), vec!["emu.nes"]);
        assert!(registry.candidates("notes.txt", None).is_empty());
        assert!(registry.candidates("no_extension", None).is_empty());
    }

    #[test]
    fn test_requested_client_restricts_candidates() {
        let registry = SessionRegistry::new();
        registry.register_client("emu.a", &["rom"], factory());
        registry.register_client("emu.b", &["rom"], factory());

        assert_eq!(registry.candidates("game.rom", None), vec!["emu.a", "emu.b"]);
        assert_eq!(
            registry.candidates("game.rom", Some("emu.b")),
            vec!["emu.b"]
        );
        assert!(registry.candidates("game.rom", Some("emu.c")).is_empty());
    }

    #[test]
    fn test_is_game_includes_archives() {
        let registry = SessionRegistry::new();
        registry.register_client("emu.nes", &["nes"], factory());

        assert!(registry.is_game("pack.zip"));
        assert!(registry.is_game("game.nes"));
        assert!(!registry.is_game("readme.md"));
    }

    #[test]
    fn test_unregister_removes_client() {
        let registry = SessionRegistry::new();
        registry.register_client("emu.nes", &["nes"], factory());
        registry.unregister_client("emu.nes");

        assert!(registry.create("emu.nes").is_none());
        assert!(registry.candidates("game.nes", None).is_empty());
    }
}
