//! Configuration loading and shared handle tests

#[cfg(test)]
mod tests {
    use faction_claims::{
        config, BoundedArea, Column, FactionType, Footprint, MemoryPersistence, OptimizationMode,
        Persistence, RegistryConfig, SharedRegistry, UserId,
    };
    use std::sync::{Arc, Mutex};

    // `config::load` reads the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // -----------------------------------------------------------------------
    // Config
    // -----------------------------------------------------------------------

    #[test]
    fn defaults_without_sources() {
        let _guard = ENV_LOCK.lock().unwrap();
        let cfg = config::load(None).unwrap();
        assert_eq!(cfg.optimization, OptimizationMode::Process);
        assert!(cfg.claim_owners);
        assert_eq!(cfg.cell_size, 16);
        assert_eq!(cfg.creation_cost, 0.0);
    }

    #[test]
    fn file_then_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claims.toml");
        std::fs::write(
            &path,
            "optimization = \"MEMORY\"\ncreation_cost = 250\ncell_size = 8\n",
        )
        .unwrap();

        let cfg = config::load(Some(&path)).unwrap();
        assert_eq!(cfg.optimization, OptimizationMode::Memory);
        assert_eq!(cfg.creation_cost, 250.0);
        assert_eq!(cfg.cell_size, 8);
        assert!(cfg.claim_owners);

        std::env::set_var("CLAIMS_CELL_SIZE", "32");
        std::env::set_var("CLAIMS_CLAIM_OWNERS", "false");
        let cfg = config::load(Some(&path));
        std::env::remove_var("CLAIMS_CELL_SIZE");
        std::env::remove_var("CLAIMS_CLAIM_OWNERS");

        let cfg = cfg.unwrap();
        assert_eq!(cfg.cell_size, 32);
        assert!(!cfg.claim_owners);
        assert_eq!(cfg.optimization, OptimizationMode::Memory);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claims.toml");
        std::fs::write(&path, "optimization = \"turbo\"\n").unwrap();
        assert!(config::load(Some(&path)).is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        assert!(config::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    // -----------------------------------------------------------------------
    // SharedRegistry
    // -----------------------------------------------------------------------

    #[test]
    fn shared_readers_see_committed_writes() {
        let store = Arc::new(MemoryPersistence::new());
        let shared =
            SharedRegistry::load(RegistryConfig::default(), store as Arc<dyn Persistence>)
                .unwrap();

        {
            let mut reg = shared.write();
            let id = reg
                .create_faction(UserId::new("a"), "Alpha", FactionType::Normal)
                .unwrap()
                .faction
                .id();
            reg.claim(id, Footprint::rect(&BoundedArea::new("world1", 0, 0, 15, 15)))
                .unwrap();
        }

        let readers: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    let owner = shared.owner_of(&Column::new("world1", i, i));
                    owner.name().to_string()
                })
            })
            .collect();
        for r in readers {
            assert_eq!(r.join().unwrap(), "Alpha");
        }

        let area = BoundedArea::new("world1", 10, 10, 40, 40);
        assert_eq!(shared.factions_in(&area).len(), 1);
        assert_eq!(shared.stats().claims, 1);
        assert_eq!(shared.read().by_name("alpha").unwrap().name(), "Alpha");
    }
}
