//! End-to-end: resolve, download, install, and query an atlas.

mod common;

use brainatlas::{AtlasLibrary, AtlasVersion, LibraryConfig, VersionPolicy};
use std::collections::HashSet;
use tempfile::TempDir;

fn library_against(server: &mockito::ServerGuard, cache_dir: &TempDir) -> AtlasLibrary {
    let config = LibraryConfig::new(cache_dir.path()).with_remote_url(server.url());
    AtlasLibrary::new(config)
}

#[test]
fn install_then_query_taxonomy_and_volumes() {
    let work = TempDir::new().unwrap();
    let atlas_dir = common::build_atlas_dir(work.path(), "1.2");
    let archive = common::pack_archive(&atlas_dir);

    let mut server = mockito::Server::new();
    let _mocks = common::serve_atlas(&mut server, "1.2", &archive);

    let cache_dir = TempDir::new().unwrap();
    let library = library_against(&server, &cache_dir);

    let atlas = library
        .open("test_25um", &VersionPolicy::AnyInstalled)
        .unwrap();

    // Identity and metadata.
    assert_eq!(atlas.name().to_string(), "test_25um");
    assert_eq!(atlas.version(), AtlasVersion::new(1, 2));
    assert_eq!(atlas.shape(), [1, 1, 4]);

    // Taxonomy: grey > CH > CTX.
    assert_eq!(atlas.structures().get("CTX").unwrap().id(), 3);

    let ancestors: Vec<u32> = atlas
        .structures()
        .ancestors(3u32)
        .unwrap()
        .iter()
        .map(|n| n.id())
        .collect();
    assert_eq!(ancestors, vec![1, 2]);

    let subtree: HashSet<u32> = atlas
        .structures()
        .descendants(1u32)
        .unwrap()
        .iter()
        .map(|n| n.id())
        .collect();
    assert_eq!(subtree, HashSet::from([1, 2, 3]));

    // Volumes.
    assert_eq!(atlas.reference().unwrap()[[0, 0, 0]], 100);
    assert_eq!(atlas.annotation().unwrap()[[0, 0, 2]], 2);

    let hemispheres = atlas.hemispheres().unwrap();
    assert_eq!(hemispheres[[0, 0, 0]], 0);
    assert_eq!(hemispheres[[0, 0, 1]], 1);
    assert_eq!(hemispheres[[0, 0, 3]], 2);

    // Meshes: present for CH, absent for CTX, error for nonsense.
    assert!(atlas.mesh("CH").unwrap().is_some());
    assert!(atlas.mesh("CTX").unwrap().is_none());
    assert!(atlas.mesh(999_999u32).is_err());
}

#[test]
fn second_open_runs_from_cache() {
    let work = TempDir::new().unwrap();
    let atlas_dir = common::build_atlas_dir(work.path(), "1.2");
    let archive = common::pack_archive(&atlas_dir);

    let mut server = mockito::Server::new();
    let _mocks = common::serve_atlas(&mut server, "1.2", &archive);

    let cache_dir = TempDir::new().unwrap();

    {
        let library = library_against(&server, &cache_dir);
        library
            .open("test_25um", &VersionPolicy::AnyInstalled)
            .unwrap();
    }

    // A fresh library against an unreachable remote still opens the
    // installed copy: the fast path never touches the network.
    let config = LibraryConfig::new(cache_dir.path())
        .with_remote_url("http://127.0.0.1:1/nowhere");
    let offline = AtlasLibrary::new(config);

    let atlas = offline
        .open("test_25um", &VersionPolicy::AnyInstalled)
        .unwrap();
    assert_eq!(atlas.version(), AtlasVersion::new(1, 2));
}

#[test]
fn listing_and_delete_lifecycle() {
    let work = TempDir::new().unwrap();
    let atlas_dir = common::build_atlas_dir(work.path(), "1.2");
    let archive = common::pack_archive(&atlas_dir);

    let mut server = mockito::Server::new();
    let _mocks = common::serve_atlas(&mut server, "1.2", &archive);

    let cache_dir = TempDir::new().unwrap();
    let library = library_against(&server, &cache_dir);

    // Before install: listed from the manifest, not installed.
    let listings = library.list().unwrap();
    assert_eq!(listings.len(), 1);
    assert!(!listings[0].installed);
    assert_eq!(listings[0].latest_version, Some(AtlasVersion::new(1, 2)));

    library
        .open("test_25um", &VersionPolicy::AnyInstalled)
        .unwrap();

    let listings = library.list().unwrap();
    assert!(listings[0].installed);
    assert_eq!(listings[0].local_version, Some(AtlasVersion::new(1, 2)));

    library.delete("test_25um").unwrap();
    let listings = library.list().unwrap();
    assert!(!listings[0].installed);
}

#[test]
fn corrupt_archive_leaves_no_entry_and_retry_recovers() {
    let work = TempDir::new().unwrap();
    let atlas_dir = common::build_atlas_dir(work.path(), "1.2");
    let archive = common::pack_archive(&atlas_dir);

    let cache_dir = TempDir::new().unwrap();

    // First attempt: the server delivers garbage in place of the archive.
    {
        let mut server = mockito::Server::new();
        let _manifest = server
            .mock("GET", "/last_versions.conf")
            .with_body("[atlases]\ntest_25um = 1.2\n")
            .create();
        let _head = server
            .mock("HEAD", "/test_25um_v1.2.tar.gz")
            .with_header("content-length", "7")
            .create();
        let _get = server
            .mock("GET", "/test_25um_v1.2.tar.gz")
            .with_body("garbage")
            .create();

        let library = library_against(&server, &cache_dir);
        let result = library.open("test_25um", &VersionPolicy::AnyInstalled);
        assert!(result.is_err());

        // The failed install left nothing visible in the cache root.
        assert!(library.cache().installed().unwrap().is_empty());
    }

    // Second attempt against a healthy server succeeds.
    let mut server = mockito::Server::new();
    let _mocks = common::serve_atlas(&mut server, "1.2", &archive);

    let library = library_against(&server, &cache_dir);
    let atlas = library
        .open("test_25um", &VersionPolicy::AnyInstalled)
        .unwrap();
    assert_eq!(atlas.version(), AtlasVersion::new(1, 2));
}
