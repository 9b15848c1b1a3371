//! Shared fixture helpers: build a complete packaged atlas and serve it.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use flate2::write::GzEncoder;
use flate2::Compression;

/// Three-region taxonomy: grey > CH > CTX.
pub const STRUCTURES: &str = r#"[
    {"id": 1, "acronym": "grey", "name": "Grey matter",
     "structure_id_path": [1], "rgb_triplet": [128, 128, 128]},
    {"id": 2, "acronym": "CH", "name": "Cerebrum",
     "structure_id_path": [1, 2], "rgb_triplet": [176, 240, 255]},
    {"id": 3, "acronym": "CTX", "name": "Cerebral cortex",
     "structure_id_path": [1, 2, 3], "rgb_triplet": [112, 255, 112]}
]"#;

pub fn metadata_json(version: &str) -> String {
    format!(
        r#"{{
            "name": "test",
            "citation": "unpublished",
            "atlas_link": "https://example.org",
            "species": "Mus musculus",
            "symmetric": true,
            "resolution": [25.0, 25.0, 25.0],
            "orientation": "asr",
            "version": "{}",
            "shape": [1, 1, 4]
        }}"#,
        version
    )
}

pub fn write_raw_gz(path: &Path, bytes: &[u8]) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::fast());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap();
}

/// Write a complete atlas directory named `test_25um_v{version}`.
pub fn build_atlas_dir(root: &Path, version: &str) -> PathBuf {
    let dir = root.join(format!("test_25um_v{}", version));
    std::fs::create_dir_all(dir.join("meshes")).unwrap();

    std::fs::write(dir.join("metadata.json"), metadata_json(version)).unwrap();
    std::fs::write(dir.join("structures.json"), STRUCTURES).unwrap();

    let reference: Vec<u8> = [100u16, 200, 300, 400]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    write_raw_gz(&dir.join("reference.raw.gz"), &reference);

    // Annotation: background, CTX, CH, background.
    let annotation: Vec<u8> = [0u32, 3, 2, 0]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    write_raw_gz(&dir.join("annotation.raw.gz"), &annotation);

    std::fs::write(
        dir.join("meshes/2.obj"),
        "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
    )
    .unwrap();

    dir
}

/// Pack an atlas directory into a tar.gz next to it and return the bytes.
pub fn pack_archive(atlas_dir: &Path) -> Vec<u8> {
    let parent = atlas_dir.parent().unwrap();
    let dir_name = atlas_dir.file_name().unwrap().to_str().unwrap();
    let archive = parent.join(format!("{}.tar.gz", dir_name));

    let status = Command::new("tar")
        .args([
            "-czf",
            archive.to_str().unwrap(),
            "-C",
            parent.to_str().unwrap(),
            dir_name,
        ])
        .status()
        .unwrap();
    assert!(status.success());

    std::fs::read(&archive).unwrap()
}

/// Register manifest + archive mocks for one packaged atlas.
///
/// The returned mocks must be kept alive for as long as the server should
/// answer.
pub fn serve_atlas(
    server: &mut mockito::ServerGuard,
    version: &str,
    archive: &[u8],
) -> Vec<mockito::Mock> {
    let manifest = server
        .mock("GET", "/last_versions.conf")
        .with_body(format!("[atlases]\ntest_25um = {}\n", version))
        .create();
    let path = format!("/test_25um_v{}.tar.gz", version);
    let head = server
        .mock("HEAD", path.as_str())
        .with_header("content-length", &archive.len().to_string())
        .create();
    let get = server
        .mock("GET", path.as_str())
        .with_body(archive)
        .create();

    vec![manifest, head, get]
}
