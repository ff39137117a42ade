use assetpack_package::{PackageError, Packer, Unpacker};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TREE: &str = "5f34a1c9b2e84d1f9a0b3c4d5e6f7a8b";
const BARK: &str = "0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a";

fn write(root: &Path, rel: &str, body: &[u8]) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, body).unwrap();
    path
}

fn write_meta(root: &Path, rel: &str, guid: &str) {
    write(
        root,
        &format!("{rel}.meta"),
        format!("fileFormatVersion: 2\nguid: {guid}\nTextureImporter:\n").as_bytes(),
    );
}

/// Member name -> raw body, read straight from the archive.
fn members(archive: &[u8]) -> BTreeMap<String, Vec<u8>> {
    let mut tar = tar::Archive::new(GzDecoder::new(archive));
    let mut out = BTreeMap::new();
    for entry in tar.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().into_owned();
        let mut body = Vec::new();
        entry.read_to_end(&mut body).unwrap();
        out.insert(name, body);
    }
    out
}

fn member(name: impl Into<String>, body: &[u8]) -> (String, Vec<u8>) {
    (name.into(), body.to_vec())
}

fn archive_of(members: Vec<(String, Vec<u8>)>) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, body) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, name, body.as_slice()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

#[test]
fn prefab_is_stored_under_its_sidecar_guid() {
    let project = TempDir::new().unwrap();
    let prefab = write(project.path(), "Assets/Trees/tree.prefab", b"%YAML 1.1\n");
    write_meta(project.path(), "Assets/Trees/tree.prefab", TREE);

    let packer = Packer::new(project.path(), Vec::new());
    assert!(packer.add_asset(&prefab).unwrap());
    let (archive, stats) = packer.finish().unwrap();
    assert_eq!(stats.assets, 1);
    assert_eq!(stats.synthesized_sidecars, 0);

    let members = members(&archive);
    assert_eq!(
        members.keys().cloned().collect::<Vec<_>>(),
        vec![
            format!("{TREE}/asset"),
            format!("{TREE}/asset.meta"),
            format!("{TREE}/pathname"),
        ]
    );
    assert_eq!(members[&format!("{TREE}/asset")], b"%YAML 1.1\n".to_vec());
    assert_eq!(
        members[&format!("{TREE}/pathname")],
        b"Assets/Trees/tree.prefab".to_vec()
    );
    assert_eq!(
        members[&format!("{TREE}/asset.meta")],
        format!("fileFormatVersion: 2\nguid: {TREE}\nTextureImporter:\n").into_bytes()
    );
}

#[test]
fn missing_sidecar_gets_a_generated_id() {
    let project = TempDir::new().unwrap();
    let a = write(project.path(), "Assets/a.txt", b"a");
    let b = write(project.path(), "Assets/b.txt", b"b");

    let packer = Packer::new(project.path(), Vec::new());
    packer.add_assets([&a, &b]).unwrap();
    let (archive, stats) = packer.finish().unwrap();
    assert_eq!(stats.synthesized_sidecars, 2);

    let members = members(&archive);
    let ids: Vec<String> = members
        .keys()
        .filter_map(|name| name.strip_suffix("/asset.meta"))
        .map(str::to_string)
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    for id in &ids {
        assert_eq!(id.len(), 32);
        assert!(id.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
        assert_eq!(
            members[&format!("{id}/asset.meta")],
            format!("guid: {id}\n").into_bytes()
        );
    }
}

#[test]
fn pack_then_unpack_restores_the_tree() {
    let project = TempDir::new().unwrap();
    let material = write(
        project.path(),
        "Assets/Materials/bark.mat",
        b"Material:\n  m_Name: bark\r\n",
    );
    write_meta(project.path(), "Assets/Materials/bark.mat", BARK);
    let mut png = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];
    png.extend((0u8..=255).cycle().take(10_000));
    let texture = write(project.path(), "Assets/Textures/bark.png", &png);
    write_meta(project.path(), "Assets/Textures/bark.png", TREE);

    let packer = Packer::new(project.path(), Vec::new());
    packer.add_asset(&material).unwrap();
    packer.add_asset(&texture).unwrap();
    let (archive, _) = packer.finish().unwrap();

    let dest = TempDir::new().unwrap();
    let stats = Unpacker::new(archive.as_slice())
        .extract_to(dest.path())
        .unwrap();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.incomplete, 0);

    assert_eq!(
        std::fs::read(dest.path().join("Assets/Materials/bark.mat")).unwrap(),
        b"Material:\r\n  m_Name: bark\r\n".to_vec()
    );
    assert_eq!(
        std::fs::read(dest.path().join("Assets/Textures/bark.png")).unwrap(),
        png
    );
    assert_eq!(
        std::fs::read_to_string(dest.path().join("Assets/Materials/bark.mat.meta")).unwrap(),
        format!("fileFormatVersion: 2\r\nguid: {BARK}\r\nTextureImporter:\r\n")
    );
}

#[test]
fn duplicates_are_reported_not_rewritten() {
    let project = TempDir::new().unwrap();
    let prefab = write(project.path(), "Assets/tree.prefab", b"x");
    write_meta(project.path(), "Assets/tree.prefab", TREE);

    let packer = Packer::new(project.path(), Vec::new());
    assert!(packer.add_asset(&prefab).unwrap());
    assert!(!packer.add_asset(&prefab).unwrap());
    assert!(!packer
        .add_asset(&project.path().join("Assets/tree.prefab.meta"))
        .unwrap());
    assert!(!packer.add_asset(Path::new("Assets/tree.prefab")).unwrap());
    assert!(packer.contains(&prefab));

    let (archive, stats) = packer.finish().unwrap();
    assert_eq!(stats.assets, 1);
    assert_eq!(stats.duplicates, 3);
    assert_eq!(members(&archive).len(), 3);
}

#[test]
fn missing_and_foreign_files_are_errors() {
    let project = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();
    let foreign = write(elsewhere.path(), "a.txt", b"a");

    let packer = Packer::new(project.path(), Vec::new());
    let err = packer
        .add_asset(&project.path().join("Assets/ghost.mat"))
        .unwrap_err();
    assert!(matches!(err, PackageError::NotFound(_)));

    let err = packer.add_asset(&foreign).unwrap_err();
    assert!(matches!(err, PackageError::OutsideProject(_)));

    let odd = write(project.path(), "Assets/odd.asset", b"x");
    write(project.path(), "Assets/odd.asset.meta", b"fileFormatVersion: 2\n");
    let err = packer.add_asset(&odd).unwrap_err();
    assert!(matches!(err, PackageError::MalformedSidecar(_)));
}

#[test]
fn members_may_arrive_in_any_order() {
    let archive = archive_of(vec![
        member(format!("{TREE}/pathname"), b"Assets/tree.prefab\n"),
        member(format!("{BARK}/asset"), b"bark"),
        member(format!("{TREE}/asset.meta"), b"guid: tree"),
        member(format!("{BARK}/pathname"), b"Assets/bark.mat"),
        member(format!("{TREE}/asset"), b"tree"),
        member(format!("{BARK}/asset.meta"), b"guid: bark"),
    ]);

    let (entries, stats) = Unpacker::new(archive.as_slice()).read_entries().unwrap();
    assert_eq!(stats.entries, 2);
    let order: Vec<&str> = entries.iter().map(|(guid, _)| guid.as_str()).collect();
    assert_eq!(order, vec![TREE, BARK]);
    assert_eq!(entries[0].1.pathname.as_deref(), Some("Assets/tree.prefab"));
    assert_eq!(entries[1].1.content.as_deref(), Some(&b"bark"[..]));
}

#[test]
fn unsafe_and_unknown_members_are_skipped() {
    let archive = archive_of(vec![
        member(format!("{TREE}/asset"), b"evil"),
        member(format!("{TREE}/asset.meta"), b"guid: x"),
        member(format!("{TREE}/pathname"), b"../../etc/evil"),
        member(format!("{BARK}/preview.png"), b"png"),
        member("stray.txt", b"stray"),
        member(format!("./{BARK}/asset"), b"ok"),
        member(format!("./{BARK}/asset.meta"), b"guid: bark"),
        member(format!("./{BARK}/pathname"), b"Assets/ok.txt"),
    ]);

    let dest = TempDir::new().unwrap();
    let stats = Unpacker::new(archive.as_slice())
        .extract_to(&dest.path().join("project"))
        .unwrap();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.skipped, 3);
    assert_eq!(stats.incomplete, 1);
    assert!(!dest.path().join("etc").exists());
    assert_eq!(
        std::fs::read(dest.path().join("project/Assets/ok.txt")).unwrap(),
        b"ok".to_vec()
    );
}

#[test]
fn packer_is_shared_across_threads() {
    let project = TempDir::new().unwrap();
    let paths: Vec<PathBuf> = (0..16)
        .map(|i| write(project.path(), &format!("Assets/Gen/file{i}.txt"), b"line\n"))
        .collect();

    let packer = Packer::new(project.path(), Vec::new());
    std::thread::scope(|scope| {
        for chunk in paths.chunks(4) {
            let packer = &packer;
            scope.spawn(move || {
                for path in chunk {
                    packer.add_asset(path).unwrap();
                    packer.add_asset(path).unwrap();
                }
            });
        }
    });
    let (archive, stats) = packer.finish().unwrap();
    assert_eq!(stats.assets, 16);
    assert_eq!(stats.duplicates, 16);

    let (entries, stats) = Unpacker::new(archive.as_slice()).read_entries().unwrap();
    assert_eq!(stats.entries, 16);
    assert_eq!(stats.incomplete, 0);
    for (_, entry) in entries {
        assert_eq!(entry.content.as_deref(), Some(&b"line\r\n"[..]));
    }
}
