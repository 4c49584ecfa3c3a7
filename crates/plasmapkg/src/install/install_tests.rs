#![allow(non_snake_case)]

use super::*;
use crate::StructureDefinition;
use std::io::Write;

fn template() -> Package {
    let mut definition = StructureDefinition::new("Test/Widget");
    definition.add_file_definition("mainscript", "ui/main.qml", "Main Script File");
    definition.set_required("mainscript", true);
    Package::new(definition)
}

fn desktop_for(plugin_id: &str) -> String {
    format!(
        "[Desktop Entry]\nName=Test\nX-KDE-PluginInfo-Name={plugin_id}\n\
         X-KDE-PluginInfo-Version=1.0\n"
    )
}

fn write_source_dir(dir: &Path, plugin_id: &str) {
    fs::create_dir_all(dir.join("contents/ui")).unwrap();
    fs::write(dir.join("contents/ui/main.qml"), b"Item {}").unwrap();
    fs::write(dir.join(METADATA_DESKTOP), desktop_for(plugin_id)).unwrap();
}

fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, contents) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(contents).unwrap();
    }
    zip.finish().unwrap();
}

// Install from directories

#[test]
fn Installer___install___copies_directory_to_plugin_id() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let root = temp_dir.path().join("root");
    write_source_dir(&source, "org.kde.test");

    let target = Installer::new().install(&template(), &source, &root).unwrap();

    assert_eq!(target, root.join("org.kde.test"));
    assert!(target.join("contents/ui/main.qml").is_file());
    assert!(target.join(METADATA_DESKTOP).is_file());
}

#[test]
fn Installer___install___creates_missing_root() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let root = temp_dir.path().join("does/not/exist");
    write_source_dir(&source, "org.kde.test");

    Installer::new().install(&template(), &source, &root).unwrap();

    assert!(root.join("org.kde.test").is_dir());
}

#[test]
fn Installer___install___already_installed___returns_error() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let root = temp_dir.path().join("root");
    write_source_dir(&source, "org.kde.test");
    let installer = Installer::new();
    installer.install(&template(), &source, &root).unwrap();

    let result = installer.install(&template(), &source, &root);

    assert!(matches!(result, Err(PackageError::AlreadyInstalled(_))));
}

#[test]
fn Installer___install___missing_metadata___returns_error() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    fs::create_dir_all(source.join("contents/ui")).unwrap();
    fs::write(source.join("contents/ui/main.qml"), b"Item {}").unwrap();

    let result = Installer::new().install(&template(), &source, &temp_dir.path().join("root"));

    assert!(matches!(result, Err(PackageError::MissingFile(_))));
}

#[test]
fn Installer___install___unsafe_plugin_id___returns_error() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    write_source_dir(&source, "../escape");

    let result = Installer::new().install(&template(), &source, &temp_dir.path().join("root"));

    assert!(matches!(result, Err(PackageError::InvalidPluginName(_))));
    assert!(!temp_dir.path().join("escape").exists());
}

#[test]
fn Installer___install___missing_required_entry___returns_error() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join(METADATA_DESKTOP), desktop_for("org.kde.test")).unwrap();

    let result = Installer::new().install(&template(), &source, &temp_dir.path().join("root"));

    match result {
        Err(PackageError::MissingFile(key)) => assert_eq!(key, "mainscript"),
        other => panic!("expected missing mainscript, got {other:?}"),
    }
}

#[test]
fn Installer___install___missing_source___returns_error() {
    let temp_dir = TempDir::new().unwrap();

    let result = Installer::new().install(
        &template(),
        &temp_dir.path().join("nothing.plasmoid"),
        temp_dir.path(),
    );

    assert!(matches!(result, Err(PackageError::MissingFile(_))));
}

// Install from archives

#[test]
fn Installer___install___extracts_zip_archive() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("test.plasmoid");
    let desktop = desktop_for("org.kde.zipped");
    write_zip(
        &archive,
        &[
            ("metadata.desktop", desktop.as_bytes()),
            ("contents/ui/main.qml", b"Item {}"),
        ],
    );
    let root = temp_dir.path().join("root");

    let target = Installer::new().install(&template(), &archive, &root).unwrap();

    assert_eq!(target, root.join("org.kde.zipped"));
    assert_eq!(fs::read(target.join("contents/ui/main.qml")).unwrap(), b"Item {}");
}

#[test]
fn Installer___install___descends_into_single_top_level_directory() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("wrapped.zip");
    let desktop = desktop_for("org.kde.wrapped");
    write_zip(
        &archive,
        &[
            ("wrapped/metadata.desktop", desktop.as_bytes()),
            ("wrapped/contents/ui/main.qml", b"Item {}"),
        ],
    );
    let root = temp_dir.path().join("root");

    let target = Installer::new().install(&template(), &archive, &root).unwrap();

    assert!(target.join(METADATA_DESKTOP).is_file());
    assert!(target.join("contents/ui/main.qml").is_file());
}

#[test]
fn Installer___install___not_an_archive___returns_error() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("fake.plasmoid");
    fs::write(&source, b"not a zip file").unwrap();

    let result = Installer::new().install(&template(), &source, &temp_dir.path().join("root"));

    assert!(matches!(result, Err(PackageError::UnsupportedArchive(_))));
}

#[test]
fn ZipExtractor___can_extract___checks_magic_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let zip_path = temp_dir.path().join("a.bin");
    let text_path = temp_dir.path().join("b.zip");
    write_zip(&zip_path, &[("file.txt", b"content")]);
    fs::write(&text_path, b"plain").unwrap();

    assert!(ZipExtractor.can_extract(&zip_path));
    assert!(!ZipExtractor.can_extract(&text_path));
}

// Uninstall and upgrade

#[test]
fn Installer___uninstall___removes_package() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let root = temp_dir.path().join("root");
    write_source_dir(&source, "org.kde.test");
    let installer = Installer::new();
    installer.install(&template(), &source, &root).unwrap();

    installer.uninstall("org.kde.test", &root).unwrap();

    assert!(!root.join("org.kde.test").exists());
}

#[test]
fn Installer___uninstall___not_installed___returns_error() {
    let temp_dir = TempDir::new().unwrap();

    let result = Installer::new().uninstall("org.kde.missing", temp_dir.path());

    assert!(matches!(result, Err(PackageError::NotInstalled(_))));
}

#[test]
fn Installer___uninstall___unsafe_name___returns_error() {
    let temp_dir = TempDir::new().unwrap();

    let result = Installer::new().uninstall("..", temp_dir.path());

    assert!(matches!(result, Err(PackageError::InvalidPluginName(_))));
    assert!(temp_dir.path().exists());
}

#[test]
fn Installer___upgrade___replaces_previous_version() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let root = temp_dir.path().join("root");
    write_source_dir(&source, "org.kde.test");
    let installer = Installer::new();
    installer.install(&template(), &source, &root).unwrap();
    fs::write(root.join("org.kde.test/stale.txt"), b"old").unwrap();
    fs::write(source.join("contents/ui/main.qml"), b"Item { id: v2 }").unwrap();

    let target = installer.upgrade(&template(), &source, &root).unwrap();

    assert!(!target.join("stale.txt").exists());
    assert_eq!(
        fs::read(target.join("contents/ui/main.qml")).unwrap(),
        b"Item { id: v2 }"
    );
}

#[test]
fn Installer___upgrade___nothing_installed___installs() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let root = temp_dir.path().join("root");
    write_source_dir(&source, "org.kde.test");

    let target = Installer::new().upgrade(&template(), &source, &root).unwrap();

    assert!(target.join("contents/ui/main.qml").is_file());
}

#[test]
fn Installer___upgrade___from_installed_directory___keeps_package() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let root = temp_dir.path().join("root");
    write_source_dir(&source, "org.kde.test");
    let installer = Installer::new();
    let installed = installer.install(&template(), &source, &root).unwrap();

    let result = installer.upgrade(&template(), &installed, &root);

    assert!(matches!(result, Err(PackageError::InvalidSource(_))));
    assert!(installed.join("contents/ui/main.qml").is_file());
}

#[test]
fn Installer___upgrade___source_inside_installed_package___returns_error() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("root");
    let nested = root.join("org.kde.test/bundled");
    write_source_dir(&root.join("org.kde.test"), "org.kde.test");
    write_source_dir(&nested, "org.kde.test");

    let result = Installer::new().upgrade(&template(), &nested, &root);

    assert!(matches!(result, Err(PackageError::InvalidSource(_))));
    assert!(nested.join("contents/ui/main.qml").is_file());
}

#[test]
fn Installer___upgrade___leaves_only_the_package_in_root() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let root = temp_dir.path().join("root");
    write_source_dir(&source, "org.kde.test");
    let installer = Installer::new();
    installer.install(&template(), &source, &root).unwrap();

    installer.upgrade(&template(), &source, &root).unwrap();

    let names: Vec<String> = fs::read_dir(&root)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, ["org.kde.test"]);
}

#[test]
fn Installer___install___root_inside_source___returns_error() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let nested_root = source.join("installed");
    write_source_dir(&source, "org.kde.test");
    let installer = Installer::new();

    let result = installer.install(&template(), &source, &nested_root);

    assert!(matches!(result, Err(PackageError::InvalidSource(_))));
    assert!(!nested_root.exists());
}

#[test]
fn Installer___install___after_rejected_root___other_root_still_works() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let root = temp_dir.path().join("root");
    write_source_dir(&source, "org.kde.test");
    let installer = Installer::new();
    installer
        .install(&template(), &source, &source.join("installed"))
        .unwrap_err();

    let target = installer.install(&template(), &source, &root).unwrap();

    assert!(target.join("contents/ui/main.qml").is_file());
    assert_eq!(known_packages(&root).unwrap(), ["org.kde.test"]);
}

#[cfg(unix)]
#[test]
fn Installer___install___target_is_world_readable() {
    use std::os::unix::fs::PermissionsExt;
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let root = temp_dir.path().join("root");
    write_source_dir(&source, "org.kde.test");

    let target = Installer::new().install(&template(), &source, &root).unwrap();

    let mode = fs::metadata(target).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
}

#[test]
fn known_packages___lists_directories_with_metadata() {
    let temp_dir = TempDir::new().unwrap();
    write_source_dir(&temp_dir.path().join("org.kde.b"), "org.kde.b");
    write_source_dir(&temp_dir.path().join("org.kde.a"), "org.kde.a");
    fs::create_dir_all(temp_dir.path().join("not-a-package")).unwrap();
    write_source_dir(&temp_dir.path().join(".plasmapkg-staging-x"), "org.kde.c");

    let packages = known_packages(temp_dir.path()).unwrap();

    assert_eq!(packages, ["org.kde.a", "org.kde.b"]);
}

#[test]
fn known_packages___missing_root___is_empty() {
    let packages = known_packages(Path::new("/nonexistent/plasmoids")).unwrap();

    assert!(packages.is_empty());
}
