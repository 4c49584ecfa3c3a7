#![allow(non_snake_case)]

use super::*;
use crate::structures::BuiltinKind;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct NotesStructure;

impl PackageStructure for NotesStructure {
    fn name(&self) -> &str {
        "Test/Notes"
    }

    fn init_package(&self, definition: &mut StructureDefinition) {
        definition.add_file_definition("mainscript", "notes.qml", "Notes");
        definition.set_required("mainscript", true);
    }
}

struct ScriptedNotesStructure;

impl PackageStructure for ScriptedNotesStructure {
    fn name(&self) -> &str {
        "Test/Notes"
    }

    fn init_package(&self, definition: &mut StructureDefinition) {
        definition.add_file_definition("mainscript", "notes.js", "Scripted notes");
    }
}

fn empty_loader() -> PackageLoader {
    PackageLoader::new(LoaderConfig::empty())
}

#[test]
fn PackageLoader___load_package___unknown_name___is_invalid() {
    let loader = PackageLoader::with_builtin_structures(LoaderConfig::empty());

    let package = loader.load_package("doesNotExist", "");

    assert!(!package.is_valid());
    assert!(!package.has_valid_structure());
}

#[test]
fn PackageLoader___load_package___registered_structure() {
    let loader = empty_loader();
    loader.register(Arc::new(NotesStructure));

    let package = loader.load_package("Test/Notes", "");

    assert_eq!(package.structure_definition().type_name(), "Test/Notes");
    assert_eq!(package.structure_definition().search_paths("mainscript"), ["notes.qml"]);
    assert!(package.structure().is_some());
}

#[test]
fn PackageLoader___load_package___prefers_api_specific_structure() {
    let loader = empty_loader();
    loader.register(Arc::new(NotesStructure));
    loader.register_for_api("javascript", Arc::new(ScriptedNotesStructure));

    let scripted = loader.load_package("Test/Notes", "javascript");
    let generic = loader.load_package("Test/Notes", "python");

    assert_eq!(scripted.structure_definition().search_paths("mainscript"), ["notes.js"]);
    assert_eq!(generic.structure_definition().search_paths("mainscript"), ["notes.qml"]);
}

#[test]
fn PackageLoader___load_package___shares_canonical_definition() {
    let loader = empty_loader();
    loader.register(Arc::new(NotesStructure));

    let first = loader.load_package("Test/Notes", "");
    let second = loader.load_package("Test/Notes", "");
    let canonical = loader.canonical_definition("Test/Notes").unwrap();

    assert!(first.structure_definition().shares_data_with(&canonical));
    assert!(second.structure_definition().shares_data_with(&canonical));
}

#[test]
fn PackageLoader___load_package___mutation_does_not_reach_registry() {
    let loader = empty_loader();
    loader.register(Arc::new(NotesStructure));
    let mut package = loader.load_package("Test/Notes", "");

    package.set_required("mainscript", false);

    let canonical = loader.canonical_definition("Test/Notes").unwrap();
    assert!(canonical.is_required("mainscript"));
}

#[test]
fn PackageLoader___load_package___passes_data_dirs() {
    let loader = PackageLoader::new(
        LoaderConfig::empty().with_data_dirs(vec![PathBuf::from("/opt/share")]),
    );
    loader.register(Arc::new(NotesStructure));

    let package = loader.load_package("Test/Notes", "");

    assert_eq!(package.data_dirs(), [PathBuf::from("/opt/share")]);
}

#[test]
fn PackageLoader___load_package___reads_packageformats_description() {
    let data_dir = TempDir::new().unwrap();
    let formats = data_dir.path().join("packageformats/Custom");
    fs::create_dir_all(&formats).unwrap();
    fs::write(
        formats.join("Format.toml"),
        r#"
[structure]
type = "Custom/Format"
default_package_root = "custom/"

[[entry]]
key = "mainscript"
paths = ["main.js"]
required = true
"#,
    )
    .unwrap();
    let loader = PackageLoader::new(
        LoaderConfig::empty().with_data_dirs(vec![data_dir.path().to_path_buf()]),
    );

    let package = loader.load_package("Custom/Format", "");

    assert_eq!(package.default_package_root(), "custom/");
    assert!(package.is_required("mainscript"));
    assert!(loader.known_structures().contains(&"Custom/Format".to_string()));
}

#[test]
fn PackageLoader___load_package___reads_description_by_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("layout.toml");
    fs::write(
        &path,
        "[structure]\ntype = \"Adhoc\"\n\n\
         [[entry]]\nkey = \"data\"\npaths = [\"data\"]\ndirectory = true\n",
    )
    .unwrap();
    let loader = empty_loader();

    let package = loader.load_package(path.to_str().unwrap(), "");

    assert_eq!(package.directories(), ["data"]);
}

#[test]
fn PackageLoader___load_package___broken_description___is_invalid() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    fs::write(&path, "[structure").unwrap();
    let loader = empty_loader();

    let package = loader.load_package(path.to_str().unwrap(), "");

    assert!(!package.has_valid_structure());
    assert!(package.structure().is_none());
}

#[test]
fn PackageLoader___known_structures___lists_builtins_sorted() {
    let loader = PackageLoader::with_builtin_structures(LoaderConfig::empty());

    let names = loader.known_structures();

    assert_eq!(names.len(), BuiltinKind::ALL.len());
    assert!(names.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(names.contains(&"Plasma/Applet".to_string()));
}

#[test]
fn PackageLoader___known_structures___api_variants_listed_once() {
    let loader = empty_loader();
    loader.register(Arc::new(NotesStructure));
    loader.register_for_api("javascript", Arc::new(ScriptedNotesStructure));

    assert_eq!(loader.known_structures(), ["Test/Notes"]);
}

#[test]
fn PackageLoader___canonical_definition___unknown___is_none() {
    assert!(empty_loader().canonical_definition("Test/Nothing").is_none());
}

#[test]
fn PackageLoader___global___is_singleton_with_builtins() {
    let first = PackageLoader::global();
    let second = PackageLoader::global();

    assert!(std::ptr::eq(first, second));
    assert!(first.canonical_definition("Plasma/Generic").is_some());
}

#[test]
fn DescribedStructure___init_package___copies_definition() {
    let mut described = StructureDefinition::new("Test/Described");
    described.add_file_definition("mainscript", "main.js", "Main");
    let structure = DescribedStructure::new("Test/Described", described.clone());

    let package = Package::from_structure(Arc::new(structure));

    assert!(package.structure_definition().shares_data_with(&described));
}
