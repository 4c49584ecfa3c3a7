//! Property-based tests for structure definitions and packages
//!
//! Copies must stay independent whatever mutation is applied to either
//! side, and resolution must find whatever a structure declares.

use plasmapkg::{Package, StructureDefinition};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Clone)]
enum Mutation {
    SetRequired(bool),
    SetDefaultPackageRoot(String),
    SetAllowExternalPaths(bool),
    SetServicePrefix(String),
    SetContentsPrefixPaths(Vec<String>),
    AddFile(String, String),
    AddDirectory(String, String),
    SetSearchPaths(Vec<String>),
    Remove,
    SetMimeTypes(Vec<String>),
    SetDefaultMimeTypes(Vec<String>),
}

// Strategy: relative path segments
fn arb_segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

fn arb_mime_types() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,8}/[a-z+]{1,8}", 0..4)
}

fn arb_mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        any::<bool>().prop_map(Mutation::SetRequired),
        arb_segment().prop_map(Mutation::SetDefaultPackageRoot),
        any::<bool>().prop_map(Mutation::SetAllowExternalPaths),
        arb_segment().prop_map(Mutation::SetServicePrefix),
        prop::collection::vec(arb_segment(), 0..3).prop_map(Mutation::SetContentsPrefixPaths),
        (arb_segment(), arb_segment()).prop_map(|(k, p)| Mutation::AddFile(k, p)),
        (arb_segment(), arb_segment()).prop_map(|(k, p)| Mutation::AddDirectory(k, p)),
        prop::collection::vec(arb_segment(), 1..3).prop_map(Mutation::SetSearchPaths),
        Just(Mutation::Remove),
        arb_mime_types().prop_map(Mutation::SetMimeTypes),
        arb_mime_types().prop_map(Mutation::SetDefaultMimeTypes),
    ]
}

fn sample_package() -> Package {
    let mut definition = StructureDefinition::new("Test/Sample");
    definition.add_file_definition("mainscript", "ui/main.qml", "Main Script File");
    definition.set_required("mainscript", true);
    definition.add_directory_definition("images", "images", "Images");
    definition.set_mime_types("images", vec!["image/png".to_string()]);
    Package::new(definition)
}

fn apply(package: &mut Package, mutation: &Mutation) {
    match mutation {
        Mutation::SetRequired(required) => package.set_required("mainscript", *required),
        Mutation::SetDefaultPackageRoot(root) => package.set_default_package_root(root),
        Mutation::SetAllowExternalPaths(allow) => package.set_allow_external_paths(*allow),
        Mutation::SetServicePrefix(prefix) => package.set_service_prefix(prefix),
        Mutation::SetContentsPrefixPaths(prefixes) => {
            package.set_contents_prefix_paths(prefixes.clone());
        }
        Mutation::AddFile(key, path) => package.add_file_definition(key, path, ""),
        Mutation::AddDirectory(key, path) => package.add_directory_definition(key, path, ""),
        Mutation::SetSearchPaths(paths) => package.set_search_paths("mainscript", paths.clone()),
        Mutation::Remove => package.remove_definition("images"),
        Mutation::SetMimeTypes(mime_types) => package.set_mime_types("images", mime_types.clone()),
        Mutation::SetDefaultMimeTypes(mime_types) => {
            package.set_default_mime_types(mime_types.clone());
        }
    }
}

fn snapshot(package: &Package) -> String {
    package.structure_definition().to_toml().unwrap()
}

proptest! {
    /// Property: mutating a copy never changes the original
    #[test]
    fn proptest_copy_independence(mutations in prop::collection::vec(arb_mutation(), 1..8)) {
        let original = sample_package();
        let before = snapshot(&original);

        let mut copy = original.clone();
        for mutation in &mutations {
            apply(&mut copy, mutation);
        }

        prop_assert_eq!(snapshot(&original), before);
    }

    /// Property: mutating the original never changes an earlier copy
    #[test]
    fn proptest_original_mutation_leaves_copy(
        mutations in prop::collection::vec(arb_mutation(), 1..8)
    ) {
        let mut original = sample_package();
        let copy = original.clone();
        let before = snapshot(&copy);

        for mutation in &mutations {
            apply(&mut original, mutation);
        }

        prop_assert_eq!(snapshot(&copy), before);
    }

    /// Property: a declared file that exists under contents/ resolves to its
    /// canonical path
    #[test]
    fn proptest_declared_file_resolves(dir in arb_segment(), file in arb_segment()) {
        let temp_dir = TempDir::new().unwrap();
        let relative = format!("{dir}/{file}.qml");
        let on_disk = temp_dir.path().join("contents").join(&relative);
        fs::create_dir_all(on_disk.parent().unwrap()).unwrap();
        fs::write(&on_disk, "").unwrap();

        let mut definition = StructureDefinition::new("Test/Generated");
        definition.add_file_definition("entry", &relative, "Generated");
        let mut package = Package::new(definition);
        package.set_path(temp_dir.path());

        prop_assert_eq!(package.file_path_for("entry"), Some(on_disk.canonicalize().unwrap()));
    }
}
