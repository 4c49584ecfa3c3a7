#![allow(non_snake_case)]

use super::*;
use test_case::test_case;

fn definition_of(kind: BuiltinKind) -> StructureDefinition {
    let mut definition = StructureDefinition::new(kind.as_str());
    BuiltinStructure::new(kind, &[]).init_package(&mut definition);
    definition
}

// ============================================================================
// Registry names
// ============================================================================

#[test_case(BuiltinKind::Generic, "Plasma/Generic")]
#[test_case(BuiltinKind::Applet, "Plasma/Applet")]
#[test_case(BuiltinKind::Containment, "Plasma/Containment")]
#[test_case(BuiltinKind::DataEngine, "Plasma/DataEngine")]
#[test_case(BuiltinKind::Runner, "Plasma/Runner")]
#[test_case(BuiltinKind::ContainmentActions, "Plasma/ContainmentActions")]
#[test_case(BuiltinKind::Wallpaper, "Plasma/Wallpaper")]
#[test_case(BuiltinKind::LayoutTemplate, "Plasma/LayoutTemplate")]
#[test_case(BuiltinKind::Theme, "Plasma/Theme")]
#[test_case(BuiltinKind::Shell, "Plasma/Shell")]
#[test_case(BuiltinKind::LookAndFeel, "Plasma/LookAndFeel")]
fn BuiltinKind___as_str___parses_back(kind: BuiltinKind, name: &str) {
    assert_eq!(kind.as_str(), name);
    assert_eq!(BuiltinKind::parse(name), Some(kind));
}

#[test_case("")]
#[test_case("Generic")]
#[test_case("plasma/generic")]
#[test_case("Plasma/Unknown")]
fn BuiltinKind___parse___rejects_unknown(name: &str) {
    assert_eq!(BuiltinKind::parse(name), None);
}

// ============================================================================
// Install locations
// ============================================================================

#[test_case(BuiltinKind::Generic, "plasma/packages/")]
#[test_case(BuiltinKind::Applet, "plasma/plasmoids/")]
#[test_case(BuiltinKind::Containment, "plasma/plasmoids/")]
#[test_case(BuiltinKind::DataEngine, "plasma/dataengines/")]
#[test_case(BuiltinKind::Runner, "plasma/runners/")]
#[test_case(BuiltinKind::ContainmentActions, "plasma/containmentactions/")]
#[test_case(BuiltinKind::Wallpaper, "plasma/wallpapers/")]
#[test_case(BuiltinKind::LayoutTemplate, "plasma/layout-templates")]
#[test_case(BuiltinKind::Theme, "plasma/desktoptheme/")]
#[test_case(BuiltinKind::Shell, "plasma/shells/")]
#[test_case(BuiltinKind::LookAndFeel, "plasma/look-and-feel/")]
fn BuiltinStructure___init_package___default_package_root(kind: BuiltinKind, root: &str) {
    assert_eq!(definition_of(kind).default_package_root(), root);
}

#[test_case(BuiltinKind::Applet, "plasma-applet-")]
#[test_case(BuiltinKind::DataEngine, "plasma-dataengine-")]
#[test_case(BuiltinKind::Runner, "plasma-runner-")]
#[test_case(BuiltinKind::LayoutTemplate, "plasma-layout-template")]
fn BuiltinStructure___init_package___service_prefix(kind: BuiltinKind, prefix: &str) {
    assert_eq!(definition_of(kind).service_prefix(), prefix);
}

// ============================================================================
// Main script
// ============================================================================

#[test_case(BuiltinKind::Generic, true)]
#[test_case(BuiltinKind::Applet, true)]
#[test_case(BuiltinKind::Containment, true)]
#[test_case(BuiltinKind::DataEngine, true)]
#[test_case(BuiltinKind::Runner, true)]
#[test_case(BuiltinKind::ContainmentActions, true)]
#[test_case(BuiltinKind::Wallpaper, true)]
#[test_case(BuiltinKind::LayoutTemplate, true)]
#[test_case(BuiltinKind::Theme, false)]
#[test_case(BuiltinKind::Shell, false)]
#[test_case(BuiltinKind::LookAndFeel, false)]
fn BuiltinStructure___init_package___mainscript_required(kind: BuiltinKind, required: bool) {
    assert_eq!(definition_of(kind).is_required(MAINSCRIPT), required);
}

#[test_case(BuiltinKind::Generic, Some(MAINSCRIPT_METADATA_KEY))]
#[test_case(BuiltinKind::Containment, Some(CONTAINMENT_MAINSCRIPT_METADATA_KEY))]
#[test_case(BuiltinKind::Runner, Some(MAINSCRIPT_METADATA_KEY))]
#[test_case(BuiltinKind::Wallpaper, None)]
#[test_case(BuiltinKind::Theme, None)]
fn BuiltinKind___main_script_key(kind: BuiltinKind, key: Option<&str>) {
    assert_eq!(kind.main_script_key(), key);
}
