//! Built-in `Plasma/*` package structures.

use crate::{DEFAULT_CONTENTS_PREFIX, Package, PackageStructure, StructureDefinition};
use std::sync::Arc;
use tracing::debug;

/// Key of the entry point of script based packages.
pub const MAINSCRIPT: &str = "mainscript";

/// Default location of [`MAINSCRIPT`].
pub const DEFAULT_MAINSCRIPT: &str = "ui/main.qml";

/// Metadata key overriding the main script of most packages.
pub const MAINSCRIPT_METADATA_KEY: &str = "X-Plasma-MainScript";

/// Metadata key overriding the main script of containments.
pub const CONTAINMENT_MAINSCRIPT_METADATA_KEY: &str = "X-Plasma-Containment-MainScript";

const IMAGE_MIME_TYPES: [&str; 3] = ["image/svg+xml", "image/png", "image/jpeg"];

/// The structures shipped with the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    Generic,
    Applet,
    Containment,
    DataEngine,
    Runner,
    ContainmentActions,
    Wallpaper,
    LayoutTemplate,
    Theme,
    Shell,
    LookAndFeel,
}

impl BuiltinKind {
    pub const ALL: [BuiltinKind; 11] = [
        Self::Generic,
        Self::Applet,
        Self::Containment,
        Self::DataEngine,
        Self::Runner,
        Self::ContainmentActions,
        Self::Wallpaper,
        Self::LayoutTemplate,
        Self::Theme,
        Self::Shell,
        Self::LookAndFeel,
    ];

    /// Registry name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "Plasma/Generic",
            Self::Applet => "Plasma/Applet",
            Self::Containment => "Plasma/Containment",
            Self::DataEngine => "Plasma/DataEngine",
            Self::Runner => "Plasma/Runner",
            Self::ContainmentActions => "Plasma/ContainmentActions",
            Self::Wallpaper => "Plasma/Wallpaper",
            Self::LayoutTemplate => "Plasma/LayoutTemplate",
            Self::Theme => "Plasma/Theme",
            Self::Shell => "Plasma/Shell",
            Self::LookAndFeel => "Plasma/LookAndFeel",
        }
    }

    /// Parse a registry name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }

    /// Metadata key that may override the main script, if any.
    #[must_use]
    pub fn main_script_key(&self) -> Option<&'static str> {
        match self {
            Self::Generic
            | Self::Applet
            | Self::DataEngine
            | Self::Runner
            | Self::ContainmentActions => Some(MAINSCRIPT_METADATA_KEY),
            Self::Containment => Some(CONTAINMENT_MAINSCRIPT_METADATA_KEY),
            Self::Wallpaper
            | Self::LayoutTemplate
            | Self::Theme
            | Self::Shell
            | Self::LookAndFeel => None,
        }
    }
}

/// A built-in structure, parameterised by the runtime platforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinStructure {
    kind: BuiltinKind,
    platforms: Vec<String>,
}

impl BuiltinStructure {
    #[must_use]
    pub fn new(kind: BuiltinKind, platforms: &[String]) -> Self {
        Self {
            kind,
            platforms: platforms.to_vec(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> BuiltinKind {
        self.kind
    }
}

/// One instance of every built-in structure.
#[must_use]
pub fn builtin_structures(platforms: &[String]) -> Vec<Arc<dyn PackageStructure>> {
    BuiltinKind::ALL
        .into_iter()
        .map(|kind| Arc::new(BuiltinStructure::new(kind, platforms)) as Arc<dyn PackageStructure>)
        .collect()
}

/// `platformcontents/<platform>/` for each platform, then `contents/`.
///
/// `None` when no platform is configured, leaving the default prefix alone.
#[must_use]
pub fn platform_prefixes(platforms: &[String]) -> Option<Vec<String>> {
    if platforms.is_empty() {
        return None;
    }

    let mut prefixes: Vec<String> = platforms
        .iter()
        .map(|platform| format!("platformcontents/{platform}/"))
        .collect();
    prefixes.push(DEFAULT_CONTENTS_PREFIX.to_string());
    Some(prefixes)
}

impl PackageStructure for BuiltinStructure {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn init_package(&self, definition: &mut StructureDefinition) {
        match self.kind {
            BuiltinKind::Generic => init_generic(definition, &self.platforms),
            BuiltinKind::Applet | BuiltinKind::Containment => {
                init_applet(definition, &self.platforms);
            }
            BuiltinKind::DataEngine => init_data_engine(definition),
            BuiltinKind::Runner => init_runner(definition),
            BuiltinKind::ContainmentActions => {
                init_main_script(definition);
                definition.set_default_package_root("plasma/containmentactions/");
            }
            BuiltinKind::Wallpaper => init_wallpaper(definition, &self.platforms),
            BuiltinKind::LayoutTemplate => init_layout_template(definition),
            BuiltinKind::Theme => init_theme(definition),
            BuiltinKind::Shell => init_shell(definition),
            BuiltinKind::LookAndFeel => init_look_and_feel(definition),
        }
    }

    fn path_changed(&self, package: &mut Package) {
        let Some(config_key) = self.kind.main_script_key() else {
            return;
        };

        let main_script = package
            .metadata()
            .and_then(|metadata| metadata.value(config_key))
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_MAINSCRIPT)
            .to_string();

        if package.structure_definition().search_paths(MAINSCRIPT) == [main_script.as_str()] {
            return;
        }

        debug!(main_script = %main_script, "Main script overridden by metadata");
        if package.structure_definition().contains(MAINSCRIPT) {
            package.set_search_paths(MAINSCRIPT, vec![main_script]);
        } else {
            package.add_file_definition(MAINSCRIPT, &main_script, "Main Script File");
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn init_main_script(definition: &mut StructureDefinition) {
    definition.add_file_definition(MAINSCRIPT, DEFAULT_MAINSCRIPT, "Main Script File");
    definition.set_required(MAINSCRIPT, true);
}

fn init_generic(definition: &mut StructureDefinition, platforms: &[String]) {
    init_main_script(definition);

    if let Some(prefixes) = platform_prefixes(platforms) {
        definition.set_contents_prefix_paths(prefixes);
    }
    definition.set_default_package_root("plasma/packages/");

    definition.add_directory_definition("images", "images", "Images");
    definition.add_directory_definition("theme", "theme", "Themed Images");
    definition.set_mime_types("images", strings(&IMAGE_MIME_TYPES));
    definition.set_mime_types("theme", strings(&IMAGE_MIME_TYPES));

    definition.add_directory_definition("config", "config", "Configuration Definitions");
    definition.set_mime_types("config", strings(&["text/xml"]));

    definition.add_directory_definition("ui", "ui", "User Interface");
    definition.add_directory_definition("data", "data", "Data Files");

    definition.add_directory_definition("scripts", "code", "Executable Scripts");
    definition.set_mime_types("scripts", strings(&["text/plain"]));

    definition.add_directory_definition("translations", "locale", "Translations");
}

fn init_applet(definition: &mut StructureDefinition, platforms: &[String]) {
    init_generic(definition, platforms);
    definition.set_service_prefix("plasma-applet-");
    definition.set_default_package_root("plasma/plasmoids/");

    definition.add_file_definition(
        "configmodel",
        "config/config.qml",
        "Configuration UI pages model",
    );
    definition.add_file_definition("mainconfigxml", "config/main.xml", "Configuration XML file");
}

fn init_data_engine(definition: &mut StructureDefinition) {
    init_main_script(definition);
    definition.set_service_prefix("plasma-dataengine-");
    definition.set_default_package_root("plasma/dataengines/");

    definition.add_directory_definition("data", "data", "Data Files");

    definition.add_directory_definition("scripts", "code", "Executable Scripts");
    definition.set_mime_types("scripts", strings(&["text/plain"]));

    definition.add_directory_definition("services", "services/", "Service Descriptions");
    definition.set_mime_types("services", strings(&["text/plain"]));

    definition.add_directory_definition("translations", "locale", "Translations");
}

fn init_runner(definition: &mut StructureDefinition) {
    init_main_script(definition);
    definition.set_service_prefix("plasma-runner-");
    definition.set_default_package_root("plasma/runners/");

    definition.add_directory_definition("data", "data", "Data Files");

    definition.add_directory_definition("scripts", "code", "Executable Scripts");
    definition.set_mime_types("scripts", strings(&["text/plain"]));

    definition.add_directory_definition("translations", "locale", "Translations");
}

fn init_wallpaper(definition: &mut StructureDefinition, platforms: &[String]) {
    init_main_script(definition);

    if let Some(prefixes) = platform_prefixes(platforms) {
        definition.set_contents_prefix_paths(prefixes);
    }
    definition.set_default_package_root("plasma/wallpapers/");

    definition.add_directory_definition("images", "images", "Images");
    definition.add_directory_definition("theme", "theme", "Themed Images");
    definition.set_mime_types("images", strings(&IMAGE_MIME_TYPES));
    definition.set_mime_types("theme", strings(&IMAGE_MIME_TYPES));

    definition.add_directory_definition("config", "config", "Configuration Definitions");
    definition.set_mime_types("config", strings(&["text/xml"]));

    definition.add_directory_definition("ui", "ui", "User Interface");
    definition.add_directory_definition("data", "data", "Data Files");

    definition.add_directory_definition("scripts", "code", "Executable Scripts");
    definition.set_mime_types("scripts", strings(&["text/plain"]));

    definition.add_directory_definition("translations", "locale", "Translations");
}

fn init_layout_template(definition: &mut StructureDefinition) {
    definition.set_service_prefix("plasma-layout-template");
    definition.set_default_package_root("plasma/layout-templates");
    definition.add_file_definition(MAINSCRIPT, "layout.js", "Main Script File");
    definition.set_required(MAINSCRIPT, true);
}

/// Theme images come as `.svg` or compressed `.svgz`.
fn add_svg(definition: &mut StructureDefinition, key: &str, name: &str) {
    definition.add_file_definition(key, &format!("{key}.svg"), name);
    definition.add_file_definition(key, &format!("{key}.svgz"), name);
}

fn init_theme(definition: &mut StructureDefinition) {
    // Themes keep their images directly below the root.
    definition.set_contents_prefix_paths(Vec::new());
    definition.set_default_package_root("plasma/desktoptheme/");

    definition.add_directory_definition("dialogs", "dialogs/", "Images for dialogs");
    add_svg(definition, "dialogs/background", "Generic dialog background");
    add_svg(definition, "dialogs/shutdowndialog", "Theme for the logout dialog");

    definition.add_directory_definition("wallpapers", "wallpapers/", "Wallpaper packages");

    definition.add_directory_definition("widgets", "widgets/", "Images for widgets");
    add_svg(definition, "widgets/background", "Background image for widgets");
    add_svg(definition, "widgets/clock", "Analog clock face");
    add_svg(definition, "widgets/panel-background", "Background image for panels");
    add_svg(definition, "widgets/plot-background", "Background for graphing widgets");
    add_svg(definition, "widgets/tooltip", "Background image for tooltips");

    definition.add_directory_definition(
        "opaque/dialogs",
        "opaque/dialogs/",
        "Opaque images for dialogs",
    );
    add_svg(definition, "opaque/dialogs/background", "Opaque generic dialog background");
    add_svg(definition, "opaque/dialogs/shutdowndialog", "Opaque theme for the logout dialog");

    definition.add_directory_definition(
        "opaque/widgets",
        "opaque/widgets/",
        "Opaque images for widgets",
    );
    add_svg(definition, "opaque/widgets/panel-background", "Opaque background image for panels");
    add_svg(definition, "opaque/widgets/tooltip", "Opaque background image for tooltips");

    definition.add_directory_definition(
        "locolor/dialogs",
        "locolor/dialogs/",
        "Low color images for dialogs",
    );
    add_svg(definition, "locolor/dialogs/background", "Low color generic dialog background");
    add_svg(definition, "locolor/dialogs/shutdowndialog", "Low color theme for the logout dialog");

    definition.add_directory_definition(
        "locolor/widgets",
        "locolor/widgets/",
        "Images for widgets",
    );
    add_svg(definition, "locolor/widgets/background", "Low color background image for widgets");
    add_svg(definition, "locolor/widgets/clock", "Low color analog clock face");
    add_svg(
        definition,
        "locolor/widgets/panel-background",
        "Low color background image for panels",
    );
    add_svg(
        definition,
        "locolor/widgets/plot-background",
        "Low color background for graphing widgets",
    );
    add_svg(definition, "locolor/widgets/tooltip", "Low color background image for tooltips");

    definition.add_file_definition("colors", "colors", "KColorScheme configuration file");

    definition.set_default_mime_types(strings(&["image/svg+xml"]));
}

fn init_shell(definition: &mut StructureDefinition) {
    definition.set_default_package_root("plasma/shells/");

    definition.add_directory_definition("applet", "applet", "Applets furniture");
    definition.add_directory_definition("configuration", "configuration", "Applets furniture");
    definition.add_directory_definition("explorer", "explorer", "Explorer UI for adding widgets");
    definition.add_directory_definition(
        "views",
        "views",
        "User interface for the views that will show containments",
    );
    for key in ["applet", "configuration", "views"] {
        definition.set_mime_types(key, strings(&["text/x-qml"]));
    }

    definition.add_file_definition("defaultlayout", "layout.js", "Default layout file");
    definition.add_file_definition(
        "defaults",
        "defaults",
        "Default plugins for containments, containmentActions etc",
    );
    definition.set_mime_types("defaultlayout", strings(&["application/javascript"]));
    definition.set_mime_types("defaults", strings(&["text/plain"]));

    definition.add_file_definition(
        "appleterror",
        "applet/AppletError.qml",
        "Error message shown when an applet fails to load",
    );
    definition.add_file_definition(
        "compactapplet",
        "applet/CompactApplet.qml",
        "QML component that shows an applet in a popup",
    );
    definition.add_file_definition(
        "defaultcompactrepresentation",
        "applet/DefaultCompactRepresentation.qml",
        "Compact representation of an applet when collapsed in a popup",
    );

    definition.add_file_definition(
        "appletconfigurationui",
        "configuration/AppletConfiguration.qml",
        "QML component for the configuration dialog for applets",
    );
    definition.add_file_definition(
        "containmentconfigurationui",
        "configuration/ContainmentConfiguration.qml",
        "QML component for the configuration dialog for containments",
    );
    definition.add_file_definition(
        "panelconfigurationui",
        "configuration/PanelConfiguration.qml",
        "Panel configuration UI",
    );

    definition.add_file_definition(
        "widgetexplorer",
        "explorer/WidgetExplorer.qml",
        "Widgets explorer UI",
    );
}

fn init_look_and_feel(definition: &mut StructureDefinition) {
    definition.set_default_package_root("plasma/look-and-feel/");

    definition.add_file_definition("defaults", "defaults", "Default settings for theme, etc.");
    definition.add_file_definition("colors", "colors", "Color scheme to use for applications.");

    definition.add_directory_definition("previews", "previews", "Preview Images");
    let previews = [
        ("loginmanagerpreview", "loginmanager", "Preview for the Login Manager"),
        ("lockscreenpreview", "lockscreen", "Preview for the Lock Screen"),
        ("userswitcherpreview", "userswitcher", "Preview for the Userswitcher"),
        ("desktopswitcherpreview", "desktopswitcher", "Preview for the Virtual Desktop Switcher"),
        ("splashpreview", "splash", "Preview for Splash Screen"),
        ("runcommandpreview", "runcommand", "Preview for KRunner"),
        ("windowdecorationpreview", "windowdecoration", "Preview for the Window Decorations"),
        ("windowswitcherpreview", "windowswitcher", "Preview for Window Switcher"),
    ];
    for (key, image, name) in previews {
        definition.add_file_definition(key, &format!("previews/{image}.png"), name);
    }

    let components = [
        ("loginmanager", "LoginManager", "Login Manager", "Main Script for Login Manager"),
        ("logout", "Logout", "Logout Dialog", "Main Script for Logout Dialog"),
        ("lockscreen", "LockScreen", "Screenlocker", "Main Script for Lock Screen"),
        (
            "userswitcher",
            "UserSwitcher",
            "UI for fast user switching",
            "Main Script for User Switcher",
        ),
        (
            "desktopswitcher",
            "DesktopSwitcher",
            "Virtual Desktop Switcher",
            "Main Script for Virtual Desktop Switcher",
        ),
        (
            "osd",
            "Osd",
            "On-Screen Display Notifications",
            "Main Script for On-Screen Display Notifications",
        ),
        ("splash", "Splash", "Splash Screen", "Main Script for Splash Screen"),
        ("runcommand", "RunCommand", "KRunner UI", "Main Script KRunner"),
        (
            "windowdecoration",
            "WindowDecoration",
            "Window Decoration",
            "Main Script for Window Decoration",
        ),
        ("windowswitcher", "WindowSwitcher", "Window Switcher", "Main Script for Window Switcher"),
    ];
    for (dir, component, dir_name, script_name) in components {
        definition.add_directory_definition(dir, dir, dir_name);
        definition.add_file_definition(
            &format!("{dir}mainscript"),
            &format!("{dir}/{component}.qml"),
            script_name,
        );
    }
}


#[cfg(test)]
#[path = "structures/structures_parameterized_tests.rs"]
mod structures_parameterized_tests;
