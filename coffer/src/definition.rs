//! Symbol definitions and the registry that resolves them by name.
//!
//! A definition describes one record type: its name, its ordered columns,
//! and a revision number that lets extensions ship forward-compatible
//! upgrades of the same schema. Built-in definitions live in a static
//! table; extensions register theirs at run time.

use std::sync::Arc;

use fxhash::FxHashMap;
use once_cell::sync::Lazy;

use crate::field::{FieldDefinition, FieldType};

/// Resolved record shape for a definition name.
///
/// Shapes drive the typed accessor views over symbols. Definition names
/// without a specialized shape use [`SymbolShape::Generic`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum SymbolShape {
    #[default]
    Generic,
    Binary,
    Component,
    Control,
    ControlEvent,
    CustomAction,
    Dialog,
    Directory,
    Feature,
    File,
    Icon,
    Media,
    Property,
    Registry,
    Shortcut,
}

impl SymbolShape {
    /// Resolve the shape registered for a definition name.
    pub fn for_name(name: &str) -> SymbolShape {
        static SHAPES: Lazy<FxHashMap<&'static str, SymbolShape>> = Lazy::new(|| {
            FxHashMap::from_iter([
                ("Binary", SymbolShape::Binary),
                ("Component", SymbolShape::Component),
                ("Control", SymbolShape::Control),
                ("ControlEvent", SymbolShape::ControlEvent),
                ("CustomAction", SymbolShape::CustomAction),
                ("Dialog", SymbolShape::Dialog),
                ("Directory", SymbolShape::Directory),
                ("Feature", SymbolShape::Feature),
                ("File", SymbolShape::File),
                ("Icon", SymbolShape::Icon),
                ("Media", SymbolShape::Media),
                ("Property", SymbolShape::Property),
                ("Registry", SymbolShape::Registry),
                ("Shortcut", SymbolShape::Shortcut),
            ])
        });

        SHAPES.get(name).copied().unwrap_or_default()
    }
}

/// Metadata flags attached to a definition by downstream tooling.
///
/// Semantically a set of strings; stored compactly since almost every
/// definition carries none or one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Tags {
    #[default]
    None,
    Single(String),
    Many(Vec<String>),
}

impl Tags {
    pub fn contains(&self, tag: &str) -> bool {
        match self {
            Self::None => false,
            Self::Single(single) => single == tag,
            Self::Many(many) => many.iter().any(|t| t == tag),
        }
    }

    pub fn add(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if self.contains(&tag) {
            return;
        }
        *self = match std::mem::take(self) {
            Self::None => Self::Single(tag),
            Self::Single(single) => Self::Many(vec![single, tag]),
            Self::Many(mut many) => {
                many.push(tag);
                Self::Many(many)
            }
        };
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let (single, many): (Option<&String>, &[String]) = match self {
            Self::None => (None, &[]),
            Self::Single(single) => (Some(single), &[]),
            Self::Many(many) => (None, many.as_slice()),
        };
        single
            .into_iter()
            .chain(many.iter())
            .map(String::as_str)
    }
}

/// Schema of one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDefinition {
    name: String,
    revision: u32,
    field_definitions: Vec<FieldDefinition>,
    tags: Tags,
    shape: SymbolShape,
}

impl SymbolDefinition {
    pub fn new(
        name: impl Into<String>,
        revision: u32,
        field_definitions: Vec<FieldDefinition>,
    ) -> Self {
        let name = name.into();
        let shape = SymbolShape::for_name(&name);
        Self {
            name,
            revision,
            field_definitions,
            tags: Tags::None,
            shape,
        }
    }

    /// Like [`SymbolDefinition::new`] but with an explicit shape. A shape
    /// that disagrees with the one registered for `name` is a wiring bug
    /// in the caller, checked in debug builds only.
    pub fn with_shape(
        name: impl Into<String>,
        revision: u32,
        field_definitions: Vec<FieldDefinition>,
        shape: SymbolShape,
    ) -> Self {
        let name = name.into();
        debug_assert!(
            shape == SymbolShape::Generic || shape == SymbolShape::for_name(&name),
            "shape {shape:?} is not registered for definition '{name}'",
        );
        Self {
            name,
            revision,
            field_definitions,
            tags: Tags::None,
            shape,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn field_definitions(&self) -> &[FieldDefinition] {
        &self.field_definitions
    }

    pub fn field_definition(&self, index: usize) -> Option<&FieldDefinition> {
        self.field_definitions.get(index)
    }

    /// Index of the column named `name`, if any.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.field_definitions
            .iter()
            .position(|field| field.name() == name)
    }

    pub fn shape(&self) -> SymbolShape {
        self.shape
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.add(tag);
    }
}

/// Resolves definition names, preferring built-ins and keeping the highest
/// revision of each extension-registered definition.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    custom: FxHashMap<String, Arc<SymbolDefinition>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `name`, checking the built-in table first and extension
    /// registrations second.
    pub fn try_get(&self, name: &str) -> Option<Arc<SymbolDefinition>> {
        builtin_definition(name)
            .cloned()
            .or_else(|| self.custom.get(name).cloned())
    }

    /// Register an extension definition.
    ///
    /// An existing definition with the same name is replaced only when the
    /// new revision is strictly greater; otherwise the call is a silent
    /// no-op, so reloading an older extension cannot downgrade a schema a
    /// newer one already upgraded. Returns whether the definition was
    /// installed.
    pub fn register(&mut self, definition: SymbolDefinition) -> bool {
        match self.custom.get(definition.name()) {
            Some(existing) if definition.revision() <= existing.revision() => false,
            _ => {
                self.custom
                    .insert(definition.name().to_owned(), Arc::new(definition));
                true
            }
        }
    }

    pub fn custom_definitions(&self) -> impl Iterator<Item = &Arc<SymbolDefinition>> {
        self.custom.values()
    }
}

/// Look up a built-in definition by exact name.
pub fn builtin_definition(name: &str) -> Option<&'static Arc<SymbolDefinition>> {
    BUILTIN_DEFINITIONS.get(name)
}

/// Names of every built-in definition, in registration order.
pub fn builtin_definition_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_NAMES.iter().copied()
}

macro_rules! builtin {
    ($table:expr, $name:literal, [$(($field:literal, $type:ident)),* $(,)?]) => {
        $table.insert(
            $name,
            Arc::new(SymbolDefinition::new(
                $name,
                0,
                vec![$(FieldDefinition::new($field, FieldType::$type),)*],
            )),
        );
    };
}

static BUILTIN_NAMES: &[&str] = &[
    "ActionText",
    "AppSearch",
    "Binary",
    "CheckBox",
    "Class",
    "ComboBox",
    "Component",
    "Condition",
    "Control",
    "ControlCondition",
    "ControlEvent",
    "CreateFolder",
    "CustomAction",
    "Dialog",
    "Directory",
    "DuplicateFile",
    "Environment",
    "Error",
    "EventMapping",
    "Extension",
    "Feature",
    "FeatureComponents",
    "File",
    "Icon",
    "IniFile",
    "InstallExecuteSequence",
    "InstallUISequence",
    "LaunchCondition",
    "ListBox",
    "ListView",
    "Media",
    "MIME",
    "ModuleSignature",
    "MsiShortcut",
    "ProgId",
    "Property",
    "RadioButton",
    "RegLocator",
    "Registry",
    "RemoveFile",
    "RemoveRegistry",
    "ServiceControl",
    "ServiceInstall",
    "Shortcut",
    "Signature",
    "TextStyle",
    "TypeLib",
    "UIText",
    "Upgrade",
    "Verb",
];

static BUILTIN_DEFINITIONS: Lazy<FxHashMap<&'static str, Arc<SymbolDefinition>>> =
    Lazy::new(|| {
        let mut table = FxHashMap::default();

        builtin!(table, "ActionText", [("Action", String), ("Description", String), ("Template", String)]);
        builtin!(table, "AppSearch", [("Property", String), ("Signature_", String)]);
        builtin!(table, "Binary", [("Data", Path)]);
        builtin!(table, "CheckBox", [("Property", String), ("Value", String)]);
        builtin!(table, "Class", [("CLSID", String), ("Context", String), ("Component_", String), ("ProgId_Default", String), ("Description", String), ("AppId_", String), ("FileTypeMask", String), ("Icon_", String), ("IconIndex", Number), ("DefInprocHandler", String), ("Argument", String), ("Feature_", String), ("Attributes", Number)]);
        builtin!(table, "ComboBox", [("Property", String), ("Order", Number), ("Value", String), ("Text", String)]);
        builtin!(table, "Component", [("ComponentId", String), ("Directory_", String), ("Attributes", Number), ("Condition", String), ("KeyPath", String)]);
        builtin!(table, "Condition", [("Feature_", String), ("Level", Number), ("Condition", String)]);
        builtin!(table, "Control", [("Dialog_", String), ("Control", String), ("Type", String), ("X", Number), ("Y", Number), ("Width", Number), ("Height", Number), ("Attributes", LargeNumber), ("Property", String), ("Text", String), ("Control_Next", String), ("Help", String)]);
        builtin!(table, "ControlCondition", [("Dialog_", String), ("Control_", String), ("Action", String), ("Condition", String)]);
        builtin!(table, "ControlEvent", [("Dialog_", String), ("Control_", String), ("Event", String), ("Argument", String), ("Condition", String), ("Ordering", Number)]);
        builtin!(table, "CreateFolder", [("Directory_", String), ("Component_", String)]);
        builtin!(table, "CustomAction", [("Type", Number), ("Source", String), ("Target", String), ("ExtendedType", Number)]);
        builtin!(table, "Dialog", [("HCentering", Number), ("VCentering", Number), ("Width", Number), ("Height", Number), ("Attributes", LargeNumber), ("Title", String), ("Control_First", String), ("Control_Default", String), ("Control_Cancel", String)]);
        builtin!(table, "Directory", [("Directory_Parent", String), ("DefaultDir", String)]);
        builtin!(table, "DuplicateFile", [("Component_", String), ("File_", String), ("DestName", String), ("DestFolder", String)]);
        builtin!(table, "Environment", [("Name", String), ("Value", String), ("Component_", String)]);
        builtin!(table, "Error", [("Error", Number), ("Message", String)]);
        builtin!(table, "EventMapping", [("Dialog_", String), ("Control_", String), ("Event", String), ("Attribute", String)]);
        builtin!(table, "Extension", [("Extension", String), ("Component_", String), ("ProgId_", String), ("MIME_", String), ("Feature_", String)]);
        builtin!(table, "Feature", [("Feature_Parent", String), ("Title", String), ("Description", String), ("Display", Number), ("Level", Number), ("Directory_", String), ("Attributes", Number)]);
        builtin!(table, "FeatureComponents", [("Feature_", String), ("Component_", String)]);
        builtin!(table, "File", [("Component_", String), ("Name", String), ("FileSize", LargeNumber), ("Version", String), ("Language", String), ("Attributes", Number), ("Sequence", Number), ("Source", Path)]);
        builtin!(table, "Icon", [("Data", Path)]);
        builtin!(table, "IniFile", [("FileName", String), ("DirProperty", String), ("Section", String), ("Key", String), ("Value", String), ("Action", Number), ("Component_", String)]);
        builtin!(table, "InstallExecuteSequence", [("Action", String), ("Condition", String), ("Sequence", Number)]);
        builtin!(table, "InstallUISequence", [("Action", String), ("Condition", String), ("Sequence", Number)]);
        builtin!(table, "LaunchCondition", [("Condition", String), ("Description", String)]);
        builtin!(table, "ListBox", [("Property", String), ("Order", Number), ("Value", String), ("Text", String)]);
        builtin!(table, "ListView", [("Property", String), ("Order", Number), ("Value", String), ("Text", String), ("Binary_", String)]);
        builtin!(table, "Media", [("DiskId", Number), ("LastSequence", Number), ("DiskPrompt", String), ("Cabinet", String), ("VolumeLabel", String), ("Source", String)]);
        builtin!(table, "MIME", [("ContentType", String), ("Extension_", String), ("CLSID", String)]);
        builtin!(table, "ModuleSignature", [("ModuleID", String), ("Language", Number), ("Version", String)]);
        builtin!(table, "MsiShortcut", [("Directory_", String), ("Name", String), ("Component_", String), ("Target", String)]);
        builtin!(table, "ProgId", [("ProgId", String), ("ProgId_Parent", String), ("Class_", String), ("Description", String), ("Icon_", String), ("IconIndex", Number)]);
        builtin!(table, "Property", [("Value", String)]);
        builtin!(table, "RadioButton", [("Property", String), ("Order", Number), ("Value", String), ("X", Number), ("Y", Number), ("Width", Number), ("Height", Number), ("Text", String), ("Help", String)]);
        builtin!(table, "RegLocator", [("Root", Number), ("Key", String), ("Name", String), ("Type", Number)]);
        builtin!(table, "Registry", [("Root", Number), ("Key", String), ("Name", String), ("Value", String), ("Component_", String)]);
        builtin!(table, "RemoveFile", [("Component_", String), ("FileName", String), ("DirProperty", String), ("InstallMode", Number)]);
        builtin!(table, "RemoveRegistry", [("Root", Number), ("Key", String), ("Name", String), ("Component_", String)]);
        builtin!(table, "ServiceControl", [("Name", String), ("Event", Number), ("Arguments", String), ("Wait", Bool), ("Component_", String)]);
        builtin!(table, "ServiceInstall", [("Name", String), ("DisplayName", String), ("ServiceType", Number), ("StartType", Number), ("ErrorControl", Number), ("LoadOrderGroup", String), ("Dependencies", String), ("StartName", String), ("Password", String), ("Arguments", String), ("Description", String), ("Component_", String)]);
        builtin!(table, "Shortcut", [("Directory_", String), ("Name", String), ("Component_", String), ("Target", String), ("Arguments", String), ("Description", String), ("Hotkey", Number), ("Icon_", String), ("IconIndex", Number), ("ShowCmd", Number), ("WkDir", String)]);
        builtin!(table, "Signature", [("FileName", String), ("MinVersion", String), ("MaxVersion", String), ("MinSize", Number), ("MaxSize", Number), ("MinDate", Number), ("MaxDate", Number), ("Languages", String)]);
        builtin!(table, "TextStyle", [("FaceName", String), ("Size", Number), ("Color", Number), ("StyleBits", Number)]);
        builtin!(table, "TypeLib", [("LibID", String), ("Language", Number), ("Component_", String), ("Version", Number), ("Description", String), ("Directory_", String), ("Feature_", String), ("Cost", Number)]);
        builtin!(table, "UIText", [("Text", String)]);
        builtin!(table, "Upgrade", [("UpgradeCode", String), ("VersionMin", String), ("VersionMax", String), ("Language", String), ("Attributes", Number), ("Remove", String), ("ActionProperty", String)]);
        builtin!(table, "Verb", [("Extension_", String), ("Verb", String), ("Sequence", Number), ("Command", String), ("Argument", String)]);

        debug_assert_eq!(table.len(), BUILTIN_NAMES.len());
        table
    });

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(revision: u32) -> SymbolDefinition {
        SymbolDefinition::new(
            "Foo",
            revision,
            vec![FieldDefinition::new("Value", FieldType::String)],
        )
    }

    #[test]
    fn builtin_lookup_is_exact() {
        let component = builtin_definition("Component").unwrap();
        assert_eq!(component.name(), "Component");
        assert_eq!(component.shape(), SymbolShape::Component);
        assert_eq!(component.field_index("KeyPath"), Some(4));
        assert!(builtin_definition("component").is_none());
    }

    #[test]
    fn every_builtin_name_resolves() {
        for name in builtin_definition_names() {
            assert!(builtin_definition(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn registration_keeps_highest_revision() {
        let mut registry = DefinitionRegistry::new();
        assert!(registry.register(definition(1)));
        assert!(registry.register(definition(3)));
        // Lower revision after higher is a silent no-op.
        assert!(!registry.register(definition(2)));
        assert_eq!(registry.try_get("Foo").unwrap().revision(), 3);

        let mut registry = DefinitionRegistry::new();
        assert!(registry.register(definition(3)));
        assert!(!registry.register(definition(1)));
        assert_eq!(registry.try_get("Foo").unwrap().revision(), 3);
    }

    #[test]
    fn equal_revision_is_a_no_op() {
        let mut registry = DefinitionRegistry::new();
        registry.register(definition(2));
        assert!(!registry.register(definition(2)));
    }

    #[test]
    fn builtins_shadow_custom_registrations() {
        let mut registry = DefinitionRegistry::new();
        registry.register(SymbolDefinition::new("Property", 9, Vec::new()));
        // Lookup prefers the static built-in table.
        assert_eq!(registry.try_get("Property").unwrap().revision(), 0);
    }

    #[test]
    fn tags_behave_like_a_set() {
        let mut tags = Tags::None;
        tags.add("patchable");
        tags.add("patchable");
        tags.add("unreal");
        assert!(tags.contains("patchable"));
        assert!(tags.contains("unreal"));
        assert_eq!(tags.iter().count(), 2);
    }
}
