use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::file_object::GeneratedFileObject;

/// Where the host compiler looks for or puts files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    SourcePath,
    ClassPath,
    ClassOutput,
    SourceOutput,
    /// The host's module patch path as a whole.
    PatchModulePath,
    /// Class location of a named host module.
    Module(String),
    /// Patch location of one named host module.
    PatchModule(String),
    /// A generated file that may patch a type of an existing module.
    Patch(PatchLocation),
}

impl Location {
    pub fn is_output(&self) -> bool {
        matches!(self, Location::ClassOutput | Location::SourceOutput)
    }

    /// Locations whose listings may gain synthesized sources.
    pub fn may_hold_generated_sources(&self) -> bool {
        matches!(
            self,
            Location::SourcePath | Location::ClassPath | Location::PatchModule(_)
        )
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::SourcePath => f.write_str("SOURCE_PATH"),
            Location::ClassPath => f.write_str("CLASS_PATH"),
            Location::ClassOutput => f.write_str("CLASS_OUTPUT"),
            Location::SourceOutput => f.write_str("SOURCE_OUTPUT"),
            Location::PatchModulePath => f.write_str("PATCH_MODULE_PATH"),
            Location::Module(name) => write!(f, "MODULE[{name}]"),
            Location::PatchModule(name) => write!(f, "PATCH_MODULE[{name}]"),
            Location::Patch(patch) => write!(f, "PATCH[{}]", patch.file_name),
        }
    }
}

/// The host's view of one module: which classes each package holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostModule {
    /// `None` for the unnamed module.
    pub name: Option<String>,
    pub packages: BTreeMap<String, BTreeSet<String>>,
}

impl HostModule {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            packages: BTreeMap::new(),
        }
    }

    pub fn unnamed() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, package: &str, simple_name: &str) -> Self {
        self.packages
            .entry(package.to_string())
            .or_default()
            .insert(simple_name.to_string());
        self
    }

    pub fn contains(&self, package: &str, simple_name: &str) -> bool {
        self.packages
            .get(package)
            .is_some_and(|classes| classes.contains(simple_name))
    }
}

/// Location of a generated file that may patch an existing module's type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatchLocation {
    /// Slash separated file name, e.g. `java/lang/String.java`.
    pub file_name: String,
    /// Simple name of the class the host knows: the generated type's own name, or the enclosing
    /// file's base name for a fragment.
    pub physical_class: String,
}

impl PatchLocation {
    pub fn for_generated(file: &GeneratedFileObject) -> Self {
        let physical_class = match file.fragment() {
            Some(fragment) => fragment.base_name(),
            None => loom_core::name::simple_name(&file.fqn).to_string(),
        };
        Self {
            file_name: file.name(),
            physical_class,
        }
    }

    pub fn package(&self) -> String {
        match self.file_name.rfind('/') {
            Some(idx) => self.file_name[..idx].replace('/', "."),
            None => String::new(),
        }
    }

    /// The named module whose package holds the physical class.
    pub fn infer_module_name(&self, modules: &[HostModule]) -> Option<String> {
        let package = self.package();
        modules
            .iter()
            .filter_map(|module| module.name.as_ref().map(|name| (name, module)))
            .find(|(_, module)| module.contains(&package, &self.physical_class))
            .map(|(name, _)| name.clone())
    }
}
