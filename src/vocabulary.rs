//! Static HL7 vocabulary: segment names, field datatypes, component names, PHI list
//!
//! The vocabulary is loaded once at start-up into plain lookup tables and is
//! read-only afterwards. Every lookup is a direct map access; there is no
//! runtime cache.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Datatypes that never carry analyzable components in descriptions
const SIMPLE_TYPES: &[&str] = &["ST", "ID", "DT", "TM", "TX", "NM", "SI", "FT", "IS"];

/// One segment entry (`[[segment]]` in TOML)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SegmentDefinition {
    /// Three-letter segment name (e.g., "PID")
    pub name: String,
    /// Human-readable description
    pub description: String,
}

/// One field entry (`[[field]]` in TOML)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDefinition {
    /// Segment-qualified base path (e.g., "PID.5")
    pub path: String,
    /// Field name
    pub name: String,
    /// HL7 datatype code (e.g., "XPN")
    pub datatype: String,
}

/// One composite datatype (`[[datatype]]` in TOML)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatatypeDefinition {
    /// Datatype code (e.g., "CX")
    pub code: String,
    /// Component names in positional order (component 1 first)
    pub components: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct VocabularyFile {
    #[serde(default)]
    phi: Vec<String>,
    #[serde(default)]
    segment: Vec<SegmentDefinition>,
    #[serde(default)]
    field: Vec<FieldDefinition>,
    #[serde(default)]
    datatype: Vec<DatatypeDefinition>,
}

#[derive(Debug, Clone)]
struct FieldEntry {
    name: String,
    datatype: String,
}

/// Statically classified PHI field paths
///
/// A path is PHI when `SEG.path` equals an entry, or extends an entry by a
/// further `.component` part (`PID.5` covers `PID.5.1`, not `PID.50`).
#[derive(Debug, Clone, Default)]
pub struct PhiList {
    entries: HashSet<String>,
}

impl PhiList {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, segment: &str, path: &str) -> bool {
        let full = format!("{segment}.{path}");
        if self.entries.contains(&full) {
            return true;
        }
        // Walk up the dotted path: PID.5.1 -> PID.5
        let mut candidate = full.as_str();
        while let Some(idx) = candidate.rfind('.') {
            candidate = &candidate[..idx];
            if self.entries.contains(candidate) {
                return true;
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Immutable vocabulary lookup
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    segments: HashMap<String, String>,
    /// "SEG.N" → field entry
    fields: HashMap<String, FieldEntry>,
    /// datatype code → component number ("1", "2", ...) → component name
    datatypes: HashMap<String, HashMap<String, String>>,
    phi: PhiList,
}

impl Vocabulary {
    /// Load a vocabulary from a TOML file
    ///
    /// # Example TOML
    /// ```toml
    /// phi = ["PID.5", "PID.3.1"]
    ///
    /// [[segment]]
    /// name = "PID"
    /// description = "Patient Identification"
    ///
    /// [[field]]
    /// path = "PID.5"
    /// name = "Patient Name"
    /// datatype = "XPN"
    ///
    /// [[datatype]]
    /// code = "XPN"
    /// components = ["Family Name", "Given Name"]
    /// ```
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read vocabulary file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid vocabulary file: {}", path.as_ref().display()))
    }

    /// Default HL7 v2.5 vocabulary compiled into the binary
    pub fn default_hl7() -> Result<Self> {
        const DEFAULT_TOML: &str = include_str!("../vocabulary-default.toml");
        Self::from_toml_str(DEFAULT_TOML).context("Failed to parse embedded vocabulary-default.toml")
    }

    /// Parse a vocabulary from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: VocabularyFile =
            toml::from_str(content).context("Failed to parse TOML vocabulary")?;

        let mut fields = HashMap::new();
        for def in file.field {
            if let Some(existing) = fields.insert(
                def.path.clone(),
                FieldEntry {
                    name: def.name,
                    datatype: def.datatype,
                },
            ) {
                anyhow::bail!(
                    "Duplicate field '{}' in vocabulary (already named '{}')",
                    def.path,
                    existing.name
                );
            }
        }

        let datatypes = file
            .datatype
            .into_iter()
            .map(|def| {
                let components = def
                    .components
                    .into_iter()
                    .enumerate()
                    .map(|(i, name)| ((i + 1).to_string(), name))
                    .collect();
                (def.code, components)
            })
            .collect();

        Ok(Self {
            segments: file
                .segment
                .into_iter()
                .map(|s| (s.name, s.description))
                .collect(),
            fields,
            datatypes,
            phi: PhiList::new(file.phi),
        })
    }

    /// Load the three-file JSON schema layout
    ///
    /// - `hl7_segments.json`: `{"PID": "Patient Identification", ...}`
    /// - `hl7_fields.json`: `{"PID.5": {"field_name": "...", "field_type": "XPN"}, ...}`
    /// - `hl7_datatypes.json`: `{"XPN": {"1": {"name": "Family Name"}, ...}, "ST": "String", ...}`
    ///
    /// Only object-valued datatypes are composites. The PHI list is the
    /// default one; override it with [`Vocabulary::with_phi_fields`].
    pub fn from_schema_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        #[derive(Deserialize)]
        struct JsonField {
            #[serde(default)]
            field_name: String,
            #[serde(default)]
            field_type: String,
        }

        #[derive(Deserialize)]
        struct JsonComponent {
            #[serde(default)]
            name: String,
        }

        let dir = dir.as_ref();
        let segments: HashMap<String, String> = read_json(&dir.join("hl7_segments.json"))?;
        let raw_fields: HashMap<String, JsonField> = read_json(&dir.join("hl7_fields.json"))?;
        let raw_types: HashMap<String, serde_json::Value> =
            read_json(&dir.join("hl7_datatypes.json"))?;

        let fields = raw_fields
            .into_iter()
            .map(|(path, f)| {
                (
                    path,
                    FieldEntry {
                        name: f.field_name,
                        datatype: f.field_type,
                    },
                )
            })
            .collect();

        let mut datatypes = HashMap::new();
        for (code, value) in raw_types {
            if let serde_json::Value::Object(map) = value {
                let mut components = HashMap::new();
                for (number, component) in map {
                    let component: JsonComponent = serde_json::from_value(component)
                        .with_context(|| format!("Invalid component {code}.{number}"))?;
                    components.insert(number, component.name);
                }
                datatypes.insert(code, components);
            }
        }

        let defaults = Self::default_hl7()?;

        Ok(Self {
            segments,
            fields,
            datatypes,
            phi: defaults.phi,
        })
    }

    /// Replace the PHI allow-list
    pub fn with_phi_fields<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phi = PhiList::new(entries);
        self
    }

    /// Datatype code of the base field of `path` (empty when unknown)
    pub fn datatype_of(&self, segment: &str, path: &str) -> &str {
        let base = base_field(path);
        self.fields
            .get(&format!("{segment}.{base}"))
            .map(|f| f.datatype.as_str())
            .unwrap_or("")
    }

    /// True when the datatype has named components
    pub fn is_composite(&self, datatype: &str) -> bool {
        self.datatypes
            .get(datatype)
            .is_some_and(|components| !components.is_empty())
    }

    /// Human description of a field or component path
    pub fn description_of(&self, segment: &str, path: &str) -> String {
        let mut parts = path.split('.');
        let base = parts.next().unwrap_or_default();
        let Some(field) = self.fields.get(&format!("{segment}.{base}")) else {
            return String::new();
        };

        let component = parts.next();
        let component = match component {
            Some(c) if !SIMPLE_TYPES.contains(&field.datatype.as_str()) => c,
            _ => return field.name.clone(),
        };

        match self
            .datatypes
            .get(&field.datatype)
            .and_then(|components| components.get(component))
        {
            Some(name) if !name.is_empty() => format!("{} - {}", field.name, name),
            _ => field.name.clone(),
        }
    }

    /// Description of a segment (empty when unknown)
    pub fn segment_description(&self, segment: &str) -> &str {
        self.segments.get(segment).map(String::as_str).unwrap_or("")
    }

    /// True when the field path is statically classified as PHI
    pub fn is_phi(&self, segment: &str, path: &str) -> bool {
        self.phi.contains(segment, path)
    }

    /// Number of field definitions
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// Base field number of a dotted path ("5.1" → "5")
pub fn base_field(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid schema JSON: {}", path.display()))
}
