//! Field registry built from control naming conventions.
//!
//! # Responsibility
//! - Resolve each control id to a type and record variable name.
//! - Wire weight-normalized (`...Norm`) controls to their raw sibling and the
//!   body-weight control.
//!
//! # Invariants
//! - Prefix matching is longest-prefix over `PREFIX_RULES`, in table order.
//! - Controls without a known prefix are never bound.
//! - Every bound control maps to exactly one variable name and vice versa.
//! - Every derived control has an existing raw sibling (`Norm` -> `NormUn`).
//!
//! # See also
//! - `binding::codec` for per-type value conversion.

use crate::model::control::{ControlDecl, ControlProps, ControlType};
use log::{error, info};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Id suffix marking a weight-normalized (derived) control.
pub const DERIVED_SUFFIX: &str = "Norm";
const DERIVED_SOURCE_MARKER: &str = "NormUn";

#[derive(Debug, Clone, Copy)]
struct PrefixRule {
    prefix: &'static str,
    control_type: ControlType,
    strip_prefix: bool,
}

// Longer prefixes first so that `csb`/`cmt` win over any two-letter rule.
const PREFIX_RULES: &[PrefixRule] = &[
    PrefixRule {
        prefix: "csb",
        control_type: ControlType::CompoundAngle,
        strip_prefix: true,
    },
    PrefixRule {
        prefix: "cmt",
        control_type: ControlType::MultilineText,
        strip_prefix: false,
    },
    PrefixRule {
        prefix: "sp",
        control_type: ControlType::Numeric,
        strip_prefix: true,
    },
    PrefixRule {
        prefix: "ln",
        control_type: ControlType::Text,
        strip_prefix: true,
    },
    PrefixRule {
        prefix: "cb",
        control_type: ControlType::Choice,
        strip_prefix: true,
    },
    PrefixRule {
        prefix: "xb",
        control_type: ControlType::Boolean,
        strip_prefix: true,
    },
];

/// Resolves a control id to its bound type and variable name.
///
/// Returns `None` for ids that carry no binding prefix (labels, buttons,
/// `rdonly_*` patient fields and so on).
pub fn resolve_control_id(id: &str) -> Option<(ControlType, String)> {
    PREFIX_RULES
        .iter()
        .find(|rule| id.starts_with(rule.prefix))
        .map(|rule| {
            let variable = if rule.strip_prefix {
                id[rule.prefix.len()..].to_string()
            } else {
                id.to_string()
            };
            (rule.control_type, variable)
        })
}

/// Configuration defects detected while building the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Declared control type disagrees with the id prefix.
    TypeMismatch {
        id: String,
        declared: ControlType,
        expected: ControlType,
    },
    /// Prefix stripping left nothing.
    EmptyVariableName(String),
    DuplicateControl(String),
    /// Two controls resolve to the same variable name.
    DuplicateVariable {
        variable: String,
        first: String,
        second: String,
    },
    /// `...Norm` control without its `...NormUn` sibling.
    MissingNormSource { id: String, expected_source: String },
    /// Raw sibling of a derived control does not hold numbers.
    InvalidNormSource { id: String, source: String },
    /// Derived controls must be numeric spin boxes.
    DerivedNotNumeric(String),
    /// Derived controls exist but the body-weight control is not bound.
    MissingBodyWeight(String),
    BodyWeightNotNumeric(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration error: ")?;
        match self {
            Self::TypeMismatch {
                id,
                declared,
                expected,
            } => write!(
                f,
                "control `{id}` is declared {declared:?} but its prefix means {expected:?}"
            ),
            Self::EmptyVariableName(id) => {
                write!(f, "control `{id}` yields an empty variable name")
            }
            Self::DuplicateControl(id) => write!(f, "control `{id}` is declared twice"),
            Self::DuplicateVariable {
                variable,
                first,
                second,
            } => write!(
                f,
                "controls `{first}` and `{second}` both map to variable `{variable}`"
            ),
            Self::MissingNormSource {
                id,
                expected_source,
            } => write!(
                f,
                "derived control `{id}` requires missing control `{expected_source}`"
            ),
            Self::InvalidNormSource { id, source } => write!(
                f,
                "derived control `{id}` depends on non-numeric control `{source}`"
            ),
            Self::DerivedNotNumeric(id) => {
                write!(f, "derived control `{id}` must be a numeric control")
            }
            Self::MissingBodyWeight(id) => {
                write!(f, "body-weight control `{id}` is not declared")
            }
            Self::BodyWeightNotNumeric(id) => {
                write!(f, "body-weight control `{id}` must be a numeric control")
            }
        }
    }
}

impl Error for RegistryError {}

/// Dependencies of a weight-normalized control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedFrom {
    /// Raw (unnormalized) value control id.
    pub raw: String,
    /// Body-weight control id.
    pub weight: String,
}

/// Immutable binding descriptor for one control.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlBinding {
    pub id: String,
    pub control_type: ControlType,
    pub props: ControlProps,
    pub variable_name: String,
    /// Present only for derived controls.
    pub derived_from: Option<DerivedFrom>,
}

impl ControlBinding {
    pub fn is_derived(&self) -> bool {
        self.derived_from.is_some()
    }

    /// Ordered dependency ids: raw value first, then body weight.
    pub fn depends_on(&self) -> Vec<&str> {
        match &self.derived_from {
            Some(from) => vec![from.raw.as_str(), from.weight.as_str()],
            None => Vec::new(),
        }
    }
}

/// Canonical set of bound controls for one form.
#[derive(Debug, Clone)]
pub struct Registry {
    controls: Vec<ControlBinding>,
    by_id: HashMap<String, usize>,
    by_variable: BTreeMap<String, usize>,
    body_weight_control: String,
}

impl Registry {
    /// Builds the registry from declared controls.
    ///
    /// Unprefixed declarations are skipped. Derived wiring is checked here,
    /// once, so the binding path never has to.
    ///
    /// # Errors
    /// - Any [`RegistryError`] for naming or wiring defects.
    pub fn build(decls: &[ControlDecl], body_weight_control: &str) -> Result<Self, RegistryError> {
        match Self::build_inner(decls, body_weight_control) {
            Ok(registry) => {
                info!(
                    "event=registry_build module=binding status=ok controls={} derived={} skipped={}",
                    registry.len(),
                    registry.derived_controls().count(),
                    decls.len() - registry.len()
                );
                Ok(registry)
            }
            Err(err) => {
                error!(
                    "event=registry_build module=binding status=error error={}",
                    err
                );
                Err(err)
            }
        }
    }

    fn build_inner(decls: &[ControlDecl], body_weight_control: &str) -> Result<Self, RegistryError> {
        let mut controls = Vec::new();
        let mut by_id = HashMap::new();
        let mut by_variable = BTreeMap::new();

        for decl in decls {
            let Some((expected, variable_name)) = resolve_control_id(&decl.id) else {
                continue;
            };
            if decl.control_type != expected {
                return Err(RegistryError::TypeMismatch {
                    id: decl.id.clone(),
                    declared: decl.control_type,
                    expected,
                });
            }
            if variable_name.is_empty() {
                return Err(RegistryError::EmptyVariableName(decl.id.clone()));
            }
            if by_id.contains_key(&decl.id) {
                return Err(RegistryError::DuplicateControl(decl.id.clone()));
            }
            if let Some(&first) = by_variable.get(&variable_name) {
                let first: &ControlBinding = &controls[first];
                return Err(RegistryError::DuplicateVariable {
                    variable: variable_name,
                    first: first.id.clone(),
                    second: decl.id.clone(),
                });
            }

            let index = controls.len();
            by_id.insert(decl.id.clone(), index);
            by_variable.insert(variable_name.clone(), index);
            controls.push(ControlBinding {
                id: decl.id.clone(),
                control_type: decl.control_type,
                props: decl.props.clone(),
                variable_name,
                derived_from: None,
            });
        }

        let mut registry = Self {
            controls,
            by_id,
            by_variable,
            body_weight_control: body_weight_control.to_string(),
        };
        registry.wire_derived()?;
        Ok(registry)
    }

    fn wire_derived(&mut self) -> Result<(), RegistryError> {
        let mut wiring = Vec::new();
        for (index, control) in self.controls.iter().enumerate() {
            if !control.id.ends_with(DERIVED_SUFFIX) {
                continue;
            }
            if control.control_type != ControlType::Numeric {
                return Err(RegistryError::DerivedNotNumeric(control.id.clone()));
            }
            let raw = control.id.replace(DERIVED_SUFFIX, DERIVED_SOURCE_MARKER);
            let Some(source) = self.get(&raw) else {
                return Err(RegistryError::MissingNormSource {
                    id: control.id.clone(),
                    expected_source: raw,
                });
            };
            if !source.control_type.has_unit() {
                return Err(RegistryError::InvalidNormSource {
                    id: control.id.clone(),
                    source: raw,
                });
            }
            wiring.push((index, raw));
        }

        if wiring.is_empty() {
            return Ok(());
        }

        let weight = self.body_weight_control.clone();
        match self.get(&weight) {
            None => return Err(RegistryError::MissingBodyWeight(weight)),
            Some(control) if control.control_type != ControlType::Numeric => {
                return Err(RegistryError::BodyWeightNotNumeric(weight));
            }
            Some(_) => {}
        }

        for (index, raw) in wiring {
            self.controls[index].derived_from = Some(DerivedFrom {
                raw,
                weight: weight.clone(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Bound controls in declaration order.
    pub fn controls(&self) -> impl Iterator<Item = &ControlBinding> {
        self.controls.iter()
    }

    pub fn get(&self, control_id: &str) -> Option<&ControlBinding> {
        self.by_id.get(control_id).map(|&index| &self.controls[index])
    }

    pub fn by_variable(&self, variable_name: &str) -> Option<&ControlBinding> {
        self.by_variable
            .get(variable_name)
            .map(|&index| &self.controls[index])
    }

    pub fn all_variable_names(&self) -> BTreeSet<String> {
        self.by_variable.keys().cloned().collect()
    }

    pub fn body_weight_control(&self) -> &str {
        &self.body_weight_control
    }

    pub fn derived_controls(&self) -> impl Iterator<Item = &ControlBinding> {
        self.controls.iter().filter(|control| control.is_derived())
    }

    /// Derived controls that list `control_id` among their dependencies.
    pub fn dependents_of<'a>(
        &'a self,
        control_id: &'a str,
    ) -> impl Iterator<Item = &'a ControlBinding> + 'a {
        self.derived_controls()
            .filter(move |control| control.depends_on().contains(&control_id))
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_control_id;
    use crate::model::control::ControlType;

    #[test]
    fn resolve_strips_type_prefix() {
        assert_eq!(
            resolve_control_id("spAntropPaino"),
            Some((ControlType::Numeric, "AntropPaino".to_string()))
        );
        assert_eq!(
            resolve_control_id("csbLonkkaFleksioOik"),
            Some((ControlType::CompoundAngle, "LonkkaFleksioOik".to_string()))
        );
        assert_eq!(
            resolve_control_id("lnTiedotNimi"),
            Some((ControlType::Text, "TiedotNimi".to_string()))
        );
        assert_eq!(
            resolve_control_id("cbKyselyApuvaline"),
            Some((ControlType::Choice, "KyselyApuvaline".to_string()))
        );
        assert_eq!(
            resolve_control_id("xbTasapSilmatKiinni"),
            Some((ControlType::Boolean, "TasapSilmatKiinni".to_string()))
        );
    }

    #[test]
    fn comment_controls_keep_full_id() {
        assert_eq!(
            resolve_control_id("cmtLonkka"),
            Some((ControlType::MultilineText, "cmtLonkka".to_string()))
        );
    }

    #[test]
    fn unprefixed_controls_are_not_bound() {
        assert_eq!(resolve_control_id("rdonly_firstname"), None);
        assert_eq!(resolve_control_id("btnSave"), None);
        assert_eq!(resolve_control_id("tabLonkka"), None);
    }
}
