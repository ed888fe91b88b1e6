//! # Node Editor
//!
//! Classifies any `(value, declared type, path)` triple into exactly one
//! editing mode and applies the actions that mode allows.
//!
//! ```text
//!                 declared list / list value ──► List        append, duplicate(i), remove(i)
//!                 class with subtypes,
//!                 not yet resolved ────────────► Polymorphic select_type(t)
//! (value, type) ─► object present ─────────────► Composite   (children carry the actions)
//!                 scalar type ─────────────────► Atomic      set_scalar(input)
//!                 otherwise ───────────────────► Absent      initialize
//! ```
//!
//! Nodes carry no callbacks. A presentation layer reads a [`Node`] tree,
//! sends back an [`EditAction`] for one [`Path`], and the session routes
//! it through [`NodeEditor::apply`] inside a commit.

use serde::{Deserialize, Serialize};
use std::fmt;

use triogui_dataset::Value;
use triogui_schema::{SchemaOracle, TypeRef};

use crate::errors::{EditorError, EditorResult};
use crate::path::{self, Path, PathError, Step};

/// Bare classification tag of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    List,
    Polymorphic,
    Composite,
    Atomic,
    Absent,
}

impl Classification {
    pub fn name(self) -> &'static str {
        match self {
            Classification::List => "list",
            Classification::Polymorphic => "polymorphic",
            Classification::Composite => "composite",
            Classification::Atomic => "atomic",
            Classification::Absent => "absent",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Str,
    Int,
    Float,
    Bool,
    Choice(Vec<String>),
}

impl ScalarKind {
    fn from_type(ty: &TypeRef) -> Option<Self> {
        match ty {
            TypeRef::Str => Some(ScalarKind::Str),
            TypeRef::Int => Some(ScalarKind::Int),
            TypeRef::Float => Some(ScalarKind::Float),
            TypeRef::Bool => Some(ScalarKind::Bool),
            TypeRef::Choice(options) => Some(ScalarKind::Choice(options.clone())),
            _ => None,
        }
    }

    /// Text and numbers commit when finalized, toggles and dropdowns at once
    pub fn commit_policy(&self) -> CommitPolicy {
        match self {
            ScalarKind::Str | ScalarKind::Int | ScalarKind::Float => CommitPolicy::OnFinalize,
            ScalarKind::Bool | ScalarKind::Choice(_) => CommitPolicy::Immediate,
        }
    }

    fn accepts(&self, input: &ScalarInput) -> bool {
        matches!(
            (self, input),
            (ScalarKind::Str | ScalarKind::Int | ScalarKind::Float, ScalarInput::Text(_))
                | (ScalarKind::Bool, ScalarInput::Bool(_))
                | (ScalarKind::Choice(_), ScalarInput::Choice(_) | ScalarInput::Text(_))
        )
    }

    fn expected(&self) -> &'static str {
        match self {
            ScalarKind::Str => "text",
            ScalarKind::Int => "an integer",
            ScalarKind::Float => "a finite number",
            ScalarKind::Bool => "a boolean",
            ScalarKind::Choice(_) => "a choice",
        }
    }

    /// Turn raw input into the value to commit.
    ///
    /// `Ok(None)` means there is nothing to commit (blank input).
    pub fn parse(&self, input: &ScalarInput) -> EditorResult<Option<Value>> {
        match (self, input) {
            (ScalarKind::Bool, ScalarInput::Bool(flag)) => Ok(Some(Value::Bool(*flag))),
            (ScalarKind::Str, ScalarInput::Text(text)) => {
                Ok(non_blank(text).map(Value::str))
            }
            (ScalarKind::Int, ScalarInput::Text(text)) => match non_blank(text) {
                None => Ok(None),
                Some(t) => t
                    .parse::<i64>()
                    .map(|i| Some(Value::Int(i)))
                    .map_err(|_| EditorError::malformed(text.as_str(), self.expected())),
            },
            (ScalarKind::Float, ScalarInput::Text(text)) => match non_blank(text) {
                None => Ok(None),
                Some(t) => match t.parse::<f64>() {
                    Ok(f) if f.is_finite() => Ok(Some(Value::Float(f))),
                    _ => Err(EditorError::malformed(text.as_str(), self.expected())),
                },
            },
            (ScalarKind::Choice(options), ScalarInput::Choice(text) | ScalarInput::Text(text)) => {
                let Some(choice) = non_blank(text) else {
                    return Ok(None);
                };
                if !options.iter().any(|o| o == choice) {
                    tracing::warn!("[NodeEditor] '{}' is not among {:?}", choice, options);
                }
                Ok(Some(Value::Choice(choice.to_string())))
            }
            (kind, other) => Err(EditorError::malformed(other.to_string(), kind.expected())),
        }
    }
}

fn non_blank(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Commit when the caller signals the value is final
    OnFinalize,
    /// Commit on every change
    Immediate,
}

/// Raw user input for an atomic node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarInput {
    Text(String),
    Bool(bool),
    Choice(String),
}

impl fmt::Display for ScalarInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarInput::Text(text) | ScalarInput::Choice(text) => f.write_str(text),
            ScalarInput::Bool(flag) => write!(f, "{}", flag),
        }
    }
}

/// Message sent back by the presentation layer for one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
    SetScalar(ScalarInput),
    SelectType(String),
    Append,
    Duplicate(usize),
    Remove(usize),
    Initialize,
}

impl EditAction {
    pub fn name(&self) -> &'static str {
        match self {
            EditAction::SetScalar(_) => "set_scalar",
            EditAction::SelectType(_) => "select_type",
            EditAction::Append => "append",
            EditAction::Duplicate(_) => "duplicate",
            EditAction::Remove(_) => "remove",
            EditAction::Initialize => "initialize",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeMode {
    List {
        element: TypeRef,
        items: Vec<Node>,
    },
    Polymorphic {
        base: String,
        choices: Vec<String>,
        selected: Option<String>,
        /// The current value as a composite of its runtime type
        resolved: Option<Box<Node>>,
    },
    Composite {
        type_name: String,
        fields: Vec<Node>,
    },
    Atomic {
        kind: ScalarKind,
        value: Option<Value>,
        commit: CommitPolicy,
    },
    Absent {
        /// What `Initialize` creates
        initializer: TypeRef,
    },
}

/// One editable position in the tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub path: Path,
    pub label: String,
    pub description: String,
    pub declared: TypeRef,
    pub runtime_type: Option<String>,
    pub mode: NodeMode,
}

impl Node {
    pub fn classification(&self) -> Classification {
        match self.mode {
            NodeMode::List { .. } => Classification::List,
            NodeMode::Polymorphic { .. } => Classification::Polymorphic,
            NodeMode::Composite { .. } => Classification::Composite,
            NodeMode::Atomic { .. } => Classification::Atomic,
            NodeMode::Absent { .. } => Classification::Absent,
        }
    }

    /// Whether `action` is bound on this node
    pub fn accepts(&self, action: &EditAction) -> bool {
        match (&self.mode, action) {
            (NodeMode::List { .. }, EditAction::Append) => true,
            (NodeMode::List { items, .. }, EditAction::Duplicate(i) | EditAction::Remove(i)) => {
                *i < items.len()
            }
            (NodeMode::Polymorphic { choices, .. }, EditAction::SelectType(t)) => choices.contains(t),
            (NodeMode::Atomic { kind, .. }, EditAction::SetScalar(input)) => kind.accepts(input),
            (NodeMode::Absent { .. }, EditAction::Initialize) => true,
            _ => false,
        }
    }

    /// Direct children: list items, fields, or the resolved composite's fields
    pub fn children(&self) -> &[Node] {
        match &self.mode {
            NodeMode::List { items, .. } => items,
            NodeMode::Composite { fields, .. } => fields,
            NodeMode::Polymorphic {
                resolved: Some(inner),
                ..
            } => inner.children(),
            _ => &[],
        }
    }

    /// Committed scalar value of an atomic node
    pub fn scalar(&self) -> Option<&Value> {
        match &self.mode {
            NodeMode::Atomic { value, .. } => value.as_ref(),
            _ => None,
        }
    }
}

/// How the root object of an anchor is declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootType {
    /// Any concrete descendant of `base` may be selected
    Polymorphic { base: String },
    /// The root is edited as its runtime type
    Resolved,
}

impl RootType {
    fn declared(&self, root: &Value) -> (TypeRef, bool) {
        match self {
            RootType::Polymorphic { base } => (TypeRef::class(base.clone()), false),
            RootType::Resolved => (
                TypeRef::class(root.type_name().unwrap_or_default()),
                true,
            ),
        }
    }
}

/// Reflection-driven editor over a value tree
pub struct NodeEditor<'s, S: SchemaOracle + ?Sized> {
    schema: &'s S,
}

impl<'s, S: SchemaOracle + ?Sized> NodeEditor<'s, S> {
    pub fn new(schema: &'s S) -> Self {
        Self { schema }
    }

    /// Whole tree below an anchor's root
    pub fn classify_root(&self, root: &Value, root_type: &RootType) -> EditorResult<Node> {
        self.locate(root, root_type, &Path::root())
    }

    /// Node at `path`; every step above it must hold a value
    pub fn locate(&self, root: &Value, root_type: &RootType, path: &Path) -> EditorResult<Node> {
        let (mut declared, resolved) = root_type.declared(root);
        let mut label = root.type_name().unwrap_or_default().to_string();
        let mut description = String::new();
        let mut current = Some(root);

        for (depth, step) in path.steps().iter().enumerate() {
            let value = current.ok_or_else(|| PathError::BrokenPath {
                path: path.to_string(),
                step: path.prefix(depth).to_string(),
            })?;

            match step {
                Step::Field(name) => {
                    let obj = value.as_object().ok_or_else(|| PathError::NotAComposite {
                        path: path.prefix(depth).to_string(),
                    })?;
                    let meta = self.schema.field(&obj.type_name, name)?;
                    current = obj.get(&meta.name);
                    declared = meta.ty.clone();
                    label = meta.name.clone();
                    description = meta.description.clone();
                }
                Step::Index(i) => {
                    let items = value.as_list().ok_or_else(|| PathError::NotAList {
                        path: path.prefix(depth).to_string(),
                    })?;
                    let item = items.get(*i).ok_or_else(|| PathError::IndexOutOfRange {
                        path: path.prefix(depth).to_string(),
                        index: *i,
                        len: items.len(),
                    })?;
                    current = Some(item);
                    declared = element_of(&declared);
                    label = format!("[{}]", i);
                    description = String::new();
                }
            }
        }

        let resolved = resolved && path.is_root();
        self.classify(current, &declared, path.clone(), label, description, resolved)
    }

    /// Classify one value against its declared type.
    ///
    /// `resolved` marks a node whose polymorphic choice was already made,
    /// so it is shown as a composite instead of offering the selector again.
    pub fn classify(
        &self,
        value: Option<&Value>,
        declared: &TypeRef,
        path: Path,
        label: String,
        description: String,
        resolved: bool,
    ) -> EditorResult<Node> {
        let (element, is_list) = declared.normalized();
        let runtime_type = value.and_then(Value::type_name).map(str::to_string);

        let mode = if is_list || matches!(value, Some(Value::List(_))) {
            self.classify_list(value, declared, &path)?
        } else if let TypeRef::Class(base) = &element {
            if !resolved && self.schema.has_subclasses(base) {
                let choices = self.schema.choices_for(base)?;
                let inner = match runtime_type.as_ref() {
                    Some(runtime) => Some(Box::new(self.classify(
                        value,
                        &TypeRef::class(runtime.clone()),
                        path.clone(),
                        label.clone(),
                        description.clone(),
                        true,
                    )?)),
                    None => None,
                };
                NodeMode::Polymorphic {
                    base: base.clone(),
                    choices,
                    selected: runtime_type.clone(),
                    resolved: inner,
                }
            } else {
                match value {
                    Some(Value::Object(obj)) => NodeMode::Composite {
                        type_name: obj.type_name.clone(),
                        fields: self
                            .schema
                            .fields_of(&obj.type_name)?
                            .iter()
                            .map(|meta| {
                                self.classify(
                                    obj.get(&meta.name),
                                    &meta.ty,
                                    path.join(Step::Field(meta.name.clone())),
                                    meta.name.clone(),
                                    meta.description.clone(),
                                    false,
                                )
                            })
                            .collect::<EditorResult<Vec<_>>>()?,
                    },
                    _ => NodeMode::Absent {
                        initializer: element.clone(),
                    },
                }
            }
        } else {
            match ScalarKind::from_type(&element) {
                Some(kind) => NodeMode::Atomic {
                    commit: kind.commit_policy(),
                    kind,
                    value: value.cloned(),
                },
                None => NodeMode::Absent {
                    initializer: element.clone(),
                },
            }
        };

        Ok(Node {
            path,
            label,
            description,
            declared: declared.clone(),
            runtime_type,
            mode,
        })
    }

    fn classify_list(
        &self,
        value: Option<&Value>,
        declared: &TypeRef,
        path: &Path,
    ) -> EditorResult<NodeMode> {
        let element = element_of(declared);
        match value {
            Some(Value::List(items)) => {
                let items = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.classify(
                            Some(item),
                            &element,
                            path.join(Step::Index(i)),
                            format!("[{}]", i),
                            String::new(),
                            false,
                        )
                    })
                    .collect::<EditorResult<Vec<_>>>()?;
                Ok(NodeMode::List { element, items })
            }
            _ => Ok(NodeMode::Absent {
                initializer: TypeRef::list(element),
            }),
        }
    }

    /// Apply `action` to the node at `path`.
    ///
    /// Returns whether the tree changed. Errors leave `root` untouched.
    pub fn apply(
        &self,
        root: &mut Value,
        root_type: &RootType,
        path: &Path,
        action: &EditAction,
    ) -> EditorResult<bool> {
        let node = self.locate(root, root_type, path)?;

        if !node.accepts(action) {
            return Err(self.rejection(&node, action));
        }

        match (&node.mode, action) {
            (NodeMode::Atomic { kind, value, .. }, EditAction::SetScalar(input)) => {
                let parsed = match kind.parse(input) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        tracing::warn!("[NodeEditor] rejected input at {}: {}", path, e);
                        return Err(e);
                    }
                };
                let Some(parsed) = parsed else {
                    return Ok(false);
                };
                if value.as_ref() == Some(&parsed) {
                    return Ok(false);
                }
                Ok(path::set(self.schema, root, path, Some(parsed))?)
            }

            (NodeMode::Polymorphic { selected, .. }, EditAction::SelectType(type_name)) => {
                if selected.as_deref() == Some(type_name.as_str()) {
                    return Ok(false);
                }
                // Switching type discards the node's previous field values
                let fresh = self.schema.instantiate(type_name)?;
                tracing::debug!("[NodeEditor] select {} at {}", type_name, path);
                Ok(path::set(self.schema, root, path, Some(Value::Object(fresh)))?)
            }

            (NodeMode::List { element, .. }, EditAction::Append) => {
                let fresh = self.schema.default_for(element)?;
                list_at(self.schema, root, path)?.push(fresh);
                Ok(true)
            }

            (NodeMode::List { .. }, EditAction::Duplicate(i)) => {
                let items = list_at(self.schema, root, path)?;
                let copy = items[*i].clone();
                items.push(copy);
                Ok(true)
            }

            (NodeMode::List { .. }, EditAction::Remove(i)) => {
                list_at(self.schema, root, path)?.remove(*i);
                Ok(true)
            }

            (NodeMode::Absent { initializer }, EditAction::Initialize) => {
                let fresh = match initializer.normalized() {
                    (element, true) => Value::List(vec![self.schema.default_for(&element)?]),
                    (element, false) => self.schema.default_for(&element)?,
                };
                tracing::debug!("[NodeEditor] initialize {} as {}", path, initializer);
                Ok(path::set(self.schema, root, path, Some(fresh))?)
            }

            _ => Err(self.rejection(&node, action)),
        }
    }

    fn rejection(&self, node: &Node, action: &EditAction) -> EditorError {
        match (&node.mode, action) {
            (NodeMode::Polymorphic { base, .. }, EditAction::SelectType(value)) => {
                EditorError::UnknownChoice {
                    value: value.clone(),
                    base: base.clone(),
                }
            }
            (NodeMode::List { items, .. }, EditAction::Duplicate(i) | EditAction::Remove(i)) => {
                PathError::IndexOutOfRange {
                    path: node.path.to_string(),
                    index: *i,
                    len: items.len(),
                }
                .into()
            }
            (NodeMode::Atomic { kind, .. }, EditAction::SetScalar(input)) => {
                EditorError::malformed(input.to_string(), kind.expected())
            }
            _ => EditorError::not_available(action.name(), node.classification().name()),
        }
    }
}

/// Item type of a list node, one nesting level down.
///
/// A list under a non-list declaration keeps the declaration as its item type.
fn element_of(declared: &TypeRef) -> TypeRef {
    declared.normalized().0
}

fn list_at<'a, S: SchemaOracle + ?Sized>(
    schema: &S,
    root: &'a mut Value,
    path: &Path,
) -> EditorResult<&'a mut Vec<Value>> {
    path::get_mut(schema, root, path)?
        .as_list_mut()
        .ok_or_else(|| {
            PathError::NotAList {
                path: path.to_string(),
            }
            .into()
        })
}

/// Keystroke buffer for an atomic node.
///
/// Edits stay local until [`ScalarDraft::finalize`] turns them into a
/// single [`EditAction`]; nothing reaches the history before that.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarDraft {
    path: Path,
    committed: String,
    buffer: String,
}

impl ScalarDraft {
    /// Start a draft from an atomic node's committed value
    pub fn begin(node: &Node) -> Option<Self> {
        match &node.mode {
            NodeMode::Atomic { value, .. } => {
                let committed = value.as_ref().map(display_scalar).unwrap_or_default();
                Some(Self {
                    path: node.path.clone(),
                    buffer: committed.clone(),
                    committed,
                })
            }
            _ => None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn type_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub fn backspace(&mut self) {
        self.buffer.pop();
    }

    /// Replace the whole buffer
    pub fn replace(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    pub fn is_dirty(&self) -> bool {
        self.buffer != self.committed
    }

    /// The action to commit, or `None` if the text did not change
    pub fn finalize(self) -> Option<EditAction> {
        self.is_dirty()
            .then(|| EditAction::SetScalar(ScalarInput::Text(self.buffer)))
    }
}

/// Text shown for a committed scalar
pub fn display_scalar(value: &Value) -> String {
    match value {
        Value::Str(s) | Value::Choice(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(obj) => obj.type_name.clone(),
        Value::List(items) => format!("[{} items]", items.len()),
    }
}
