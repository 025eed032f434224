use serde::Serialize;
use strata_core_types::RunId;
use thiserror::Error;

/// Result type alias using StrataError
pub type Result<T> = std::result::Result<T, StrataError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used in deployment reports, log
/// lines and CLI output. The deployment kinds (`UnreadableEntity` through
/// `StructuralMismatch`) are the ones surfaced per entity in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    InvalidName,
    NotFound,
    AlreadyExists,
    CycleDetected,

    // Deployment
    UnreadableEntity,
    UnresolvedSchemaDependency,
    ConflictingInheritance,
    UnresolvedPrincipal,
    /// Shared component cycle: a structural note, not a failure
    CyclicShutdownGuard,
    StructuralMismatch,
    /// Export directory is missing, unreadable or has an unsupported format
    InvalidExport,

    // Integration/IO
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidName => "ERR_INVALID_NAME",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::UnreadableEntity => "ERR_UNREADABLE_ENTITY",
            ExErrorKind::UnresolvedSchemaDependency => "ERR_UNRESOLVED_SCHEMA_DEPENDENCY",
            ExErrorKind::ConflictingInheritance => "ERR_CONFLICTING_INHERITANCE",
            ExErrorKind::UnresolvedPrincipal => "ERR_UNRESOLVED_PRINCIPAL",
            ExErrorKind::CyclicShutdownGuard => "ERR_CYCLIC_SHUTDOWN_GUARD",
            ExErrorKind::StructuralMismatch => "ERR_STRUCTURAL_MISMATCH",
            ExErrorKind::InvalidExport => "ERR_INVALID_EXPORT",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification kind plus optional context describing which
/// entity (store id, reconciliation key, export path) the error is about.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    key: Option<String>,
    path: Option<String>,
    run_id: Option<RunId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            key: None,
            path: None,
            run_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add store id context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add reconciliation key context
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add export path context (file inside the export directory, or a content path)
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        if let Some(key) = &self.key {
            write!(f, " (key: {})", key)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for domain operations on the in-memory store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrataError {
    // ===== Lookup Errors =====
    #[error("Content node not found: {node_id}")]
    NodeNotFound { node_id: String },

    #[error("Page not found: {page_id}")]
    PageNotFound { page_id: String },

    #[error("Folder not found: {folder_id}")]
    FolderNotFound { folder_id: String },

    #[error("File not found: {file_id}")]
    FileNotFound { file_id: String },

    #[error("Principal not found: {principal}")]
    PrincipalNotFound { principal: String },

    #[error("Schema type not found: {type_name}")]
    TypeNotFound { type_name: String },

    #[error("View {view} not defined on type {type_name}")]
    ViewNotFound { type_name: String, view: String },

    #[error("Record not found: {record_id}")]
    RecordNotFound { record_id: String },

    #[error("{kind} not found: {id}")]
    EntityNotFound { kind: String, id: String },

    #[error("Shared component not found: {component_id}")]
    ComponentNotFound { component_id: String },

    // ===== Schema Errors =====
    /// A declared base type does not exist
    #[error("Type {type_name} inherits from unknown type {base}")]
    UnknownBaseType { type_name: String, base: String },

    /// Two bases define the same member with incompatible definitions
    #[error("Type {type_name} inherits incompatible definitions of '{member}' from {first} and {second}")]
    ConflictingInheritance {
        type_name: String,
        member: String,
        first: String,
        second: String,
    },

    #[error("Inheritance cycle through type {type_name}")]
    InheritanceCycle { type_name: String },

    // ===== Structural Errors =====
    /// Attaching a node would make it its own ancestor
    #[error("Cycle detected: node {node_id} cannot become a descendant of itself")]
    CycleDetected { node_id: String },

    #[error("Invalid name: {reason}")]
    InvalidName { reason: String },

    /// Sibling with the same name already exists
    #[error("Name '{name}' already used in {scope}")]
    DuplicateName { name: String, scope: String },

    /// Reconciliation key already bound to another entity
    #[error("Reconciliation key {key} already bound to {existing}")]
    DuplicateKey { key: String, existing: String },

    #[error("Invalid permission set: {value}")]
    InvalidPermission { value: String },

    #[error("Invalid operation: {reason}")]
    InvalidOperation { reason: String },

    // ===== Generic Errors =====
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serde_json::Error> for StrataError {
    fn from(err: serde_json::Error) -> Self {
        StrataError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Conversion from StrataError to the canonical error facility
impl From<StrataError> for ExError {
    fn from(err: StrataError) -> Self {
        let message = err.to_string();
        match err {
            StrataError::NodeNotFound { node_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(node_id)
                .with_message(message),
            StrataError::PageNotFound { page_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(page_id)
                .with_message(message),
            StrataError::FolderNotFound { folder_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(folder_id)
                .with_message(message),
            StrataError::FileNotFound { file_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(file_id)
                .with_message(message),
            StrataError::RecordNotFound { record_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(record_id)
                .with_message(message),
            StrataError::EntityNotFound { id, .. } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(id)
                .with_message(message),
            StrataError::ComponentNotFound { component_id } => {
                ExError::new(ExErrorKind::StructuralMismatch)
                    .with_entity_id(component_id)
                    .with_message(message)
            }
            StrataError::PrincipalNotFound { .. } => {
                ExError::new(ExErrorKind::UnresolvedPrincipal).with_message(message)
            }
            StrataError::TypeNotFound { .. } | StrataError::UnknownBaseType { .. } => {
                ExError::new(ExErrorKind::UnresolvedSchemaDependency).with_message(message)
            }
            StrataError::ViewNotFound { .. } => {
                ExError::new(ExErrorKind::NotFound).with_message(message)
            }
            StrataError::ConflictingInheritance { .. } | StrataError::InheritanceCycle { .. } => {
                ExError::new(ExErrorKind::ConflictingInheritance).with_message(message)
            }
            StrataError::CycleDetected { node_id } => ExError::new(ExErrorKind::CycleDetected)
                .with_entity_id(node_id)
                .with_message(message),
            StrataError::InvalidName { .. } => {
                ExError::new(ExErrorKind::InvalidName).with_message(message)
            }
            StrataError::DuplicateName { .. } | StrataError::DuplicateKey { .. } => {
                ExError::new(ExErrorKind::AlreadyExists).with_message(message)
            }
            StrataError::InvalidPermission { .. } | StrataError::InvalidOperation { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }
            StrataError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
            StrataError::Internal { .. } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}
