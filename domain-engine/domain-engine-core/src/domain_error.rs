use std::fmt::Display;

use ontol_runtime::ontology::builder::SchemaError;
use serde::Serialize;
use thiserror::Error;

/// The coarse classification every error reported to callers carries.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Debug)]
pub enum ErrorCategory {
    SyntaxError,
    SchemaInconsistent,
    UnknownFieldForType,
    QueryShapeConflict,
    BackendCompileError,
    BackendExecutionError,
}

/// A position in the query document, 1-based.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Debug)]
pub struct SourcePos {
    pub line: usize,
    pub column: usize,
}

#[derive(Error, Clone, PartialEq, Debug)]
pub enum DomainErrorKind {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("operation `{0}` not found")]
    OperationNotFound(String),
    #[error("an operation name is required when the document has several operations")]
    AmbiguousOperation,
    #[error("{0} operations are not supported")]
    UnsupportedOperation(&'static str),
    #[error("unknown fragment `{0}`")]
    UnknownFragment(String),
    #[error("fragment `{0}` spreads itself")]
    FragmentCycle(String),
    #[error("directive `@{0}` is not supported")]
    UnsupportedDirective(String),
    #[error("variable `${0}` is not defined")]
    UndefinedVariable(String),
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("inconsistent schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("unknown field `{field}` on type `{typename}`")]
    UnknownFieldForType { typename: String, field: String },
    #[error("conflicting selection `{alias}` on type `{typename}`: {reason}")]
    ShapeConflict {
        typename: String,
        alias: String,
        reason: String,
    },
    #[error("cannot compile query: {0}")]
    BackendCompile(String),
    #[error("no data store")]
    NoDataStore,
    #[error("data store: {0}")]
    DataStore(String),
}

impl DomainErrorKind {
    pub fn into_error(self) -> DomainError {
        DomainError(Box::new(ErrorInner {
            kind: self,
            pos: None,
        }))
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Syntax(_)
            | Self::OperationNotFound(_)
            | Self::AmbiguousOperation
            | Self::UnsupportedOperation(_)
            | Self::UnknownFragment(_)
            | Self::FragmentCycle(_)
            | Self::UnsupportedDirective(_)
            | Self::UndefinedVariable(_)
            | Self::UnknownType(_) => ErrorCategory::SyntaxError,
            Self::Schema(_) => ErrorCategory::SchemaInconsistent,
            Self::UnknownFieldForType { .. } => ErrorCategory::UnknownFieldForType,
            Self::ShapeConflict { .. } => ErrorCategory::QueryShapeConflict,
            Self::BackendCompile(_) => ErrorCategory::BackendCompileError,
            Self::NoDataStore | Self::DataStore(_) => ErrorCategory::BackendExecutionError,
        }
    }
}

/// The error type of the domain engine.
///
/// Kept at pointer size so results stay small.
#[derive(Clone, PartialEq, Debug)]
pub struct DomainError(Box<ErrorInner>);

#[derive(Clone, PartialEq, Debug)]
struct ErrorInner {
    kind: DomainErrorKind,
    pos: Option<SourcePos>,
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn data_store(msg: impl Into<String>) -> Self {
        DomainErrorKind::DataStore(msg.into()).into_error()
    }

    pub fn kind(&self) -> &DomainErrorKind {
        &self.0.kind
    }

    pub fn category(&self) -> ErrorCategory {
        self.0.kind.category()
    }

    pub fn pos(&self) -> Option<SourcePos> {
        self.0.pos
    }

    /// Attach a source position, unless one is already known.
    ///
    /// The innermost position is the most precise.
    pub fn with_pos(mut self, pos: SourcePos) -> Self {
        self.0.pos.get_or_insert(pos);
        self
    }
}

impl Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.pos {
            Some(SourcePos { line, column }) => write!(f, "{} at {line}:{column}", self.0.kind),
            None => write!(f, "{}", self.0.kind),
        }
    }
}

impl std::error::Error for DomainError {}

impl From<DomainErrorKind> for DomainError {
    fn from(value: DomainErrorKind) -> Self {
        value.into_error()
    }
}

impl From<SchemaError> for DomainError {
    fn from(value: SchemaError) -> Self {
        DomainErrorKind::Schema(value).into_error()
    }
}
