use memory::BaseType;
use thiserror::Error;

fn types(list: &[BaseType]) -> String {
    list.iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    #[error("unknown token: {0}")]
    UnknownToken(String),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid literal: {0}")]
    InvalidLiteral(String),
    #[error("malformed assignment: {0}")]
    MalformedAssignment(&'static str),
    #[error("reference to uninitialized identifier: {0}")]
    UninitializedIdentifier(String),
    #[error("cannot assign {found} to '{target}' of type {expected}")]
    TypeMismatch {
        target: String,
        expected: BaseType,
        found: BaseType,
    },
    #[error(
        "no overload of '{op}' accepts ({}) -> ({})",
        types(.args),
        types(.targets)
    )]
    NoMatchingOverload {
        op: String,
        args: Vec<BaseType>,
        targets: Vec<BaseType>,
    },
    #[error("more than one operation on a line")]
    MultipleOperations,
    #[error("line is {len} bytes long, limit is {max}")]
    LineTooLong { len: usize, max: usize },
    #[error("program exceeds {max} lines")]
    TooManyLines { max: usize },
    #[error("label '~{0}' must stand alone at the start of a line")]
    MisplacedLabel(String),
    #[error("label '~{0}' is already defined")]
    DuplicateLabel(String),
    #[error("label '~{0}' is never defined")]
    UndefinedLabel(String),
    #[error("input parameters are already declared")]
    DuplicateParams,
    #[error("input parameter '{0}' is already bound")]
    ParamRedeclared(String),
    #[error("'if' has no statement to guard")]
    DanglingIf,
    #[error("statement guarded by 'if' emits no instruction")]
    EmptyGuard,
    #[error("type of '{0}' is never resolved")]
    UnresolvedType(String),
    #[error("expected a statement")]
    ExpectedStatement,
}

/// A compile failure, tagged with the 1-based source line it was found on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct CompileError {
    pub line: usize,
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub fn new(line: usize, kind: CompileErrorKind) -> Self {
        Self { line, kind }
    }
}
