pub type Result<T> = std::result::Result<T, Error>;

/// Which side of a reference failed to resolve at encode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceRole {
    Source,
    Target,
    Parent,
}

impl std::fmt::Display for ReferenceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ReferenceRole::Source => "source",
            ReferenceRole::Target => "target",
            ReferenceRole::Parent => "parent",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Diagram payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Diagram payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Malformed diagram XML: {0}")]
    MalformedXml(#[from] roxmltree::Error),

    #[error("Diagram XML has no <{node}> node")]
    MissingNode { node: &'static str },

    #[error("Duplicate element id `{id}`")]
    DuplicateElementId { id: String },

    #[error("Duplicate connector id `{id}`")]
    DuplicateConnectorId { id: String },

    #[error("`{owner}` {field} contains {character:?}, which XML 1.0 cannot carry")]
    InvalidCharacter {
        owner: String,
        field: &'static str,
        character: char,
    },

    #[error("`{owner}` references unknown {role} element `{target}`")]
    DanglingReference {
        owner: String,
        role: ReferenceRole,
        target: String,
    },

    #[error("No `{kind}` macro with id `{macro_id}` in document")]
    MacroNotFound { macro_id: String, kind: String },

    #[error("Macro `{macro_id}` has no diagram payload")]
    PayloadMissing { macro_id: String },

    #[error("Malformed host document: {message}")]
    MalformedDocument { message: String },
}

impl Error {
    /// True for errors that mean "the payload could not be read", as opposed to addressing or
    /// model-validation failures.
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            Error::InvalidBase64(_)
                | Error::InvalidUtf8(_)
                | Error::MalformedXml(_)
                | Error::MissingNode { .. }
        )
    }
}
