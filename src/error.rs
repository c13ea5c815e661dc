pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{field} must be {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    #[error("every {record} must have the key '{key}'")]
    SchemaError {
        record: &'static str,
        key: &'static str,
    },

    #[error("duplicate entity_id '{entity_id}'")]
    DuplicateEntityId { entity_id: String },

    #[error("unknown theme '{name}', expected 'light' or 'dark'")]
    UnknownTheme { name: String },

    #[error("entity '{entity_id}' span {start}..{end} does not fit text of length {len}")]
    SpanOutOfBounds {
        entity_id: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("entity '{entity_id}' has no attribute '{key}'")]
    MissingAttribute { entity_id: String, key: String },

    #[error("expected a theme color name or a 3- or 6-digit hex code, received \"{value}\"")]
    InvalidColorFormat { value: String },

    #[error("relation references unknown entity_id '{entity_id}'")]
    UnresolvedRelationEndpoint { entity_id: String },

    #[error("'{host}' is not a valid host address")]
    InvalidAddress { host: String },

    #[error("address {addr} is already in use")]
    PortInUse { addr: String },

    #[error("malformed theme palette: {message}")]
    MalformedPalette { message: String },

    #[error("export failed: {message}")]
    Export { message: String },

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
