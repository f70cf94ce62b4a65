use thiserror::Error;

/// Main error type for the table compiler.
/// Aggregates errors from the standard library, dependencies and every internal stage.
#[derive(Error, Debug)]
pub enum RustyTableError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    #[error("{0}")]
    GlobError(#[from] glob::GlobError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    // Helper module errors
    #[error("{0}")]
    CfbHelperError(#[from] crate::helpers::cfb::CfbError),

    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    #[error("{0}")]
    Biff8HelperError(#[from] crate::helpers::biff8::Biff8Error),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    XlsError(#[from] crate::spreadsheet::xls::XlsError),

    // Compiler stage errors
    #[error("{0}")]
    AddressedError(#[from] crate::address::AddressedError),

    #[error("{0}")]
    CollectError(#[from] crate::schema::discovery::CollectError),

    #[error("{0}")]
    OutputError(#[from] crate::extract::output::OutputError),

    #[error("{0}")]
    CipherError(#[from] crate::crypto::CipherError),

    #[error("{0}")]
    ConfigError(#[from] crate::config::ConfigError),
}

impl RustyTableError {
    /// Returns the addressed schema/integrity/value error, if this is one.
    pub fn as_addressed(&self) -> Option<&crate::address::AddressedError> {
        match self {
            RustyTableError::AddressedError(error) => Some(error),
            _ => None,
        }
    }
}

pub(crate) trait ResultOptionChain {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self;
}

impl<T, E> ResultOptionChain for Result<Option<T>, E> {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self,
    {
        match self {
            Ok(None) => f(),
            _ => self,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, RustyTableError> {
    /// Prefixes I/O style failures with the file they happened in.
    /// Addressed errors already carry their location and pass through untouched.
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| match e {
            RustyTableError::AddressedError(_) => e,
            _ => RustyTableError::WithContextError(format!("{}: {}", message, e)),
        })
    }
}
