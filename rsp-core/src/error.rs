use thiserror::Error;

/// Main error type for RSP operations
///
/// Every variant carries enough detail (tag, status word, server code,
/// sequence number) to diagnose a failure from the error value alone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RspError {
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Unexpected tag {tag} while decoding {context}")]
    UnexpectedTag { context: &'static str, tag: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("APDU channel error: {0}")]
    Channel(String),

    #[error("Card returned status word {sw:04X}")]
    Card { sw: u16 },

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("HTTP status {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Remote function failed: subject {subject_code}, reason {reason_code}: {message}")]
    Remote {
        subject_code: String,
        reason_code: String,
        message: String,
    },

    #[error("eUICC function {function} returned code {code}")]
    Euicc { function: &'static str, code: i64 },

    #[error("Profile installation failed: bppCommandId {bpp_command_id}, errorReason {error_reason}")]
    InstallFailed { bpp_command_id: i64, error_reason: i64 },

    #[error("Confirmation code required")]
    ConfirmationCodeRequired,

    #[error("Client busy: another operation is in progress")]
    Busy,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Notification with sequence number {0} not found")]
    NotificationNotFound(u32),

    #[error("Invalid activation code: {0}")]
    InvalidActivationCode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RspError {
    /// Whether a caller may retry the same operation with more input
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RspError::ConfirmationCodeRequired)
    }

    /// Status word carried by a card error, if any
    pub fn status_word(&self) -> Option<u16> {
        match self {
            RspError::Card { sw } => Some(*sw),
            _ => None,
        }
    }
}

/// Result type alias for RSP operations
pub type RspResult<T> = Result<T, RspError>;
