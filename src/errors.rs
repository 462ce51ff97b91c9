use thiserror::Error;

/// Errors loading the OAuth configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// Errors from the Graph API client and the token layer beneath it.
///
/// `AuthenticationRequired` is the terminal auth state: the token manager
/// has no usable credentials left and only the interactive auth flow can
/// recover. Handlers turn it into their "use the 'authenticate' tool"
/// message.
#[derive(Debug, Error)]
pub enum GraphApiError {
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Non-success HTTP response; the message embeds the status code so
    /// callers can match on e.g. "404".
    #[error("{0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

pub type GraphResult<T> = Result<T, GraphApiError>;

/// Errors from the encrypted token store.
#[derive(Debug, Error)]
pub enum TokenStorageError {
    #[error("Token storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Token storage format error: {0}")]
    FormatError(String),

    #[error("Token encryption error: {0}")]
    CryptoError(String),
}

/// Violations of the recurrence structural rules, one variant per rule.
///
/// The display strings are the exact messages shown to the user after the
/// "Invalid recurrence pattern: " prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecurrenceError {
    #[error("Recurrence pattern must include 'type' and 'interval'")]
    MissingPatternBase,

    #[error("Recurrence interval must be at least 1")]
    IntervalTooSmall,

    #[error("Weekly recurrence requires 'daysOfWeek' array")]
    WeeklyMissingDaysOfWeek,

    #[error("absoluteMonthly recurrence requires 'dayOfMonth'")]
    AbsoluteMonthlyMissingDayOfMonth,

    #[error("relativeMonthly recurrence requires 'daysOfWeek' and 'index'")]
    RelativeMonthlyMissingFields,

    #[error("absoluteYearly recurrence requires 'dayOfMonth' and 'month'")]
    AbsoluteYearlyMissingFields,

    #[error("relativeYearly recurrence requires 'daysOfWeek', 'index', and 'month'")]
    RelativeYearlyMissingFields,

    #[error("Recurrence range must include 'type' and 'startDate'")]
    MissingRangeBase,

    #[error("endDate range type requires 'endDate'")]
    EndDateMissingEndDate,

    #[error("numbered range type requires 'numberOfOccurrences'")]
    NumberedMissingOccurrences,

    #[error("Number of occurrences must be at least 1")]
    OccurrencesTooSmall,
}
