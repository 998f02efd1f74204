use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimErrorCategory {
    Success,
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl SimErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

/// Fatal failure of a simulation run.
///
/// `placeholder` is a stable dotted code (`INPUT.NOISE_FLOOR`,
/// `RUN.INSTRUMENT_ENGINE`, ...) that callers can match on without parsing
/// the human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimError {
    category: SimErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl SimError {
    pub fn new(
        category: SimErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SimErrorCategory::InputValidationError, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SimErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SimErrorCategory::ComputationError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SimErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> SimErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for SimError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for SimError {}

#[cfg(test)]
mod tests {
    use super::{SimError, SimErrorCategory};

    #[test]
    fn exit_codes_are_stable_per_category() {
        let cases = [
            (SimErrorCategory::Success, 0, "Success"),
            (
                SimErrorCategory::InputValidationError,
                2,
                "InputValidationError",
            ),
            (SimErrorCategory::IoSystemError, 3, "IoSystemError"),
            (SimErrorCategory::ComputationError, 4, "ComputationError"),
            (SimErrorCategory::InternalError, 5, "InternalError"),
        ];

        for (category, exit_code, name) in cases {
            assert_eq!(category.exit_code(), exit_code);
            assert_eq!(category.as_str(), name);
        }
        assert!(!SimErrorCategory::Success.is_fatal());
    }

    #[test]
    fn configuration_error_renders_diagnostic_lines() {
        let error = SimError::input_validation(
            "INPUT.CALCULATION_MODE",
            "unknown calculation mode 'fast'",
        );

        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.CALCULATION_MODE] unknown calculation mode 'fast'"
        );
        assert_eq!(
            error.fatal_exit_line().as_deref(),
            Some("FATAL EXIT CODE: 2")
        );
        assert_eq!(
            error.to_string(),
            "InputValidationError [INPUT.CALCULATION_MODE] unknown calculation mode 'fast'"
        );
    }
}
