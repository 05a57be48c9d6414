use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The row is not there (yet). Distinct from [`Error::LookupFailed`] so
    /// logs can tell propagation delay apart from a broken backend.
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Lookup failed: {0}")]
    LookupFailed(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Either email format is invalid or password length is less than 8")]
    InvalidEmailOrPassword,
    /// Message reported by the backend, surfaced as-is.
    #[error("{0}")]
    Backend(String),
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("This account has been deactivated. Please contact the Canstory team.")]
    AccountDisabled,
    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),
    #[error("Something went wrong, please try again")]
    Unexpected,
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|k| k.to_string())
            .collect();
        fields.sort_unstable();
        Error::InvalidInput(fields.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Form {
        #[validate(email)]
        email: String,
        #[validate(length(min = 2))]
        name: String,
    }

    #[test]
    fn validation_errors_name_offending_fields() {
        let form = Form {
            email: "nope".to_string(),
            name: "x".to_string(),
        };
        let error: Error = form.validate().unwrap_err().into();
        assert_eq!(error, Error::InvalidInput("email, name".to_string()));
    }
}
