use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::catalog::CatalogError, cache::CacheError, domain::error::DomainError,
    infra::error::InfraError,
};

/// Error message chain of a failure, outermost first.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    /// Messages joined with `: `, skipping repeats from transparent wrappers.
    pub fn render(&self) -> String {
        let mut rendered: Vec<&str> = Vec::with_capacity(self.messages.len());
        for message in &self.messages {
            if rendered.last() != Some(&message.as_str()) {
                rendered.push(message);
            }
        }
        rendered.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code for the CLI: 2 for bad input, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => 2,
            AppError::Infra(InfraError::Configuration { .. }) => 2,
            _ => 1,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}
