use thiserror::Error;

pub use config::ConfigError;

pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Coarse classification of [`AssistantError`], used by front ends to pick a
/// message for the citizen instead of showing the raw error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Retrieval,
    Generation,
    InvalidQuery,
    Internal,
}

impl AssistantError {
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Retrieval(_) => ErrorKind::Retrieval,
            Self::Generation(_) => ErrorKind::Generation,
            Self::InvalidQuery(_) => ErrorKind::InvalidQuery,
            Self::Io(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Localized message suitable for display in the chat interface
    #[inline]
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Configuration => {
                "El asistente no está configurado correctamente. Contacta al administrador."
            }
            ErrorKind::Retrieval => {
                "No fue posible consultar el plan de desarrollo en este momento. Intenta de nuevo más tarde."
            }
            ErrorKind::Generation => {
                "No fue posible generar una respuesta en este momento. Intenta de nuevo más tarde."
            }
            ErrorKind::InvalidQuery => "Por favor escribe una pregunta sobre el plan de desarrollo.",
            ErrorKind::Internal => "Ocurrió un error inesperado. Intenta de nuevo más tarde.",
        }
    }
}

pub mod chat;
pub mod citation;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod generation;
pub mod http;
pub mod index;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds() {
        assert_eq!(
            AssistantError::Retrieval("index missing".to_string()).kind(),
            ErrorKind::Retrieval
        );
        assert_eq!(
            AssistantError::Generation("HTTP 429".to_string()).kind(),
            ErrorKind::Generation
        );
        assert_eq!(
            AssistantError::Config(ConfigError::InvalidTopK(0)).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            AssistantError::Other(anyhow::anyhow!("boom")).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn user_messages_hide_internal_details() {
        let error = AssistantError::Generation("Unauthorized: HTTP 401 sk-secret".to_string());
        let message = error.user_message();
        assert!(!message.contains("401"));
        assert!(!message.contains("sk-secret"));
        assert!(message.contains("generar una respuesta"));
    }

    #[test]
    fn error_display_keeps_detail() {
        let error = AssistantError::Retrieval("Failed to open table: plan_chunks".to_string());
        assert_eq!(
            error.to_string(),
            "Retrieval error: Failed to open table: plan_chunks"
        );
    }
}
