//! Gestion des erreurs pour la navigation et la résolution de contenu

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Type Result personnalisé pour pmobrowser
pub type Result<T> = std::result::Result<T, BrowserError>;

/// Erreurs possibles lors de la résolution d'un chemin
///
/// `Clone` est nécessaire : une même résolution peut être partagée entre
/// plusieurs appelants concurrents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    /// Aucune route ne correspond et aucune source par défaut n'est configurée
    #[error("No content found for path: {0}")]
    ContentNotFound(String),

    /// Le transport a répondu avec un statut hors 2xx
    #[error("HTTP error (status {status})")]
    Http { status: u16 },

    /// Le transport a échoué sans produire de réponse
    #[error("Network error: {0}")]
    Network(String),

    /// Le callback de l'hôte a explicitement signalé une erreur
    #[error("{0}")]
    Callback(String),

    /// La réponse n'a pas pu être interprétée comme un contenu
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    /// Table de routes ou source mal configurée
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Erreur générique
    #[error("{0}")]
    Unknown(String),
}

impl BrowserError {
    /// Crée une erreur depuis un code de statut HTTP
    pub fn from_status_code(status: u16) -> Self {
        Self::Http { status }
    }

    /// Vérifie si l'erreur provient du transport (réseau ou HTTP)
    pub fn is_transport_error(&self) -> bool {
        matches!(self, BrowserError::Http { .. } | BrowserError::Network(_))
    }

    /// Vérifie si l'erreur signale l'absence de contenu
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BrowserError::ContentNotFound(_) | BrowserError::Http { status: 404 }
        )
    }

    /// Code HTTP associé, s'il existe
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BrowserError::Http { status } => Some(*status),
            _ => None,
        }
    }
}

/// Catégorie d'erreur publiée aux listeners de navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NavigationErrorCode {
    NetworkError,
    HttpError,
    ContentNotFoundError,
    CallbackError,
    UnknownError,
}

/// Erreur de navigation structurée, destinée à l'affichage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationError {
    pub code: NavigationErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl From<&BrowserError> for NavigationError {
    fn from(error: &BrowserError) -> Self {
        let code = match error {
            BrowserError::ContentNotFound(_) => NavigationErrorCode::ContentNotFoundError,
            BrowserError::Http { .. } => NavigationErrorCode::HttpError,
            BrowserError::Network(_) => NavigationErrorCode::NetworkError,
            BrowserError::Callback(_) => NavigationErrorCode::CallbackError,
            BrowserError::InvalidContent(_)
            | BrowserError::Configuration(_)
            | BrowserError::Unknown(_) => NavigationErrorCode::UnknownError,
        };

        Self {
            code,
            message: error.to_string(),
            status_code: error.status_code(),
        }
    }
}
