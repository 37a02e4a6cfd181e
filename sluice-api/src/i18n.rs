//! Message catalog
//!
//! Renders import messages and error texts in the language negotiated
//! through `Accept-Language`. English is the fallback for anything the
//! header does not resolve.

use sluice_core::domain::message::{ImportMessage, MessageId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    En,
    Fr,
}

impl Language {
    /// Picks the preferred supported language from an `Accept-Language` value
    ///
    /// Entries are weighed by their `q` parameter; ties keep header order.
    pub fn from_accept_language(header: &str) -> Self {
        let mut ranges: Vec<(&str, f32)> = header
            .split(',')
            .filter_map(|entry| {
                let mut parts = entry.split(';');
                let tag = parts.next()?.trim();
                if tag.is_empty() {
                    return None;
                }
                let q = parts
                    .filter_map(|p| p.trim().strip_prefix("q="))
                    .find_map(|q| q.trim().parse::<f32>().ok())
                    .unwrap_or(1.0);
                Some((tag, q))
            })
            .filter(|(_, q)| *q > 0.0)
            .collect();

        ranges.sort_by(|a, b| b.1.total_cmp(&a.1));

        ranges
            .into_iter()
            .find_map(|(tag, _)| Self::from_tag(tag))
            .unwrap_or_default()
    }

    fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Language::En),
            "fr" => Some(Language::Fr),
            _ => None,
        }
    }
}

/// Catalog keys for error texts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKey {
    Unauthorized,
    Forbidden,
    NotFound,
    WrongRequest,
    UnsupportedFormat,
    InvalidPipeline,
    PipelineAlreadyExists,
    Conflict,
    Internal,
}

fn message_template(id: MessageId, lang: Language) -> &'static str {
    use Language::*;
    use MessageId::*;

    match (id, lang) {
        (PipelineCreated, En) => "Pipeline {0} has been created",
        (PipelineCreated, Fr) => "Le pipeline {0} a été créé",
        (PipelineUpdated, En) => "Pipeline {0} has been updated",
        (PipelineUpdated, Fr) => "Le pipeline {0} a été mis à jour",
        (PipelineNameOverridden, En) => "Pipeline name {0} from the document was replaced by {1}",
        (PipelineNameOverridden, Fr) => "Le nom de pipeline {0} du document a été remplacé par {1}",
        (StageAdded, En) => "Stage {0} added to pipeline {1}",
        (StageAdded, Fr) => "Le stage {0} a été ajouté au pipeline {1}",
        (StageUpdated, En) => "Stage {0} of pipeline {1} has been updated",
        (StageUpdated, Fr) => "Le stage {0} du pipeline {1} a été mis à jour",
        (StageDeleted, En) => "Stage {0} removed from pipeline {1}",
        (StageDeleted, Fr) => "Le stage {0} a été supprimé du pipeline {1}",
        (JobAdded, En) => "Job {0} added to stage {1}",
        (JobAdded, Fr) => "Le job {0} a été ajouté au stage {1}",
        (ParameterAdded, En) => "Parameter {0} added to pipeline {1}",
        (ParameterAdded, Fr) => "Le paramètre {0} a été ajouté au pipeline {1}",
        (ParameterDeleted, En) => "Parameter {0} removed from pipeline {1}",
        (ParameterDeleted, Fr) => "Le paramètre {0} a été supprimé du pipeline {1}",
    }
}

fn error_template(key: ErrorKey, lang: Language) -> &'static str {
    use ErrorKey::*;
    use Language::*;

    match (key, lang) {
        (Unauthorized, En) => "authentication required",
        (Unauthorized, Fr) => "authentification requise",
        (Forbidden, En) => "forbidden: {0}",
        (Forbidden, Fr) => "accès refusé : {0}",
        (NotFound, En) => "{0} does not exist",
        (NotFound, Fr) => "{0} n'existe pas",
        (WrongRequest, En) => "wrong request: {0}",
        (WrongRequest, Fr) => "requête incorrecte : {0}",
        (UnsupportedFormat, En) => "unsupported format",
        (UnsupportedFormat, Fr) => "format non supporté",
        (InvalidPipeline, En) => "invalid pipeline: {0}",
        (InvalidPipeline, Fr) => "pipeline invalide : {0}",
        (PipelineAlreadyExists, En) => "pipeline {0} already exists",
        (PipelineAlreadyExists, Fr) => "le pipeline {0} existe déjà",
        (Conflict, En) => "conflict: {0}",
        (Conflict, Fr) => "conflit : {0}",
        (Internal, En) => "internal server error",
        (Internal, Fr) => "erreur interne du serveur",
    }
}

/// Substitutes `{n}` placeholders with positional arguments
fn render(template: &str, args: &[String]) -> String {
    args.iter()
        .enumerate()
        .fold(template.to_string(), |text, (i, arg)| {
            text.replace(&format!("{{{i}}}"), arg)
        })
}

/// Renders import messages in emission order
pub fn translate(messages: &[ImportMessage], lang: Language) -> Vec<String> {
    messages
        .iter()
        .map(|m| render(message_template(m.id, lang), &m.args))
        .collect()
}

/// Renders an error text
pub fn translate_error(key: ErrorKey, args: &[String], lang: Language) -> String {
    render(error_template(key, lang), args)
}
