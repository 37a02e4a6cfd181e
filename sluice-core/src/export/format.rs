//! Format codec
//!
//! Maps between the format tag, file suffixes and MIME types, and decodes or
//! encodes any serde type in the selected format.
//!
//! Strict decoding only tightens YAML: unknown fields are rejected there,
//! while JSON strict decoding behaves exactly like lenient decoding. Types
//! that want unknown-field rejection in JSON must opt in with
//! `#[serde(deny_unknown_fields)]` themselves.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{ExportError, Result};

/// Serialization format of a pipeline document
///
/// `Unknown` is only ever produced as a failure value; the codec rejects it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    #[default]
    Yaml,
    Unknown,
}

impl Format {
    /// Parses a file suffix or format name
    ///
    /// Comparison is case-insensitive, surrounding whitespace is ignored and
    /// the leading dot is optional.
    pub fn from_path(s: &str) -> Result<Format> {
        match s.trim().to_lowercase().as_str() {
            "yaml" | "yml" | ".yaml" | ".yml" => Ok(Format::Yaml),
            "json" | ".json" => Ok(Format::Json),
            _ => Err(ExportError::UnsupportedFormat),
        }
    }

    /// Derives the format from the extension of a file name or URL path
    pub fn from_file_name(name: &str) -> Result<Format> {
        std::path::Path::new(name.trim())
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or(ExportError::UnsupportedFormat)
            .and_then(Format::from_path)
    }

    /// Parses a MIME type; parameters such as `charset` are ignored
    pub fn from_content_type(ct: &str) -> Result<Format> {
        let mime = ct.split(';').next().unwrap_or_default().trim();
        match mime.to_lowercase().as_str() {
            "application/x-yaml" | "text/x-yaml" => Ok(Format::Yaml),
            "application/json" => Ok(Format::Json),
            _ => Err(ExportError::UnsupportedFormat),
        }
    }

    /// Canonical name ("json" or "yaml")
    pub fn as_str(self) -> Result<&'static str> {
        match self {
            Format::Json => Ok("json"),
            Format::Yaml => Ok("yaml"),
            Format::Unknown => Err(ExportError::UnsupportedFormat),
        }
    }

    /// Canonical MIME type, `application/octet-stream` for `Unknown`
    pub fn content_type(self) -> &'static str {
        match self {
            Format::Yaml => "application/x-yaml",
            Format::Json => "application/json",
            Format::Unknown => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str().unwrap_or("unknown"))
    }
}

/// Decodes `bytes`, ignoring fields the target does not know about
pub fn decode<T: DeserializeOwned>(bytes: &[u8], format: Format) -> Result<T> {
    match format {
        Format::Json => Ok(serde_json::from_slice(bytes)?),
        Format::Yaml => Ok(serde_yaml::from_slice(bytes)?),
        Format::Unknown => Err(ExportError::UnsupportedFormat),
    }
}

/// Decodes `bytes`, rejecting unknown fields when the format supports it
pub fn decode_strict<T: DeserializeOwned>(bytes: &[u8], format: Format) -> Result<T> {
    match format {
        Format::Json => Ok(serde_json::from_slice(bytes)?),
        Format::Yaml => {
            let mut unknown = Vec::new();
            let de = serde_yaml::Deserializer::from_slice(bytes);
            let value: T = serde_ignored::deserialize(de, |path| unknown.push(path.to_string()))?;
            match unknown.into_iter().next() {
                Some(field) => Err(ExportError::UnknownField(field)),
                None => Ok(value),
            }
        }
        Format::Unknown => Err(ExportError::UnsupportedFormat),
    }
}

/// Encodes `value`; `Unknown` yields an empty buffer
pub fn encode<T: Serialize + ?Sized>(value: &T, format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Json => Ok(serde_json::to_vec_pretty(value)?),
        Format::Yaml => Ok(serde_yaml::to_string(value)?.into_bytes()),
        Format::Unknown => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::pipeline::PipelineV1;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Named {
        name: String,
    }

    #[test]
    fn test_from_path_is_lenient_about_case_space_and_dot() {
        for s in ["yaml", "YML", " .yaml ", ".Yml", "\tyml\n"] {
            assert_eq!(Format::from_path(s).unwrap(), Format::Yaml, "{s:?}");
        }
        for s in ["json", ".JSON", "  Json "] {
            assert_eq!(Format::from_path(s).unwrap(), Format::Json, "{s:?}");
        }
    }

    #[test]
    fn test_from_path_rejects_other_suffixes() {
        for s in ["xml", "", "..json", "yaml.", "pipeline.yml"] {
            assert!(matches!(
                Format::from_path(s),
                Err(ExportError::UnsupportedFormat)
            ));
        }
    }

    #[test]
    fn test_content_types_are_not_paths() {
        for f in [Format::Json, Format::Yaml, Format::Unknown] {
            assert!(Format::from_path(f.content_type()).is_err());
        }
        assert!(Format::from_path("text/x-yaml").is_err());
    }

    #[test]
    fn test_from_content_type() {
        assert_eq!(
            Format::from_content_type("application/x-yaml").unwrap(),
            Format::Yaml
        );
        assert_eq!(
            Format::from_content_type("text/x-yaml").unwrap(),
            Format::Yaml
        );
        assert_eq!(
            Format::from_content_type("application/json; charset=utf-8").unwrap(),
            Format::Json
        );
        assert!(Format::from_content_type("text/json").is_err());
        assert!(Format::from_content_type("application/xml").is_err());
    }

    #[test]
    fn test_from_file_name() {
        assert_eq!(Format::from_file_name("ci/build.yml").unwrap(), Format::Yaml);
        assert_eq!(
            Format::from_file_name("/tmp/Build.JSON").unwrap(),
            Format::Json
        );
        assert!(Format::from_file_name("Makefile").is_err());
        assert!(Format::from_file_name("build.toml").is_err());
    }

    #[test]
    fn test_format_strings_and_content_types() {
        assert_eq!(Format::Json.as_str().unwrap(), "json");
        assert_eq!(Format::Yaml.as_str().unwrap(), "yaml");
        assert!(Format::Unknown.as_str().is_err());

        assert_eq!(Format::Json.content_type(), "application/json");
        assert_eq!(Format::Yaml.content_type(), "application/x-yaml");
        assert_eq!(Format::Unknown.content_type(), "application/octet-stream");
        assert_eq!(Format::default(), Format::Yaml);
    }

    #[test]
    fn test_decode_unknown_format_fails() {
        let err = decode::<Named>(b"name: x", Format::Unknown).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat));
        let err = decode_strict::<Named>(b"name: x", Format::Unknown).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat));
    }

    #[test]
    fn test_decode_surfaces_parse_errors() {
        assert!(matches!(
            decode::<Named>(b"{", Format::Json),
            Err(ExportError::Json(_))
        ));
        assert!(matches!(
            decode::<Named>(b"name: [unclosed", Format::Yaml),
            Err(ExportError::Yaml(_))
        ));
    }

    #[test]
    fn test_strict_yaml_rejects_unknown_fields() {
        let doc = b"name: build\ncolour: blue\n";

        let lenient: Named = decode(doc, Format::Yaml).unwrap();
        assert_eq!(lenient.name, "build");

        match decode_strict::<Named>(doc, Format::Yaml) {
            Err(ExportError::UnknownField(field)) => assert_eq!(field, "colour"),
            other => panic!("expected unknown field error, got {other:?}"),
        }
    }

    #[test]
    fn test_strict_json_is_lenient() {
        let doc = br#"{"name": "build", "colour": "blue"}"#;
        let value: Named = decode_strict(doc, Format::Json).unwrap();
        assert_eq!(value.name, "build");
    }

    #[test]
    fn test_strict_yaml_reports_nested_path() {
        let doc = b"name: build\njobs:\n  - job: make\n    stage: compile\n    colour: red\n";
        let err = decode_strict::<PipelineV1>(doc, Format::Yaml).unwrap_err();
        match err {
            ExportError::UnknownField(path) => assert!(path.ends_with("colour"), "{path}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_encode_unknown_is_empty() {
        let bytes = encode(&PipelineV1::default(), Format::Unknown).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_declarative_pipeline_round_trips() {
        let doc = br#"
version: v1.0
name: build
description: Compile and package
parameters:
  branch:
    type: string
    default: main
stages: [compile, package]
options:
  package:
    enabled: false
    conditions:
      git.branch: main
jobs:
  - job: make
    stage: compile
    requirements:
      - binary: make
    steps:
      - script:
          - make all
      - action: checkout
        with:
          depth: "1"
        always_executed: true
  - job: tarball
    stage: package
    steps:
      - script: tar czf out.tgz build/
"#;
        let original: PipelineV1 = decode_strict(doc, Format::Yaml).unwrap();

        for format in [Format::Json, Format::Yaml] {
            let bytes = encode(&original, format).unwrap();
            let decoded: PipelineV1 = decode_strict(&bytes, format).unwrap();
            assert_eq!(decoded, original, "round trip through {format}");
        }
    }
}
