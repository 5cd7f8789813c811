//! Conversion dispatch

use crate::format::FormatRegistry;
use crate::mode::ConversionMode;
use crate::{ReportError, Result};
use template::{OutputCategory, RenderedDocument};

/// Value returned to the caller
///
/// `format_tag` always equals the requested extension, whether or not
/// conversion was bypassed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub format_tag: String,
    pub payload: Vec<u8>,
}

impl From<ConversionResult> for (String, Vec<u8>) {
    fn from(result: ConversionResult) -> Self {
        (result.format_tag, result.payload)
    }
}

/// Route a rendered document to its output
///
/// - markup: content returned unchanged
/// - binary, [`ConversionMode::Real`]: content converted by the bound converter
/// - binary, [`ConversionMode::Bypass`]: the converter's placeholder payload
pub fn dispatch(
    registry: &FormatRegistry,
    document: RenderedDocument,
    extension: &str,
    mode: ConversionMode,
) -> Result<ConversionResult> {
    let format = registry.get(extension)?;

    let payload = match document.category {
        OutputCategory::Markup => document.content,
        OutputCategory::Binary => {
            let converter = format.converter().ok_or_else(|| {
                ReportError::ConfigError(format!("format '{}' has no converter", extension))
            })?;
            if mode.is_bypass() {
                tracing::debug!(extension, "Conversion bypassed");
                converter.placeholder()?
            } else {
                tracing::debug!(extension, markup_bytes = document.content.len(), "Converting");
                converter.convert(&document.content)?
            }
        }
    };

    Ok(ConversionResult {
        format_tag: extension.to_string(),
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;
    use pdf_convert::{ConvertError, Converter};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use template::Escape;

    #[derive(Default)]
    struct CountingConverter {
        calls: AtomicUsize,
    }

    impl Converter for CountingConverter {
        fn convert(&self, markup: &[u8]) -> pdf_convert::Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok([b"converted:".as_slice(), markup].concat())
        }

        fn placeholder(&self) -> pdf_convert::Result<Vec<u8>> {
            Ok(b"stub".to_vec())
        }
    }

    struct FailingConverter;

    impl Converter for FailingConverter {
        fn convert(&self, _markup: &[u8]) -> pdf_convert::Result<Vec<u8>> {
            Err(ConvertError::Engine {
                status: "exit status: 1".to_string(),
                diagnostics: "boom".to_string(),
            })
        }
    }

    fn registry(converter: Arc<dyn Converter>) -> FormatRegistry {
        FormatRegistry::new()
            .with_format("html", Format::markup(Escape::Html))
            .with_format("pdf", Format::binary(Escape::Html, converter))
    }

    fn document(category: OutputCategory) -> RenderedDocument {
        RenderedDocument {
            category,
            content: "<p>Héllø</p>".as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_markup_is_returned_unchanged() {
        let converter = Arc::new(CountingConverter::default());
        let registry = registry(converter.clone());

        for mode in [ConversionMode::Real, ConversionMode::Bypass] {
            let result = dispatch(&registry, document(OutputCategory::Markup), "html", mode).unwrap();
            assert_eq!(result.format_tag, "html");
            assert_eq!(result.payload, "<p>Héllø</p>".as_bytes());
        }
        assert_eq!(converter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_binary_real_converts() {
        let converter = Arc::new(CountingConverter::default());
        let registry = registry(converter.clone());

        let result = dispatch(
            &registry,
            document(OutputCategory::Binary),
            "pdf",
            ConversionMode::Real,
        )
        .unwrap();

        assert_eq!(result.format_tag, "pdf");
        assert!(result.payload.starts_with(b"converted:"));
        assert_eq!(converter.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_binary_bypass_keeps_tag() {
        let converter = Arc::new(CountingConverter::default());
        let registry = registry(converter.clone());

        let (tag, payload): (String, Vec<u8>) = dispatch(
            &registry,
            document(OutputCategory::Binary),
            "pdf",
            ConversionMode::Bypass,
        )
        .unwrap()
        .into();

        assert_eq!(tag, "pdf");
        assert_eq!(payload, b"stub");
        assert_eq!(converter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let registry = registry(Arc::new(CountingConverter::default()));
        let err = dispatch(
            &registry,
            document(OutputCategory::Markup),
            "odt",
            ConversionMode::Real,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_engine_failure_propagates() {
        let registry = registry(Arc::new(FailingConverter));
        let err = dispatch(
            &registry,
            document(OutputCategory::Binary),
            "pdf",
            ConversionMode::Real,
        )
        .unwrap_err();
        match err {
            ReportError::ConvertError(ConvertError::Engine { diagnostics, .. }) => {
                assert_eq!(diagnostics, "boom")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
