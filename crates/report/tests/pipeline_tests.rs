//! End-to-end tests for report execution

use pretty_assertions::assert_eq;
use report::{
    ConversionMode, Converter, Escape, Format, FormatRegistry, MemoryDefinitionStore,
    MemoryRecordProvider, Report, ReportConfig, ReportDefinition, ReportError, TemplateError,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

const USER: i64 = 1;
const UNICODE_TEMPLATE: &str = "<h1>Héllø, {{data['name']}}!</h1>";

/// Converter producing a single-page PDF regardless of input
struct OnePagePdf;

impl Converter for OnePagePdf {
    fn convert(&self, markup: &[u8]) -> pdf_convert::Result<Vec<u8>> {
        assert!(!markup.is_empty());
        pdf_convert::blank_pdf()
    }
}

fn data(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn provider() -> MemoryRecordProvider {
    MemoryRecordProvider::new()
        .with_record("res.user", USER, json!({ "name": "Administrator", "login": "admin" }))
        .with_ambient("company", json!({ "party": { "name": "Openlabs" }, "currency": "USD" }))
}

fn user_report(template: &str, extension: &str) -> Report {
    let store = MemoryDefinitionStore::new().with_definition(ReportDefinition::new(
        "res.user",
        "res.user",
        template,
        extension,
    ));
    Report::new("res.user", Arc::new(store), Arc::new(provider())).unwrap()
}

fn page_count(pdf: &[u8]) -> usize {
    lopdf::Document::load_mem(pdf).unwrap().get_pages().len()
}

#[test]
fn test_render_report_html() {
    let report = user_report("<h1>Hello, {{records[0].name}}!</h1>", "html");
    let result = report
        .execute_with_mode(&[USER], Map::new(), ConversionMode::Bypass)
        .unwrap();

    assert_eq!(result.format_tag, "html");
    assert_eq!(result.payload, "<h1>Hello, Administrator!</h1>".as_bytes());
}

#[test]
fn test_render_unicode() {
    let report = user_report(UNICODE_TEMPLATE, "html");
    let result = report
        .execute_with_mode(&[USER], data(json!({ "name": "Cédric" })), ConversionMode::Real)
        .unwrap();

    assert_eq!(result.format_tag, "html");
    assert_eq!(result.payload, "<h1>Héllø, Cédric!</h1>".as_bytes());
}

#[test]
fn test_render_escaping() {
    let report = user_report(UNICODE_TEMPLATE, "html");
    let result = report
        .execute_with_mode(
            &[USER],
            data(json!({ "name": "<script></script>" })),
            ConversionMode::Real,
        )
        .unwrap();

    assert_eq!(
        result.payload,
        "<h1>Héllø, &lt;script&gt;&lt;/script&gt;!</h1>".as_bytes()
    );
}

#[test]
fn test_render_txt_is_not_escaped() {
    let report = user_report("Hello {{data.name}}", "txt");
    let result = report
        .execute_with_mode(&[USER], data(json!({ "name": "<b>&" })), ConversionMode::Real)
        .unwrap();

    assert_eq!(result.format_tag, "txt");
    assert_eq!(result.payload, b"Hello <b>&");
}

#[test]
fn test_render_pdf_single_page() {
    let report = user_report(UNICODE_TEMPLATE, "pdf").with_registry(
        FormatRegistry::new().with_format("pdf", Format::binary(Escape::Html, Arc::new(OnePagePdf))),
    );

    let result = report
        .execute_with_mode(&[USER], data(json!({ "name": "Cédric" })), ConversionMode::Real)
        .unwrap();

    assert_eq!(result.format_tag, "pdf");
    assert_eq!(page_count(&result.payload), 1);
}

#[test]
fn test_render_pdf_with_wkhtmltopdf() {
    if which::which("wkhtmltopdf").is_err() {
        eprintln!("wkhtmltopdf not installed, skipping");
        return;
    }

    let report = user_report(UNICODE_TEMPLATE, "pdf");
    let result = report
        .execute_with_mode(&[USER], data(json!({ "name": "Cédric" })), ConversionMode::Real)
        .unwrap();

    assert_eq!(result.format_tag, "pdf");
    assert_eq!(page_count(&result.payload), 1);
}

#[test]
fn test_pdf_tag_is_kept_in_both_modes() {
    for mode in [ConversionMode::Real, ConversionMode::Bypass] {
        let report = user_report(UNICODE_TEMPLATE, "pdf").with_registry(
            FormatRegistry::new()
                .with_format("pdf", Format::binary(Escape::Html, Arc::new(OnePagePdf))),
        );
        let result = report
            .execute_with_mode(&[USER], data(json!({ "name": "x" })), mode)
            .unwrap();
        assert_eq!(result.format_tag, "pdf");
        assert!(!result.payload.is_empty());
    }
}

#[test]
fn test_bypass_skips_missing_engine() {
    // The default pdf binding points at wkhtmltopdf; bypass never runs it
    let report = user_report(UNICODE_TEMPLATE, "pdf").with_mode(ConversionMode::Bypass);
    let result = report
        .execute(&[USER], data(json!({ "name": "Cédric" })))
        .unwrap();

    assert_eq!(result.format_tag, "pdf");
    assert_eq!(page_count(&result.payload), 1);
}

#[test]
fn test_missing_reference_returns_no_output() {
    let report = user_report("<h1>{{records[0].name}} {{data['missing']}}</h1>", "html");
    let err = report
        .execute_with_mode(&[USER], data(json!({ "name": "x" })), ConversionMode::Real)
        .unwrap_err();

    match err {
        ReportError::TemplateError(TemplateError::UnresolvedReference { expression, .. }) => {
            assert_eq!(expression, "data['missing']");
        }
        other => panic!("expected unresolved reference, got {:?}", other),
    }
}

#[test]
fn test_invalid_utf8_template() {
    let store = MemoryDefinitionStore::new().with_definition(ReportDefinition::new(
        "res.user",
        "res.user",
        b"<h1>H\xe9llo</h1>".to_vec(),
        "html",
    ));
    let report = Report::new("res.user", Arc::new(store), Arc::new(provider())).unwrap();

    let err = report
        .execute_with_mode(&[USER], Map::new(), ConversionMode::Real)
        .unwrap_err();
    assert!(matches!(
        err,
        ReportError::TemplateError(TemplateError::Encoding { .. })
    ));
}

#[test]
fn test_unsupported_extension() {
    let report = user_report("<p/>", "odt");
    let err = report
        .execute_with_mode(&[USER], Map::new(), ConversionMode::Bypass)
        .unwrap_err();
    assert!(matches!(err, ReportError::UnsupportedFormat(ext) if ext == "odt"));
}

#[test]
fn test_ambient_company_and_rendering_is_idempotent() {
    let report = user_report(
        "<p>{{company.party.name}} / {{company['currency']}} / {{records[0].login}}</p>",
        "html",
    );
    let first = report
        .execute_with_mode(&[USER], Map::new(), ConversionMode::Real)
        .unwrap();
    let second = report
        .execute_with_mode(&[USER], Map::new(), ConversionMode::Real)
        .unwrap();

    assert_eq!(first.payload, b"<p>Openlabs / USD / admin</p>");
    assert_eq!(first, second);
}

#[cfg(unix)]
#[test]
fn test_configured_engine_receives_rendered_markup() {
    let staging = tempfile::tempdir().unwrap();
    let config = ReportConfig::from_json(&format!(
        r#"{{
            "formats": {{
                "html": {{ "category": "markup" }},
                "copy": {{
                    "category": "binary",
                    "engine": {{
                        "program": "sh",
                        "args": ["-c", "cp \"$1\" \"$2\"", "sh"],
                        "outputSuffix": ".out",
                        "tempDir": {:?}
                    }}
                }}
            }},
            "conversion": "real"
        }}"#,
        staging.path().to_string_lossy()
    ))
    .unwrap();

    let store = MemoryDefinitionStore::new().with_definition(ReportDefinition::new(
        "res.user",
        "res.user",
        UNICODE_TEMPLATE,
        "copy",
    ));
    let report = Report::from_config("res.user", &config, Arc::new(store), Arc::new(provider()))
        .unwrap();

    let result = report.execute(&[USER], data(json!({ "name": "Cédric & co" }))).unwrap();

    assert_eq!(result.format_tag, "copy");
    assert_eq!(result.payload, "<h1>Héllø, Cédric &amp; co!</h1>".as_bytes());
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
}
