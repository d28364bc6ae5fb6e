//! Diagnostic conversion: compiler diagnostics to LSP payloads, with the
//! severity mapping applied at publish time.

use nextflow_compiler::parse_util::{CompilePhase, ParseError, ParseErrorLevel};
use tower_lsp::lsp_types::{
    Diagnostic, DiagnosticRelatedInformation, DiagnosticSeverity, Location, NumberOrString,
    Url,
};

use super::to_range;

fn phase_code(phase: CompilePhase) -> &'static str {
    match phase {
        CompilePhase::Syntax => "syntax",
        CompilePhase::IncludeResolution => "include-resolution",
        CompilePhase::NameResolution => "name-resolution",
        CompilePhase::TypeChecking => "type-checking",
    }
}

/// Severity mapping: errors stay errors; warnings stay warnings; future
/// warnings downgrade to information when the client suppresses them.
fn severity(error: &ParseError, suppress_future: bool) -> DiagnosticSeverity {
    match error.level {
        ParseErrorLevel::Error => DiagnosticSeverity::ERROR,
        ParseErrorLevel::Warning => DiagnosticSeverity::WARNING,
        ParseErrorLevel::Future => {
            if suppress_future {
                DiagnosticSeverity::INFORMATION
            } else {
                DiagnosticSeverity::WARNING
            }
        }
    }
}

pub fn to_lsp_diagnostics(errors: &[ParseError], suppress_future: bool) -> Vec<Diagnostic> {
    errors
        .iter()
        .map(|error| {
            let related = error.related.as_ref().and_then(|related| {
                let uri = Url::parse(&related.uri).ok()?;
                Some(vec![DiagnosticRelatedInformation {
                    location: Location { uri, range: to_range(related.span) },
                    message: related.message.clone(),
                }])
            });
            Diagnostic {
                range: to_range(error.span),
                severity: Some(severity(error, suppress_future)),
                code: Some(NumberOrString::String(phase_code(error.phase).to_string())),
                code_description: None,
                source: Some("nextflow".to_string()),
                message: error.msg.clone(),
                related_information: related,
                tags: None,
                data: None,
            }
        })
        .collect()
}
