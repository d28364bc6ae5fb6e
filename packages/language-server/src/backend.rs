//! LSP Backend
//!
//! Wires the LSP surface onto the analysis state: notifications update
//! the file cache and schedule a debounced analysis; requests answer
//! from the latest completed analysis under the state lock. Provider
//! failures degrade to empty results, never to request errors.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info, warn};

use crate::configuration::Settings;
use crate::debounce::Debouncer;
use crate::providers::{self, CancellationToken};
use crate::state::AnalysisState;

const ANALYSIS_KEY: &str = "analysis";
const DEBOUNCE_DELAY: Duration = Duration::from_millis(300);

/// Handle to the process-wide log filter, swapped when the client's
/// `debug` setting changes.
pub type LogFilterHandle =
    tracing_subscriber::reload::Handle<tracing_subscriber::EnvFilter, tracing_subscriber::Registry>;

pub struct Backend {
    client: Client,
    state: Arc<Mutex<AnalysisState>>,
    debouncer: Arc<Debouncer>,
    root: Mutex<Option<PathBuf>>,
    log_filter: Option<LogFilterHandle>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Backend {
            client,
            state: Arc::new(Mutex::new(AnalysisState::new())),
            debouncer: Arc::new(Debouncer::new(DEBOUNCE_DELAY)),
            root: Mutex::new(None),
            log_filter: None,
        }
    }

    pub fn with_log_filter(mut self, handle: LogFilterHandle) -> Self {
        self.log_filter = Some(handle);
        self
    }

    /// Raise or restore the log level to match the `debug` setting.
    fn apply_log_level(&self, debug: bool) {
        let Some(handle) = &self.log_filter else { return };
        let directive = if debug { "debug" } else { "info" };
        if let Err(error) = handle.reload(tracing_subscriber::EnvFilter::new(directive)) {
            warn!(%error, "failed to update the log filter");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AnalysisState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn generation(&self) -> u64 {
        self.lock().edit_generation
    }

    fn is_excluded(&self, uri: &str) -> bool {
        self.lock().settings.is_excluded(uri)
    }

    fn schedule_analysis(&self) {
        let client = self.client.clone();
        let state = Arc::clone(&self.state);
        self.debouncer
            .execute_later(ANALYSIS_KEY, move || analyze_and_publish(client, state));
    }

    async fn analyze_now(&self) {
        let client = self.client.clone();
        let state = Arc::clone(&self.state);
        self.debouncer
            .execute_now(ANALYSIS_KEY, move || analyze_and_publish(client, state))
            .await;
    }

    /// Pull every script and config file under the workspace root into
    /// the file cache.
    fn scan_workspace(&self, root: &Path) {
        let mut found = Vec::new();
        collect_workspace_files(root, &mut found);
        info!(count = found.len(), "workspace scan complete");
        let mut state = self.lock();
        for (uri, text) in found {
            if state.settings.is_excluded(&uri) {
                continue;
            }
            state.files.set_disk_contents(&uri, Some(text));
        }
    }
}

async fn analyze_and_publish(client: Client, state: Arc<Mutex<AnalysisState>>) {
    let (publishes, debug) = {
        let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
        let suppress = state.settings.suppress_future_warnings;
        let debug = state.settings.debug;
        let publishes = state
            .analyze()
            .into_iter()
            .map(|(uri, errors)| {
                (
                    uri,
                    providers::diagnostics::to_lsp_diagnostics(&errors, suppress),
                )
            })
            .collect::<Vec<_>>();
        (publishes, debug)
    };
    for (uri, diagnostics) in &publishes {
        if debug {
            for diagnostic in diagnostics {
                client
                    .log_message(
                        MessageType::LOG,
                        format!(
                            "{}:{}: {}",
                            uri,
                            diagnostic.range.start.line + 1,
                            diagnostic.message
                        ),
                    )
                    .await;
            }
        }
        match Url::parse(uri) {
            Ok(url) => client.publish_diagnostics(url, diagnostics.clone(), None).await,
            Err(error) => warn!(%uri, %error, "unpublishable diagnostic uri"),
        }
    }
}

fn collect_workspace_files(dir: &Path, out: &mut Vec<(String, String)>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if path.is_dir() {
            // Task work directories and VCS internals are never source.
            if name.starts_with('.') || name == "work" {
                continue;
            }
            collect_workspace_files(&path, out);
            continue;
        }
        let Ok(url) = Url::from_file_path(&path) else { continue };
        let uri = url.to_string();
        if nextflow_compiler::file_kind_of(&uri).is_none() {
            continue;
        }
        if let Ok(text) = std::fs::read_to_string(&path) {
            out.push((uri, text));
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(root) = params
            .root_uri
            .as_ref()
            .and_then(|uri| uri.to_file_path().ok())
        {
            *self.root.lock().unwrap_or_else(|e| e.into_inner()) = Some(root);
        }

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "nextflow-language-server".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![".".to_string()]),
                    ..CompletionOptions::default()
                }),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                workspace_symbol_provider: Some(OneOf::Left(true)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                document_formatting_provider: Some(OneOf::Left(true)),
                document_link_provider: Some(DocumentLinkOptions {
                    resolve_provider: Some(false),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                semantic_tokens_provider: Some(
                    SemanticTokensServerCapabilities::SemanticTokensOptions(
                        SemanticTokensOptions {
                            work_done_progress_options: WorkDoneProgressOptions::default(),
                            legend: SemanticTokensLegend {
                                token_types: providers::semantic_tokens::TOKEN_TYPES.to_vec(),
                                token_modifiers: providers::semantic_tokens::TOKEN_MODIFIERS
                                    .to_vec(),
                            },
                            range: Some(false),
                            full: Some(SemanticTokensFullOptions::Bool(true)),
                        },
                    ),
                ),
                ..ServerCapabilities::default()
            },
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let root = self.root.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(root) = root {
            self.scan_workspace(&root);
            self.schedule_analysis();
        }
        self.client
            .log_message(MessageType::INFO, "nextflow language server ready")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        self.debouncer.shutdown();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        if self.is_excluded(&uri) {
            return;
        }
        debug!(%uri, "did_open");
        {
            let mut state = self.lock();
            state.files.did_open(&uri, params.text_document.text);
            state.edit_generation += 1;
        }
        self.schedule_analysis();
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        if self.is_excluded(&uri) {
            return;
        }
        {
            let mut state = self.lock();
            for change in &params.content_changes {
                let range = change.range.map(|r| {
                    (
                        r.start.line as usize,
                        r.start.character as usize,
                        r.end.line as usize,
                        r.end.character as usize,
                    )
                });
                state.apply_change(&uri, range, &change.text);
            }
        }
        self.schedule_analysis();
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        debug!(%uri, "did_save");
        self.analyze_now().await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        {
            let mut state = self.lock();
            state.files.did_close(&uri);
        }
        self.schedule_analysis();
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let settings = Settings::from_payload(&params.settings);
        let debug = settings.debug;
        let reanalyze = {
            let mut state = self.lock();
            let changed = state.settings.analysis_changed(&settings);
            state.settings = settings;
            if changed {
                state.files.invalidate_all();
            }
            changed
        };
        self.apply_log_level(debug);
        info!(reanalyze, "configuration updated");
        if reanalyze {
            self.analyze_now().await;
        }
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        for event in params.changes {
            let uri = event.uri.to_string();
            if self.is_excluded(&uri) {
                continue;
            }
            let text = if event.typ == FileChangeType::DELETED {
                None
            } else {
                match event.uri.to_file_path() {
                    Ok(path) => tokio::fs::read_to_string(path).await.ok(),
                    Err(_) => None,
                }
            };
            let mut state = self.lock();
            state.files.set_disk_contents(&uri, text);
        }
        self.schedule_analysis();
    }

    async fn did_create_files(&self, params: CreateFilesParams) {
        for file in params.files {
            if let Ok(url) = Url::parse(&file.uri) {
                if let Ok(path) = url.to_file_path() {
                    if let Ok(text) = tokio::fs::read_to_string(path).await {
                        self.lock().files.set_disk_contents(&file.uri, Some(text));
                    }
                }
            }
        }
        self.schedule_analysis();
    }

    async fn did_delete_files(&self, params: DeleteFilesParams) {
        {
            let mut state = self.lock();
            for file in params.files {
                state.files.remove(&file.uri);
            }
        }
        self.schedule_analysis();
    }

    async fn did_rename_files(&self, params: RenameFilesParams) {
        {
            let mut state = self.lock();
            for file in params.files {
                state.files.rename(&file.old_uri, &file.new_uri);
            }
        }
        self.schedule_analysis();
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let token = CancellationToken::new(self.generation());
        let position = params.text_document_position;
        let uri = position.text_document.uri.to_string();
        let state = self.lock();
        if token.is_cancelled(state.edit_generation) {
            return Ok(None);
        }
        let items = providers::completion::completion(
            &state,
            &uri,
            position.position.line as usize,
            position.position.character as usize,
        );
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let token = CancellationToken::new(self.generation());
        let position = params.text_document_position_params;
        let uri = position.text_document.uri.to_string();
        let state = self.lock();
        if token.is_cancelled(state.edit_generation) {
            return Ok(None);
        }
        Ok(providers::definition::definition(
            &state,
            &uri,
            position.position.line as usize,
            position.position.character as usize,
        )
        .map(GotoDefinitionResponse::Scalar))
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let token = CancellationToken::new(self.generation());
        let position = params.text_document_position;
        let uri = position.text_document.uri.to_string();
        let state = self.lock();
        if token.is_cancelled(state.edit_generation) {
            return Ok(None);
        }
        let locations = providers::references::references(
            &state,
            &uri,
            position.position.line as usize,
            position.position.character as usize,
        );
        Ok(Some(locations))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let token = CancellationToken::new(self.generation());
        let uri = params.text_document.uri.to_string();
        let state = self.lock();
        if token.is_cancelled(state.edit_generation) {
            return Ok(None);
        }
        let symbols = providers::symbols::document_symbols(&state, &uri);
        Ok(Some(DocumentSymbolResponse::Nested(symbols)))
    }

    async fn symbol(
        &self,
        params: WorkspaceSymbolParams,
    ) -> Result<Option<Vec<SymbolInformation>>> {
        let token = CancellationToken::new(self.generation());
        let state = self.lock();
        if token.is_cancelled(state.edit_generation) {
            return Ok(None);
        }
        Ok(Some(providers::symbols::workspace_symbols(
            &state,
            &params.query,
        )))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let token = CancellationToken::new(self.generation());
        let position = params.text_document_position_params;
        let uri = position.text_document.uri.to_string();
        let state = self.lock();
        if token.is_cancelled(state.edit_generation) {
            return Ok(None);
        }
        Ok(providers::hover::hover(
            &state,
            &uri,
            position.position.line as usize,
            position.position.character as usize,
        ))
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let token = CancellationToken::new(self.generation());
        let uri = params.text_document.uri.to_string();
        let state = self.lock();
        if token.is_cancelled(state.edit_generation) {
            return Ok(None);
        }
        Ok(Some(providers::formatting::format(&state, &uri)))
    }

    async fn document_link(&self, params: DocumentLinkParams) -> Result<Option<Vec<DocumentLink>>> {
        let token = CancellationToken::new(self.generation());
        let uri = params.text_document.uri.to_string();
        let state = self.lock();
        if token.is_cancelled(state.edit_generation) {
            return Ok(None);
        }
        Ok(Some(providers::links::document_links(&state, &uri)))
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let token = CancellationToken::new(self.generation());
        let uri = params.text_document.uri.to_string();
        let state = self.lock();
        if token.is_cancelled(state.edit_generation) {
            return Ok(None);
        }
        let data = providers::semantic_tokens::semantic_tokens(&state, &uri);
        Ok(Some(SemanticTokensResult::Tokens(SemanticTokens {
            result_id: None,
            data,
        })))
    }
}
