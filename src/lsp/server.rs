//! The tower-lsp backend.
//!
//! Workspace state lives behind a single `RwLock`; request handlers take
//! read locks and the reindex path takes the write lock, so readers never
//! observe a torn index. Open-file contents live in a `DashMap` keyed by
//! path. The initial workspace walk runs as a background task spawned from
//! `initialize`, which replies immediately.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::request::{
    GotoDeclarationParams, GotoDeclarationResponse, GotoImplementationParams,
    GotoImplementationResponse,
};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{info, warn};

use crate::ast::FileNode;
use crate::lexer::{verilog_lexer, Lexer};
use crate::parser::Parser;

use super::completion;
use super::definition;
use super::document::{path_to_uri, uri_to_path, Document};
use super::semantic_tokens;
use super::workspace::WorkspaceIndex;

/// State shared between request handlers and the background indexer.
pub struct ServerState {
    pub lexer: Lexer,
    pub documents: DashMap<PathBuf, Document>,
    pub index: RwLock<WorkspaceIndex>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            lexer: verilog_lexer(),
            documents: DashMap::new(),
            index: RwLock::new(WorkspaceIndex::new()),
        }
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Backend {
    client: Client,
    state: Arc<ServerState>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            state: Arc::new(ServerState::new()),
        }
    }

    fn capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(
                TextDocumentSyncKind::FULL,
            )),
            completion_provider: Some(CompletionOptions::default()),
            definition_provider: Some(OneOf::Left(true)),
            declaration_provider: Some(DeclarationCapability::Simple(true)),
            implementation_provider: Some(ImplementationProviderCapability::Simple(true)),
            semantic_tokens_provider: Some(semantic_tokens::capabilities()),
            ..Default::default()
        }
    }

    fn is_verilog_file(path: &Path) -> bool {
        path.to_string_lossy().ends_with(".v")
    }

    async fn jump(&self, uri: &Url, position: Position) -> Option<GotoDefinitionResponse> {
        let path = uri_to_path(uri);
        let contents = {
            let document = self.state.documents.get(&path)?;
            document.contents()
        };
        let index = self.state.index.read().await;
        let locations = definition::jump_to(
            &index,
            &self.state.lexer,
            &contents,
            position.line,
            position.character,
        );
        if locations.is_empty() {
            None
        } else {
            Some(GotoDefinitionResponse::Array(locations))
        }
    }

    async fn on_change(&self, uri: &Url, text: &str) {
        let path = uri_to_path(uri);
        if !Self::is_verilog_file(&path) {
            return;
        }
        self.state
            .documents
            .entry(path.clone())
            .or_insert_with(|| Document::new(path.clone()))
            .set_contents(text);
        reindex_file(&self.state, &self.client, &path, true).await;
    }
}

/// Lex, parse, and index one file, publishing diagnostics.
///
/// On success the file's index entries are replaced and the parsed tree is
/// returned for callers that want to walk it again; with `publish` the
/// interpreter runs and its warnings go out. On parse failure the previous
/// entries are preserved and exactly one error diagnostic is published at
/// the farthest-error token (or an empty set when the error position falls
/// outside the token stream, clearing older errors).
async fn reindex_file(
    state: &ServerState,
    client: &Client,
    path: &Path,
    publish: bool,
) -> Option<FileNode> {
    let contents = {
        let document = state.documents.get(path)?;
        document.contents()
    };

    let (tokens, lex_err) = state.lexer.lex(&contents);
    if let Some(err) = lex_err {
        warn!(file = %path.display(), %err, "lex error");
        return None;
    }

    let mut parser = Parser::new();
    match parser.parse_file(&tokens) {
        Ok(file) => {
            let diagnostics = {
                let mut index = state.index.write().await;
                index.apply_file(path, &file);
                if publish {
                    Some(index.interpret(&file))
                } else {
                    None
                }
            };
            if let Some(diagnostics) = diagnostics {
                client
                    .publish_diagnostics(path_to_uri(path), diagnostics, None)
                    .await;
            }
            Some(file)
        }
        Err(err) => {
            warn!(file = %path.display(), %err, "parse error");
            let diagnostics = match parser.farthest_position() {
                Some(pos) if pos < tokens.len() => {
                    let token = &tokens[pos];
                    vec![Diagnostic {
                        range: Range {
                            start: Position::new(token.line, token.start_col),
                            end: Position::new(token.line, token.end_col),
                        },
                        severity: Some(DiagnosticSeverity::ERROR),
                        message: err.to_string(),
                        ..Default::default()
                    }]
                }
                _ => Vec::new(),
            };
            client
                .publish_diagnostics(path_to_uri(path), diagnostics, None)
                .await;
            None
        }
    }
}

/// Walk the workspace once: index every `.v` file, then run the interpreter
/// against the now-populated index and publish per-file diagnostics. The
/// trees parsed while indexing are kept for the second pass, so each file
/// is lexed and parsed exactly once.
async fn index_workspace(state: Arc<ServerState>, client: Client) {
    let files = {
        let index = state.index.read().await;
        index.scan_workspace()
    };

    let mut parsed = Vec::new();
    for path in &files {
        state
            .documents
            .entry(path.clone())
            .or_insert_with(|| Document::new(path.clone()));
        if let Some(file) = reindex_file(&state, &client, path, false).await {
            parsed.push((path.clone(), file));
        }
        client
            .publish_diagnostics(path_to_uri(path), Vec::new(), None)
            .await;
    }

    for (path, file) in &parsed {
        let diagnostics = {
            let index = state.index.read().await;
            index.interpret(file)
        };
        client
            .publish_diagnostics(path_to_uri(path), diagnostics, None)
            .await;
    }

    info!(files = files.len(), "workspace indexed");
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .map(|folder| uri_to_path(&folder.uri));

        if let Some(root) = root {
            info!(root = %root.display(), "initializing workspace");
            self.state.index.write().await.root = Some(root);

            // The walk can take a while on large workspaces; the reply to
            // initialize must not wait for it.
            let state = self.state.clone();
            let client = self.client.clone();
            tokio::spawn(async move {
                index_workspace(state, client).await;
            });
        }

        Ok(InitializeResult {
            capabilities: Self::capabilities(),
            server_info: Some(ServerInfo {
                name: "verilog-ls".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "verilog-ls initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.on_change(&params.text_document.uri, &params.text_document.text)
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full-text sync only: the last content change carries the document.
        let Some(change) = params.content_changes.last() else {
            return;
        };
        self.on_change(&params.text_document.uri, &change.text).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let path = uri_to_path(&params.text_document.uri);
        if !Self::is_verilog_file(&path) {
            return;
        }
        self.state
            .documents
            .entry(path.clone())
            .or_insert_with(|| Document::new(path.clone()))
            .mark_saved();
        reindex_file(&self.state, &self.client, &path, true).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        // Index entries survive; the document just stops being editor-owned
        // on the next save.
        info!(uri = %params.text_document.uri, "document closed");
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let path = uri_to_path(&uri);

        let contents = self.state.documents.get(&path).map(|d| d.contents());
        let index = self.state.index.read().await;

        let variables = contents.as_deref().and_then(|contents| {
            let details = definition::location_details(
                &self.state.lexer,
                contents,
                position.line,
                position.character,
            )?;
            index.variable_definitions.get(&details.current_module?)
        });

        let list = completion::completion_list(&index, variables);
        Ok(Some(CompletionResponse::List(list)))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        Ok(self.jump(&uri, position).await)
    }

    async fn goto_declaration(
        &self,
        params: GotoDeclarationParams,
    ) -> Result<Option<GotoDeclarationResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        Ok(self.jump(&uri, position).await)
    }

    async fn goto_implementation(
        &self,
        params: GotoImplementationParams,
    ) -> Result<Option<GotoImplementationResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        Ok(self.jump(&uri, position).await)
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let path = uri_to_path(&params.text_document.uri);
        let contents = match self.state.documents.get(&path) {
            Some(document) => document.contents(),
            None => Document::new(path.clone()).contents(),
        };

        let (mut tokens, _) = self.state.lexer.lex(&contents);
        if let Ok(file) = Parser::new().parse_file(&tokens) {
            semantic_tokens::retag(&mut tokens, &file);
        }

        Ok(Some(SemanticTokensResult::Tokens(SemanticTokens {
            result_id: None,
            data: semantic_tokens::encode(&tokens),
        })))
    }
}
