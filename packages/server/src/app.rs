//! Composition root: wires collaborators, use cases and the server together.
//!
//! Dependencies are created in order:
//! 1. Collaborators (persistence, membership, identity)
//! 2. SessionRegistry
//! 3. UseCases
//! 4. AppState
//! 5. Server

use std::sync::Arc;

use crate::{
    config::{ChatSettings, ServerConfig},
    domain::{IdentityDirectory, MembershipRepository, MessageRepository, SessionRegistry},
    infrastructure::{
        registry::InMemorySessionRegistry,
        repository::{ChatSeed, InMemoryChatStore, SeedError},
    },
    ui::{AppState, Server},
    usecase::{
        ConnectSessionUseCase, DisconnectSessionUseCase, FanOutEngine, GetChannelHistoryUseCase,
        GetSessionsUseCase, MessageRouter, SelectChannelUseCase, SendMessageUseCase,
    },
};

/// External collaborators consumed by the fan-out core.
#[derive(Clone)]
pub struct Collaborators {
    pub messages: Arc<dyn MessageRepository>,
    pub membership: Arc<dyn MembershipRepository>,
    pub identity: Arc<dyn IdentityDirectory>,
}

impl Collaborators {
    /// Use one in-memory store for all three roles.
    pub fn in_memory(store: Arc<InMemoryChatStore>) -> Self {
        Self {
            messages: store.clone(),
            membership: store.clone(),
            identity: store,
        }
    }
}

/// Load the seed named by the configuration, or the built-in demo data.
pub fn load_seed(config: &ServerConfig) -> Result<ChatSeed, SeedError> {
    match &config.seed {
        Some(path) => {
            tracing::info!("Loading seed data from {}", path.display());
            ChatSeed::from_file(path)
        }
        None => {
            tracing::info!("No seed file given, using built-in demo data");
            Ok(ChatSeed::demo())
        }
    }
}

/// Build the server with a fresh session registry.
pub fn build_server(settings: ChatSettings, collaborators: Collaborators) -> Server {
    let registry: Arc<dyn SessionRegistry> = Arc::new(InMemorySessionRegistry::new());

    let fan_out = Arc::new(FanOutEngine::new(
        registry.clone(),
        collaborators.membership.clone(),
        collaborators.identity.clone(),
        settings.preview_chars,
    ));
    let send_message = Arc::new(SendMessageUseCase::new(
        collaborators.messages.clone(),
        collaborators.membership.clone(),
        fan_out,
    ));
    let select_channel = Arc::new(SelectChannelUseCase::new(
        registry.clone(),
        collaborators.membership.clone(),
    ));
    let message_router = Arc::new(MessageRouter::new(
        registry.clone(),
        send_message,
        select_channel,
    ));

    let state = Arc::new(AppState {
        identity: collaborators.identity.clone(),
        connect_session_usecase: Arc::new(ConnectSessionUseCase::new(
            registry.clone(),
            settings.connection.queue_capacity,
        )),
        disconnect_session_usecase: Arc::new(DisconnectSessionUseCase::new(registry.clone())),
        message_router,
        get_channel_history_usecase: Arc::new(GetChannelHistoryUseCase::new(
            collaborators.messages,
            collaborators.membership,
            collaborators.identity,
            settings.history_limit,
        )),
        get_sessions_usecase: Arc::new(GetSessionsUseCase::new(registry)),
        settings: settings.connection,
    });

    Server::new(state)
}
