//! Slate agent binary — joins a room and runs the voice/vision turn loop.
//!
//! Starts with structured logging, TOML + environment configuration, and
//! graceful shutdown on SIGTERM/SIGINT.

use slate_agent::{
    load_config, run_audio_loop, AgentSession, OpenAiChatClient, SttService, TtsService, VadHandle,
};
use slate_media::{RoomService, SimulatedRoom};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("SLATE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("agent.toml"));

    // Load configuration
    let config = load_config(selected_config_path)
        .expect("failed to load configuration — the agent cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Prewarm the process-wide VAD before any session starts.
    let vad_handle = VadHandle::new(&config.voice.vad_model_path);
    let vad = vad_handle
        .get()
        .await
        .expect("failed to load VAD model — check voice.vad_model_path in config");

    let stt = Arc::new(SttService::new(
        &config.voice.stt_model_path,
        &config.voice.stt_binary_path,
    ));
    let tts = Arc::new(TtsService::new(
        &config.voice.tts_binary_path,
        &config.voice.tts_model_path,
    ));
    let llm = Arc::new(
        OpenAiChatClient::new(&config.llm.api_key)
            .with_model(&config.llm.model)
            .with_base_url(&config.llm.base_url),
    );

    // With a LiveKit URL configured, provision the room and a join token for
    // the front-end. The in-process room carries the session either way; a
    // production deployment would swap in a client-SDK-backed session here.
    let room_service = RoomService::new(config.livekit.clone());
    if room_service.is_enabled() {
        match room_service.ensure_room("slate-whiteboard").await {
            Ok(room) => tracing::info!(room = %room.name, "LiveKit room ready"),
            Err(e) => tracing::warn!("failed to provision LiveKit room: {}", e),
        }
        match room_service.join_token("slate-whiteboard", "slate-agent", "Slate") {
            Ok(token) => tracing::info!(token_len = token.len(), "minted agent join token"),
            Err(e) => tracing::warn!("failed to mint join token: {}", e),
        }
    } else {
        tracing::info!("no LiveKit URL configured, running with the simulated room");
    }

    let room = Arc::new(SimulatedRoom::new());
    let mut session = AgentSession::new(&config.context, room, stt, tts, llm, vad);

    if let Err(e) = session.start().await {
        tracing::warn!("session greeting failed: {}", e);
    }

    tracing::info!("slate agent running, reading s16le PCM from stdin");

    // Turns are driven by raw PCM piped to stdin, one chunk per candidate
    // utterance (e.g. `arecord -f S16_LE -r 16000 -t raw | slate-agent`).
    tokio::select! {
        result = run_audio_loop(&mut session, tokio::io::stdin()) => {
            match result {
                Ok(()) => tracing::info!("audio input closed"),
                Err(e) => tracing::warn!("audio ingest stopped: {}", e),
            }
            shutdown_signal().await;
        }
        () = shutdown_signal() => {}
    }

    tracing::info!("slate agent shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
