//! Centralized constants for NextGen chat.
//! Defaults for the conversation store live here so settings and tests agree.

// ─── Storage ──────────────────────────────────────────────────────────────────

pub mod storage {
    /// Key holding the full conversation collection.
    pub const CONVERSATIONS_KEY: &str = "chatConversations";

    /// Current version of the persisted snapshot envelope.
    pub const SNAPSHOT_VERSION: u32 = 1;

    /// Extension used by the file-backed key-value store.
    pub const FILE_EXTENSION: &str = "json";

    /// Directory name under the platform data dir.
    pub const DATA_DIR_NAME: &str = "nextgen";
}

// ─── Chat defaults ────────────────────────────────────────────────────────────

pub mod chat {
    /// Delay between two revealed words of a simulated reply.
    pub const REVEAL_INTERVAL_MS: u64 = 100;

    pub const TITLE_PREFIX: &str = "Conversación";

    pub const WELCOME_MESSAGE: &str =
        "¡Hola! Soy tu asistente de NextGen. ¿En qué puedo ayudarte hoy con tu desarrollo de liderazgo?";

    pub const CANNED_REPLY: &str = "Gracias por tu mensaje. Como tu asistente de liderazgo, estoy aquí para ayudarte a desarrollar tus habilidades. ¿Te gustaría que exploremos algún tema específico de liderazgo o que analicemos tus fortalezas actuales?";

    pub const COPIED_NOTICE: &str = "Mensaje copiado al portapapeles";

    /// Capacity of the store event broadcast channel.
    pub const EVENT_CHANNEL_CAPACITY: usize = 256;
}

// ─── Message id prefixes ──────────────────────────────────────────────────────

pub mod ids {
    pub const USER_PREFIX: &str = "user";
    pub const ASSISTANT_PREFIX: &str = "assistant";
    pub const WELCOME_PREFIX: &str = "welcome";
    pub const PLACEHOLDER_PREFIX: &str = "typing";
}
