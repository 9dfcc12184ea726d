//! Digest engine: HTTP clients, the job poller, mail delivery and artifact IO.
mod api;
mod artifacts;
mod chat;
mod credentials;
mod exa;
mod mail;
mod monitor;
mod persist;
mod poll;
mod speech;

pub use api::{ApiError, ApiFailure, ApiSettings};
pub use artifacts::{artifact_filename, ArtifactStore, AUDIO_SUBDIR};
pub use chat::{ChatClient, ChatSettings, DEFAULT_CHAT_BASE_URL};
pub use credentials::{
    AuthError, Credential, CredentialProvider, TokenFileCredentials, DEFAULT_TOKEN_URI,
};
pub use exa::{
    dashboard_url, AnswerQuery, ExaClient, Monitor, MonitorSchedule, WebsetApi, WebsetQuery,
    DEFAULT_EXA_BASE_URL,
};
pub use mail::{
    build_message, deliver, DeliveryReport, GmailApiMailer, MailAttachment, MailError,
    MailTransport, OutgoingMessage, SmtpMailer, SmtpSettings, DEFAULT_GMAIL_BASE_URL,
    GMAIL_API_BODY_LIMIT, SMTP_BODY_LIMIT,
};
pub use monitor::{watch_new_items, MonitorSettings, MonitorSummary};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poll::{
    poll_until_ready, Completion, LogProgressSink, PollError, PollEvent, PollOutcome,
    PollSettings, ProgressSink,
};
pub use speech::{SpeechClient, SpeechError, VoiceSettings, DEFAULT_SPEECH_BASE_URL, DEFAULT_VOICE_ID};
