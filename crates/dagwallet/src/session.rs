/// Per-widget "already running" guards. The init protocols consult these so a
/// background notifier is never started twice in one process.
#[derive(Debug, Default, Clone, Copy)]
pub struct WidgetFlags {
    pub dashboard: bool,
    pub pass_keys_to_frontend: bool,
}

/// Process-lifetime session state, owned by the orchestrator instance rather
/// than living in ambient globals. Distinct from persisted wallet data.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    /// Single-flight gate: only one pending create/import/transaction
    /// operation at a time. `true` means idle.
    pub transaction_finished: bool,
    pub user_logged_in: bool,
    pub new_user: bool,
    pub first_tx: bool,
    pub keystore_access: bool,
    pub widgets: WidgetFlags,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            transaction_finished: true,
            user_logged_in: false,
            new_user: false,
            first_tx: false,
            keystore_access: false,
            widgets: WidgetFlags::default(),
        }
    }
}
