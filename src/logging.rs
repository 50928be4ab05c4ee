use once_cell::sync::OnceCell;

static INIT: OnceCell<()> = OnceCell::new();

/// Install the tracing subscriber once per process.
///
/// Filter defaults to `tallybook=info,sqlx=warn` and can be overridden with
/// `TALLYBOOK_LOG`. Safe to call from every test; later calls are no-ops.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = std::env::var("TALLYBOOK_LOG")
            .unwrap_or_else(|_| "tallybook=info,sqlx=warn".into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .try_init();
    });
}
