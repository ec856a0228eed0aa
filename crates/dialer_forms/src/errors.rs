use std::sync::OnceLock;

use color_eyre::Result;
use tracing::error;

static INIT: OnceLock<()> = OnceLock::new();

/// Install the color-eyre report and panic hooks. Safe to call twice.
pub fn init() -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    // try_into_hooks instead of into_hooks: no panic if a theme is already set
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .panic_section(
            "This is a bug. Please report it together with the schema kind and the values file.",
        )
        .capture_span_trace_by_default(false)
        .display_location_section(cfg!(debug_assertions))
        .display_env_section(false)
        .try_into_hooks()?;
    eyre_hook.install()?;

    std::panic::set_hook(Box::new(move |panic_info| {
        let report = panic_hook.panic_report(panic_info).to_string();
        error!("panic: {report}");
        eprintln!("{report}");
        std::process::exit(1);
    }));

    let _ = INIT.set(());
    Ok(())
}
